//! The two languages a scratchpad session can run

use clap::ValueEnum;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Language selected in the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Language {
    /// Evaluated in-process by the Boa engine
    #[default]
    #[value(name = "javascript", alias = "js")]
    JavaScript,
    /// Executed by the embedded RustPython VM once it has booted
    #[value(alias = "py")]
    Python,
}

impl Language {
    /// Comment the editor is reset to when this language is selected
    pub fn placeholder(self) -> &'static str {
        match self {
            Language::JavaScript => "// Write your JavaScript code here",
            Language::Python => "# Write your Python code here",
        }
    }

    /// Human readable name
    pub fn display_name(self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
        }
    }

    /// Whether this language runs on the embedded VM rather than in-process
    pub fn needs_embedded_runtime(self) -> bool {
        matches!(self, Language::Python)
    }

    /// Infer the language from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "js" | "mjs" | "cjs" => Some(Language::JavaScript),
            "py" | "pyw" => Some(Language::Python),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "js" | "javascript" => Ok(Language::JavaScript),
            "py" | "python" => Ok(Language::Python),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}
