//! Configuration for a scratchpad session

use crate::language::Language;
use std::path::PathBuf;

/// Top level configuration, filled from command-line flags
#[derive(Debug, Clone, Default)]
pub struct ConsoleConfig {
    /// Language selected when the session starts
    pub language: Language,
    /// Boa engine settings
    pub javascript: JsConfig,
    /// Embedded Python VM settings
    pub python: PythonConfig,
}

/// Settings for each fresh Boa context
#[derive(Debug, Clone)]
pub struct JsConfig {
    /// Maximum call depth before a RangeError is raised
    pub recursion_limit: usize,
    /// Maximum VM stack size
    pub stack_size_limit: usize,
}

impl Default for JsConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 16384,
            stack_size_limit: 1024 * 1024,
        }
    }
}

/// Settings for the embedded Python VM
#[derive(Debug, Clone)]
pub struct PythonConfig {
    /// Directory of pure-Python modules appended to `sys.path`
    pub library_path: Option<PathBuf>,
    /// Name of the OS thread hosting the VM
    pub thread_name: String,
    /// Native stack of the VM thread; deep Python recursion must hit the
    /// interpreter's recursion limit before it exhausts this
    pub stack_size: usize,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            thread_name: "scratchpad-python".to_string(),
            stack_size: 256 * 1024 * 1024,
        }
    }
}

/// Prompt strings of the interactive console
#[derive(Debug, Clone)]
pub struct PromptConfig {
    /// Printed before every editor line
    pub prompt: String,
    /// Whether to print the banner on start
    pub show_banner: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            show_banner: true,
        }
    }
}
