//! Interactive console for the scratchpad
//!
//! Lines typed at the prompt go into the editor buffer. Commands start with
//! `.` and drive the session: `.run` executes the buffer, `.js` / `.py`
//! switch language, `.source` / `.output` show the two panels.
//!
//! The Python runtime boots in the background while the console is already
//! accepting input.

use crate::capture::EMPTY_OUTPUT_HINT;
use crate::config::PromptConfig;
use crate::language::Language;
use crate::session::{PendingRuntime, RunStatus, Session};
use colored::Colorize;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

/// What the console should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Interactive console around one [`Session`]
pub struct Console {
    session: Session,
    config: PromptConfig,
}

impl Console {
    pub fn new(session: Session, config: PromptConfig) -> Self {
        Self { session, config }
    }

    /// Print the welcome banner
    fn print_banner(&self) {
        println!("{}", "╔════════════════════════════════════════════════════════════╗".cyan());
        println!("{}", "║                        Scratchpad                          ║".cyan());
        println!("{}", "║           JavaScript on Boa · Python on RustPython         ║".cyan());
        println!("{}", "╚════════════════════════════════════════════════════════════╝".cyan());
        println!();
        println!("Version: {}", env!("CARGO_PKG_VERSION").green());
        println!(
            "Type code to fill the editor, {} to execute it, {} for help",
            ".run".yellow(),
            ".help".yellow()
        );
        println!();
    }

    /// Print help information
    fn print_help(&self) {
        println!("{}", "Available commands:".bold());
        println!("  {}      - Run the editor contents", ".run".yellow());
        println!("  {}       - Switch to JavaScript", ".js".yellow());
        println!("  {}       - Switch to Python", ".py".yellow());
        println!("  {}   - Show the editor contents", ".source".yellow());
        println!("  {}   - Show the last output", ".output".yellow());
        println!("  {}      - Empty the editor", ".new".yellow());
        println!("  {}   - Show language and runtime status", ".status".yellow());
        println!("  {}    - Clear the screen", ".clear".yellow());
        println!("  {}     - Exit", ".exit".yellow());
        println!();
        println!("{}", "Tips:".bold());
        println!("  - Switching language replaces the editor with a placeholder");
        println!("  - console.log in JavaScript and print in Python are captured");
        println!("  - A trailing expression is shown after {}", "=>".green());
        println!("  - Programs get no input: Python's input() raises EOFError");
        println!();
    }

    fn print_status(&self) {
        let runtime = if self.session.runtime_ready() {
            "ready".green()
        } else if self.session.runtime_loading() {
            "loading".yellow()
        } else if self.session.runtime_unavailable() {
            "unavailable".red()
        } else {
            "not started".dimmed()
        };

        println!("{}", "Session:".bold());
        println!("  Language: {}", self.session.language().to_string().cyan());
        println!("  Python runtime: {}", runtime);
        println!(
            "  Run: {}",
            if self.session.can_run() {
                "enabled".green()
            } else {
                "disabled".dimmed()
            }
        );
        println!();
    }

    fn print_source(&self) {
        println!("{}", "── editor ──".dimmed());
        println!("{}", self.session.source());
        println!("{}", "────────────".dimmed());
    }

    fn print_output(&self) {
        println!("{}", "── output ──".dimmed());
        if self.session.output().is_empty() {
            println!("{}", EMPTY_OUTPUT_HINT.dimmed());
        } else {
            println!("{}", self.session.output());
        }
        println!("{}", "────────────".dimmed());
    }

    fn switch_language(&mut self, language: Language) {
        if self.session.select_language(language) {
            println!("Switched to {}", language.to_string().cyan());
            self.print_source();
        } else {
            println!("Already using {}", language);
        }
    }

    async fn run_source(&mut self) {
        if !self.session.can_run() {
            let reason = if self.session.runtime_loading() {
                "Run is disabled while the Python runtime is loading"
            } else {
                "Run is disabled: the Python runtime is not available"
            };
            println!("{}", reason.dimmed());
            return;
        }

        let status = self.session.run().await;
        self.print_output();
        if status == RunStatus::Failed {
            println!("{}", "(run failed)".red());
        }
    }

    /// Process a console command (starts with .)
    async fn process_command(&mut self, command: &str) -> Flow {
        match command.trim() {
            ".exit" | ".quit" | ".q" => return Flow::Exit,
            ".help" | ".h" => self.print_help(),
            ".run" | ".r" => self.run_source().await,
            ".js" | ".javascript" => self.switch_language(Language::JavaScript),
            ".py" | ".python" => self.switch_language(Language::Python),
            ".source" | ".src" => self.print_source(),
            ".output" | ".out" => self.print_output(),
            ".new" => {
                self.session.set_source("");
                println!("{}", "Editor emptied".dimmed());
            }
            ".status" => self.print_status(),
            ".clear" | ".cls" => {
                // Clear screen using ANSI escape codes
                print!("\x1B[2J\x1B[1;1H");
                let _ = io::stdout().flush();
            }
            cmd => {
                println!(
                    "{}: Unknown command '{}'. Type .help for available commands.",
                    "Error".red(),
                    cmd
                );
            }
        }
        Flow::Continue
    }

    fn report_bootstrap(&self) {
        if self.session.runtime_ready() {
            println!("{}", "Python runtime ready".green());
        } else {
            println!(
                "{}",
                "Python runtime failed to load; Python runs are disabled".red()
            );
        }
    }

    fn print_prompt(&self) -> io::Result<()> {
        let tag = match self.session.language() {
            Language::JavaScript => "js",
            Language::Python => "py",
        };
        print!("{}{}", tag.cyan(), self.config.prompt.cyan());
        io::stdout().flush()
    }

    /// Run the interactive console until `.exit` or end of input
    pub async fn run(&mut self) -> io::Result<()> {
        if self.config.show_banner {
            self.print_banner();
        }

        let mut pending: Option<PendingRuntime> = self.session.begin_bootstrap();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        self.print_prompt()?;
        loop {
            tokio::select! {
                result = async {
                    match pending.as_mut() {
                        Some(bootstrap) => bootstrap.await,
                        None => std::future::pending().await,
                    }
                }, if pending.is_some() => {
                    pending = None;
                    self.session.complete_bootstrap(result);
                    println!();
                    self.report_bootstrap();
                    self.print_prompt()?;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        // EOF
                        println!();
                        break;
                    };
                    let line = line.trim_end_matches('\r');

                    if line.starts_with('.') {
                        if self.process_command(line).await == Flow::Exit {
                            break;
                        }
                    } else {
                        self.session.append_line(line);
                    }
                    self.print_prompt()?;
                }
            }
        }

        println!("{}", "Goodbye!".cyan());
        Ok(())
    }
}
