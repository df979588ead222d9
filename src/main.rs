//! Scratchpad - a two-language code console
//!
//! - JavaScript is evaluated in-process by the Boa engine
//! - Python runs on an embedded RustPython VM booted in the background
//! - Output written by the program is captured and shown with the value of
//!   a trailing expression

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, Result, miette};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::EnvFilter;

use scratchpad::cli::Console;
use scratchpad::config::{ConsoleConfig, PromptConfig, PythonConfig};
use scratchpad::{Language, RunStatus, Session};

#[derive(Parser)]
#[command(name = "scratchpad")]
#[command(author, version, about = "Run JavaScript and Python snippets and capture their output")]
struct Cli {
    /// Evaluate code from the command line
    #[arg(short, long)]
    eval: Option<String>,

    #[command(flatten)]
    options: GlobalOptions,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct GlobalOptions {
    /// Language of the code (inferred from the file extension when omitted)
    #[arg(short, long, global = true)]
    lang: Option<Language>,

    /// Directory of pure-Python modules to make importable
    #[arg(long, global = true)]
    python_path: Option<PathBuf>,

    /// Log runtime events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive console
    Console {
        /// Skip the welcome banner
        #[arg(long)]
        no_banner: bool,
    },
    /// Run a JavaScript or Python file
    Run {
        /// File to run
        file: PathBuf,
    },
    /// Run code read from stdin
    Stdin,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.options.verbose)?;

    match cli.command {
        Some(Commands::Console { no_banner }) => {
            run_console(&cli.options, !no_banner).await?;
        }
        Some(Commands::Run { file }) => {
            let source = std::fs::read_to_string(&file).into_diagnostic()?;
            let language = resolve_language(cli.options.lang, Some(&file))?;
            run_once(&cli.options, language, source).await?;
        }
        Some(Commands::Stdin) => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .into_diagnostic()?;
            let language = resolve_language(cli.options.lang, None)?;
            run_once(&cli.options, language, source).await?;
        }
        None => {
            if let Some(code) = cli.eval {
                let language = resolve_language(cli.options.lang, None)?;
                run_once(&cli.options, language, code).await?;
            } else {
                // No code provided, start the console
                run_console(&cli.options, true).await?;
            }
        }
    }

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` overrides the default level
fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse().into_diagnostic()?))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn session_config(options: &GlobalOptions, language: Language) -> ConsoleConfig {
    ConsoleConfig {
        language,
        python: PythonConfig {
            library_path: options.python_path.clone(),
            ..PythonConfig::default()
        },
        ..ConsoleConfig::default()
    }
}

/// Pick the language from the flag, then the file extension, then JavaScript
fn resolve_language(flag: Option<Language>, file: Option<&Path>) -> Result<Language> {
    if let Some(language) = flag {
        return Ok(language);
    }
    match file {
        Some(path) => Language::from_path(path).ok_or_else(|| {
            miette!(
                "Cannot infer the language of '{}'; pass --lang",
                path.display()
            )
        }),
        None => Ok(Language::default()),
    }
}

async fn run_console(options: &GlobalOptions, show_banner: bool) -> Result<()> {
    let language = options.lang.unwrap_or_default();
    let session = Session::new(session_config(options, language));
    let prompt = PromptConfig {
        show_banner,
        ..PromptConfig::default()
    };

    let mut console = Console::new(session, prompt);
    console.run().await.into_diagnostic()
}

/// Run one program, print its output, and exit non-zero if it failed
async fn run_once(options: &GlobalOptions, language: Language, source: String) -> Result<()> {
    let mut session = Session::new(session_config(options, language));
    if language.needs_embedded_runtime() {
        session.bootstrap().await;
    }
    session.set_source(source);

    let status = session.run().await;
    if !session.output().is_empty() {
        println!("{}", session.output());
    }

    match status {
        RunStatus::Completed => Ok(()),
        RunStatus::Failed => std::process::exit(1),
        RunStatus::RuntimeNotReady => {
            eprintln!(
                "{}: the Python runtime could not be loaded (run with --verbose for details)",
                "Error".red()
            );
            std::process::exit(1);
        }
    }
}
