//! Execution console state
//!
//! A [`Session`] is the whole application model: the editor buffer, the
//! selected language, the last composed output, and the embedded Python
//! runtime. It is created when the console starts and dropped when it exits;
//! dropping it also shuts the Python VM thread down.

use std::pin::Pin;
use tracing::{debug, error, info, warn};

use crate::config::ConsoleConfig;
use crate::language::Language;
use crate::runtime::python::{NOT_READY_MESSAGE, PythonRuntime};
use crate::runtime::{BootstrapError, javascript};

/// The in-flight Python bootstrap, resolved by [`Session::complete_bootstrap`]
pub type PendingRuntime =
    Pin<Box<dyn Future<Output = Result<PythonRuntime, BootstrapError>> + Send>>;

/// Lifecycle of the embedded runtime. Loading and ready are separate variants,
/// so a session can never report both.
#[derive(Debug)]
enum RuntimeSlot {
    Unstarted,
    Loading,
    Ready(PythonRuntime),
    Unavailable,
}

/// How the last run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The program ran to completion
    Completed,
    /// The program raised; the output holds the error text
    Failed,
    /// Python was selected before its runtime was ready; nothing ran
    RuntimeNotReady,
}

pub struct Session {
    config: ConsoleConfig,
    source: String,
    language: Language,
    output: String,
    runtime: RuntimeSlot,
}

impl Session {
    /// Create a session with the editor showing the placeholder of the
    /// configured language
    pub fn new(config: ConsoleConfig) -> Self {
        let language = config.language;
        Self {
            config,
            source: language.placeholder().to_string(),
            language,
            output: String::new(),
            runtime: RuntimeSlot::Unstarted,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replace the editor contents
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    /// Append one line to the editor contents
    pub fn append_line(&mut self, line: &str) {
        if !self.source.is_empty() {
            self.source.push('\n');
        }
        self.source.push_str(line);
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Output of the last run, empty before the first one
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn runtime_ready(&self) -> bool {
        matches!(self.runtime, RuntimeSlot::Ready(_))
    }

    pub fn runtime_loading(&self) -> bool {
        matches!(self.runtime, RuntimeSlot::Loading)
    }

    /// The bootstrap failed; Python stays unavailable for this session
    pub fn runtime_unavailable(&self) -> bool {
        matches!(self.runtime, RuntimeSlot::Unavailable)
    }

    /// Whether the run command should be offered
    ///
    /// Disabled while the Python runtime loads, and for Python until it is
    /// ready. [`Session::run`] does not consult this.
    pub fn can_run(&self) -> bool {
        if self.runtime_loading() {
            return false;
        }
        !self.language.needs_embedded_runtime() || self.runtime_ready()
    }

    /// Switch the editor to another language
    ///
    /// Resets the source to the language's placeholder and clears the output.
    /// Returns `false` without touching anything when `language` is already
    /// selected.
    pub fn select_language(&mut self, language: Language) -> bool {
        if language == self.language {
            return false;
        }
        debug!(from = %self.language, to = %language, "switching language");
        self.language = language;
        self.source = language.placeholder().to_string();
        self.output.clear();
        true
    }

    /// Start the one bootstrap attempt of this session
    ///
    /// Returns `None` if a bootstrap was already started.
    pub fn begin_bootstrap(&mut self) -> Option<PendingRuntime> {
        if !matches!(self.runtime, RuntimeSlot::Unstarted) {
            return None;
        }
        info!("loading Python runtime");
        self.runtime = RuntimeSlot::Loading;
        Some(Box::pin(PythonRuntime::launch(self.config.python.clone())))
    }

    /// Record the outcome of [`Session::begin_bootstrap`]
    pub fn complete_bootstrap(&mut self, result: Result<PythonRuntime, BootstrapError>) {
        if !self.runtime_loading() {
            warn!("ignoring bootstrap result: no bootstrap in progress");
            return;
        }
        self.runtime = match result {
            Ok(runtime) => RuntimeSlot::Ready(runtime),
            Err(err) => {
                error!("failed to load the Python runtime: {err}");
                RuntimeSlot::Unavailable
            }
        };
    }

    /// Begin and await the bootstrap in one step. Returns whether Python is
    /// ready afterwards.
    pub async fn bootstrap(&mut self) -> bool {
        if let Some(pending) = self.begin_bootstrap() {
            let result = pending.await;
            self.complete_bootstrap(result);
        }
        self.runtime_ready()
    }

    /// Run the editor contents with the selected language
    ///
    /// The previous output is cleared before anything executes; afterwards
    /// [`Session::output`] holds the composed output or error text.
    pub async fn run(&mut self) -> RunStatus {
        self.output.clear();
        debug!(language = %self.language, "run requested");

        let result = match self.language {
            Language::JavaScript => javascript::execute(&self.source, &self.config.javascript),
            Language::Python => {
                let RuntimeSlot::Ready(runtime) = &self.runtime else {
                    self.output = NOT_READY_MESSAGE.to_string();
                    return RunStatus::RuntimeNotReady;
                };
                runtime.execute(&self.source).await
            }
        };

        match result {
            Ok(output) => {
                self.output = output;
                RunStatus::Completed
            }
            Err(err) => {
                debug!("run failed: {err}");
                self.output = err.to_string();
                RunStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PythonConfig;

    fn session() -> Session {
        Session::new(ConsoleConfig::default())
    }

    fn broken_python() -> ConsoleConfig {
        ConsoleConfig {
            python: PythonConfig {
                library_path: Some("/no/such/python/library".into()),
                ..PythonConfig::default()
            },
            ..ConsoleConfig::default()
        }
    }

    #[test]
    fn test_new_session_state() {
        let session = session();
        assert_eq!(session.language(), Language::JavaScript);
        assert_eq!(session.source(), Language::JavaScript.placeholder());
        assert_eq!(session.output(), "");
        assert!(!session.runtime_loading());
        assert!(!session.runtime_ready());
        assert!(session.can_run());
    }

    #[test]
    fn test_append_line() {
        let mut session = session();
        session.set_source("");
        session.append_line("let a = 1;");
        session.append_line("a");
        assert_eq!(session.source(), "let a = 1;\na");
    }

    #[tokio::test]
    async fn test_javascript_run() {
        let mut session = session();
        session.set_source(r#"console.log("hi"); 42"#);
        assert_eq!(session.run().await, RunStatus::Completed);
        assert_eq!(session.output(), "hi\n=> 42");
    }

    #[tokio::test]
    async fn test_javascript_error() {
        let mut session = session();
        session.set_source(r#"throw new Error("bad")"#);
        assert_eq!(session.run().await, RunStatus::Failed);
        assert_eq!(session.output(), "Error: bad");
    }

    #[tokio::test]
    async fn test_run_replaces_previous_output() {
        let mut session = session();
        session.set_source(r#"console.log("first")"#);
        session.run().await;
        assert_eq!(session.output(), "first");

        session.set_source("");
        session.run().await;
        assert_eq!(session.output(), "");
    }

    #[tokio::test]
    async fn test_python_before_bootstrap_is_not_run() {
        let mut session = session();
        session.select_language(Language::Python);

        for source in [r#"print("x")"#, "raise SystemExit"] {
            session.set_source(source);
            assert_eq!(session.run().await, RunStatus::RuntimeNotReady);
            assert_eq!(session.output(), NOT_READY_MESSAGE);
        }
    }

    #[test]
    fn test_switching_language_resets_editor() {
        let mut session = session();
        session.set_source("console.log(1)");
        assert!(session.select_language(Language::Python));
        assert_eq!(session.source(), "# Write your Python code here");
        assert_eq!(session.output(), "");
        assert!(!session.runtime_loading());
    }

    #[tokio::test]
    async fn test_switching_language_clears_output() {
        let mut session = session();
        session.set_source("1");
        session.run().await;
        assert!(!session.output().is_empty());

        session.select_language(Language::Python);
        assert_eq!(session.output(), "");
        session.select_language(Language::JavaScript);
        assert_eq!(session.source(), Language::JavaScript.placeholder());
    }

    #[test]
    fn test_selecting_current_language_is_noop() {
        let mut session = session();
        session.set_source("let kept = true;");
        assert!(!session.select_language(Language::JavaScript));
        assert_eq!(session.source(), "let kept = true;");
    }

    #[tokio::test]
    async fn test_bootstrap_happens_once() {
        let mut session = session();
        let pending = session.begin_bootstrap().expect("first attempt");
        assert!(session.runtime_loading());
        assert!(!session.runtime_ready());
        assert!(!session.can_run());
        assert!(session.begin_bootstrap().is_none());

        session.complete_bootstrap(pending.await);
        assert!(session.runtime_ready());
        assert!(!session.runtime_loading());
        assert!(session.begin_bootstrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_bootstrap_leaves_python_unavailable() {
        let mut session = Session::new(broken_python());
        assert!(!session.bootstrap().await);
        assert!(session.runtime_unavailable());
        assert!(!session.runtime_loading());
        assert!(session.begin_bootstrap().is_none());

        assert!(session.can_run());
        session.select_language(Language::Python);
        assert!(!session.can_run());

        session.set_source("print(1)");
        assert_eq!(session.run().await, RunStatus::RuntimeNotReady);
        assert_eq!(session.output(), NOT_READY_MESSAGE);
    }

    #[tokio::test]
    async fn test_python_run() {
        let mut session = session();
        assert!(session.bootstrap().await);
        session.select_language(Language::Python);
        assert!(session.can_run());

        session.set_source(r#"print("x")"#);
        assert_eq!(session.run().await, RunStatus::Completed);
        assert_eq!(session.output(), "x");

        session.set_source("1 / 0");
        assert_eq!(session.run().await, RunStatus::Failed);
        assert!(session.output().starts_with("Error: ZeroDivisionError"));
    }
}
