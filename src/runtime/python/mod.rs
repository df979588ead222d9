//! Python strategy powered by an embedded RustPython VM
//!
//! The interpreter is not `Send`, so it lives on a dedicated thread for the
//! whole session. [`PythonRuntime`] is the only way to reach it: each run is
//! one request/reply pair over tokio channels. Dropping the handle closes the
//! job channel and the thread exits.

mod worker;

use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::{BootstrapError, ExecutionError, ExecutionResult};
use crate::config::PythonConfig;

/// Shown instead of running anything while the VM is not available
pub const NOT_READY_MESSAGE: &str = "Python runtime is not ready yet. Please wait...";

/// A request for the VM thread
struct Job {
    source: String,
    reply: oneshot::Sender<ExecutionResult<String>>,
}

/// Handle to a booted Python VM
#[derive(Debug)]
pub struct PythonRuntime {
    jobs: mpsc::UnboundedSender<Job>,
}

impl PythonRuntime {
    /// Spawn the VM thread and wait until it reports readiness
    ///
    /// The thread starts immediately; the returned future only waits for the
    /// outcome of the boot.
    pub fn launch(
        config: PythonConfig,
    ) -> impl Future<Output = Result<PythonRuntime, BootstrapError>> + Send + 'static {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread_name = config.thread_name.clone();
        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .stack_size(config.stack_size)
            .spawn(move || worker::serve(config, jobs_rx, ready_tx));

        async move {
            spawned?;
            debug!(thread = %thread_name, "waiting for Python VM");
            ready_rx.await.map_err(|_| BootstrapError::WorkerExited)??;
            info!("Python runtime ready");
            Ok::<_, BootstrapError>(PythonRuntime { jobs: jobs_tx })
        }
    }

    /// Run `source` on the VM and compose its output
    pub async fn execute(&self, source: &str) -> ExecutionResult<String> {
        let (reply, response) = oneshot::channel();
        let job = Job {
            source: source.to_string(),
            reply,
        };

        self.jobs.send(job).map_err(|_| stopped())?;
        response.await.map_err(|_| stopped())?
    }
}

fn stopped() -> ExecutionError {
    ExecutionError::Raised("Python runtime has stopped".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn boot() -> PythonRuntime {
        PythonRuntime::launch(PythonConfig::default())
            .await
            .expect("Python VM should boot")
    }

    #[tokio::test]
    async fn test_print_is_captured() {
        let runtime = boot().await;
        assert_eq!(runtime.execute(r#"print("x")"#).await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_trailing_expression_value() {
        let runtime = boot().await;
        let output = runtime.execute("print('sum')\n1 + 2").await.unwrap();
        assert_eq!(output, "sum\n\n=> 3");
    }

    #[tokio::test]
    async fn test_value_only_is_trimmed() {
        let runtime = boot().await;
        assert_eq!(runtime.execute("'abc'").await.unwrap(), "=> abc");
    }

    #[tokio::test]
    async fn test_none_is_not_a_value() {
        let runtime = boot().await;
        assert_eq!(runtime.execute("None").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_trailing_semicolon_suppresses_value() {
        let runtime = boot().await;
        assert_eq!(runtime.execute("x = 5\nx;").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_multiline_trailing_expression() {
        let runtime = boot().await;
        let output = runtime.execute("values = [1, 2]\nlen(\n    values\n)").await;
        assert_eq!(output.unwrap(), "=> 2");
    }

    #[tokio::test]
    async fn test_exception_is_reported() {
        let runtime = boot().await;
        let err = runtime.execute("print('lost')\nundefined_name").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: NameError: name 'undefined_name' is not defined"
        );
    }

    #[tokio::test]
    async fn test_syntax_error_is_reported() {
        let runtime = boot().await;
        let err = runtime.execute("def broken(:\n    pass").await.unwrap_err();
        assert!(err.to_string().starts_with("Error: SyntaxError"));
    }

    #[tokio::test]
    async fn test_capture_works_after_failure() {
        let runtime = boot().await;
        assert!(runtime.execute("raise ValueError('boom')").await.is_err());
        assert_eq!(runtime.execute("print('after')").await.unwrap(), "after");
    }

    #[tokio::test]
    async fn test_runs_do_not_share_globals() {
        let runtime = boot().await;
        runtime.execute("leaked = 1").await.unwrap();
        let err = runtime.execute("leaked").await.unwrap_err();
        assert!(err.to_string().contains("NameError"));
    }

    #[tokio::test]
    async fn test_deep_recursion_is_a_recursion_error() {
        let runtime = boot().await;
        let err = runtime
            .execute("def f(n):\n    return f(n + 1)\nf(0)")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error: RecursionError"));
        assert_eq!(runtime.execute("print('alive')").await.unwrap(), "alive");
    }

    #[cfg(feature = "python-stdlib")]
    #[tokio::test]
    async fn test_standard_library_imports() {
        let runtime = boot().await;
        let output = runtime.execute("import math\nround(math.pi, 2)").await;
        assert_eq!(output.unwrap(), "=> 3.14");
        let output = runtime
            .execute("import json\njson.dumps({'a': [1, 2]})")
            .await;
        assert_eq!(output.unwrap(), r#"=> {"a": [1, 2]}"#);
    }

    #[tokio::test]
    async fn test_input_sees_end_of_file() {
        let runtime = boot().await;
        let err = runtime.execute("name = input('name? ')").await.unwrap_err();
        assert!(err.to_string().starts_with("Error: EOFError"));
    }

    #[tokio::test]
    async fn test_missing_library_path_fails_boot() {
        let config = PythonConfig {
            library_path: Some("/definitely/not/a/python/lib".into()),
            ..PythonConfig::default()
        };
        let result = PythonRuntime::launch(config).await;
        assert!(matches!(result, Err(BootstrapError::MissingLibrary(_))));
    }
}
