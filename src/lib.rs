//! Scratchpad - a two-language code console
//!
//! Scratchpad keeps an editor buffer, a language toggle and an output panel,
//! and delegates all execution to existing engines:
//! - Boa: JavaScript, evaluated in a fresh context per run
//! - RustPython: Python, on a VM thread booted asynchronously at startup
//!
//! Program output is captured per run (`console.log` / `sys.stdout`) and
//! composed with the value of a trailing expression.

pub mod capture;
pub mod cli;
pub mod config;
pub mod language;
pub mod runtime;
pub mod session;

// Re-export commonly used types
pub use config::{ConsoleConfig, JsConfig, PromptConfig, PythonConfig};
pub use language::Language;
pub use runtime::python::{NOT_READY_MESSAGE, PythonRuntime};
pub use runtime::{BootstrapError, ExecutionError, ExecutionResult};
pub use session::{PendingRuntime, RunStatus, Session};
