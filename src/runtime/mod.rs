//! Execution strategies
//!
//! - [`javascript`]: evaluates source in a fresh Boa context with a captured
//!   `console.log`
//! - [`python`]: hands source to the RustPython VM thread, capturing
//!   `sys.stdout`
//!
//! Both report failures as [`ExecutionError`], whose `Display` is exactly the
//! text shown in the output panel.

pub mod javascript;
pub mod python;

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single run, already in user-facing form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The program raised an error carrying a message
    #[error("Error: {0}")]
    Raised(String),

    /// The program threw something that is not an error object
    #[error("An unknown error occurred")]
    Unknown,
}

/// Errors that can occur while booting the embedded Python VM
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Python library directory not found: {}", .0.display())]
    MissingLibrary(PathBuf),

    #[error("Failed to spawn the Python VM thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Python VM failed to initialize: {0}")]
    Init(String),

    #[error("Python VM thread exited before reporting readiness")]
    WorkerExited,
}

/// Result type for a single run
pub type ExecutionResult<T> = Result<T, ExecutionError>;
