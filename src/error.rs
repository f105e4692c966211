//! Error types for process execution and burn jobs
//!
//! Uses `thiserror` so each layer gets a typed error with readable messages.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of the process layer itself
///
/// A child that runs and exits nonzero is *not* an `ExecError`; its outcome
/// is returned normally.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The binary could not be launched
    #[error("failed to start {}: {source}", binary.display())]
    Start {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the child's output failed
    #[error("failed to read xorriso output: {0}")]
    Pipe(#[source] io::Error),
}

/// Errors reported by the burn controller and drive queries
#[derive(Error, Debug)]
pub enum BurnError {
    #[error("{0}")]
    Start(String),

    #[error("{0}")]
    Pipe(String),

    /// The tool ran but reported failure
    #[error("xorriso exited with code {code}: {message}")]
    NonZeroExit { code: i32, message: String },

    #[error("burn already in progress")]
    Busy,

    #[error("no matching burn job found: {0}")]
    UnknownJob(String),
}

impl From<ExecError> for BurnError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Start { .. } => BurnError::Start(e.to_string()),
            ExecError::Pipe(_) => BurnError::Pipe(e.to_string()),
        }
    }
}
