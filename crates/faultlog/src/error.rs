use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to the caller at setup time.
///
/// Steady-state capture never returns these to the faulting code path; see
/// [`crate::writer::WriteOutcome`].
#[derive(Error, Debug)]
pub enum FaultLogError {
    #[error("Configuration error: {0}")]
    Config(#[from] faultlog_config::ConfigError),

    #[error("Failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Alert delivery failed: {0}")]
    Alert(String),
}

pub type Result<T> = std::result::Result<T, FaultLogError>;
