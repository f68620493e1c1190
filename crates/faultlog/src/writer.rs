//! # Size-Limited File Writer
//!
//! Appends rendered records to bucket files. Once a file has reached the
//! configured size budget, further writes to it are dropped without error.
//! Capture failures never propagate to the faulting code path; they come
//! back as [`WriteOutcome::Dropped`].

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use faultlog_config::{log_writer_debug, log_writer_warn, LoggerConfig};

/// Why a record was not written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Target file is at or above its size budget
    SizeLimit,
    /// Target could not be opened or written
    Io(io::ErrorKind),
    /// Log directory could not be created
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { bytes: usize },
    Dropped(DropReason),
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

/// Append-only writer gated by a per-file byte budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimitedWriter {
    limit_bytes: Option<u64>,
}

impl SizeLimitedWriter {
    pub fn new(limit_bytes: Option<u64>) -> Self {
        Self { limit_bytes }
    }

    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::new(config.file_size_limit_bytes())
    }

    pub fn limit_bytes(&self) -> Option<u64> {
        self.limit_bytes
    }

    /// True when `path` exists and is at or above the budget.
    /// No limit or a missing file is never exceeded.
    pub fn size_limit_exceeded(&self, path: &Path) -> bool {
        let Some(limit) = self.limit_bytes else {
            return false;
        };
        match fs::metadata(path) {
            Ok(meta) => meta.len() >= limit,
            Err(_) => false,
        }
    }

    /// Append `text` to `path` unless the size gate is closed.
    pub fn write(&self, path: &Path, text: &str) -> WriteOutcome {
        if self.size_limit_exceeded(path) {
            log_writer_debug!(path = %path.display(), "Size limit reached, record dropped");
            return WriteOutcome::Dropped(DropReason::SizeLimit);
        }

        match append(path, text.as_bytes()) {
            Ok(()) => WriteOutcome::Written { bytes: text.len() },
            Err(e) => {
                log_writer_warn!(path = %path.display(), error = %e, "Failed to append record");
                WriteOutcome::Dropped(DropReason::Io(e.kind()))
            }
        }
    }
}

/// Single `write_all` on an O_APPEND handle
fn append(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(bytes)?;
    file.flush()
}
