//! # Log Path Resolver
//!
//! Computes the active log directory. With date rotation enabled the current
//! date is appended as `YYYY/MM/DD`, evaluated on every call:
//!
//! ```text
//! <log_dir_path>/
//! └── 2024/
//!     └── 03/
//!         └── 09/
//!             ├── other.txt
//!             └── exception.txt
//! ```

use std::fs::DirBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use faultlog_config::LoggerConfig;

use crate::clock::{Clock, SystemClock};
use crate::error::{FaultLogError, Result};

#[derive(Clone)]
pub struct LogPathResolver {
    base: PathBuf,
    rotate_by_date: bool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LogPathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogPathResolver")
            .field("base", &self.base)
            .field("rotate_by_date", &self.rotate_by_date)
            .finish()
    }
}

impl LogPathResolver {
    pub fn new(base: impl Into<PathBuf>, rotate_by_date: bool, clock: Arc<dyn Clock>) -> Self {
        Self {
            base: base.into(),
            rotate_by_date,
            clock,
        }
    }

    pub fn from_config(config: &LoggerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.log_dir_path(), config.rotate_by_date(), clock)
    }

    /// Resolver on the wall clock
    pub fn system(config: &LoggerConfig) -> Self {
        Self::from_config(config, Arc::new(SystemClock))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Active log directory for the clock's current date
    pub fn resolve(&self) -> PathBuf {
        self.resolve_at(&self.clock.now())
    }

    /// Log directory for a given instant
    pub fn resolve_at(&self, now: &DateTime<Local>) -> PathBuf {
        if !self.rotate_by_date {
            return self.base.clone();
        }
        self.base
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string())
            .join(now.format("%d").to_string())
    }

    /// Create the active directory chain if missing
    pub fn ensure_exists(&self) -> Result<PathBuf> {
        let dir = self.resolve();
        if dir.is_dir() {
            return Ok(dir);
        }
        create_dir_chain(&dir).map_err(|source| FaultLogError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Full path of `file_name` inside the active directory, creating it first
    pub fn file_path(&self, file_name: &str) -> Result<PathBuf> {
        Ok(self.ensure_exists()?.join(file_name))
    }
}

#[cfg(unix)]
fn create_dir_chain(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    DirBuilder::new().recursive(true).mode(0o755).create(dir)
}

#[cfg(not(unix))]
fn create_dir_chain(dir: &Path) -> std::io::Result<()> {
    DirBuilder::new().recursive(true).create(dir)
}
