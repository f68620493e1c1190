//! # faultlog
//!
//! Captures runtime faults of the running process into categorized,
//! append-only text files, with an optional email alert for fatal errors.
//!
//! ## Pipeline
//!
//! ```text
//! host (raise / panic / fault_assert!)
//!   └── HandlerRegistry ── chained to previously installed handlers
//!         └── FaultRouter ── severity table → bucket
//!               ├── context snapshot (allow-list / deny-list)
//!               ├── LogPathResolver (<dir>[/YYYY/MM/DD])
//!               └── SizeLimitedWriter → <stem>.txt
//! end of process
//!   └── ShutdownCapturer ── last fault fatal? → fatal dump (+ email)
//! ```
//!
//! ## Layout
//!
//! ```text
//! <log_dir_path>/
//! ├── fatal_error.txt
//! ├── exception.txt
//! ├── deprecated.txt
//! └── other.txt
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use faultlog::{fault, LoggerOptions, SeverityCode};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut options = LoggerOptions::with_log_dir("/var/log/app");
//!     options.rotate_by_date = true;
//!     let _faults = faultlog::register_all(options)?;
//!
//!     fault!(SeverityCode::DEPRECATED, "v1 endpoint called");
//!     Ok(())
//! }
//! ```

pub mod alert;
pub mod clock;
pub mod context;
pub mod error;
pub mod event;
pub mod host;
pub mod path;
pub mod record;
pub mod registry;
pub mod router;
pub mod severity;
pub mod shutdown;
pub mod testing;
pub mod writer;

use std::sync::Arc;

pub use alert::{AlertTransport, SendmailTransport};
pub use clock::{Clock, SystemClock};
pub use context::{ContextSource, FieldPolicy, ProcessEnvironment, StaticContext};
pub use error::{FaultLogError, Result};
pub use event::{AssertionFailed, FaultEvent, FaultKind, UncaughtException};
pub use faultlog_config::{ConfigError, LoggerConfig, LoggerOptions};
pub use host::{
    assertion_failed, exit, raise, raise_fatal, AssertionHandler, ExceptionHandler, FaultHandler,
    FaultHost, LastFaultSource, ProcessHost, ShutdownHook,
};
pub use path::LogPathResolver;
pub use registry::HandlerRegistry;
pub use router::{FaultRouter, Routed};
pub use severity::{classify, Bucket, SeverityCode};
pub use shutdown::{AlertOutcome, ShutdownCapturer, ShutdownGuard, ShutdownOutcome};
pub use writer::{DropReason, SizeLimitedWriter, WriteOutcome};

/// Validate `options` and install every hook on the process host.
///
/// Hold the returned guard until the end of `main`; dropping it runs the
/// shutdown capture. [`exit`] runs it too.
pub fn register_all(options: LoggerOptions) -> Result<ShutdownGuard> {
    let config = LoggerConfig::from_options(options)?;
    register_all_with(config)
}

/// [`register_all`] for an already validated config
pub fn register_all_with(config: LoggerConfig) -> Result<ShutdownGuard> {
    let mut registry = HandlerRegistry::new(Arc::new(config));
    registry.register_all(Arc::new(ProcessHost))
}
