//! Diagnostics logging for faultlog components.
//!
//! These macros cover the pipeline's own diagnostics (dropped writes, failed
//! alert sends). They never reach the fault log files.
//!
//! # Usage
//!
//! ```ignore
//! use faultlog_config::log_writer_warn;
//!
//! log_writer_warn!(path = %path.display(), "Size limit reached, record dropped");
//! ```

/// Component identifiers for log filtering
pub struct Component;

impl Component {
    pub const ROUTER: &'static str = "ROUTER";
    pub const WRITER: &'static str = "WRITER";
    pub const REGISTRY: &'static str = "REGISTRY";
    pub const SHUTDOWN: &'static str = "SHUTDOWN";
    pub const ALERT: &'static str = "ALERT";
}

/// Log levels for runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// === ROUTER logging macros ===

#[macro_export]
macro_rules! log_router_debug {
    ($($arg:tt)+) => {
        tracing::debug!(component = $crate::logging::Component::ROUTER, $($arg)+)
    };
}

// === WRITER logging macros ===

#[macro_export]
macro_rules! log_writer_warn {
    ($($arg:tt)+) => {
        tracing::warn!(component = $crate::logging::Component::WRITER, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_writer_debug {
    ($($arg:tt)+) => {
        tracing::debug!(component = $crate::logging::Component::WRITER, $($arg)+)
    };
}

// === REGISTRY logging macros ===

#[macro_export]
macro_rules! log_registry_info {
    ($($arg:tt)+) => {
        tracing::info!(component = $crate::logging::Component::REGISTRY, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_registry_debug {
    ($($arg:tt)+) => {
        tracing::debug!(component = $crate::logging::Component::REGISTRY, $($arg)+)
    };
}

// === SHUTDOWN logging macros ===

#[macro_export]
macro_rules! log_shutdown_warn {
    ($($arg:tt)+) => {
        tracing::warn!(component = $crate::logging::Component::SHUTDOWN, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_shutdown_debug {
    ($($arg:tt)+) => {
        tracing::debug!(component = $crate::logging::Component::SHUTDOWN, $($arg)+)
    };
}

// === ALERT logging macros ===

#[macro_export]
macro_rules! log_alert_error {
    ($($arg:tt)+) => {
        tracing::error!(component = $crate::logging::Component::ALERT, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_alert_info {
    ($($arg:tt)+) => {
        tracing::info!(component = $crate::logging::Component::ALERT, $($arg)+)
    };
}

/// Initialize diagnostics logging with the given level filter.
///
/// `FAULTLOG_LOG` takes precedence over `RUST_LOG`. Does nothing if the host
/// already installed a global subscriber.
pub fn init_logging(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_env("FAULTLOG_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
