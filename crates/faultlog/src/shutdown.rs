//! # Shutdown Capturer
//!
//! End-of-process check for an unrecoverable fault. Such a fault leaves no
//! exception path to observe it, so the capturer pulls the host's last
//! reported fault instead of being notified. When it is of the fatal class,
//! a full dump goes to the `fatal` bucket file and, if configured, to the
//! alert address. The two deliveries are independent: a dropped file write
//! does not prevent the email.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use faultlog_config::{log_alert_error, log_alert_info, log_shutdown_debug, LoggerConfig};

use crate::alert::{alert_subject, AlertTransport};
use crate::clock::Clock;
use crate::context::{snapshot, ContextSource};
use crate::host::{FaultHost, LastFaultSource, ShutdownHook};
use crate::path::LogPathResolver;
use crate::record::render_fatal;
use crate::router::write_bucket;
use crate::severity::{classify, Bucket};
use crate::writer::{SizeLimitedWriter, WriteOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// No alert address configured
    Disabled,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// No fault was reported during the process lifetime
    NoFault,
    /// The last fault was not of the fatal class
    NotFatal,
    Captured {
        write: WriteOutcome,
        alert: AlertOutcome,
    },
}

pub struct ShutdownCapturer {
    config: Arc<LoggerConfig>,
    resolver: LogPathResolver,
    writer: SizeLimitedWriter,
    context: Arc<dyn ContextSource>,
    transport: Arc<dyn AlertTransport>,
    clock: Arc<dyn Clock>,
    done: AtomicBool,
}

impl ShutdownCapturer {
    pub fn new(
        config: Arc<LoggerConfig>,
        clock: Arc<dyn Clock>,
        context: Arc<dyn ContextSource>,
        transport: Arc<dyn AlertTransport>,
    ) -> Self {
        Self {
            resolver: LogPathResolver::from_config(&config, clock.clone()),
            writer: SizeLimitedWriter::from_config(&config),
            config,
            context,
            transport,
            clock,
            done: AtomicBool::new(false),
        }
    }

    /// Inspect the last fault and capture it if fatal
    pub fn capture<S: LastFaultSource + ?Sized>(&self, source: &S) -> ShutdownOutcome {
        let Some(last) = source.last_fault() else {
            return ShutdownOutcome::NoFault;
        };
        if !last.level().is_unrecoverable() {
            log_shutdown_debug!(level = last.level().0, "Last fault is not fatal");
            return ShutdownOutcome::NotFatal;
        }

        let class = classify(last.level());
        let dump = render_fatal(
            &last,
            &class.display_name,
            &self.context.request(),
            &snapshot(self.context.as_ref(), true),
            &self.clock.now(),
        );

        let write = write_bucket(
            &self.resolver,
            &self.writer,
            &self.config,
            Bucket::Fatal,
            &dump,
        );
        let alert = self.send_alert(last.message(), &dump);

        ShutdownOutcome::Captured { write, alert }
    }

    /// [`capture`](Self::capture) at most once per capturer
    pub fn capture_once<S: LastFaultSource + ?Sized>(
        &self,
        source: &S,
    ) -> Option<ShutdownOutcome> {
        if self.done.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.capture(source))
    }

    pub fn has_run(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    fn send_alert(&self, message: &str, dump: &str) -> AlertOutcome {
        let Some(to) = self.config.alert_email() else {
            return AlertOutcome::Disabled;
        };
        match self.transport.send(to, &alert_subject(message), dump) {
            Ok(()) => {
                log_alert_info!(to = to, "Fatal error alert sent");
                AlertOutcome::Sent
            }
            Err(e) => {
                log_alert_error!(to = to, error = %e, "Fatal error alert failed");
                AlertOutcome::Failed
            }
        }
    }
}

impl ShutdownHook for ShutdownCapturer {
    fn on_shutdown(&self, source: &dyn LastFaultSource) {
        let _ = self.capture_once(source);
    }
}

/// Runs the shutdown capture when dropped.
///
/// Keep it alive for the whole of `main`:
///
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     let _faults = faultlog::register_all(options)?;
///     run()
/// }
/// ```
#[must_use = "the shutdown capture runs when this guard is dropped"]
pub struct ShutdownGuard {
    capturer: Arc<ShutdownCapturer>,
    source: Arc<dyn FaultHost>,
}

impl ShutdownGuard {
    pub fn new(capturer: Arc<ShutdownCapturer>, source: Arc<dyn FaultHost>) -> Self {
        Self { capturer, source }
    }

    /// Run the capture now instead of at drop
    pub fn run(self) -> Option<ShutdownOutcome> {
        self.capturer.capture_once(self.source.as_ref())
    }

    pub fn capturer(&self) -> &Arc<ShutdownCapturer> {
        &self.capturer
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        let _ = self.capturer.capture_once(self.source.as_ref());
    }
}
