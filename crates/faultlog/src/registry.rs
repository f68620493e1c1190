//! # Handler Registry
//!
//! Subscribes the pipeline to a [`FaultHost`] and keeps whatever handler was
//! installed before, so existing observers keep running:
//!
//! - fault hook → [`FaultRouter`], then the previous fault handler
//! - exception hook → exception record (previous handler kept, not called)
//! - assertion hook → [`AssertionFailed`] for the host to raise
//! - shutdown hook → [`ShutdownCapturer`]
//!
//! Registering the same hook twice chains the pipeline through itself and
//! doubles every record. Callers register once.

use std::sync::Arc;

use faultlog_config::{log_registry_debug, log_registry_info, LoggerConfig};
use once_cell::sync::OnceCell;

use crate::alert::{AlertTransport, SendmailTransport};
use crate::clock::{Clock, SystemClock};
use crate::context::{ContextSource, ProcessEnvironment};
use crate::error::Result;
use crate::event::{AssertionFailed, FaultEvent, UncaughtException};
use crate::host::{AssertionHandler, ExceptionHandler, FaultHandler, FaultHost};
use crate::path::LogPathResolver;
use crate::router::FaultRouter;
use crate::shutdown::{ShutdownCapturer, ShutdownGuard};

/// Router plus the delegate that was installed before it
pub struct ChainedFaultHandler {
    router: Arc<FaultRouter>,
    previous: OnceCell<Arc<dyn FaultHandler>>,
}

impl ChainedFaultHandler {
    pub fn previous(&self) -> Option<&Arc<dyn FaultHandler>> {
        self.previous.get()
    }
}

impl FaultHandler for ChainedFaultHandler {
    /// Recoverable errors always answer "not handled" so the host's own
    /// recovery still runs. Everything else answers with the previous
    /// handler's result, or "handled" when there is none.
    fn on_fault(&self, event: &FaultEvent) -> bool {
        self.router.route(event);
        let chained = self.previous.get().map(|prev| prev.on_fault(event));
        if event.level().is_recoverable_error() {
            return false;
        }
        chained.unwrap_or(true)
    }
}

pub struct ChainedExceptionHandler {
    router: Arc<FaultRouter>,
    previous: OnceCell<Arc<dyn ExceptionHandler>>,
}

impl ChainedExceptionHandler {
    pub fn previous(&self) -> Option<&Arc<dyn ExceptionHandler>> {
        self.previous.get()
    }
}

impl ExceptionHandler for ChainedExceptionHandler {
    fn on_exception(&self, exc: &UncaughtException) {
        self.router.route_exception(exc);
    }
}

pub struct AssertionConverter {
    previous: OnceCell<Arc<dyn AssertionHandler>>,
}

impl AssertionConverter {
    pub fn previous(&self) -> Option<&Arc<dyn AssertionHandler>> {
        self.previous.get()
    }
}

impl AssertionHandler for AssertionConverter {
    fn on_assertion(&self, file: &str, line: u32, code: &str) -> AssertionFailed {
        AssertionFailed::new(file, line, code)
    }
}

pub struct HandlerRegistry {
    config: Arc<LoggerConfig>,
    clock: Arc<dyn Clock>,
    context: Arc<dyn ContextSource>,
    transport: Arc<dyn AlertTransport>,
    router: OnceCell<Arc<FaultRouter>>,
    fault: Option<Arc<ChainedFaultHandler>>,
    exception: Option<Arc<ChainedExceptionHandler>>,
    assertion: Option<Arc<AssertionConverter>>,
}

impl HandlerRegistry {
    /// Registry on the wall clock, the process environment and sendmail
    pub fn new(config: Arc<LoggerConfig>) -> Self {
        let transport = Arc::new(SendmailTransport::from_config(&config));
        Self {
            config,
            clock: Arc::new(SystemClock),
            context: Arc::new(ProcessEnvironment),
            transport,
            router: OnceCell::new(),
            fault: None,
            exception: None,
            assertion: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_context(mut self, context: Arc<dyn ContextSource>) -> Self {
        self.context = context;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn AlertTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn config(&self) -> &Arc<LoggerConfig> {
        &self.config
    }

    /// The router shared by every installed hook
    pub fn router(&self) -> &Arc<FaultRouter> {
        self.router.get_or_init(|| {
            Arc::new(FaultRouter::new(
                self.config.clone(),
                self.clock.clone(),
                self.context.clone(),
            ))
        })
    }

    /// Install the fault hook. Returns the previously installed handler.
    pub fn register_fault_handler(
        &mut self,
        host: &dyn FaultHost,
    ) -> Option<Arc<dyn FaultHandler>> {
        let handler = Arc::new(ChainedFaultHandler {
            router: self.router().clone(),
            previous: OnceCell::new(),
        });
        let previous = host.replace_fault_handler(handler.clone());
        if let Some(prev) = &previous {
            let _ = handler.previous.set(prev.clone());
            log_registry_debug!("Chaining to previous fault handler");
        }
        self.fault = Some(handler);
        previous
    }

    /// Install the exception hook. Returns the previously installed handler.
    pub fn register_exception_handler(
        &mut self,
        host: &dyn FaultHost,
    ) -> Option<Arc<dyn ExceptionHandler>> {
        let handler = Arc::new(ChainedExceptionHandler {
            router: self.router().clone(),
            previous: OnceCell::new(),
        });
        let previous = host.replace_exception_handler(handler.clone());
        if let Some(prev) = &previous {
            let _ = handler.previous.set(prev.clone());
        }
        self.exception = Some(handler);
        previous
    }

    /// Install the assertion hook. Returns the previously installed handler.
    pub fn register_assertion_handler(
        &mut self,
        host: &dyn FaultHost,
    ) -> Option<Arc<dyn AssertionHandler>> {
        let handler = Arc::new(AssertionConverter {
            previous: OnceCell::new(),
        });
        let previous = host.replace_assertion_handler(handler.clone());
        if let Some(prev) = &previous {
            let _ = handler.previous.set(prev.clone());
        }
        self.assertion = Some(handler);
        previous
    }

    /// Install the shutdown capture on the host and hand back a guard that
    /// also runs it when dropped. It runs at most once either way.
    pub fn register_shutdown(&self, host: Arc<dyn FaultHost>) -> ShutdownGuard {
        let capturer = Arc::new(ShutdownCapturer::new(
            self.config.clone(),
            self.clock.clone(),
            self.context.clone(),
            self.transport.clone(),
        ));
        host.add_shutdown_hook(capturer.clone());
        ShutdownGuard::new(capturer, host)
    }

    /// Prepare the log directory and install every hook.
    ///
    /// Fails if the log directory cannot be created.
    pub fn register_all(&mut self, host: Arc<dyn FaultHost>) -> Result<ShutdownGuard> {
        let dir = LogPathResolver::from_config(&self.config, self.clock.clone()).ensure_exists()?;

        let guard = self.register_shutdown(host.clone());
        self.register_fault_handler(host.as_ref());
        self.register_exception_handler(host.as_ref());
        self.register_assertion_handler(host.as_ref());

        log_registry_info!(log_dir = %dir.display(), "Fault handlers registered");
        Ok(guard)
    }

    pub fn fault_handler(&self) -> Option<&Arc<ChainedFaultHandler>> {
        self.fault.as_ref()
    }

    pub fn exception_handler(&self) -> Option<&Arc<ChainedExceptionHandler>> {
        self.exception.as_ref()
    }

    pub fn assertion_handler(&self) -> Option<&Arc<AssertionConverter>> {
        self.assertion.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StaticContext;
    use crate::severity::SeverityCode;
    use crate::testing::{LocalHost, ManualClock, RecordingTransport, TestEnvironment};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry(env: &TestEnvironment) -> HandlerRegistry {
        HandlerRegistry::new(Arc::new(env.config().unwrap()))
            .with_clock(Arc::new(ManualClock::default()))
            .with_context(Arc::new(StaticContext::default()))
            .with_transport(Arc::new(RecordingTransport::default()))
    }

    #[test]
    fn test_previous_fault_handler_still_runs() {
        let env = TestEnvironment::new().unwrap();
        let host = LocalHost::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        host.replace_fault_handler(Arc::new(move |_: &FaultEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            false
        }));

        let mut registry = registry(&env);
        assert!(registry.register_fault_handler(&host).is_some());

        let handled = host.raise(FaultEvent::new(SeverityCode::NOTICE, "n", "a.rs", 1));
        assert!(!handled, "previous handler's answer is passed through");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(env.count_records("other.txt"), 1);
    }

    #[test]
    fn test_handled_without_previous() {
        let env = TestEnvironment::new().unwrap();
        let host = LocalHost::new();
        let mut registry = registry(&env);
        assert!(registry.register_fault_handler(&host).is_none());

        assert!(host.raise(FaultEvent::new(SeverityCode::WARNING, "w", "a.rs", 1)));
    }

    #[test]
    fn test_recoverable_error_not_handled() {
        let env = TestEnvironment::new().unwrap();
        let host = LocalHost::new();
        host.replace_fault_handler(Arc::new(|_: &FaultEvent| true));

        let mut registry = registry(&env);
        registry.register_fault_handler(&host);

        let handled = host.raise(FaultEvent::new(
            SeverityCode::RECOVERABLE_ERROR,
            "type mismatch",
            "a.rs",
            1,
        ));
        assert!(!handled);
        assert_eq!(env.count_records("other.txt"), 1);
    }

    #[test]
    fn test_double_registration_chains_through_itself() {
        let env = TestEnvironment::new().unwrap();
        let host = LocalHost::new();
        let mut registry = registry(&env);
        registry.register_fault_handler(&host);
        registry.register_fault_handler(&host);

        host.raise(FaultEvent::new(SeverityCode::WARNING, "w", "a.rs", 1));
        assert_eq!(env.count_records("other.txt"), 2);
    }

    #[test]
    fn test_exception_previous_kept_not_called() {
        let env = TestEnvironment::new().unwrap();
        let host = LocalHost::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        host.replace_exception_handler(Arc::new(move |_: &UncaughtException| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let mut registry = registry(&env);
        assert!(registry.register_exception_handler(&host).is_some());
        assert!(registry.exception_handler().unwrap().previous().is_some());

        host.throw(&UncaughtException::new("IoError", "gone", "a.rs", 3, "0: main"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(env.count_records("exception.txt"), 1);
    }

    #[test]
    fn test_assertion_reenters_exception_path() {
        let env = TestEnvironment::new().unwrap();
        let host = LocalHost::new();
        let mut registry = registry(&env);
        registry.register_exception_handler(&host);
        registry.register_assertion_handler(&host);

        let failed = host.fail_assertion("math.rs", 17, "divisor != 0");
        assert_eq!(failed, AssertionFailed::new("math.rs", 17, "divisor != 0"));

        let text = env.read_log("exception.txt").unwrap();
        assert!(text.contains("Exception: AssertionFailed"));
        assert!(text.contains("File:      math.rs"));
        assert!(text.contains("Line:      17"));
        // Never logged as a plain fault
        assert!(!env.log_path("other.txt").exists());
    }

    #[test]
    fn test_register_all_creates_rotated_dir() {
        let env = TestEnvironment::new().unwrap();
        let config = env.config_with(|o| o.rotate_by_date = true).unwrap();
        let clock = Arc::new(ManualClock::ymd(2024, 2, 29));

        let mut registry = HandlerRegistry::new(Arc::new(config))
            .with_clock(clock)
            .with_context(Arc::new(StaticContext::default()))
            .with_transport(Arc::new(RecordingTransport::default()));
        let host = Arc::new(LocalHost::new());
        let _guard = registry.register_all(host).unwrap();

        assert!(env.log_dir.join("2024").join("02").join("29").is_dir());
        assert!(registry.fault_handler().is_some());
        assert!(registry.exception_handler().is_some());
        assert!(registry.assertion_handler().is_some());
    }
}
