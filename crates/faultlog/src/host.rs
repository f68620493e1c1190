//! Host-side fault notification interface.
//!
//! The pipeline never reaches into the runtime directly. It installs
//! handlers on a [`FaultHost`] and pulls the last reported fault from it at
//! shutdown. [`ProcessHost`] is the process-wide implementation: runtime
//! faults arrive through [`raise`], uncaught exceptions are panics, and
//! assertions raise a typed [`AssertionFailed`] panic payload.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::Location;
use std::sync::{Arc, Mutex, Once, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::event::{AssertionFailed, FaultEvent, UncaughtException};
use crate::severity::SeverityCode;

/// Receives runtime faults. Returns whether the fault was fully handled.
pub trait FaultHandler: Send + Sync {
    fn on_fault(&self, event: &FaultEvent) -> bool;
}

impl<F> FaultHandler for F
where
    F: Fn(&FaultEvent) -> bool + Send + Sync,
{
    fn on_fault(&self, event: &FaultEvent) -> bool {
        self(event)
    }
}

/// Receives exceptions nobody caught
pub trait ExceptionHandler: Send + Sync {
    fn on_exception(&self, exc: &UncaughtException);
}

impl<F> ExceptionHandler for F
where
    F: Fn(&UncaughtException) + Send + Sync,
{
    fn on_exception(&self, exc: &UncaughtException) {
        self(exc)
    }
}

/// Converts a failed assertion into the exception the host raises
pub trait AssertionHandler: Send + Sync {
    fn on_assertion(&self, file: &str, line: u32, code: &str) -> AssertionFailed;
}

/// Pull-based "what was the last fault" query
pub trait LastFaultSource: Send + Sync {
    fn last_fault(&self) -> Option<FaultEvent>;
}

/// Runs once when the process terminates
pub trait ShutdownHook: Send + Sync {
    fn on_shutdown(&self, source: &dyn LastFaultSource);
}

/// Hook points offered by the host. Each `replace_*` installs a handler and
/// hands back whatever was installed before.
pub trait FaultHost: LastFaultSource {
    fn replace_fault_handler(
        &self,
        handler: Arc<dyn FaultHandler>,
    ) -> Option<Arc<dyn FaultHandler>>;

    fn replace_exception_handler(
        &self,
        handler: Arc<dyn ExceptionHandler>,
    ) -> Option<Arc<dyn ExceptionHandler>>;

    fn replace_assertion_handler(
        &self,
        handler: Arc<dyn AssertionHandler>,
    ) -> Option<Arc<dyn AssertionHandler>>;

    fn add_shutdown_hook(&self, hook: Arc<dyn ShutdownHook>);
}

/// Handler slots shared by host implementations
#[derive(Default)]
pub(crate) struct HookSlots {
    pub fault: RwLock<Option<Arc<dyn FaultHandler>>>,
    pub exception: RwLock<Option<Arc<dyn ExceptionHandler>>>,
    pub assertion: RwLock<Option<Arc<dyn AssertionHandler>>>,
    pub shutdown: Mutex<Vec<Arc<dyn ShutdownHook>>>,
    pub last_fault: Mutex<Option<FaultEvent>>,
}

// A panicking handler must not disable fault capture for the rest of the
// process, so poisoned locks are read through.
impl HookSlots {
    pub fn replace<T: ?Sized>(slot: &RwLock<Option<Arc<T>>>, new: Arc<T>) -> Option<Arc<T>> {
        slot.write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(new)
    }

    pub fn current<T: ?Sized>(slot: &RwLock<Option<Arc<T>>>) -> Option<Arc<T>> {
        slot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn record(&self, event: FaultEvent) {
        *self.last_fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(event);
    }

    pub fn last(&self) -> Option<FaultEvent> {
        self.last_fault
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record the fault, then dispatch it outside of any lock
    pub fn dispatch(&self, event: FaultEvent) -> bool {
        self.record(event.clone());
        match Self::current(&self.fault) {
            Some(handler) => handler.on_fault(&event),
            None => false,
        }
    }

    pub fn push_shutdown(&self, hook: Arc<dyn ShutdownHook>) {
        self.shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    pub fn take_shutdown(&self) -> Vec<Arc<dyn ShutdownHook>> {
        std::mem::take(&mut *self.shutdown.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

static PROCESS_SLOTS: Lazy<HookSlots> = Lazy::new(HookSlots::default);
static PANIC_HOOK: Once = Once::new();

/// The process-wide host.
///
/// Installing an exception handler replaces the `std::panic` hook once. The
/// hook that was installed before (the std default or one set by the
/// application) keeps running after the exception handler, so panic output
/// is unchanged.
///
/// A panic hook runs at the panic site, before unwinding. Panics that are
/// later stopped by `catch_unwind` are therefore recorded in the exception
/// log as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessHost;

impl ProcessHost {
    /// Run and clear the registered shutdown hooks
    pub fn run_shutdown_hooks(&self) {
        for hook in PROCESS_SLOTS.take_shutdown() {
            hook.on_shutdown(self);
        }
    }
}

impl LastFaultSource for ProcessHost {
    fn last_fault(&self) -> Option<FaultEvent> {
        PROCESS_SLOTS.last()
    }
}

impl FaultHost for ProcessHost {
    fn replace_fault_handler(
        &self,
        handler: Arc<dyn FaultHandler>,
    ) -> Option<Arc<dyn FaultHandler>> {
        HookSlots::replace(&PROCESS_SLOTS.fault, handler)
    }

    fn replace_exception_handler(
        &self,
        handler: Arc<dyn ExceptionHandler>,
    ) -> Option<Arc<dyn ExceptionHandler>> {
        install_panic_hook();
        HookSlots::replace(&PROCESS_SLOTS.exception, handler)
    }

    fn replace_assertion_handler(
        &self,
        handler: Arc<dyn AssertionHandler>,
    ) -> Option<Arc<dyn AssertionHandler>> {
        HookSlots::replace(&PROCESS_SLOTS.assertion, handler)
    }

    fn add_shutdown_hook(&self, hook: Arc<dyn ShutdownHook>) {
        PROCESS_SLOTS.push_shutdown(hook);
    }
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let std_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some(handler) = HookSlots::current(&PROCESS_SLOTS.exception) {
                handler.on_exception(&exception_from_panic(info.payload(), info.location()));
            }
            std_hook(info);
        }));
    });
}

/// Build an exception record from a panic payload
pub fn exception_from_panic(
    payload: &(dyn Any + Send),
    location: Option<&Location<'_>>,
) -> UncaughtException {
    let trace = Backtrace::force_capture().to_string();

    if let Some(failed) = payload.downcast_ref::<AssertionFailed>() {
        return failed.clone().into_exception(trace);
    }

    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    };
    let (file, line) = location
        .map(|l| (l.file().to_string(), l.line()))
        .unwrap_or_else(|| ("<unknown>".to_string(), 0));

    let type_name = match std::thread::current().name() {
        Some(name) => format!("panic (thread '{}')", name),
        None => "panic".to_string(),
    };
    UncaughtException::new(type_name, message, file, line, trace)
}

/// Report a runtime fault to the installed fault handler.
///
/// Returns the handler's "handled" answer, or `false` when none is installed.
pub fn raise(
    code: impl Into<SeverityCode>,
    message: impl Into<String>,
    file: impl Into<String>,
    line: u32,
) -> bool {
    PROCESS_SLOTS.dispatch(FaultEvent::new(code, message, file, line))
}

/// Record an unrecoverable fault right before the process goes down.
///
/// Nothing is routed; the shutdown capture picks it up.
pub fn raise_fatal(message: impl Into<String>, file: impl Into<String>, line: u32) {
    PROCESS_SLOTS.record(FaultEvent::new(SeverityCode::ERROR, message, file, line));
}

/// Raise a failed assertion as a typed, catchable panic
pub fn assertion_failed(file: &str, line: u32, code: &str) -> ! {
    match HookSlots::current(&PROCESS_SLOTS.assertion) {
        Some(handler) => std::panic::panic_any(handler.on_assertion(file, line, code)),
        None => panic!("{}", AssertionFailed::new(file, line, code)),
    }
}

/// Run shutdown hooks, then exit the process
pub fn exit(code: i32) -> ! {
    ProcessHost.run_shutdown_hooks();
    std::process::exit(code)
}

/// Report a runtime fault at the call site
///
/// ```ignore
/// faultlog::fault!(SeverityCode::WARNING, "cache miss for {}", key);
/// ```
#[macro_export]
macro_rules! fault {
    ($code:expr, $($arg:tt)+) => {
        $crate::raise($code, format!($($arg)+), file!(), line!())
    };
}

/// Assert through the installed assertion handler
#[macro_export]
macro_rules! fault_assert {
    ($cond:expr $(,)?) => {
        if !$cond {
            $crate::assertion_failed(file!(), line!(), stringify!($cond))
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_from_str_panic() {
        let payload: Box<dyn Any + Send> = Box::new("bad state");
        let exc = exception_from_panic(payload.as_ref(), None);
        assert_eq!(exc.message, "bad state");
        assert_eq!(exc.file, "<unknown>");
        assert!(exc.type_name.starts_with("panic"));
    }

    #[test]
    fn test_exception_from_string_panic() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("index 4 out of range"));
        let exc = exception_from_panic(payload.as_ref(), Some(Location::caller()));
        assert_eq!(exc.message, "index 4 out of range");
        assert!(exc.file.ends_with("host.rs"));
    }

    #[test]
    fn test_exception_from_assertion_payload() {
        let payload: Box<dyn Any + Send> = Box::new(AssertionFailed::new("calc.rs", 9, "n != 0"));
        let exc = exception_from_panic(payload.as_ref(), Some(Location::caller()));
        assert_eq!(exc.type_name, AssertionFailed::TYPE_NAME);
        assert_eq!(exc.file, "calc.rs");
        assert_eq!(exc.line, 9);
        assert_eq!(exc.message, "Assertion Failed - Code[ n != 0 ]");
    }

    #[test]
    fn test_closure_fault_handler() {
        let handler = |event: &FaultEvent| event.source_line() > 10;
        assert!(handler.on_fault(&FaultEvent::new(SeverityCode::NOTICE, "", "a.rs", 11)));
        assert!(!handler.on_fault(&FaultEvent::new(SeverityCode::NOTICE, "", "a.rs", 3)));
    }
}
