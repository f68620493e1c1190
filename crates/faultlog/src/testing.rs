//! Test fixtures for isolated pipeline testing.
//!
//! Provides:
//! - `TestEnvironment`: a temporary log directory and config builder
//! - `ManualClock`: a settable clock for simulating calendar days
//! - `RecordingTransport`: captures alert sends instead of delivering them
//! - `LocalHost`: an in-memory `FaultHost` with no process-wide state
//!
//! # Usage
//!
//! ```ignore
//! use faultlog::testing::TestEnvironment;
//!
//! #[test]
//! fn test_something() {
//!     let env = TestEnvironment::new().unwrap();
//!     let config = env.config_with(|o| o.rotate_by_date = true).unwrap();
//!     // env.log_dir is isolated and removed on drop
//! }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Local, TimeZone};
use faultlog_config::{LoggerConfig, LoggerOptions};
use tempfile::TempDir;

use crate::alert::AlertTransport;
use crate::clock::Clock;
use crate::event::{AssertionFailed, FaultEvent, UncaughtException};
use crate::host::{
    AssertionHandler, ExceptionHandler, FaultHandler, FaultHost, HookSlots, LastFaultSource,
    ShutdownHook,
};
use crate::record::RECORD_SEPARATOR;
use crate::severity::SeverityCode;

/// Atomic counter for unique test IDs
static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Isolated log directory with config helpers
pub struct TestEnvironment {
    /// Temporary directory (dropped on cleanup)
    _temp_dir: TempDir,
    /// Base log directory for this test
    pub log_dir: PathBuf,
    /// Unique test ID
    pub test_id: u32,
}

impl TestEnvironment {
    pub fn new() -> anyhow::Result<Self> {
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_dir = TempDir::new()?;
        let log_dir = temp_dir.path().join(format!("logs-{}", test_id));
        std::fs::create_dir_all(&log_dir)?;

        Ok(Self {
            _temp_dir: temp_dir,
            log_dir,
            test_id,
        })
    }

    /// Default options pointing at this environment's log directory
    pub fn options(&self) -> LoggerOptions {
        LoggerOptions::with_log_dir(&self.log_dir)
    }

    pub fn config(&self) -> anyhow::Result<LoggerConfig> {
        Ok(LoggerConfig::from_options(self.options())?)
    }

    /// Config with adjusted options
    pub fn config_with(&self, f: impl FnOnce(&mut LoggerOptions)) -> anyhow::Result<LoggerConfig> {
        let mut options = self.options();
        f(&mut options);
        Ok(LoggerConfig::from_options(options)?)
    }

    /// Path of a file directly under the base log directory
    pub fn log_path(&self, relative: &str) -> PathBuf {
        self.log_dir.join(relative)
    }

    pub fn read_log(&self, relative: &str) -> anyhow::Result<String> {
        Ok(std::fs::read_to_string(self.log_path(relative))?)
    }

    /// Number of records in a log file (0 if it does not exist)
    pub fn count_records(&self, relative: &str) -> usize {
        let separator = format!("\n{}\n", RECORD_SEPARATOR);
        self.read_log(relative)
            .map(|text| text.matches(&separator).count())
            .unwrap_or(0)
    }
}

/// Settable clock
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Noon on the given day
    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        let now = Local
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .unwrap_or_else(Local::now);
        Self::new(now)
    }

    pub fn set(&self, now: DateTime<Local>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = *now + Duration::days(days);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::ymd(2024, 1, 15)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentAlert {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Transport that records every send
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentAlert>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<SentAlert> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AlertTransport for RecordingTransport {
    fn send(&self, to: &str, subject: &str, body: &str) -> crate::Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentAlert {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}

/// In-memory host. Faults, exceptions and assertions are delivered by
/// calling its methods directly; no panic hook is involved.
#[derive(Default)]
pub struct LocalHost {
    slots: HookSlots,
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a runtime fault; returns the handler's "handled" answer
    pub fn raise(&self, event: FaultEvent) -> bool {
        self.slots.dispatch(event)
    }

    /// Record an unrecoverable fault without routing it
    pub fn raise_fatal(&self, message: &str, file: &str, line: u32) {
        self.slots
            .record(FaultEvent::new(SeverityCode::ERROR, message, file, line));
    }

    /// Deliver an uncaught exception
    pub fn throw(&self, exc: &UncaughtException) {
        if let Some(handler) = HookSlots::current(&self.slots.exception) {
            handler.on_exception(exc);
        }
    }

    /// Convert a failed assertion and let it escape as an uncaught exception
    pub fn fail_assertion(&self, file: &str, line: u32, code: &str) -> AssertionFailed {
        let failed = match HookSlots::current(&self.slots.assertion) {
            Some(handler) => handler.on_assertion(file, line, code),
            None => AssertionFailed::new(file, line, code),
        };
        self.throw(&failed.clone().into_exception(""));
        failed
    }

    pub fn run_shutdown_hooks(&self) {
        for hook in self.slots.take_shutdown() {
            hook.on_shutdown(self);
        }
    }
}

impl LastFaultSource for LocalHost {
    fn last_fault(&self) -> Option<FaultEvent> {
        self.slots.last()
    }
}

impl FaultHost for LocalHost {
    fn replace_fault_handler(
        &self,
        handler: Arc<dyn FaultHandler>,
    ) -> Option<Arc<dyn FaultHandler>> {
        HookSlots::replace(&self.slots.fault, handler)
    }

    fn replace_exception_handler(
        &self,
        handler: Arc<dyn ExceptionHandler>,
    ) -> Option<Arc<dyn ExceptionHandler>> {
        HookSlots::replace(&self.slots.exception, handler)
    }

    fn replace_assertion_handler(
        &self,
        handler: Arc<dyn AssertionHandler>,
    ) -> Option<Arc<dyn AssertionHandler>> {
        HookSlots::replace(&self.slots.assertion, handler)
    }

    fn add_shutdown_hook(&self, hook: Arc<dyn ShutdownHook>) {
        self.slots.push_shutdown(hook);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creates_log_dir() {
        let env = TestEnvironment::new().unwrap();
        assert!(env.log_dir.is_dir());
    }

    #[test]
    fn test_environments_are_isolated() {
        let env1 = TestEnvironment::new().unwrap();
        let env2 = TestEnvironment::new().unwrap();
        assert_ne!(env1.log_dir, env2.log_dir);
        assert_ne!(env1.test_id, env2.test_id);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::ymd(2024, 12, 31);
        clock.advance_days(1);
        assert_eq!(clock.now().format("%Y-%m-%d").to_string(), "2025-01-01");
    }

    #[test]
    fn test_local_host_tracks_last_fault() {
        let host = LocalHost::new();
        assert!(host.last_fault().is_none());

        assert!(!host.raise(FaultEvent::new(SeverityCode::NOTICE, "first", "a.rs", 1)));
        host.raise_fatal("second", "b.rs", 2);

        let last = host.last_fault().unwrap();
        assert_eq!(last.message(), "second");
        assert_eq!(last.level(), SeverityCode::ERROR);
    }

    #[test]
    fn test_count_records_missing_file() {
        let env = TestEnvironment::new().unwrap();
        assert_eq!(env.count_records("nothing.txt"), 0);
    }
}
