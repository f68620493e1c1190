//! Fault events as reported by the host.

use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;

use chrono::{DateTime, Local};

use crate::severity::SeverityCode;

/// How the host observed the fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    RuntimeFault,
    UncaughtException,
    AssertionFailure,
}

/// A single reported fault. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultEvent {
    level: SeverityCode,
    message: String,
    source_file: String,
    source_line: u32,
    timestamp: DateTime<Local>,
    kind: FaultKind,
}

impl FaultEvent {
    /// Runtime fault stamped with the current local time
    pub fn new(
        level: impl Into<SeverityCode>,
        message: impl Into<String>,
        source_file: impl Into<String>,
        source_line: u32,
    ) -> Self {
        Self {
            level: level.into(),
            message: message.into(),
            source_file: source_file.into(),
            source_line,
            timestamp: Local::now(),
            kind: FaultKind::RuntimeFault,
        }
    }

    /// Replace the timestamp (for hosts that stamp faults themselves)
    pub fn at(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_kind(mut self, kind: FaultKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn level(&self) -> SeverityCode {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn source_line(&self) -> u32 {
        self.source_line
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }
}

/// An exception that escaped to the top of the process (a panic, or an
/// error the host gave up on).
#[derive(Debug, Clone)]
pub struct UncaughtException {
    pub type_name: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    /// Formatted stack trace, one frame per line
    pub trace: String,
    pub timestamp: DateTime<Local>,
}

impl UncaughtException {
    pub fn new(
        type_name: impl Into<String>,
        message: impl Into<String>,
        file: impl Into<String>,
        line: u32,
        trace: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            file: file.into(),
            line,
            trace: trace.into(),
            timestamp: Local::now(),
        }
    }

    /// Build from an error value at the caller's location.
    /// The message includes the full `source()` chain.
    #[track_caller]
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        let location = Location::caller();
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(
            std::any::type_name::<E>(),
            message,
            location.file(),
            location.line(),
            Backtrace::force_capture().to_string(),
        )
    }

    pub fn at(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A failed assertion, raised as a typed panic payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailed {
    pub file: String,
    pub line: u32,
    pub code: String,
}

impl AssertionFailed {
    pub const TYPE_NAME: &'static str = "AssertionFailed";

    pub fn new(file: impl Into<String>, line: u32, code: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            code: code.into(),
        }
    }

    /// The exception this assertion turns into when nobody catches it
    pub fn into_exception(self, trace: impl Into<String>) -> UncaughtException {
        let message = self.to_string();
        UncaughtException::new(Self::TYPE_NAME, message, self.file, self.line, trace)
    }
}

impl fmt::Display for AssertionFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Assertion Failed - Code[ {} ]", self.code)
    }
}

impl std::error::Error for AssertionFailed {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_defaults_to_runtime_fault() {
        let event = FaultEvent::new(SeverityCode::WARNING, "boom", "app.rs", 7);
        assert_eq!(event.kind(), FaultKind::RuntimeFault);
        assert_eq!(event.level(), SeverityCode::WARNING);
        assert_eq!(event.source_line(), 7);
    }

    #[test]
    fn test_assertion_message() {
        let failed = AssertionFailed::new("lib.rs", 12, "x > 0");
        assert_eq!(failed.to_string(), "Assertion Failed - Code[ x > 0 ]");

        let exc = failed.into_exception("");
        assert_eq!(exc.type_name, "AssertionFailed");
        assert_eq!(exc.file, "lib.rs");
        assert_eq!(exc.line, 12);
    }

    #[test]
    fn test_from_error_includes_source_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("loading failed")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        let exc = UncaughtException::from_error(&err);
        assert_eq!(exc.message, "loading failed: disk gone");
        assert!(exc.type_name.ends_with("Outer"));
        assert!(exc.file.ends_with("event.rs"));
    }
}
