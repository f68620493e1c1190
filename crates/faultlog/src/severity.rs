//! Severity table: fault-level codes, display names and routing buckets.
//!
//! Every code resolves to a display name; codes missing from the table
//! render as `Undefined (<code>)` and route to [`Bucket::Other`].

use std::borrow::Cow;
use std::fmt;

use faultlog_config::{log_file_name, LoggerConfig};

/// Fault-level code reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeverityCode(pub i32);

impl SeverityCode {
    pub const ERROR: Self = Self(1);
    pub const WARNING: Self = Self(2);
    pub const PARSE: Self = Self(4);
    pub const NOTICE: Self = Self(8);
    pub const CORE_ERROR: Self = Self(16);
    pub const CORE_WARNING: Self = Self(32);
    pub const COMPILE_ERROR: Self = Self(64);
    pub const COMPILE_WARNING: Self = Self(128);
    pub const USER_ERROR: Self = Self(256);
    pub const USER_WARNING: Self = Self(512);
    pub const USER_NOTICE: Self = Self(1024);
    pub const STRICT: Self = Self(2048);
    pub const RECOVERABLE_ERROR: Self = Self(4096);
    pub const DEPRECATED: Self = Self(8192);
    pub const USER_DEPRECATED: Self = Self(16384);
    pub const ALL: Self = Self(32767);

    /// The one class after which no further code runs.
    /// Only the shutdown capturer ever writes it.
    pub fn is_unrecoverable(self) -> bool {
        self == Self::ERROR
    }

    /// Catchable error that the host still wants to recover from itself
    pub fn is_recoverable_error(self) -> bool {
        self == Self::RECOVERABLE_ERROR
    }
}

impl fmt::Display for SeverityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for SeverityCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

/// Routing category; selects the target file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Fatal,
    Exception,
    Deprecated,
    Other,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Fatal => "fatal",
            Bucket::Exception => "exception",
            Bucket::Deprecated => "deprecated",
            Bucket::Other => "other",
        }
    }

    /// Configured file-name stem for this bucket
    pub fn stem<'a>(&self, config: &'a LoggerConfig) -> &'a str {
        match self {
            Bucket::Fatal => config.file_name_fatal(),
            Bucket::Exception => config.file_name_exception(),
            Bucket::Deprecated => config.file_name_deprecated(),
            Bucket::Other => config.file_name_other(),
        }
    }

    /// `<stem>.txt`
    pub fn file_name(&self, config: &LoggerConfig) -> String {
        log_file_name(self.stem(config))
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SEVERITY_TABLE: &[(SeverityCode, &str, Bucket)] = &[
    (SeverityCode::ERROR, "Error", Bucket::Fatal),
    (SeverityCode::WARNING, "Warning", Bucket::Other),
    (SeverityCode::PARSE, "Parse", Bucket::Fatal),
    (SeverityCode::NOTICE, "Notice", Bucket::Other),
    (SeverityCode::CORE_ERROR, "Core error", Bucket::Fatal),
    (SeverityCode::CORE_WARNING, "Core warning", Bucket::Other),
    (SeverityCode::COMPILE_ERROR, "Compile error", Bucket::Fatal),
    (SeverityCode::COMPILE_WARNING, "Compile warning", Bucket::Other),
    (SeverityCode::USER_ERROR, "User error", Bucket::Fatal),
    (SeverityCode::USER_WARNING, "User warning", Bucket::Other),
    (SeverityCode::USER_NOTICE, "User notice", Bucket::Other),
    (SeverityCode::STRICT, "Strict", Bucket::Other),
    (SeverityCode::RECOVERABLE_ERROR, "Recoverable error", Bucket::Other),
    (SeverityCode::DEPRECATED, "Deprecated", Bucket::Deprecated),
    (SeverityCode::USER_DEPRECATED, "User deprecated", Bucket::Deprecated),
    (SeverityCode::ALL, "All", Bucket::Other),
];

/// Result of looking a code up in the severity table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub display_name: Cow<'static, str>,
    pub bucket: Bucket,
}

/// Classify a severity code. Total over every `i32`.
///
/// # Examples
///
/// ```
/// use faultlog::severity::{classify, Bucket, SeverityCode};
///
/// assert_eq!(classify(SeverityCode::DEPRECATED).bucket, Bucket::Deprecated);
/// assert_eq!(classify(SeverityCode(3)).display_name, "Undefined (3)");
/// ```
pub fn classify(code: SeverityCode) -> Classification {
    match SEVERITY_TABLE.iter().find(|(c, _, _)| *c == code) {
        Some((_, name, bucket)) => Classification {
            display_name: Cow::Borrowed(name),
            bucket: *bucket,
        },
        None => Classification {
            display_name: Cow::Owned(format!("Undefined ({})", code)),
            bucket: Bucket::Other,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_resolve() {
        for (code, name, bucket) in SEVERITY_TABLE {
            let c = classify(*code);
            assert_eq!(c.display_name, *name);
            assert_eq!(c.bucket, *bucket);
        }
    }

    #[test]
    fn test_unknown_code_fallback() {
        for code in [0, 3, -1, 65536, i32::MIN, i32::MAX] {
            let c = classify(SeverityCode(code));
            assert_eq!(c.display_name, format!("Undefined ({})", code));
            assert_eq!(c.bucket, Bucket::Other);
        }
    }

    #[test]
    fn test_deprecation_codes() {
        assert_eq!(classify(SeverityCode::DEPRECATED).bucket, Bucket::Deprecated);
        assert_eq!(
            classify(SeverityCode::USER_DEPRECATED).bucket,
            Bucket::Deprecated
        );
    }

    #[test]
    fn test_runtime_codes_route_to_other() {
        for code in [
            SeverityCode::WARNING,
            SeverityCode::NOTICE,
            SeverityCode::STRICT,
            SeverityCode::USER_WARNING,
            SeverityCode::USER_NOTICE,
            SeverityCode::RECOVERABLE_ERROR,
        ] {
            assert_eq!(classify(code).bucket, Bucket::Other, "code {}", code);
        }
    }

    #[test]
    fn test_display_names_sentence_case() {
        assert_eq!(classify(SeverityCode::CORE_ERROR).display_name, "Core error");
        assert_eq!(classify(SeverityCode::USER_WARNING).display_name, "User warning");
        assert_eq!(classify(SeverityCode::USER_NOTICE).display_name, "User notice");
    }

    #[test]
    fn test_only_error_is_unrecoverable() {
        assert!(SeverityCode::ERROR.is_unrecoverable());
        assert!(!SeverityCode::USER_ERROR.is_unrecoverable());
        assert!(!SeverityCode::CORE_ERROR.is_unrecoverable());
    }

    #[test]
    fn test_bucket_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggerConfig::new(dir.path()).unwrap();
        assert_eq!(Bucket::Fatal.file_name(&config), "fatal_error.txt");
        assert_eq!(Bucket::Exception.file_name(&config), "exception.txt");
        assert_eq!(Bucket::Deprecated.file_name(&config), "deprecated.txt");
        assert_eq!(Bucket::Other.file_name(&config), "other.txt");
    }
}
