//! # faultlog-config
//!
//! Configuration surface for the faultlog pipeline.
//!
//! Options can come from:
//! 1. A TOML document (`LoggerOptions::from_toml_str`, `LoggerOptions::load`)
//! 2. String key/value pairs (`LoggerOptions::set`, `LoggerOptions::from_pairs`)
//! 3. Environment variables (`LoggerOptions::apply_env_overrides`)
//!
//! `LoggerConfig::from_options` validates the options once and produces the
//! immutable value every pipeline component reads from.

pub mod logging;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_FILE_NAME_FATAL: &str = "fatal_error";
pub const DEFAULT_FILE_NAME_EXCEPTION: &str = "exception";
pub const DEFAULT_FILE_NAME_OTHER: &str = "other";
pub const DEFAULT_FILE_NAME_DEPRECATED: &str = "deprecated";
pub const DEFAULT_SENDMAIL_COMMAND: &str = "/usr/sbin/sendmail";

/// Extension appended to every file-name stem
pub const LOG_FILE_EXTENSION: &str = "txt";

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Environment variable → option key
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("FAULTLOG_DIR", "log_dir_path"),
    ("FAULTLOG_ROTATE", "rotate_by_date"),
    ("FAULTLOG_SIZE_LIMIT_MB", "file_size_limit_mb"),
    ("FAULTLOG_ALERT_EMAIL", "alert_email"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid log directory: {}", .0.display())]
    InvalidLogDir(PathBuf),
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Raw, unvalidated logger options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerOptions {
    /// Base log directory (None = current working directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir_path: Option<PathBuf>,
    /// Partition the log directory into YYYY/MM/DD subdirectories
    pub rotate_by_date: bool,
    pub file_name_fatal: String,
    pub file_name_exception: String,
    pub file_name_other: String,
    pub file_name_deprecated: String,
    /// Per-file size budget in megabytes (None = no limit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_limit_mb: Option<u64>,
    /// Recipient of fatal-error alerts (empty = disabled)
    pub alert_email: String,
    /// sendmail-compatible program used to deliver alerts
    pub sendmail_command: PathBuf,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            log_dir_path: None,
            rotate_by_date: false,
            file_name_fatal: DEFAULT_FILE_NAME_FATAL.to_string(),
            file_name_exception: DEFAULT_FILE_NAME_EXCEPTION.to_string(),
            file_name_other: DEFAULT_FILE_NAME_OTHER.to_string(),
            file_name_deprecated: DEFAULT_FILE_NAME_DEPRECATED.to_string(),
            file_size_limit_mb: None,
            alert_email: String::new(),
            sendmail_command: PathBuf::from(DEFAULT_SENDMAIL_COMMAND),
        }
    }
}

impl LoggerOptions {
    /// Options with only the log directory set
    pub fn with_log_dir(path: impl Into<PathBuf>) -> Self {
        Self {
            log_dir_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Parse options from a TOML document. Unknown keys are rejected.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading logger options from {:?}", path);
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Build options from string key/value pairs, applied in order
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            options.set(key.as_ref(), value.as_ref())?;
        }
        Ok(options)
    }

    /// Set a single option from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "log_dir_path" => self.log_dir_path = Some(PathBuf::from(value)),
            "rotate_by_date" => self.rotate_by_date = parse_bool(key, value)?,
            "file_name_fatal" => self.file_name_fatal = value.to_string(),
            "file_name_exception" => self.file_name_exception = value.to_string(),
            "file_name_other" => self.file_name_other = value.to_string(),
            "file_name_deprecated" => self.file_name_deprecated = value.to_string(),
            "file_size_limit_mb" => self.file_size_limit_mb = parse_limit(key, value)?,
            "alert_email" => self.alert_email = value.trim().to_string(),
            "sendmail_command" => self.sendmail_command = PathBuf::from(value),
            _ => return Err(ConfigError::UnknownOption(key.to_string())),
        }
        Ok(())
    }

    /// Apply environment variable overrides. Malformed values are ignored.
    pub fn apply_env_overrides(&mut self) {
        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                if let Err(e) = self.set(key, &value) {
                    debug!("Ignoring {}: {}", var, e);
                }
            }
        }
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_limit(key: &str, value: &str) -> Result<Option<u64>> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Validated, immutable logger configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    log_dir_path: PathBuf,
    rotate_by_date: bool,
    file_name_fatal: String,
    file_name_exception: String,
    file_name_other: String,
    file_name_deprecated: String,
    file_size_limit_mb: Option<u64>,
    alert_email: Option<String>,
    sendmail_command: PathBuf,
}

impl LoggerConfig {
    /// Validate options. The log directory must already exist.
    pub fn from_options(options: LoggerOptions) -> Result<Self> {
        let log_dir_path = match options.log_dir_path {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        if !log_dir_path.is_dir() {
            return Err(ConfigError::InvalidLogDir(log_dir_path));
        }

        for (key, stem) in [
            ("file_name_fatal", &options.file_name_fatal),
            ("file_name_exception", &options.file_name_exception),
            ("file_name_other", &options.file_name_other),
            ("file_name_deprecated", &options.file_name_deprecated),
        ] {
            if stem.is_empty() || stem.contains(['/', '\\']) {
                return Err(invalid(key, stem));
            }
        }

        let alert_email = Some(options.alert_email.trim().to_string()).filter(|e| !e.is_empty());

        Ok(Self {
            log_dir_path,
            rotate_by_date: options.rotate_by_date,
            file_name_fatal: options.file_name_fatal,
            file_name_exception: options.file_name_exception,
            file_name_other: options.file_name_other,
            file_name_deprecated: options.file_name_deprecated,
            file_size_limit_mb: options.file_size_limit_mb,
            alert_email,
            sendmail_command: options.sendmail_command,
        })
    }

    /// Shorthand for a config with defaults and the given log directory
    pub fn new(log_dir_path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_options(LoggerOptions::with_log_dir(log_dir_path))
    }

    pub fn log_dir_path(&self) -> &Path {
        &self.log_dir_path
    }

    pub fn rotate_by_date(&self) -> bool {
        self.rotate_by_date
    }

    pub fn file_name_fatal(&self) -> &str {
        &self.file_name_fatal
    }

    pub fn file_name_exception(&self) -> &str {
        &self.file_name_exception
    }

    pub fn file_name_other(&self) -> &str {
        &self.file_name_other
    }

    pub fn file_name_deprecated(&self) -> &str {
        &self.file_name_deprecated
    }

    pub fn file_size_limit_mb(&self) -> Option<u64> {
        self.file_size_limit_mb
    }

    /// Size budget in bytes (None = no limit)
    pub fn file_size_limit_bytes(&self) -> Option<u64> {
        self.file_size_limit_mb
            .map(|mb| mb.saturating_mul(BYTES_PER_MB))
    }

    pub fn alert_email(&self) -> Option<&str> {
        self.alert_email.as_deref()
    }

    pub fn sendmail_command(&self) -> &Path {
        &self.sendmail_command
    }
}

/// `<stem>.txt`
pub fn log_file_name(stem: &str) -> String {
    format!("{}.{}", stem, LOG_FILE_EXTENSION)
}
