//! Integration tests for faultlog-config
//!
//! These tests verify the options → config pipeline with real file system operations.

use faultlog_config::{ConfigError, LoggerConfig, LoggerOptions};
use tempfile::tempdir;

/// Test loading a full options file from disk
#[test]
fn test_load_options_from_file() {
    let temp = tempdir().unwrap();
    let log_dir = temp.path().join("logs");
    std::fs::create_dir_all(&log_dir).unwrap();

    let options_content = format!(
        r#"
log_dir_path = "{}"
rotate_by_date = true
file_name_fatal = "crash"
file_size_limit_mb = 1
alert_email = "ops@example.com"
"#,
        log_dir.display()
    );
    let options_path = temp.path().join("faultlog.toml");
    std::fs::write(&options_path, options_content).unwrap();

    let options = LoggerOptions::load(&options_path).unwrap();
    let config = LoggerConfig::from_options(options).unwrap();

    assert_eq!(config.log_dir_path(), log_dir.as_path());
    assert!(config.rotate_by_date());
    assert_eq!(config.file_name_fatal(), "crash");
    assert_eq!(config.file_name_other(), "other");
    assert_eq!(config.file_size_limit_mb(), Some(1));
    assert_eq!(config.alert_email(), Some("ops@example.com"));
}

/// Test that a log directory that does not exist fails at setup time
#[test]
fn test_nonexistent_log_dir_rejected() {
    let temp = tempdir().unwrap();
    let missing = temp.path().join("missing");

    let options = LoggerOptions::with_log_dir(&missing);
    match LoggerConfig::from_options(options) {
        Err(ConfigError::InvalidLogDir(path)) => assert_eq!(path, missing),
        other => panic!("expected InvalidLogDir, got {:?}", other),
    }
}

/// Test that a regular file is not accepted as the log directory
#[test]
fn test_file_as_log_dir_rejected() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("not_a_dir");
    std::fs::write(&file, b"x").unwrap();

    assert!(matches!(
        LoggerConfig::new(&file),
        Err(ConfigError::InvalidLogDir(_))
    ));
}

/// Test key/value pairs applied in order
#[test]
fn test_options_from_pairs() {
    let temp = tempdir().unwrap();
    let dir = temp.path().to_string_lossy().to_string();

    let options = LoggerOptions::from_pairs([
        ("log_dir_path", dir.as_str()),
        ("file_name_other", "warnings"),
        ("file_size_limit_mb", "3"),
    ])
    .unwrap();
    let config = LoggerConfig::from_options(options).unwrap();

    assert_eq!(config.file_name_other(), "warnings");
    assert_eq!(config.file_size_limit_bytes(), Some(3 * 1024 * 1024));
}

/// Test that an unknown key aborts pair parsing
#[test]
fn test_pairs_unknown_key_fails() {
    let result = LoggerOptions::from_pairs([("rotate_by_date", "1"), ("bogus", "x")]);
    assert!(matches!(result, Err(ConfigError::UnknownOption(k)) if k == "bogus"));
}

/// Test environment variable overrides
#[test]
fn test_env_override_integration() {
    let temp = tempdir().unwrap();
    let mut options = LoggerOptions::default();

    std::env::set_var("FAULTLOG_DIR", temp.path());
    std::env::set_var("FAULTLOG_SIZE_LIMIT_MB", "not-a-number");
    std::env::set_var("FAULTLOG_ALERT_EMAIL", "oncall@example.com");
    options.apply_env_overrides();
    std::env::remove_var("FAULTLOG_DIR");
    std::env::remove_var("FAULTLOG_SIZE_LIMIT_MB");
    std::env::remove_var("FAULTLOG_ALERT_EMAIL");

    assert_eq!(options.log_dir_path.as_deref(), Some(temp.path()));
    // Malformed values leave the default untouched
    assert_eq!(options.file_size_limit_mb, None);
    assert_eq!(options.alert_email, "oncall@example.com");
}
