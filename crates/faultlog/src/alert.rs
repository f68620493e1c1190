//! Email alerts for fatal faults.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use faultlog_config::LoggerConfig;

use crate::error::{FaultLogError, Result};

const SUBJECT_MAX_CHARS: usize = 78;

/// Outbound message transport
pub trait AlertTransport: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Delivers through a sendmail-compatible program (`sendmail -t -i`)
#[derive(Debug, Clone)]
pub struct SendmailTransport {
    command: PathBuf,
}

impl SendmailTransport {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::new(config.sendmail_command())
    }

    pub fn command(&self) -> &Path {
        &self.command
    }
}

impl AlertTransport for SendmailTransport {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let mut child = Command::new(&self.command)
            .arg("-t")
            .arg("-i")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(compose_message(to, subject, body).as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(FaultLogError::Alert(format!(
                "{} exited with {}: {}",
                self.command.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Plain-text message with `To` and `Subject` headers
pub fn compose_message(to: &str, subject: &str, body: &str) -> String {
    format!(
        "To: {}\nSubject: {}\nContent-Type: text/plain; charset=UTF-8\n\n{}",
        header_value(to),
        header_value(subject),
        body
    )
}

/// `Fatal error: <message>`, cut to a single header line
pub fn alert_subject(message: &str) -> String {
    let subject = format!("Fatal error: {}", message);
    subject.chars().take(SUBJECT_MAX_CHARS).collect()
}

fn header_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_message_headers() {
        let msg = compose_message("ops@example.com", "Fatal error: oom", "dump");
        assert!(msg.starts_with("To: ops@example.com\nSubject: Fatal error: oom\n"));
        assert!(msg.ends_with("\n\ndump"));
    }

    #[test]
    fn test_header_injection_flattened() {
        let msg = compose_message("ops@example.com\nBcc: x@evil", "s", "b");
        assert!(msg.starts_with("To: ops@example.com Bcc: x@evil\n"));
    }

    #[test]
    fn test_subject_truncated() {
        let long = "x".repeat(200);
        assert_eq!(alert_subject(&long).chars().count(), SUBJECT_MAX_CHARS);
        assert_eq!(alert_subject("oom"), "Fatal error: oom");
    }

    #[cfg(unix)]
    #[test]
    fn test_sendmail_failure_reported() {
        let transport = SendmailTransport::new("false");
        assert!(transport.send("ops@example.com", "s", "b").is_err());
    }

    #[test]
    fn test_missing_program_reported() {
        let transport = SendmailTransport::new("/nonexistent/sendmail");
        assert!(matches!(
            transport.send("ops@example.com", "s", "b"),
            Err(FaultLogError::Io(_))
        ));
    }
}
