//! # Fault Router
//!
//! Classifies each fault and writes exactly one record to the matching
//! bucket file:
//!
//! | Fault                                      | Bucket       |
//! |--------------------------------------------|--------------|
//! | warnings, notices, strict, recoverable     | `other`      |
//! | deprecations (system or user)              | `deprecated` |
//! | uncaught exceptions, failed assertions     | `exception`  |
//! | parse, core, compile and user errors       | `fatal`      |
//! | unrecoverable runtime error (`ERROR`)      | not written here |
//!
//! Chaining to previously installed handlers is the registry's concern.

use std::path::PathBuf;
use std::sync::Arc;

use faultlog_config::{log_router_debug, log_writer_warn, LoggerConfig};

use crate::clock::Clock;
use crate::context::{snapshot, ContextSource};
use crate::event::{AssertionFailed, FaultEvent, FaultKind, UncaughtException};
use crate::path::LogPathResolver;
use crate::record::{render_exception, render_fault};
use crate::severity::{classify, Bucket};
use crate::writer::{DropReason, SizeLimitedWriter, WriteOutcome};

/// Outcome of routing one fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Written { bucket: Bucket, outcome: WriteOutcome },
    /// Unrecoverable fault, left for the shutdown capture
    Deferred,
}

impl Routed {
    pub fn bucket(&self) -> Option<Bucket> {
        match self {
            Routed::Written { bucket, .. } => Some(*bucket),
            Routed::Deferred => None,
        }
    }
}

pub struct FaultRouter {
    config: Arc<LoggerConfig>,
    resolver: LogPathResolver,
    writer: SizeLimitedWriter,
    context: Arc<dyn ContextSource>,
    clock: Arc<dyn Clock>,
}

impl FaultRouter {
    pub fn new(
        config: Arc<LoggerConfig>,
        clock: Arc<dyn Clock>,
        context: Arc<dyn ContextSource>,
    ) -> Self {
        Self {
            resolver: LogPathResolver::from_config(&config, clock.clone()),
            writer: SizeLimitedWriter::from_config(&config),
            config,
            context,
            clock,
        }
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &LogPathResolver {
        &self.resolver
    }

    /// Current target file for a bucket (directory not created)
    pub fn target_path(&self, bucket: Bucket) -> PathBuf {
        self.resolver.resolve().join(bucket.file_name(&self.config))
    }

    /// Route a reported fault
    pub fn route(&self, event: &FaultEvent) -> Routed {
        match event.kind() {
            FaultKind::RuntimeFault => self.route_runtime(event),
            FaultKind::UncaughtException => {
                let exc = UncaughtException::new(
                    "UncaughtException",
                    event.message(),
                    event.source_file(),
                    event.source_line(),
                    "",
                )
                .at(event.timestamp());
                self.routed_exception(&exc)
            }
            FaultKind::AssertionFailure => {
                let failed =
                    AssertionFailed::new(event.source_file(), event.source_line(), event.message());
                let exc = failed.into_exception("").at(event.timestamp());
                self.routed_exception(&exc)
            }
        }
    }

    fn route_runtime(&self, event: &FaultEvent) -> Routed {
        if event.level().is_unrecoverable() {
            log_router_debug!(level = event.level().0, "Unrecoverable fault deferred to shutdown");
            return Routed::Deferred;
        }

        let class = classify(event.level());
        let server = snapshot(self.context.as_ref(), false);
        let text = render_fault(event, &class.display_name, &server, &self.clock.now());
        Routed::Written {
            bucket: class.bucket,
            outcome: self.write(class.bucket, &text),
        }
    }

    /// Write an uncaught exception to the `exception` bucket
    pub fn route_exception(&self, exc: &UncaughtException) -> WriteOutcome {
        let server = snapshot(self.context.as_ref(), false);
        let text = render_exception(exc, &server, &self.clock.now());
        self.write(Bucket::Exception, &text)
    }

    fn routed_exception(&self, exc: &UncaughtException) -> Routed {
        Routed::Written {
            bucket: Bucket::Exception,
            outcome: self.route_exception(exc),
        }
    }

    fn write(&self, bucket: Bucket, text: &str) -> WriteOutcome {
        write_bucket(&self.resolver, &self.writer, &self.config, bucket, text)
    }
}

/// Resolve the bucket file (creating the directory) and append through the
/// size gate. Directory failures become a dropped write.
pub(crate) fn write_bucket(
    resolver: &LogPathResolver,
    writer: &SizeLimitedWriter,
    config: &LoggerConfig,
    bucket: Bucket,
    text: &str,
) -> WriteOutcome {
    match resolver.file_path(&bucket.file_name(config)) {
        Ok(path) => writer.write(&path, text),
        Err(e) => {
            log_writer_warn!(bucket = bucket.as_str(), error = %e, "Log directory unavailable");
            WriteOutcome::Dropped(DropReason::Directory)
        }
    }
}
