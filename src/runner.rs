//! Executes one descriptor against one family handle.
//!
//! Steps run in a fixed order: Init, Subscribe, Delay, Request, Enumerate,
//! Drain. Each step after Init is skipped when its descriptor field is
//! absent. A failed subscribe, request or enumerate skips the remaining
//! request/enumerate steps, but Drain still runs if a subscription is live.

use crate::family::{Family, FamilyError, FamilyFactory, Notification};
use crate::spec::OperationDescriptor;

use serde_json::Value;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Blocks the calling thread for the delay step.
pub trait Pause {
    fn pause(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Descriptor-local failures, tagged by the step that raised them.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to construct family from {}: {source}", spec.display())]
    FamilyConstruction { spec: PathBuf, source: FamilyError },
    #[error("subscribe to '{topic}' failed: {source}")]
    Subscribe { topic: String, source: FamilyError },
    #[error("request '{operation}' failed: {source}")]
    Request {
        operation: String,
        source: FamilyError,
    },
    #[error("dump '{operation}' failed: {source}")]
    Enumerate {
        operation: String,
        source: FamilyError,
    },
    #[error("notification check failed: {source}")]
    NotificationConsistency { source: FamilyError },
}

/// Results collected by one run. A field is `Some` only if its step ran and
/// succeeded.
#[derive(Debug, Default)]
pub struct OperationReport {
    pub reply: Option<Value>,
    pub dump: Option<Vec<Value>>,
    pub notifications: Option<Vec<Notification>>,
    pub failures: Vec<RunError>,
}

impl OperationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct OperationRunner<'a, F, P> {
    factory: &'a F,
    pause: &'a P,
}

impl<'a, F, P> OperationRunner<'a, F, P>
where
    F: FamilyFactory,
    P: Pause,
{
    pub fn new(factory: &'a F, pause: &'a P) -> Self {
        Self { factory, pause }
    }

    /// Run every step of `descriptor`. Only a failed Init is returned as
    /// `Err`; later failures are collected in the report.
    pub fn run(&self, descriptor: &OperationDescriptor) -> Result<OperationReport, RunError> {
        // Init
        let mut family = self
            .factory
            .construct(descriptor.spec_path(), descriptor.schema_mode())
            .map_err(|source| RunError::FamilyConstruction {
                spec: descriptor.spec_path().to_path_buf(),
                source,
            })?;
        tracing::debug!(spec = %descriptor.spec_path().display(), "family constructed");

        let mut report = OperationReport::default();
        let mut subscribed = false;

        if let Some(topic) = descriptor.subscription_topic() {
            tracing::debug!(topic, "subscribing");
            match family.subscribe(topic) {
                Ok(()) => subscribed = true,
                Err(source) => report.failures.push(RunError::Subscribe {
                    topic: topic.to_string(),
                    source,
                }),
            }
        }

        if report.is_success() {
            self.issue_calls(&mut family, descriptor, &mut report);
        }

        if subscribed {
            tracing::debug!("draining notifications");
            match family.drain_notifications() {
                Ok(ntfs) => report.notifications = Some(ntfs),
                Err(source) => report
                    .failures
                    .push(RunError::NotificationConsistency { source }),
            }
        }

        tracing::debug!(failures = report.failures.len(), "operation done");
        Ok(report)
    }

    fn issue_calls(
        &self,
        family: &mut F::Handle,
        descriptor: &OperationDescriptor,
        report: &mut OperationReport,
    ) {
        if let Some(delay) = descriptor.delay() {
            tracing::debug!(seconds = delay.as_secs(), "pausing");
            self.pause.pause(delay);
        }

        let attrs = descriptor.attributes();

        if let Some(op) = descriptor.request_name() {
            tracing::debug!(operation = op, "issuing request");
            match family.request(op, attrs) {
                Ok(reply) => report.reply = Some(reply),
                Err(source) => {
                    report.failures.push(RunError::Request {
                        operation: op.to_string(),
                        source,
                    });
                    return;
                }
            }
        }

        if let Some(op) = descriptor.enumerate_name() {
            tracing::debug!(operation = op, "issuing dump");
            match family.enumerate(op, attrs) {
                Ok(replies) => report.dump = Some(replies),
                Err(source) => report.failures.push(RunError::Enumerate {
                    operation: op.to_string(),
                    source,
                }),
            }
        }
    }
}
