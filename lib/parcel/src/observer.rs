//! Per-attempt observation hook.
//!
//! Observers are called synchronously, once per physical attempt, after the
//! serializer ran and before the retry policy is consulted. A slow observer
//! delays the pipeline; it cannot change its outcome. A panicking observer is
//! logged and skipped.
//!
//! An attempt cancelled while its serializer runs is still observed, with an
//! [`Error::Cancelled`](parcel_core::Error::Cancelled) snapshot. Cancelling
//! before the transport answered leaves nothing to observe.

use parcel_core::ParsedResponse;
use tracing::{debug, info, warn};

/// Receives every parsed attempt.
pub trait ResponseObserver: Send + Sync {
    /// Called with the snapshot of one attempt.
    fn on_response_parsed(&self, snapshot: &dyn ParsedResponse);
}

impl<F> ResponseObserver for F
where
    F: Fn(&dyn ParsedResponse) + Send + Sync,
{
    fn on_response_parsed(&self, snapshot: &dyn ParsedResponse) {
        self(snapshot);
    }
}

/// Log level for [`TracingObserver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (headers and artifact included).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Observer that logs each parsed attempt with `tracing`.
///
/// # Example
///
/// ```ignore
/// use parcel::{DataRequest, TracingObserver};
///
/// let request = DataRequest::new(transport).with_observer(TracingObserver::new());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver {
    level: LogLevel,
}

impl TracingObserver {
    /// Create an observer logging at info level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an observer logging at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl ResponseObserver for TracingObserver {
    fn on_response_parsed(&self, snapshot: &dyn ParsedResponse) {
        let attempt = snapshot.attempt();
        let status = snapshot.response().map(parcel_core::ResponseDescriptor::status);
        // Saturating conversion to u64 (truncates after ~584 million years)
        let elapsed_us = u64::try_from(snapshot.elapsed().as_micros()).unwrap_or(u64::MAX);

        if let Some(error) = snapshot.error() {
            warn!(attempt, ?status, elapsed_us, error = %error, "response serialization failed");
            return;
        }

        match self.level {
            LogLevel::Debug => {
                debug!(
                    attempt,
                    ?status,
                    elapsed_us,
                    artifact = ?snapshot.artifact(),
                    headers = ?snapshot.response().map(parcel_core::ResponseDescriptor::headers),
                    "response serialized"
                );
            }
            LogLevel::Info => {
                info!(attempt, ?status, elapsed_us, "response serialized");
            }
        }
    }
}
