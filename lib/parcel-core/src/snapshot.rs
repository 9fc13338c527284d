//! Outcome of one attempt, as seen by observers and by the final completion.

use std::any::Any;
use std::time::Duration;

use crate::{BodyArtifact, Error, RequestDescriptor, ResponseDescriptor, Result};

/// Immutable record of one serialized attempt.
///
/// The same type is handed to observers (once per attempt) and to the
/// completion (once per logical request).
#[derive(Debug)]
pub struct ResponseSnapshot<T> {
    attempt: u32,
    request: Option<RequestDescriptor>,
    response: Option<ResponseDescriptor>,
    artifact: Option<BodyArtifact>,
    elapsed: Duration,
    result: Result<T>,
}

impl<T> ResponseSnapshot<T> {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(
        attempt: u32,
        request: Option<RequestDescriptor>,
        response: Option<ResponseDescriptor>,
        artifact: Option<BodyArtifact>,
        elapsed: Duration,
        result: Result<T>,
    ) -> Self {
        Self {
            attempt,
            request,
            response,
            artifact,
            elapsed,
            result,
        }
    }

    /// Snapshot of a request cancelled before any response was serialized.
    #[must_use]
    pub fn cancelled(attempt: u32, request: Option<RequestDescriptor>) -> Self {
        Self::new(
            attempt,
            request,
            None,
            None,
            Duration::ZERO,
            Err(Error::Cancelled),
        )
    }

    /// 1-based index of the physical attempt that produced this snapshot.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Request that was sent.
    #[must_use]
    pub const fn request(&self) -> Option<&RequestDescriptor> {
        self.request.as_ref()
    }

    /// Response metadata.
    #[must_use]
    pub const fn response(&self) -> Option<&ResponseDescriptor> {
        self.response.as_ref()
    }

    /// What was left of the body source (byte count or file location).
    #[must_use]
    pub const fn artifact(&self) -> Option<&BodyArtifact> {
        self.artifact.as_ref()
    }

    /// Time spent in the serializer.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Serialization outcome.
    #[must_use]
    pub const fn result(&self) -> &Result<T> {
        &self.result
    }

    /// Serialized value, if successful.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// Failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }

    /// Serialization succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Consume into the serialization outcome.
    ///
    /// # Errors
    ///
    /// Returns the canonical error carried by a failed snapshot.
    pub fn into_result(self) -> Result<T> {
        self.result
    }

    /// Keep request, response, artifact and duration, replacing the outcome with `error`.
    #[must_use]
    pub fn into_failure(self, error: Error) -> Self {
        Self {
            result: Err(error),
            ..self
        }
    }

    /// Transform the value, keeping everything else.
    pub fn map<U, F>(self, f: F) -> ResponseSnapshot<U>
    where
        F: FnOnce(T) -> U,
    {
        ResponseSnapshot {
            attempt: self.attempt,
            request: self.request,
            response: self.response,
            artifact: self.artifact,
            elapsed: self.elapsed,
            result: self.result.map(f),
        }
    }
}

// ============================================================================
// Type-erased view
// ============================================================================

/// Type-erased view of a [`ResponseSnapshot`], handed to observers.
///
/// The serialized value is reachable through [`value`](dyn ParsedResponse::value)
/// when the observer knows its type.
pub trait ParsedResponse: Send + Sync {
    /// 1-based attempt index.
    fn attempt(&self) -> u32;
    /// Request that was sent.
    fn request(&self) -> Option<&RequestDescriptor>;
    /// Response metadata.
    fn response(&self) -> Option<&ResponseDescriptor>;
    /// Byte count or downloaded file.
    fn artifact(&self) -> Option<&BodyArtifact>;
    /// Time spent in the serializer.
    fn elapsed(&self) -> Duration;
    /// Failure, if any.
    fn error(&self) -> Option<&Error>;
    /// Serialized value as [`Any`], if successful.
    fn value_any(&self) -> Option<&(dyn Any + Send + Sync)>;
}

impl dyn ParsedResponse + '_ {
    /// Serialized value, if successful and of type `T`.
    #[must_use]
    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value_any()?.downcast_ref::<T>()
    }

    /// Serialization succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error().is_none()
    }
}

impl<T: Send + Sync + 'static> ParsedResponse for ResponseSnapshot<T> {
    fn attempt(&self) -> u32 {
        self.attempt
    }

    fn request(&self) -> Option<&RequestDescriptor> {
        self.request.as_ref()
    }

    fn response(&self) -> Option<&ResponseDescriptor> {
        self.response.as_ref()
    }

    fn artifact(&self) -> Option<&BodyArtifact> {
        self.artifact.as_ref()
    }

    fn elapsed(&self) -> Duration {
        self.elapsed
    }

    fn error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }

    fn value_any(&self) -> Option<&(dyn Any + Send + Sync)> {
        self.result
            .as_ref()
            .ok()
            .map(|value| value as &(dyn Any + Send + Sync))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn success() -> ResponseSnapshot<String> {
        ResponseSnapshot::new(
            1,
            None,
            Some(ResponseDescriptor::new(200)),
            Some(BodyArtifact::Bytes(5)),
            Duration::from_millis(3),
            Ok("hello".to_string()),
        )
    }

    #[test]
    fn accessors() {
        let snapshot = success();
        check!(snapshot.is_success());
        check!(snapshot.value().map(String::as_str) == Some("hello"));
        check!(snapshot.error().is_none());
        check!(snapshot.artifact() == Some(&BodyArtifact::Bytes(5)));
        check!(snapshot.elapsed() == Duration::from_millis(3));
    }

    #[test]
    fn into_failure_keeps_metadata() {
        let snapshot = success().into_failure(Error::Cancelled);
        check!(!snapshot.is_success());
        check!(snapshot.response().map(ResponseDescriptor::status) == Some(200));
        check!(snapshot.elapsed() == Duration::from_millis(3));
        let_assert!(Err(Error::Cancelled) = snapshot.into_result());
    }

    #[test]
    fn erased_view_downcasts_value() {
        let snapshot = success();
        let parsed: &dyn ParsedResponse = &snapshot;
        check!(parsed.is_success());
        check!(parsed.value::<String>().map(String::as_str) == Some("hello"));
        check!(parsed.value::<u32>().is_none());
    }

    #[test]
    fn map_transforms_value() {
        let snapshot = success().map(|text| text.len());
        check!(snapshot.value() == Some(&5));
    }

    #[test]
    fn cancelled_snapshot() {
        let snapshot = ResponseSnapshot::<()>::cancelled(2, None);
        check!(snapshot.attempt() == 2);
        check!(snapshot.error().is_some_and(Error::is_cancelled));
    }
}
