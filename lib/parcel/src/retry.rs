//! Retry policy contract.
//!
//! The pipeline consults a [`RetryPolicy`] only after a failed attempt and
//! executes whatever it decides. The decision is asynchronous and may take
//! arbitrarily long.

use std::future::{self, Future};
use std::pin::Pin;
use std::time::Duration;

use parcel_core::{BoxError, Error, RequestDescriptor, ResponseDescriptor};

/// Future returned by [`RetryPolicy::decide`].
pub type DecisionFuture<'a> = Pin<Box<dyn Future<Output = RetryDecision> + Send + 'a>>;

/// What to do after a failed attempt.
#[derive(Debug)]
pub enum RetryDecision {
    /// Deliver the failure as it is.
    Proceed,
    /// Deliver a failure carrying this error instead.
    FailWith(Error),
    /// Issue another attempt immediately.
    RetryNow,
    /// Issue another attempt after the delay.
    RetryAfterDelay(Duration),
}

impl RetryDecision {
    /// Fail with an arbitrary error.
    ///
    /// Canonical errors are kept as they are; anything else is wrapped in
    /// [`Error::RetryFailWith`].
    #[must_use]
    pub fn fail_with(error: impl Into<BoxError>) -> Self {
        Self::FailWith(Error::project_retry(error.into()))
    }

    /// Retry, optionally after a delay.
    #[must_use]
    pub const fn retry(delay: Option<Duration>) -> Self {
        match delay {
            Some(delay) => Self::RetryAfterDelay(delay),
            None => Self::RetryNow,
        }
    }

    /// Returns `true` if another attempt is requested.
    #[must_use]
    pub const fn is_retry(&self) -> bool {
        matches!(self, Self::RetryNow | Self::RetryAfterDelay(_))
    }
}

/// What the policy knows about the failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryContext<'a> {
    /// 1-based index of the attempt that failed.
    pub attempt: u32,
    /// Request that was sent.
    pub request: Option<&'a RequestDescriptor>,
    /// Response metadata, if a response arrived.
    pub response: Option<&'a ResponseDescriptor>,
}

/// Decides whether a failed attempt is retried.
///
/// Only the contract lives here; the decision logic is up to the implementor.
pub trait RetryPolicy: Send + Sync {
    /// Decide what happens after `error`.
    fn decide<'a>(&'a self, context: RetryContext<'a>, error: &'a Error) -> DecisionFuture<'a>;
}

// ============================================================================
// Bounded policy
// ============================================================================

/// Retries a bounded number of times.
///
/// By default, retries idempotent requests on:
/// - Connection errors and timeouts
/// - Failures on responses with a 5xx status
/// - Failures on 429 Too Many Requests
///
/// Non-idempotent requests (`POST`, `PATCH`, ...) are only retried with
/// [`retry_all`](Self::retry_all).
///
/// # Example
///
/// ```ignore
/// use parcel::RetryLimit;
/// use std::time::Duration;
///
/// let policy = RetryLimit::new(3).with_delay(Duration::from_millis(200));
/// let request = DataRequest::new(transport).with_retry_policy(policy);
/// ```
#[derive(Debug, Clone)]
pub struct RetryLimit {
    max_retries: u32,
    delay: Option<Duration>,
    retry_all: bool,
}

impl RetryLimit {
    /// Allow at most `max_retries` additional attempts.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            delay: None,
            retry_all: false,
        }
    }

    /// Wait this long before each retry.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Retry every failure and every method, not only transient failures of idempotent requests.
    #[must_use]
    pub const fn retry_all(mut self) -> Self {
        self.retry_all = true;
        self
    }

    /// Returns `true` if the response status should be retried.
    fn should_retry_response(response: &ResponseDescriptor) -> bool {
        let status = response.status();
        status >= 500 || status == 429
    }

    /// Returns `true` if the error should be retried.
    fn should_retry_error(error: &Error) -> bool {
        error.transport().is_some_and(|err| err.is_transient())
    }

    fn decision(&self, context: &RetryContext<'_>, error: &Error) -> RetryDecision {
        if context.attempt > self.max_retries || error.is_cancelled() {
            return RetryDecision::Proceed;
        }

        if self.retry_all {
            return RetryDecision::retry(self.delay);
        }

        let idempotent = context
            .request
            .is_none_or(|request| request.method().is_idempotent());
        let should_retry = idempotent
            && (Self::should_retry_error(error)
                || context.response.is_some_and(Self::should_retry_response));

        if should_retry {
            RetryDecision::retry(self.delay)
        } else {
            RetryDecision::Proceed
        }
    }
}

impl RetryPolicy for RetryLimit {
    fn decide<'a>(&'a self, context: RetryContext<'a>, error: &'a Error) -> DecisionFuture<'a> {
        Box::pin(future::ready(self.decision(&context, error)))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use parcel_core::{Method, TransportError};

    use super::*;

    fn context(attempt: u32, response: Option<&ResponseDescriptor>) -> RetryContext<'_> {
        RetryContext {
            attempt,
            request: None,
            response,
        }
    }

    #[test]
    fn retries_transient_transport_errors() {
        let policy = RetryLimit::new(2);
        let error = Error::from(TransportError::connection("refused"));
        check!(policy.decision(&context(1, None), &error).is_retry());
        check!(policy.decision(&context(2, None), &error).is_retry());
        let_assert!(RetryDecision::Proceed = policy.decision(&context(3, None), &error));
    }

    #[test]
    fn retries_server_errors_and_rate_limits() {
        let policy = RetryLimit::new(1);
        let error = Error::InputDataNilOrZeroLength;
        for status in [500, 503, 429] {
            let response = ResponseDescriptor::new(status);
            check!(policy.decision(&context(1, Some(&response)), &error).is_retry());
        }
    }

    #[test]
    fn does_not_retry_client_errors() {
        let policy = RetryLimit::new(3);
        let response = ResponseDescriptor::new(404);
        let error = Error::InputDataNilOrZeroLength;
        let_assert!(RetryDecision::Proceed = policy.decision(&context(1, Some(&response)), &error));
    }

    #[test]
    fn does_not_retry_non_idempotent_requests() {
        let url = url::Url::parse("https://api.example.com/orders").expect("url");
        let post = RequestDescriptor::new(Method::Post, url.clone());
        let put = RequestDescriptor::new(Method::Put, url);
        let error = Error::from(TransportError::connection("reset"));

        let policy = RetryLimit::new(3);
        let context = |request| RetryContext {
            attempt: 1,
            request: Some(request),
            response: None,
        };
        let_assert!(RetryDecision::Proceed = policy.decision(&context(&post), &error));
        check!(policy.decision(&context(&put), &error).is_retry());
        check!(policy.clone().retry_all().decision(&context(&post), &error).is_retry());
    }

    #[test]
    fn retry_all_and_delay() {
        let policy = RetryLimit::new(1)
            .retry_all()
            .with_delay(Duration::from_millis(250));
        let decision = policy.decision(&context(1, None), &Error::InputFileNil);
        let_assert!(RetryDecision::RetryAfterDelay(delay) = decision);
        check!(delay == Duration::from_millis(250));
    }

    #[test]
    fn never_retries_cancellation() {
        let policy = RetryLimit::new(5).retry_all();
        let_assert!(RetryDecision::Proceed = policy.decision(&context(1, None), &Error::Cancelled));
    }

    #[test]
    fn fail_with_projects_errors() {
        let_assert!(RetryDecision::FailWith(Error::RetryFailWith(_)) = RetryDecision::fail_with("quota exhausted"));
        let_assert!(
            RetryDecision::FailWith(Error::InputFileNil) = RetryDecision::fail_with(Error::InputFileNil)
        );
    }
}
