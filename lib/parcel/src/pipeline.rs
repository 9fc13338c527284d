//! Completion and retry pipeline.
//!
//! A [`DataRequest`] drives one logical request through as many physical
//! attempts as its retry policy asks for, and produces exactly one terminal
//! [`ResponseSnapshot`].
//!
//! Each attempt moves through three contexts:
//! 1. the transport future produces an [`Attempt`];
//! 2. the serializer runs on the blocking pool, timed from inside the worker;
//! 3. the final snapshot is returned to the caller, or handed to a completion
//!    spawned on the caller's runtime by [`DataRequest::respond`].
//!
//! Values are moved from one context to the next; nothing is shared mutably.

use std::any::type_name;
use std::future::{self, Future};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::task::Poll;
use std::time::{Duration, Instant};

use parcel_core::{
    Attempt, BodySource, Error, FetchKind, RequestDescriptor, ResponseDescriptor,
    ResponseSerializer, ResponseSerializerExt, ResponseSnapshot,
};
use parcel_core::ParsedResponse;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};

use crate::observer::ResponseObserver;
use crate::retry::{RetryContext, RetryDecision, RetryPolicy};
use crate::transport::Transport;

/// One logical request.
///
/// # Example
///
/// ```ignore
/// use parcel::{DataRequest, HyperTransport, JsonSerializer, RetryLimit, TracingObserver};
///
/// let transport = HyperTransport::new(request);
/// let snapshot = DataRequest::new(transport)
///     .with_retry_policy(RetryLimit::new(2))
///     .with_observer(TracingObserver::new())
///     .response(JsonSerializer::new())
///     .await;
/// let value = snapshot.into_result()?;
/// ```
pub struct DataRequest<T> {
    transport: Arc<T>,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
    observers: Vec<Arc<dyn ResponseObserver>>,
    cancel: CancellationToken,
}

impl<T> std::fmt::Debug for DataRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRequest")
            .field("transport", &type_name::<T>())
            .field("has_retry_policy", &self.retry_policy.is_some())
            .field("observers_count", &self.observers.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl<T: Transport> DataRequest<T> {
    /// Create a request without retry policy or observers.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Create a request over a shared transport.
    #[must_use]
    pub fn from_shared(transport: Arc<T>) -> Self {
        Self {
            transport,
            retry_policy: None,
            observers: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Consult this policy after every failed attempt.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Some(Arc::new(policy));
        self
    }

    /// Consult a shared policy after every failed attempt.
    #[must_use]
    pub fn with_shared_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Notify this observer after every attempt.
    #[must_use]
    pub fn with_observer(mut self, observer: impl ResponseObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Notify a shared observer after every attempt.
    #[must_use]
    pub fn with_shared_observer(mut self, observer: Arc<dyn ResponseObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Token cancelling this request; cancelling it yields an [`Error::Cancelled`] snapshot.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the request.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once the request has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run the request to completion and return its terminal snapshot.
    pub async fn response<S: ResponseSerializer>(self, serializer: S) -> ResponseSnapshot<S::Output> {
        let span = info_span!("parcel_request", serializer = type_name::<S>());
        self.drive(Arc::new(serializer)).instrument(span).await
    }

    /// Run the request in the background and call `completion` on `deliver_on`.
    ///
    /// The pipeline runs on the current runtime (or on `deliver_on` when called
    /// outside one). `completion` is invoked exactly once, including when the
    /// request is cancelled through the returned handle. If the pipeline itself
    /// panics (in the transport, say), `completion` receives a failure carrying
    /// the panic.
    pub fn respond<S, F>(self, serializer: S, deliver_on: &Handle, completion: F) -> RequestHandle
    where
        S: ResponseSerializer,
        F: FnOnce(ResponseSnapshot<S::Output>) + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let deliver_on = deliver_on.clone();
        let driver = Handle::try_current().unwrap_or_else(|_| deliver_on.clone());

        let token = cancel.clone();
        let task = driver.spawn(async move {
            let snapshot = match tokio::spawn(self.response(serializer)).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(error = %err, "request pipeline did not run to the end");
                    let error = if token.is_cancelled() {
                        Error::Cancelled
                    } else {
                        Error::custom(err)
                    };
                    ResponseSnapshot::new(1, None, None, None, Duration::ZERO, Err(error))
                }
            };
            let delivery = deliver_on.spawn(async move { completion(snapshot) });
            if let Err(err) = delivery.await {
                warn!(error = %err, "completion did not run to the end");
            }
        });

        RequestHandle { cancel, task }
    }

    async fn drive<S: ResponseSerializer>(&self, serializer: Arc<S>) -> ResponseSnapshot<S::Output> {
        let mut attempt = 1;
        let mut delay: Option<Duration> = None;

        loop {
            let next = if attempt == 1 {
                self.until_cancelled(self.transport.execute()).await
            } else {
                self.until_cancelled(self.transport.reissue(delay)).await
            };
            let Some(outcome) = next else {
                debug!(attempt, "cancelled while waiting for the transport");
                return ResponseSnapshot::cancelled(attempt, None);
            };

            let snapshot = match self.serialize(attempt, &serializer, outcome).await {
                Ok(snapshot) => snapshot,
                Err(cancelled) => {
                    debug!(attempt, "cancelled during serialization");
                    self.notify(&cancelled);
                    return cancelled;
                }
            };

            self.notify(&snapshot);

            let Some(error) = snapshot.error() else {
                return snapshot;
            };
            let Some(policy) = self.retry_policy.as_deref() else {
                return snapshot;
            };

            let context = RetryContext {
                attempt,
                request: snapshot.request(),
                response: snapshot.response(),
            };
            let decision = self.until_cancelled(decide(policy, context, error)).await;

            match decision {
                None => {
                    debug!(attempt, "cancelled while waiting for the retry policy");
                    return snapshot.into_failure(Error::Cancelled);
                }
                Some(RetryDecision::Proceed) => return snapshot,
                Some(RetryDecision::FailWith(error)) => {
                    warn!(attempt, error = %error, "retry policy replaced the failure");
                    return snapshot.into_failure(error);
                }
                Some(RetryDecision::RetryNow) => delay = None,
                Some(RetryDecision::RetryAfterDelay(after)) => delay = Some(after),
            }

            warn!(attempt, ?delay, "retrying after failed attempt");
            attempt += 1;
        }
    }

    /// Serialize one attempt on the blocking pool.
    ///
    /// Returns `Err` with a cancelled snapshot if the request is cancelled first.
    async fn serialize<S: ResponseSerializer>(
        &self,
        attempt: u32,
        serializer: &Arc<S>,
        outcome: Attempt,
    ) -> Result<ResponseSnapshot<S::Output>, ResponseSnapshot<S::Output>> {
        let (kind, request, response, body, transport_error) = outcome.into_parts();
        let artifact = body.as_ref().map(BodySource::artifact);

        if let Some(request) = &request {
            debug!(
                attempt,
                method = %request.method(),
                url = %request.url(),
                status = ?response.as_ref().map(ResponseDescriptor::status),
                "attempt completed"
            );
        }

        let dispatched = Instant::now();
        let job = {
            let serializer = Arc::clone(serializer);
            let request = request.clone();
            let response = response.clone();
            let error = transport_error.map(Error::Transport);
            tokio::task::spawn_blocking(move || {
                let started = Instant::now();
                let result = run_serializer(
                    serializer.as_ref(),
                    kind,
                    request.as_ref(),
                    response.as_ref(),
                    body,
                    error,
                );
                (result, started.elapsed())
            })
        };

        let (result, elapsed) = match self.until_cancelled(job).await {
            Some(Ok((result, elapsed))) => (result.map_err(Error::project), elapsed),
            Some(Err(join_error)) => {
                warn!(attempt, error = %join_error, "serializer did not complete");
                (Err(Error::custom(join_error)), dispatched.elapsed())
            }
            None => {
                let cancelled = ResponseSnapshot::new(
                    attempt,
                    request,
                    response,
                    artifact,
                    dispatched.elapsed(),
                    Err(Error::Cancelled),
                );
                return Err(cancelled);
            }
        };

        Ok(ResponseSnapshot::new(
            attempt, request, response, artifact, elapsed, result,
        ))
    }

    /// Call every observer; a panicking observer is logged and skipped.
    fn notify(&self, snapshot: &dyn ParsedResponse) {
        for observer in &self.observers {
            let notified = catch_unwind(AssertUnwindSafe(|| observer.on_response_parsed(snapshot)));
            if notified.is_err() {
                warn!(attempt = snapshot.attempt(), "response observer panicked");
            }
        }
    }

    async fn until_cancelled<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            output = future => Some(output),
        }
    }
}

/// Ask the policy for a decision. A panicking policy counts as [`RetryDecision::Proceed`].
async fn decide(policy: &dyn RetryPolicy, context: RetryContext<'_>, error: &Error) -> RetryDecision {
    let Ok(mut decision) = catch_unwind(AssertUnwindSafe(|| policy.decide(context, error))) else {
        warn!(attempt = context.attempt, "retry policy panicked");
        return RetryDecision::Proceed;
    };

    let polled = future::poll_fn(|cx| {
        match catch_unwind(AssertUnwindSafe(|| decision.as_mut().poll(cx))) {
            Ok(Poll::Ready(decision)) => Poll::Ready(Some(decision)),
            Ok(Poll::Pending) => Poll::Pending,
            Err(_) => Poll::Ready(None),
        }
    })
    .await;

    polled.unwrap_or_else(|| {
        warn!(attempt = context.attempt, "retry policy panicked");
        RetryDecision::Proceed
    })
}

fn run_serializer<S: ResponseSerializer>(
    serializer: &S,
    kind: FetchKind,
    request: Option<&RequestDescriptor>,
    response: Option<&ResponseDescriptor>,
    body: Option<BodySource>,
    error: Option<Error>,
) -> Result<S::Output, parcel_core::BoxError> {
    match (kind, body) {
        (_, Some(BodySource::OnDisk(path))) => {
            serializer.serialize_file(request, response, Some(&path), error)
        }
        (FetchKind::Download, None) => serializer.serialize_file(request, response, None, error),
        (_, Some(BodySource::InMemory(data))) => serializer.serialize(request, response, Some(data), error),
        (FetchKind::Data, None) => serializer.serialize(request, response, None, error),
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Handle on a request started with [`DataRequest::respond`].
#[derive(Debug)]
pub struct RequestHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RequestHandle {
    /// Cancel the request. The completion still runs, with [`Error::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once the completion has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the completion has run.
    pub async fn finished(self) {
        if let Err(err) = self.task.await {
            warn!(error = %err, "request task did not run to the end");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use bytes::Bytes;
    use parcel_core::{BytesSerializer, JsonSerializer, TransportError};

    use super::*;

    /// Replays a fixed list of attempts, then reports connection failures.
    #[derive(Debug, Default)]
    struct Replay {
        attempts: Mutex<Vec<Attempt>>,
        calls: AtomicU32,
    }

    impl Replay {
        fn new(mut attempts: Vec<Attempt>) -> Self {
            attempts.reverse();
            Self {
                attempts: Mutex::new(attempts),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl Transport for Replay {
        async fn execute(&self) -> Attempt {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.attempts
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop()
                .unwrap_or_else(|| Attempt::failed(None, TransportError::connection("exhausted")))
        }
    }

    fn ok_json(body: &'static str) -> Attempt {
        Attempt::data(
            None,
            Some(ResponseDescriptor::new(200)),
            Some(Bytes::from_static(body.as_bytes())),
            None,
        )
    }

    #[tokio::test]
    async fn success_without_policy() {
        let transport = Arc::new(Replay::new(vec![ok_json(r#"{"a":1}"#)]));
        let snapshot = DataRequest::from_shared(Arc::clone(&transport))
            .response(JsonSerializer::new())
            .await;

        assert_eq!(snapshot.attempt(), 1);
        assert_eq!(snapshot.value(), Some(&serde_json::json!({"a": 1})));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_without_policy_is_terminal() {
        let transport = Arc::new(Replay::new(vec![Attempt::failed(None, TransportError::Timeout)]));
        let snapshot = DataRequest::from_shared(Arc::clone(&transport))
            .response(BytesSerializer::new())
            .await;

        assert!(matches!(
            snapshot.error(),
            Some(Error::Transport(TransportError::Timeout))
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let request = DataRequest::new(Replay::new(vec![ok_json("{}")]));
        request.cancel();
        assert!(request.is_cancelled());

        let snapshot = request.response(JsonSerializer::new()).await;
        assert!(snapshot.error().is_some_and(Error::is_cancelled));
    }

    #[test]
    fn debug_output() {
        let request = DataRequest::new(Replay::default());
        let debug = format!("{request:?}");
        assert!(debug.contains("has_retry_policy: false"));
    }
}
