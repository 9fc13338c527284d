//! Transport collaborator contract.
//!
//! The transport performs the network exchange; the pipeline only consumes the
//! [`Attempt`] it reports and asks for a new one when the retry policy says so.

use std::future::Future;
use std::time::Duration;

use parcel_core::Attempt;

/// Performs physical attempts for one logical request.
///
/// Implementations report every outcome, including failures, as an
/// [`Attempt`]; they never panic and never return early without one.
///
/// # Example
///
/// ```ignore
/// use parcel::{Attempt, Transport};
///
/// struct Canned(bytes::Bytes);
///
/// impl Transport for Canned {
///     async fn execute(&self) -> Attempt {
///         Attempt::data(None, Some(ResponseDescriptor::new(200)), Some(self.0.clone()), None)
///     }
/// }
/// ```
pub trait Transport: Send + Sync + 'static {
    /// Perform the first attempt.
    fn execute(&self) -> impl Future<Output = Attempt> + Send;

    /// Perform another attempt after the retry policy asked for one.
    ///
    /// The default waits for `delay` (if any) and calls [`execute`](Self::execute).
    fn reissue(&self, delay: Option<Duration>) -> impl Future<Output = Attempt> + Send {
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.execute().await
        }
    }
}
