//! Response serialization and exactly-once completion for async HTTP clients.
//!
//! A [`DataRequest`] runs one logical request through a [`Transport`], turns
//! every attempt into a typed value with a [`ResponseSerializer`], notifies its
//! [`ResponseObserver`]s, and lets a [`RetryPolicy`] decide whether to try
//! again. Whatever happens, the caller gets exactly one [`ResponseSnapshot`].
//!
//! # Example
//!
//! ```ignore
//! use parcel::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! pub struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let url = "https://api.example.com/users/42".parse()?;
//! let transport = HyperTransport::new(RequestDescriptor::new(Method::Get, url));
//!
//! let snapshot = DataRequest::new(transport)
//!     .with_retry_policy(RetryLimit::new(3))
//!     .with_observer(TracingObserver::new())
//!     .response(DecodableSerializer::<User>::new())
//!     .await;
//! let user = snapshot.into_result()?;
//! ```

#[cfg(feature = "transport-hyper")]
mod config;
#[cfg(feature = "transport-hyper")]
mod connector;
#[cfg(feature = "transport-hyper")]
mod hyper_transport;
mod observer;
mod pipeline;
pub mod prelude;
mod retry;
mod transport;

#[cfg(feature = "transport-hyper")]
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_USER_AGENT};
#[cfg(feature = "transport-hyper")]
pub use hyper_transport::HyperTransport;
pub use observer::{LogLevel, ResponseObserver, TracingObserver};
pub use pipeline::{DataRequest, RequestHandle};
pub use retry::{DecisionFuture, RetryContext, RetryDecision, RetryLimit, RetryPolicy};
pub use transport::Transport;

// Re-export core types
pub use parcel_core::{
    Attempt, BodyArtifact, BodySource, BoxError, BytesSerializer, DataPreprocessor,
    DecodableSerializer, Decoder, Empty, EmptyBodyPolicy, EmptyResponse, Error, FetchKind,
    JsonDecodeError, JsonDecoder, JsonSerializer, Method, ParsedResponse, Passthrough, PrefixStrip,
    RequestDescriptor, RequestDescriptorBuilder, ResponseDescriptor, ResponseSerializer,
    ResponseSerializerExt, ResponseSnapshot, Result, SerializerConfig, SerializerConfigBuilder,
    TextSerializer, TransportError, encoding_rs,
};

// Re-export crates appearing in the public API
pub use tokio_util::sync::CancellationToken;
pub use url;
