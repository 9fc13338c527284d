//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy glob importing:
//!
//! ```ignore
//! use parcel::prelude::*;
//! ```

#[cfg(feature = "transport-hyper")]
pub use crate::{ClientConfig, HyperTransport};
pub use crate::{
    Attempt, BytesSerializer, DataRequest, DecodableSerializer, Empty, Error, JsonSerializer,
    Method, ParsedResponse, PrefixStrip, RequestDescriptor, ResponseDescriptor, ResponseObserver,
    ResponseSerializer, ResponseSnapshot, Result, RetryDecision, RetryLimit, RetryPolicy,
    SerializerConfig, TextSerializer, TracingObserver, Transport,
};
