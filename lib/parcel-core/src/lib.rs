//! Core types and serializers for the parcel response pipeline.
//!
//! This crate provides the pieces the pipeline is assembled from:
//! - [`Method`], [`RequestDescriptor`], [`ResponseDescriptor`] - immutable exchange metadata
//! - [`BodySource`] and [`Attempt`] - what a transport reports per attempt
//! - [`Error`] and [`Result`] - the canonical error taxonomy
//! - [`DataPreprocessor`] - byte transforms run before parsing
//! - [`EmptyBodyPolicy`] - when a missing body is acceptable
//! - [`ResponseSerializer`] - the serializer contract and its built-ins
//! - [`ResponseSnapshot`] - the outcome handed to observers and completions

mod body;
mod descriptor;
mod empty;
mod error;
mod method;
pub mod prelude;
mod preprocess;
mod serializer;
mod snapshot;

pub use body::{Attempt, BodyArtifact, BodySource, FetchKind};
pub use descriptor::{RequestDescriptor, RequestDescriptorBuilder, ResponseDescriptor};
pub use empty::{Empty, EmptyBodyPolicy, EmptyResponse};
pub use error::{BoxError, Error, Result, TransportError};
pub use method::Method;
pub use preprocess::{DataPreprocessor, Passthrough, PrefixStrip};
pub use serializer::{
    BytesSerializer, DecodableSerializer, Decoder, JsonDecodeError, JsonDecoder, JsonSerializer,
    ResponseSerializer, ResponseSerializerExt, SerializerConfig, SerializerConfigBuilder,
    TextSerializer,
};
pub use snapshot::{ParsedResponse, ResponseSnapshot};

// Re-export encoding_rs so callers can pick a text encoding
pub use encoding_rs;
