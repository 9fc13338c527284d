//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy glob importing:
//!
//! ```ignore
//! use parcel_core::prelude::*;
//! ```

pub use crate::{
    Attempt, BytesSerializer, DecodableSerializer, Empty, EmptyBodyPolicy, Error, JsonSerializer,
    Method, ParsedResponse, PrefixStrip, RequestDescriptor, ResponseDescriptor, ResponseSerializer,
    ResponseSerializerExt, ResponseSnapshot, Result, SerializerConfig, TextSerializer,
    TransportError,
};
