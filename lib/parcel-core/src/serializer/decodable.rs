use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use derive_more::{Display, Error};

use super::{Prepared, ResponseSerializer, SerializerConfig};
use crate::{BoxError, EmptyResponse, Error, RequestDescriptor, ResponseDescriptor};

/// Pluggable decode capability used by [`DecodableSerializer`].
pub trait Decoder<T>: Send + Sync + 'static {
    /// Decode a non-empty, preprocessed body.
    fn decode(&self, data: &[u8]) -> Result<T, BoxError>;
}

// ============================================================================
// JSON decoder
// ============================================================================

/// JSON decoding failure with the path of the offending field.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("JSON deserialization error at '{path}': {message}")]
pub struct JsonDecodeError {
    /// JSON path to the error (e.g. `user.address.city`).
    pub path: String,
    /// Error message.
    pub message: String,
}

/// Decodes JSON with `serde_json`, reporting the failing field path.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl<T: serde::de::DeserializeOwned> Decoder<T> for JsonDecoder {
    fn decode(&self, data: &[u8]) -> Result<T, BoxError> {
        let mut deserializer = serde_json::Deserializer::from_slice(data);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
            JsonDecodeError {
                path: e.path().to_string(),
                message: e.inner().to_string(),
            }
            .into()
        })
    }
}

// ============================================================================
// Serializer
// ============================================================================

/// Decodes the body into `T` through a [`Decoder`].
///
/// Empty-eligible exchanges without a body produce `T`'s empty value when the
/// serializer was built with [`empty_capable`](Self::empty_capable), and fail
/// with [`Error::InvalidEmptyResponse`] otherwise. The decoder is never called
/// for an empty body.
///
/// # Example
///
/// ```
/// use parcel_core::{DecodableSerializer, Empty};
///
/// #[derive(Debug, serde::Deserialize)]
/// struct User {
///     id: u64,
/// }
///
/// let users = DecodableSerializer::<Vec<User>>::new().empty_capable();
/// let ack = DecodableSerializer::<Empty>::new().empty_capable();
/// let strict = DecodableSerializer::<User>::new();
/// # let _ = (users, ack, strict);
/// ```
pub struct DecodableSerializer<T, D = JsonDecoder> {
    config: SerializerConfig,
    decoder: D,
    empty_value: Option<fn() -> T>,
    _target: PhantomData<fn() -> T>,
}

impl<T, D: fmt::Debug> fmt::Debug for DecodableSerializer<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodableSerializer")
            .field("target", &std::any::type_name::<T>())
            .field("config", &self.config)
            .field("decoder", &self.decoder)
            .field("empty_capable", &self.empty_value.is_some())
            .finish()
    }
}

impl<T, D: Clone> Clone for DecodableSerializer<T, D> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            decoder: self.decoder.clone(),
            empty_value: self.empty_value,
            _target: PhantomData,
        }
    }
}

impl<T> DecodableSerializer<T, JsonDecoder>
where
    T: serde::de::DeserializeOwned,
{
    /// JSON serializer with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_decoder(JsonDecoder)
    }
}

impl<T> Default for DecodableSerializer<T, JsonDecoder>
where
    T: serde::de::DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D: Decoder<T>> DecodableSerializer<T, D> {
    /// Serializer using a custom decoder.
    #[must_use]
    pub fn with_decoder(decoder: D) -> Self {
        Self {
            config: SerializerConfig::default(),
            decoder,
            empty_value: None,
            _target: PhantomData,
        }
    }

    /// Replace the shared serializer settings.
    #[must_use]
    pub fn with_config(mut self, config: SerializerConfig) -> Self {
        self.config = config;
        self
    }

    /// Produce [`EmptyResponse::empty_value`] for empty-eligible exchanges.
    #[must_use]
    pub fn empty_capable(mut self) -> Self
    where
        T: EmptyResponse,
    {
        self.empty_value = Some(T::empty_value);
        self
    }

    /// The decoder in use.
    #[must_use]
    pub const fn decoder(&self) -> &D {
        &self.decoder
    }
}

impl<T, D> ResponseSerializer for DecodableSerializer<T, D>
where
    T: Send + Sync + 'static,
    D: Decoder<T>,
{
    type Output = T;

    fn serialize(
        &self,
        request: Option<&RequestDescriptor>,
        response: Option<&ResponseDescriptor>,
        data: Option<Bytes>,
        error: Option<Error>,
    ) -> Result<T, BoxError> {
        match self.config.prepare(request, response, data, error)? {
            Prepared::Empty => match self.empty_value {
                Some(empty_value) => Ok(empty_value()),
                None => Err(Error::InvalidEmptyResponse {
                    type_name: std::any::type_name::<T>(),
                }
                .into()),
            },
            Prepared::Data(data) => self.decoder.decode(&data).map_err(|e| Error::decode(e).into()),
        }
    }
}
