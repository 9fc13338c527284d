//! Error types for parcel.
//!
//! Every failure that can leave the pipeline is represented by [`Error`]. Foreign
//! errors enter the taxonomy through exactly one projection, [`Error::project`],
//! so a canonical error is never wrapped twice.

use std::path::PathBuf;

use derive_more::{Display, Error, From};

/// Boxed error used at extension points (custom serializers, decoders, preprocessors).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// Transport Error
// ============================================================================

/// Failure reported by the transport collaborator for one attempt.
///
/// The pipeline never produces these; it only carries them through unchanged.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Network/connection errors.
    #[display("connection error: {_0}")]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    Timeout,

    /// The request could not be built or sent.
    #[display("invalid request: {_0}")]
    InvalidRequest(#[error(not(source))] String),

    /// Local I/O failure while receiving the body (e.g. writing a download).
    #[display("I/O error: {_0}")]
    Io(#[error(not(source))] String),
}

impl TransportError {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an I/O error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Returns `true` for connection failures and timeouts.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout)
    }
}

// ============================================================================
// Canonical Error
// ============================================================================

/// Canonical error for everything the response pipeline can report.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Transport failure, passed through untouched.
    #[display("{_0}")]
    #[from]
    Transport(TransportError),

    /// A download attempt finished without a file.
    #[display("response could not be serialized, input file was nil")]
    #[from(skip)]
    InputFileNil,

    /// The downloaded file could not be read.
    #[display("response could not be serialized, input file could not be read: {}", path.display())]
    #[from(skip)]
    InputFileReadFailed {
        /// Path of the downloaded file.
        #[error(not(source))]
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The body was missing or empty and the response is not empty-eligible.
    #[display("response could not be serialized, input data was nil or zero length")]
    #[from(skip)]
    InputDataNilOrZeroLength,

    /// The body could not be represented in the chosen text encoding.
    #[display("string could not be decoded with encoding {encoding}")]
    #[from(skip)]
    StringDecodeFailed {
        /// Name of the encoding that was used.
        #[error(not(source))]
        encoding: &'static str,
    },

    /// The body is not a well-formed JSON document.
    #[display("JSON could not be parsed: {_0}")]
    #[from]
    StructuredParseFailed(serde_json::Error),

    /// The pluggable decoder rejected the body.
    #[display("response could not be decoded: {_0}")]
    #[from(skip)]
    DecodeFailed(#[error(source)] BoxError),

    /// The response was empty-eligible but the target type has no empty value.
    #[display("empty response could not be serialized to type {type_name}")]
    #[from(skip)]
    InvalidEmptyResponse {
        /// Name of the target type.
        #[error(not(source))]
        type_name: &'static str,
    },

    /// A custom serializer or preprocessor failed with a non-canonical error.
    #[display("custom response serializer failed: {_0}")]
    #[from(skip)]
    CustomSerializationFailed(#[error(source)] BoxError),

    /// The retry policy chose to fail the request with its own error.
    #[display("retry policy failed the request: {_0}")]
    #[from(skip)]
    RetryFailWith(#[error(source)] BoxError),

    /// The logical request was cancelled.
    #[display("request cancelled")]
    #[from(skip)]
    Cancelled,
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Map any error raised while serializing into the canonical taxonomy.
    ///
    /// Canonical errors pass through unchanged, everything else becomes
    /// [`Error::CustomSerializationFailed`].
    #[must_use]
    pub fn project(error: BoxError) -> Self {
        match error.downcast::<Self>() {
            Ok(canonical) => *canonical,
            Err(other) => Self::CustomSerializationFailed(other),
        }
    }

    /// Map an error chosen by a retry policy into the canonical taxonomy.
    ///
    /// Canonical errors pass through unchanged, everything else becomes
    /// [`Error::RetryFailWith`].
    #[must_use]
    pub fn project_retry(error: BoxError) -> Self {
        match error.downcast::<Self>() {
            Ok(canonical) => *canonical,
            Err(other) => Self::RetryFailWith(other),
        }
    }

    /// Wrap a decoder failure.
    #[must_use]
    pub fn decode(error: impl Into<BoxError>) -> Self {
        Self::DecodeFailed(error.into())
    }

    /// Wrap a custom serializer failure.
    #[must_use]
    pub fn custom(error: impl Into<BoxError>) -> Self {
        Self::CustomSerializationFailed(error.into())
    }

    /// Returns `true` if this error came from the transport.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns the transport error, if any.
    #[must_use]
    pub const fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if the request was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if the failure happened while reading a downloaded file.
    #[must_use]
    pub const fn is_input_file_error(&self) -> bool {
        matches!(self, Self::InputFileNil | Self::InputFileReadFailed { .. })
    }

    /// Returns `true` if this is a serialization failure (neither transport,
    /// retry nor cancellation).
    #[must_use]
    pub const fn is_serialization_error(&self) -> bool {
        !matches!(
            self,
            Self::Transport(_) | Self::RetryFailWith(_) | Self::Cancelled
        )
    }
}
