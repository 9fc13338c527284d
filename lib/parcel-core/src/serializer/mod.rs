//! Response serializers.
//!
//! A [`ResponseSerializer`] turns the outcome of one attempt into a typed value.
//! Serializers only implement the in-memory case; downloaded files go through
//! [`ResponseSerializerExt::serialize_file`], which reads the file and delegates,
//! so file handling is identical for every serializer.
//!
//! Built-in serializers:
//! - [`BytesSerializer`] - raw bytes
//! - [`TextSerializer`] - text decoded with an `encoding_rs` encoding
//! - [`JsonSerializer`] - untyped [`serde_json::Value`] tree
//! - [`DecodableSerializer`] - typed value through a pluggable [`Decoder`]

mod data;
mod decodable;
mod json;
mod text;

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

pub use data::BytesSerializer;
pub use decodable::{DecodableSerializer, Decoder, JsonDecodeError, JsonDecoder};
pub use json::JsonSerializer;
pub use text::TextSerializer;

use crate::{
    BoxError, DataPreprocessor, EmptyBodyPolicy, Error, Passthrough, RequestDescriptor,
    ResponseDescriptor,
};

/// Converts the outcome of one attempt into a typed value.
///
/// Implementations receive the transport error, if any, and are expected to
/// return it unchanged without looking at the body. Errors that are not
/// [`Error`] values are reported as [`Error::CustomSerializationFailed`].
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use parcel_core::{BoxError, Error, RequestDescriptor, ResponseDescriptor, ResponseSerializer};
///
/// #[derive(Debug)]
/// struct LineCount;
///
/// impl ResponseSerializer for LineCount {
///     type Output = usize;
///
///     fn serialize(
///         &self,
///         _request: Option<&RequestDescriptor>,
///         _response: Option<&ResponseDescriptor>,
///         data: Option<Bytes>,
///         error: Option<Error>,
///     ) -> Result<usize, BoxError> {
///         if let Some(error) = error {
///             return Err(error.into());
///         }
///         let data = data.ok_or(Error::InputDataNilOrZeroLength)?;
///         Ok(data.split(|b| *b == b'\n').count())
///     }
/// }
/// ```
pub trait ResponseSerializer: Send + Sync + 'static {
    /// Value produced on success.
    type Output: Send + Sync + 'static;

    /// Serialize an in-memory body.
    fn serialize(
        &self,
        request: Option<&RequestDescriptor>,
        response: Option<&ResponseDescriptor>,
        data: Option<Bytes>,
        error: Option<Error>,
    ) -> Result<Self::Output, BoxError>;
}

/// File-sourced serialization, derived from [`ResponseSerializer::serialize`].
///
/// Blanket-implemented for every serializer and cannot be overridden.
pub trait ResponseSerializerExt: ResponseSerializer {
    /// Serialize a downloaded file.
    ///
    /// A transport error is returned as-is; a missing path fails with
    /// [`Error::InputFileNil`]; an unreadable file fails with
    /// [`Error::InputFileReadFailed`]. Otherwise the whole file is read and
    /// handed to [`ResponseSerializer::serialize`].
    ///
    /// Reading is blocking; call this from a worker context.
    fn serialize_file(
        &self,
        request: Option<&RequestDescriptor>,
        response: Option<&ResponseDescriptor>,
        path: Option<&Path>,
        error: Option<Error>,
    ) -> Result<Self::Output, BoxError> {
        if let Some(error) = error {
            return Err(error.into());
        }
        let path = path.ok_or(Error::InputFileNil)?;
        let data = std::fs::read(path).map_err(|source| Error::InputFileReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        self.serialize(request, response, Some(Bytes::from(data)), None)
    }
}

impl<S: ResponseSerializer + ?Sized> ResponseSerializerExt for S {}

// ============================================================================
// Configuration
// ============================================================================

/// Settings shared by every built-in serializer.
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Transform applied to non-empty bodies before parsing.
    pub preprocessor: Arc<dyn DataPreprocessor>,
    /// Which exchanges may have an empty body.
    pub empty_policy: EmptyBodyPolicy,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            preprocessor: Arc::new(Passthrough),
            empty_policy: EmptyBodyPolicy::default(),
        }
    }
}

/// Outcome of the checks every built-in runs before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Prepared {
    /// The body is empty and the exchange is empty-eligible.
    Empty,
    /// Preprocessed, non-empty body.
    Data(Bytes),
}

impl SerializerConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> SerializerConfigBuilder {
        SerializerConfigBuilder::default()
    }

    /// Transport error check, empty-body check, then preprocessing.
    pub(crate) fn prepare(
        &self,
        request: Option<&RequestDescriptor>,
        response: Option<&ResponseDescriptor>,
        data: Option<Bytes>,
        error: Option<Error>,
    ) -> Result<Prepared, BoxError> {
        if let Some(error) = error {
            return Err(error.into());
        }

        let Some(data) = data.filter(|data| !data.is_empty()) else {
            if self.empty_policy.allows_empty(request, response) {
                return Ok(Prepared::Empty);
            }
            return Err(Error::InputDataNilOrZeroLength.into());
        };

        Ok(Prepared::Data(self.preprocessor.preprocess(data)?))
    }
}

/// Builder for [`SerializerConfig`].
#[derive(Debug, Clone, Default)]
pub struct SerializerConfigBuilder {
    preprocessor: Option<Arc<dyn DataPreprocessor>>,
    empty_request_methods: Option<Vec<crate::Method>>,
    empty_response_codes: Option<Vec<u16>>,
}

impl SerializerConfigBuilder {
    /// Set the data preprocessor.
    #[must_use]
    pub fn preprocessor(mut self, preprocessor: impl DataPreprocessor) -> Self {
        self.preprocessor = Some(Arc::new(preprocessor));
        self
    }

    /// Set the request methods allowed to have an empty response.
    #[must_use]
    pub fn empty_request_methods(
        mut self,
        methods: impl IntoIterator<Item = crate::Method>,
    ) -> Self {
        self.empty_request_methods = Some(methods.into_iter().collect());
        self
    }

    /// Set the status codes allowed to have an empty response.
    #[must_use]
    pub fn empty_response_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.empty_response_codes = Some(codes.into_iter().collect());
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> SerializerConfig {
        let defaults = SerializerConfig::default();
        let mut empty_policy = defaults.empty_policy;
        if let Some(methods) = self.empty_request_methods {
            empty_policy = empty_policy.with_empty_request_methods(methods);
        }
        if let Some(codes) = self.empty_response_codes {
            empty_policy = empty_policy.with_empty_response_codes(codes);
        }
        SerializerConfig {
            preprocessor: self.preprocessor.unwrap_or(defaults.preprocessor),
            empty_policy,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::Method;

    pub(crate) fn get() -> RequestDescriptor {
        request(Method::Get)
    }

    pub(crate) fn request(method: Method) -> RequestDescriptor {
        RequestDescriptor::new(
            method,
            url::Url::parse("https://api.example.com/resource").expect("valid URL"),
        )
    }

    pub(crate) fn ok() -> ResponseDescriptor {
        ResponseDescriptor::new(200)
    }

    /// Run a serializer and project its error the way the pipeline does.
    pub(crate) fn run<S: ResponseSerializer>(
        serializer: &S,
        request: Option<&RequestDescriptor>,
        response: Option<&ResponseDescriptor>,
        data: Option<&'static [u8]>,
    ) -> crate::Result<S::Output> {
        serializer
            .serialize(request, response, data.map(Bytes::from_static), None)
            .map_err(Error::project)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert2::{check, let_assert};

    use super::test_support::{get, ok, request};
    use super::*;
    use crate::{Method, PrefixStrip, TransportError};

    #[test]
    fn default_config() {
        let config = SerializerConfig::default();
        check!(config.empty_policy == EmptyBodyPolicy::default());
        check!(format!("{:?}", config.preprocessor) == "Passthrough");
    }

    #[test]
    fn builder_overrides() {
        let config = SerializerConfig::builder()
            .preprocessor(PrefixStrip::google_xssi())
            .empty_request_methods([Method::Delete])
            .empty_response_codes([202])
            .build();

        check!(config.empty_policy.empty_request_methods().contains(&Method::Delete));
        check!(!config.empty_policy.empty_response_codes().contains(&204));
        check!(config.empty_policy.empty_response_codes().contains(&202));
    }

    #[test]
    fn prepare_short_circuits_on_transport_error() {
        let config = SerializerConfig::default();
        let result = config.prepare(
            Some(&get()),
            None,
            Some(Bytes::from_static(b"ignored")),
            Some(TransportError::Timeout.into()),
        );
        let_assert!(Err(err) = result);
        let_assert!(Error::Transport(TransportError::Timeout) = Error::project(err));
    }

    #[test]
    fn prepare_empty_body() {
        let config = SerializerConfig::default();
        let_assert!(Ok(Prepared::Empty) = config.prepare(Some(&request(Method::Head)), None, None, None));
        let_assert!(
            Ok(Prepared::Empty) =
                config.prepare(None, Some(&ResponseDescriptor::new(204)), Some(Bytes::new()), None)
        );
        let_assert!(Err(err) = config.prepare(Some(&get()), Some(&ok()), Some(Bytes::new()), None));
        let_assert!(Error::InputDataNilOrZeroLength = Error::project(err));
    }

    #[test]
    fn prepare_runs_preprocessor_on_data() {
        let config = SerializerConfig::builder()
            .preprocessor(PrefixStrip::new("while(1);"))
            .build();
        let prepared = config
            .prepare(Some(&get()), Some(&ok()), Some(Bytes::from_static(b"while(1);[]")), None)
            .expect("prepared");
        check!(prepared == Prepared::Data(Bytes::from_static(b"[]")));
    }

    #[test]
    fn serialize_file_requires_a_path() {
        let result = BytesSerializer::new().serialize_file(Some(&get()), Some(&ok()), None, None);
        let_assert!(Err(err) = result);
        let_assert!(Error::InputFileNil = Error::project(err));
    }

    #[test]
    fn serialize_file_reports_unreadable_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.bin");

        let result =
            BytesSerializer::new().serialize_file(Some(&get()), Some(&ok()), Some(&missing), None);
        let_assert!(Err(err) = result);
        let_assert!(Error::InputFileReadFailed { path, .. } = Error::project(err));
        check!(path == missing);
    }

    #[test]
    fn serialize_file_prefers_transport_error() {
        let result = BytesSerializer::new().serialize_file(
            None,
            None,
            None,
            Some(TransportError::connection("reset").into()),
        );
        let_assert!(Err(err) = result);
        check!(Error::project(err).is_transport());
    }

    #[test]
    fn serialize_file_delegates_to_serialize() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b")]}',\n{\"a\":1}").expect("write");

        let serializer = JsonSerializer::with_config(
            SerializerConfig::builder()
                .preprocessor(PrefixStrip::google_xssi())
                .build(),
        );
        let value = serializer
            .serialize_file(Some(&get()), Some(&ok()), Some(file.path()), None)
            .expect("json from file");
        check!(value == serde_json::json!({"a": 1}));
    }
}
