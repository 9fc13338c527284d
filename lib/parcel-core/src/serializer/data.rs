use bytes::Bytes;

use super::{Prepared, ResponseSerializer, SerializerConfig};
use crate::{BoxError, Error, RequestDescriptor, ResponseDescriptor};

/// Returns the (preprocessed) body verbatim.
///
/// An empty-eligible exchange without a body yields an empty [`Bytes`].
#[derive(Debug, Clone, Default)]
pub struct BytesSerializer {
    config: SerializerConfig,
}

impl BytesSerializer {
    /// Serializer with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializer with a custom configuration.
    #[must_use]
    pub const fn with_config(config: SerializerConfig) -> Self {
        Self { config }
    }

    /// Shared serializer settings.
    #[must_use]
    pub const fn config(&self) -> &SerializerConfig {
        &self.config
    }
}

impl ResponseSerializer for BytesSerializer {
    type Output = Bytes;

    fn serialize(
        &self,
        request: Option<&RequestDescriptor>,
        response: Option<&ResponseDescriptor>,
        data: Option<Bytes>,
        error: Option<Error>,
    ) -> Result<Bytes, BoxError> {
        match self.config.prepare(request, response, data, error)? {
            Prepared::Empty => Ok(Bytes::new()),
            Prepared::Data(data) => Ok(data),
        }
    }
}
