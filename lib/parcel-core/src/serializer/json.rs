use bytes::Bytes;
use serde::de::Error as _;
use serde_json::Value;

use super::{Prepared, ResponseSerializer, SerializerConfig};
use crate::{BoxError, Error, RequestDescriptor, ResponseDescriptor};

/// Parses the body into an untyped JSON tree.
///
/// An empty-eligible exchange without a body yields [`Value::Null`].
#[derive(Debug, Clone)]
pub struct JsonSerializer {
    config: SerializerConfig,
    allow_fragments: bool,
}

impl Default for JsonSerializer {
    fn default() -> Self {
        Self {
            config: SerializerConfig::default(),
            allow_fragments: true,
        }
    }
}

impl JsonSerializer {
    /// Serializer with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializer with a custom configuration.
    #[must_use]
    pub fn with_config(config: SerializerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Accept top-level scalars such as `42` or `"text"` (default: `true`).
    #[must_use]
    pub const fn allow_fragments(mut self, allow: bool) -> Self {
        self.allow_fragments = allow;
        self
    }
}

impl ResponseSerializer for JsonSerializer {
    type Output = Value;

    fn serialize(
        &self,
        request: Option<&RequestDescriptor>,
        response: Option<&ResponseDescriptor>,
        data: Option<Bytes>,
        error: Option<Error>,
    ) -> Result<Value, BoxError> {
        let data = match self.config.prepare(request, response, data, error)? {
            Prepared::Empty => return Ok(Value::Null),
            Prepared::Data(data) => data,
        };

        let value: Value = serde_json::from_slice(&data).map_err(Error::StructuredParseFailed)?;
        if !self.allow_fragments && !(value.is_object() || value.is_array()) {
            return Err(Error::StructuredParseFailed(serde_json::Error::custom(
                "top-level value must be an object or an array",
            ))
            .into());
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde_json::json;

    use super::super::test_support::{get, ok, request, run};
    use super::*;
    use crate::{Method, PrefixStrip};

    #[test]
    fn parses_documents() {
        let value = run(
            &JsonSerializer::new(),
            Some(&get()),
            Some(&ok()),
            Some(br#"{"name":"parcel","tags":["a","b"],"size":3}"#),
        )
        .expect("json");
        let reference: Value =
            serde_json::from_str(r#"{"size":3,"tags":["a","b"],"name":"parcel"}"#).expect("reference");
        check!(value == reference);
    }

    #[test]
    fn strips_xssi_prefix_before_parsing() {
        let serializer = JsonSerializer::with_config(
            SerializerConfig::builder()
                .preprocessor(PrefixStrip::google_xssi())
                .build(),
        );
        let value = run(&serializer, Some(&get()), Some(&ok()), Some(b")]}',\n{\"a\":1}"))
            .expect("json");
        check!(value == json!({"a": 1}));
    }

    #[test]
    fn malformed_input_fails() {
        let result = run(&JsonSerializer::new(), Some(&get()), Some(&ok()), Some(b"{\"a\":"));
        let_assert!(Err(Error::StructuredParseFailed(_)) = result);
    }

    #[test]
    fn fragments_are_configurable() {
        let value = run(&JsonSerializer::new(), Some(&get()), Some(&ok()), Some(b"42")).expect("fragment");
        check!(value == json!(42));

        let strict = JsonSerializer::new().allow_fragments(false);
        let result = run(&strict, Some(&get()), Some(&ok()), Some(b"\"text\""));
        let_assert!(Err(Error::StructuredParseFailed(_)) = result);

        let value = run(&strict, Some(&get()), Some(&ok()), Some(b"[]")).expect("array");
        check!(value == json!([]));
    }

    #[test]
    fn empty_eligible_is_null() {
        let value = run(
            &JsonSerializer::new(),
            Some(&get()),
            Some(&ResponseDescriptor::new(204)),
            None,
        )
        .expect("null");
        check!(value == Value::Null);

        let value = run(&JsonSerializer::new(), Some(&request(Method::Head)), Some(&ok()), Some(b""))
            .expect("null");
        check!(value.is_null());
    }

    #[test]
    fn body_equal_to_prefix_is_a_parse_error() {
        let serializer = JsonSerializer::with_config(
            SerializerConfig::builder()
                .preprocessor(PrefixStrip::google_xssi())
                .build(),
        );
        let result = run(&serializer, Some(&get()), Some(&ok()), Some(b")]}',\n"));
        let_assert!(Err(Error::StructuredParseFailed(_)) = result);
    }
}
