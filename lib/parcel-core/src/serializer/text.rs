use bytes::Bytes;
use encoding_rs::Encoding;

use super::{Prepared, ResponseSerializer, SerializerConfig};
use crate::{BoxError, Error, RequestDescriptor, ResponseDescriptor};

/// Decodes the body into a [`String`].
///
/// The encoding is, in order of preference: the one configured with
/// [`TextSerializer::with_encoding`], the `charset` declared by the response,
/// then [`TextSerializer::FALLBACK_ENCODING`]. Unknown charset labels are
/// ignored. Bytes that are malformed under the chosen encoding fail with
/// [`Error::StringDecodeFailed`]; nothing is replaced.
#[derive(Debug, Clone, Default)]
pub struct TextSerializer {
    config: SerializerConfig,
    encoding: Option<&'static Encoding>,
}

impl TextSerializer {
    /// Latin-1. The WHATWG encoding standard maps the `ISO-8859-1` label to `windows-1252`.
    pub const FALLBACK_ENCODING: &'static Encoding = encoding_rs::WINDOWS_1252;

    /// Serializer with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializer with a custom configuration.
    #[must_use]
    pub const fn with_config(config: SerializerConfig) -> Self {
        Self {
            config,
            encoding: None,
        }
    }

    /// Always decode with this encoding, ignoring the response charset.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Encoding used for a given response.
    #[must_use]
    pub fn encoding_for(&self, response: Option<&ResponseDescriptor>) -> &'static Encoding {
        self.encoding
            .or_else(|| {
                response
                    .and_then(ResponseDescriptor::charset)
                    .and_then(|label| Encoding::for_label(label.as_bytes()))
            })
            .unwrap_or(Self::FALLBACK_ENCODING)
    }
}

impl ResponseSerializer for TextSerializer {
    type Output = String;

    fn serialize(
        &self,
        request: Option<&RequestDescriptor>,
        response: Option<&ResponseDescriptor>,
        data: Option<Bytes>,
        error: Option<Error>,
    ) -> Result<String, BoxError> {
        let data = match self.config.prepare(request, response, data, error)? {
            Prepared::Empty => return Ok(String::new()),
            Prepared::Data(data) => data,
        };

        let encoding = self.encoding_for(response);
        encoding
            .decode_without_bom_handling_and_without_replacement(&data)
            .map(std::borrow::Cow::into_owned)
            .ok_or_else(|| {
                Error::StringDecodeFailed {
                    encoding: encoding.name(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::super::test_support::{get, ok, request, run};
    use super::*;
    use crate::Method;

    fn with_charset(charset: &str) -> ResponseDescriptor {
        ResponseDescriptor::new(200)
            .with_header("Content-Type", format!("text/plain; charset={charset}"))
    }

    #[test]
    fn decodes_utf8_from_declared_charset() {
        let text = run(
            &TextSerializer::new(),
            Some(&get()),
            Some(&with_charset("utf-8")),
            Some("héllo".as_bytes()),
        )
        .expect("text");
        check!(text == "héllo");
    }

    #[test]
    fn falls_back_to_latin1() {
        let text = run(&TextSerializer::new(), Some(&get()), Some(&ok()), Some(b"caf\xe9"))
            .expect("latin-1 text");
        check!(text == "café");
    }

    #[test]
    fn unknown_charset_uses_fallback() {
        let serializer = TextSerializer::new();
        let response = with_charset("x-made-up");
        check!(serializer.encoding_for(Some(&response)) == TextSerializer::FALLBACK_ENCODING);
    }

    #[test]
    fn explicit_encoding_wins_over_charset() {
        let serializer = TextSerializer::new().with_encoding(encoding_rs::UTF_8);
        let response = with_charset("iso-8859-1");
        check!(serializer.encoding_for(Some(&response)) == encoding_rs::UTF_8);
    }

    #[test]
    fn malformed_bytes_fail_with_encoding_name() {
        let serializer = TextSerializer::new().with_encoding(encoding_rs::UTF_8);
        let result = run(&serializer, Some(&get()), Some(&ok()), Some(b"\xff\xfe\xfd"));
        let_assert!(Err(Error::StringDecodeFailed { encoding }) = result);
        check!(encoding == "UTF-8");
    }

    #[test]
    fn empty_eligible_is_empty_string() {
        let text = run(&TextSerializer::new(), Some(&request(Method::Head)), None, None)
            .expect("empty string");
        check!(text.is_empty());

        let text = run(
            &TextSerializer::new(),
            Some(&get()),
            Some(&ResponseDescriptor::new(205)),
            Some(b""),
        )
        .expect("empty string");
        check!(text.is_empty());
    }

    #[test]
    fn empty_body_otherwise_fails() {
        let result = run(&TextSerializer::new(), Some(&get()), Some(&ok()), Some(b""));
        let_assert!(Err(Error::InputDataNilOrZeroLength) = result);
    }
}
