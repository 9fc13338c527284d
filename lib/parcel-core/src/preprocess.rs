//! Byte transforms applied before any serializer-specific logic.

use std::fmt;

use bytes::Bytes;

use crate::BoxError;

/// Pure transform run on a non-empty body before it is serialized.
///
/// Implementations must be deterministic. Errors are reported to the caller as
/// [`Error::CustomSerializationFailed`](crate::Error::CustomSerializationFailed)
/// unless they already are canonical.
pub trait DataPreprocessor: fmt::Debug + Send + Sync + 'static {
    /// Transform the body.
    fn preprocess(&self, data: Bytes) -> Result<Bytes, BoxError>;
}

/// Returns the body unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Passthrough;

impl DataPreprocessor for Passthrough {
    fn preprocess(&self, data: Bytes) -> Result<Bytes, BoxError> {
        Ok(data)
    }
}

/// Removes one leading occurrence of a fixed prefix, if present.
///
/// Typically used to strip anti-hijacking guards prepended to JSON payloads.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use parcel_core::{DataPreprocessor, PrefixStrip};
///
/// let strip = PrefixStrip::google_xssi();
/// let body = Bytes::from_static(b")]}',\n{\"a\":1}");
/// assert_eq!(strip.preprocess(body).unwrap(), Bytes::from_static(b"{\"a\":1}"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixStrip {
    prefix: Bytes,
}

impl PrefixStrip {
    /// The `)]}',\n` guard used by Google JSON APIs.
    pub const GOOGLE_XSSI_PREFIX: &'static [u8] = b")]}',\n";

    /// Strip the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<Bytes>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Strip [`Self::GOOGLE_XSSI_PREFIX`].
    #[must_use]
    pub fn google_xssi() -> Self {
        Self::new(Bytes::from_static(Self::GOOGLE_XSSI_PREFIX))
    }

    /// The prefix being stripped.
    #[must_use]
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}

impl DataPreprocessor for PrefixStrip {
    fn preprocess(&self, data: Bytes) -> Result<Bytes, BoxError> {
        if data.starts_with(&self.prefix) {
            Ok(data.slice(self.prefix.len()..))
        } else {
            Ok(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    fn strip(prefix: &'static [u8], input: &'static [u8]) -> Bytes {
        PrefixStrip::new(Bytes::from_static(prefix))
            .preprocess(Bytes::from_static(input))
            .expect("prefix strip never fails")
    }

    #[test]
    fn passthrough_is_identity() {
        let data = Bytes::from_static(b"\x00\xffraw");
        check!(Passthrough.preprocess(data.clone()).expect("identity") == data);
    }

    #[test]
    fn prefix_strip_removes_exactly_one_occurrence() {
        check!(strip(b"X", b"XXabc") == Bytes::from_static(b"Xabc"));
        check!(strip(b")]}',\n", b")]}',\n[1]") == Bytes::from_static(b"[1]"));
    }

    #[test]
    fn prefix_strip_leaves_other_input_untouched() {
        check!(strip(b"X", b"abcX") == Bytes::from_static(b"abcX"));
        check!(strip(b"prefix", b"pre") == Bytes::from_static(b"pre"));
        check!(strip(b"X", b"") == Bytes::new());
    }

    #[test]
    fn prefix_strip_of_exact_prefix_is_empty() {
        check!(strip(b"abc", b"abc").is_empty());
    }
}
