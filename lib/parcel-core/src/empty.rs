//! Rules for accepting responses without a body.

use std::collections::HashSet;

use crate::{Method, RequestDescriptor, ResponseDescriptor};

/// Decides whether a missing or zero-length body is acceptable.
///
/// A response is *empty-eligible* when the request method is one of
/// [`empty_request_methods`](Self::empty_request_methods) or the status code is
/// one of [`empty_response_codes`](Self::empty_response_codes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyBodyPolicy {
    empty_request_methods: HashSet<Method>,
    empty_response_codes: HashSet<u16>,
}

impl EmptyBodyPolicy {
    /// Methods whose responses never carry a body (`HEAD`).
    pub const DEFAULT_EMPTY_REQUEST_METHODS: [Method; 1] = [Method::Head];

    /// Status codes whose responses never carry a body (`204 No Content`, `205 Reset Content`).
    pub const DEFAULT_EMPTY_RESPONSE_CODES: [u16; 2] = [204, 205];

    /// Create a policy from explicit sets.
    #[must_use]
    pub fn new(
        empty_request_methods: impl IntoIterator<Item = Method>,
        empty_response_codes: impl IntoIterator<Item = u16>,
    ) -> Self {
        Self {
            empty_request_methods: empty_request_methods.into_iter().collect(),
            empty_response_codes: empty_response_codes.into_iter().collect(),
        }
    }

    /// Replace the empty-eligible request methods.
    #[must_use]
    pub fn with_empty_request_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.empty_request_methods = methods.into_iter().collect();
        self
    }

    /// Replace the empty-eligible status codes.
    #[must_use]
    pub fn with_empty_response_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.empty_response_codes = codes.into_iter().collect();
        self
    }

    /// Empty-eligible request methods.
    #[must_use]
    pub fn empty_request_methods(&self) -> &HashSet<Method> {
        &self.empty_request_methods
    }

    /// Empty-eligible status codes.
    #[must_use]
    pub fn empty_response_codes(&self) -> &HashSet<u16> {
        &self.empty_response_codes
    }

    /// Returns `true` if an empty body is acceptable for this exchange.
    #[must_use]
    pub fn allows_empty(
        &self,
        request: Option<&RequestDescriptor>,
        response: Option<&ResponseDescriptor>,
    ) -> bool {
        let method_allows =
            request.is_some_and(|req| self.empty_request_methods.contains(&req.method()));
        let status_allows =
            response.is_some_and(|resp| self.empty_response_codes.contains(&resp.status()));
        method_allows || status_allows
    }
}

impl Default for EmptyBodyPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_EMPTY_REQUEST_METHODS,
            Self::DEFAULT_EMPTY_RESPONSE_CODES,
        )
    }
}

// ============================================================================
// Empty value capability
// ============================================================================

/// Types that have a meaningful value for an empty response.
///
/// [`DecodableSerializer::empty_capable`](crate::DecodableSerializer::empty_capable)
/// only accepts targets implementing this trait.
pub trait EmptyResponse {
    /// Value produced instead of decoding an empty body.
    fn empty_value() -> Self;
}

/// Placeholder for endpoints that return nothing useful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
pub struct Empty;

impl EmptyResponse for Empty {
    fn empty_value() -> Self {
        Self
    }
}

impl EmptyResponse for () {
    fn empty_value() -> Self {}
}

impl<T> EmptyResponse for Option<T> {
    fn empty_value() -> Self {
        None
    }
}

impl<T> EmptyResponse for Vec<T> {
    fn empty_value() -> Self {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::*;

    fn request(method: Method) -> RequestDescriptor {
        RequestDescriptor::new(
            method,
            url::Url::parse("https://api.example.com/items").expect("valid URL"),
        )
    }

    #[test]
    fn default_policy() {
        let policy = EmptyBodyPolicy::default();
        check!(policy.empty_request_methods().len() == 1);
        check!(policy.empty_request_methods().contains(&Method::Head));
        check!(policy.empty_response_codes().contains(&204));
        check!(policy.empty_response_codes().contains(&205));
    }

    #[test]
    fn head_requests_allow_empty() {
        let policy = EmptyBodyPolicy::default();
        check!(policy.allows_empty(Some(&request(Method::Head)), None));
        check!(policy.allows_empty(
            Some(&request(Method::Head)),
            Some(&ResponseDescriptor::new(200))
        ));
        check!(!policy.allows_empty(
            Some(&request(Method::Get)),
            Some(&ResponseDescriptor::new(200))
        ));
    }

    #[test]
    fn no_content_statuses_allow_empty() {
        let policy = EmptyBodyPolicy::default();
        for status in [204, 205] {
            check!(policy.allows_empty(None, Some(&ResponseDescriptor::new(status))));
        }
        check!(!policy.allows_empty(None, Some(&ResponseDescriptor::new(304))));
    }

    #[test]
    fn absent_inputs_disallow_empty() {
        check!(!EmptyBodyPolicy::default().allows_empty(None, None));
    }

    #[test]
    fn custom_sets_replace_defaults() {
        let policy = EmptyBodyPolicy::default()
            .with_empty_request_methods([Method::Delete])
            .with_empty_response_codes([202]);
        check!(policy.allows_empty(Some(&request(Method::Delete)), None));
        check!(!policy.allows_empty(Some(&request(Method::Head)), None));
        check!(policy.allows_empty(None, Some(&ResponseDescriptor::new(202))));
        check!(!policy.allows_empty(None, Some(&ResponseDescriptor::new(204))));
    }

    #[test]
    fn empty_values() {
        check!(Empty::empty_value() == Empty);
        check!(<Option<u32>>::empty_value().is_none());
        check!(<Vec<String>>::empty_value().is_empty());
    }
}
