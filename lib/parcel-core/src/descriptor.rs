//! Immutable request and response snapshots.
//!
//! A transport hands the pipeline one [`RequestDescriptor`] and one
//! [`ResponseDescriptor`] per attempt. Neither is mutated afterwards; they are
//! moved between execution contexts and end up in the
//! [`ResponseSnapshot`](crate::ResponseSnapshot).
//!
//! # Example
//!
//! ```
//! use parcel_core::{Method, RequestDescriptor, ResponseDescriptor};
//!
//! let request = RequestDescriptor::builder(Method::Get, "https://api.example.com".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .build();
//! assert_eq!(request.header("accept"), Some("application/json"));
//!
//! let response = ResponseDescriptor::new(200)
//!     .with_header("Content-Type", "text/plain; charset=\"utf-8\"");
//! assert_eq!(response.charset(), Some("utf-8"));
//! ```

use std::collections::HashMap;

use crate::Method;

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

// ============================================================================
// Request
// ============================================================================

/// What was sent: method, URL and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
}

impl RequestDescriptor {
    /// Creates a descriptor without headers.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
        }
    }

    /// Creates a new [`RequestDescriptorBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Builder for [`RequestDescriptor`].
#[derive(Debug, Clone)]
pub struct RequestDescriptorBuilder {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
}

impl RequestDescriptorBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Builds the [`RequestDescriptor`].
    #[must_use]
    pub fn build(self) -> RequestDescriptor {
        RequestDescriptor {
            method: self.method,
            url: self.url,
            headers: self.headers,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// What came back: status code and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    status: u16,
    headers: HashMap<String, String>,
}

impl ResponseDescriptor {
    /// Creates a descriptor without headers.
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
        }
    }

    /// Creates a descriptor from status and headers.
    #[must_use]
    pub fn with_headers(status: u16, headers: HashMap<String, String>) -> Self {
        Self { status, headers }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Value of the `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Declared character set, taken from the `charset` parameter of `Content-Type`.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.content_type()?
            .split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"'))
            .filter(|value| !value.is_empty())
    }

    /// Declared `Content-Length`, if present and numeric.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.header("Content-Length")?.trim().parse().ok()
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_basic() {
        let url = url::Url::parse("https://api.example.com/users?page=1").expect("valid URL");
        let request = RequestDescriptor::builder(Method::Head, url)
            .header("Accept", "application/json")
            .build();

        assert_eq!(request.method(), Method::Head);
        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/users?page=1"
        );
        assert_eq!(request.header("ACCEPT"), Some("application/json"));
        assert_eq!(request.header("Authorization"), None);
    }

    #[test]
    fn response_charset() {
        let response =
            ResponseDescriptor::new(200).with_header("content-type", "text/html; charset=ISO-8859-1");
        assert_eq!(response.charset(), Some("ISO-8859-1"));

        let quoted = ResponseDescriptor::new(200)
            .with_header("Content-Type", "application/json;Charset=\"utf-8\"");
        assert_eq!(quoted.charset(), Some("utf-8"));

        let none = ResponseDescriptor::new(200).with_header("Content-Type", "application/json");
        assert_eq!(none.charset(), None);

        assert_eq!(ResponseDescriptor::new(204).charset(), None);
    }

    #[test]
    fn response_content_length() {
        let response = ResponseDescriptor::new(200).with_header("Content-Length", " 42 ");
        assert_eq!(response.content_length(), Some(42));
        assert_eq!(ResponseDescriptor::new(200).content_length(), None);
    }

    #[test]
    fn response_status_checks() {
        assert!(ResponseDescriptor::new(204).is_success());
        assert!(ResponseDescriptor::new(404).is_client_error());
        assert!(ResponseDescriptor::new(503).is_server_error());
    }
}
