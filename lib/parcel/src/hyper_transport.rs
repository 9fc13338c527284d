//! [`Transport`] implementation using hyper-util.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use parcel_core::{Attempt, FetchKind, RequestDescriptor, ResponseDescriptor, TransportError};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::connector::https_connector;
use crate::transport::Transport;

type PooledClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Transport failure, with the response metadata if it already arrived.
#[derive(Debug)]
struct Failure {
    response: Option<ResponseDescriptor>,
    error: TransportError,
}

impl Failure {
    const fn before_response(error: TransportError) -> Self {
        Self {
            response: None,
            error,
        }
    }
}

/// Sends one request over a pooled hyper client.
///
/// Every call to [`Transport::execute`] sends the request again; the body is
/// buffered in memory, or written to a file for downloads.
///
/// # Example
///
/// ```ignore
/// use parcel::{DataRequest, HyperTransport, JsonSerializer, Method, RequestDescriptor};
///
/// let request = RequestDescriptor::new(Method::Get, "https://api.example.com/users".parse()?);
/// let snapshot = DataRequest::new(HyperTransport::new(request))
///     .response(JsonSerializer::new())
///     .await;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: PooledClient,
    config: ClientConfig,
    request: RequestDescriptor,
    body: Bytes,
    destination: Option<PathBuf>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .field("request", &self.request)
            .field("body_len", &self.body.len())
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new(request: RequestDescriptor) -> Self {
        Self::with_config(request, ClientConfig::default())
    }

    /// Create a transport with custom configuration.
    #[must_use]
    pub fn with_config(request: RequestDescriptor, config: ClientConfig) -> Self {
        let connector = https_connector(&config);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self {
            client,
            config,
            request,
            body: Bytes::new(),
            destination: None,
        }
    }

    /// Send this request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Write the response body to `path` instead of keeping it in memory.
    #[must_use]
    pub fn download_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }

    /// Request sent on every attempt.
    #[must_use]
    pub const fn request(&self) -> &RequestDescriptor {
        &self.request
    }

    /// Transport configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Download destination, if any.
    #[must_use]
    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    const fn kind(&self) -> FetchKind {
        if self.destination.is_some() {
            FetchKind::Download
        } else {
            FetchKind::Data
        }
    }

    fn build_hyper_request(&self) -> Result<http::Request<Full<Bytes>>, TransportError> {
        let mut builder = http::Request::builder()
            .method(http::Method::from(self.request.method()))
            .uri(self.request.url().as_str());

        for (name, value) in self.request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(agent) = &self.config.user_agent
            && self.request.header("user-agent").is_none()
        {
            builder = builder.header(http::header::USER_AGENT, agent.as_str());
        }

        builder
            .body(Full::new(self.body.clone()))
            .map_err(|e| TransportError::invalid_request(e.to_string()))
    }

    /// Extract response headers as a `HashMap`.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    /// Send the request and buffer the body, within the configured timeout.
    ///
    /// On failure, the response metadata is kept when it already arrived.
    async fn send(&self) -> Result<(ResponseDescriptor, Bytes), Failure> {
        let hyper_request = self
            .build_hyper_request()
            .map_err(Failure::before_response)?;

        tokio::time::timeout(self.config.timeout, self.exchange(hyper_request))
            .await
            .map_err(|_| Failure::before_response(TransportError::Timeout))?
    }

    async fn exchange(
        &self,
        hyper_request: http::Request<Full<Bytes>>,
    ) -> Result<(ResponseDescriptor, Bytes), Failure> {
        let response = self
            .client
            .request(hyper_request)
            .await
            .map_err(|e| Failure::before_response(Self::map_hyper_error(e)))?;

        let descriptor = ResponseDescriptor::with_headers(
            response.status().as_u16(),
            Self::extract_headers(response.headers()),
        );

        match response.into_body().collect().await {
            Ok(collected) => Ok((descriptor, collected.to_bytes())),
            Err(e) => Err(Failure {
                response: Some(descriptor),
                error: TransportError::connection(e.to_string()),
            }),
        }
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> TransportError {
        let msg = err.to_string();

        if err.is_connect() {
            return TransportError::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return TransportError::tls(msg);
        }

        TransportError::connection(msg)
    }

    fn failure(&self, response: Option<ResponseDescriptor>, error: TransportError) -> Attempt {
        let request = Some(self.request.clone());
        match self.kind() {
            FetchKind::Data => Attempt::data(request, response, None, Some(error)),
            FetchKind::Download => Attempt::download(request, response, None, Some(error)),
        }
    }
}

impl Transport for HyperTransport {
    async fn execute(&self) -> Attempt {
        debug!(method = %self.request.method(), url = %self.request.url(), "sending request");

        let (response, body) = match self.send().await {
            Ok(exchange) => exchange,
            Err(Failure { response, error }) => {
                warn!(url = %self.request.url(), error = %error, "request failed");
                return self.failure(response, error);
            }
        };

        let request = Some(self.request.clone());
        let Some(path) = &self.destination else {
            return Attempt::data(request, Some(response), Some(body), None);
        };

        match tokio::fs::write(path, &body).await {
            Ok(()) => Attempt::download(request, Some(response), Some(path.clone()), None),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not write download");
                Attempt::download(
                    request,
                    Some(response),
                    None,
                    Some(TransportError::io(err.to_string())),
                )
            }
        }
    }
}
