//! Body sources and the per-attempt snapshot produced by a transport.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::{RequestDescriptor, ResponseDescriptor, TransportError};

/// Where the body of one attempt lives.
///
/// A body source is moved into the serialization context and read at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    /// Body buffered in memory.
    InMemory(Bytes),
    /// Body downloaded to a file.
    OnDisk(PathBuf),
}

impl BodySource {
    /// Summary of this source kept in the [`ResponseSnapshot`](crate::ResponseSnapshot).
    #[must_use]
    pub fn artifact(&self) -> BodyArtifact {
        match self {
            Self::InMemory(bytes) => BodyArtifact::Bytes(bytes.len()),
            Self::OnDisk(path) => BodyArtifact::File(path.clone()),
        }
    }
}

impl From<Bytes> for BodySource {
    fn from(bytes: Bytes) -> Self {
        Self::InMemory(bytes)
    }
}

impl From<PathBuf> for BodySource {
    fn from(path: PathBuf) -> Self {
        Self::OnDisk(path)
    }
}

/// What remains of a [`BodySource`] once it has been consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyArtifact {
    /// Number of bytes received in memory.
    Bytes(usize),
    /// Location of the downloaded file.
    File(PathBuf),
}

impl BodyArtifact {
    /// Downloaded file location, if any.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Bytes(_) => None,
        }
    }
}

/// Whether an attempt fetched data into memory or downloaded it to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchKind {
    /// Body collected into memory.
    #[default]
    Data,
    /// Body written to a file.
    Download,
}

/// Everything a transport reports when one physical attempt completes.
#[derive(Debug, Clone, Default)]
pub struct Attempt {
    kind: FetchKind,
    request: Option<RequestDescriptor>,
    response: Option<ResponseDescriptor>,
    body: Option<BodySource>,
    error: Option<TransportError>,
}

impl Attempt {
    /// A data-fetch attempt.
    #[must_use]
    pub fn data(
        request: Option<RequestDescriptor>,
        response: Option<ResponseDescriptor>,
        body: Option<Bytes>,
        error: Option<TransportError>,
    ) -> Self {
        Self {
            kind: FetchKind::Data,
            request,
            response,
            body: body.map(BodySource::InMemory),
            error,
        }
    }

    /// A download attempt. `file` is `None` when nothing was written.
    #[must_use]
    pub fn download(
        request: Option<RequestDescriptor>,
        response: Option<ResponseDescriptor>,
        file: Option<PathBuf>,
        error: Option<TransportError>,
    ) -> Self {
        Self {
            kind: FetchKind::Download,
            request,
            response,
            body: file.map(BodySource::OnDisk),
            error,
        }
    }

    /// An attempt that failed in the transport before any response arrived.
    #[must_use]
    pub fn failed(request: Option<RequestDescriptor>, error: TransportError) -> Self {
        Self {
            request,
            error: Some(error),
            ..Self::default()
        }
    }

    /// Fetch kind.
    #[must_use]
    pub const fn kind(&self) -> FetchKind {
        self.kind
    }

    /// Request that was sent.
    #[must_use]
    pub const fn request(&self) -> Option<&RequestDescriptor> {
        self.request.as_ref()
    }

    /// Response metadata, if a response arrived.
    #[must_use]
    pub const fn response(&self) -> Option<&ResponseDescriptor> {
        self.response.as_ref()
    }

    /// Body source, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&BodySource> {
        self.body.as_ref()
    }

    /// Transport error, if the attempt failed.
    #[must_use]
    pub const fn error(&self) -> Option<&TransportError> {
        self.error.as_ref()
    }

    /// Consume into (kind, request, response, body, error).
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        FetchKind,
        Option<RequestDescriptor>,
        Option<ResponseDescriptor>,
        Option<BodySource>,
        Option<TransportError>,
    ) {
        (
            self.kind,
            self.request,
            self.response,
            self.body,
            self.error,
        )
    }
}
