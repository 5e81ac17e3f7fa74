//! Transport seam between the reconnecting client and the network.
//!
//! A transport opens one streaming HTTP response and hands back its body as
//! a stream of byte chunks. Closing the connection is dropping the stream.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;

use crate::error::SseError;

/// Body of an open event stream.
pub type ByteStream = BoxStream<'static, Result<Bytes, SseError>>;

/// Everything a transport needs to open one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub url: String,
    /// Sent as the `Last-Event-ID` header when present.
    pub last_event_id: Option<String>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
}

impl OpenRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            last_event_id: None,
            headers: Vec::new(),
        }
    }
}

/// Opens event-stream connections.
///
/// Implementations must resolve to an error (not an empty stream) when the
/// server rejects the request, so the client can apply its backoff policy.
///
/// `open` is called with the client's state lock held. It must return
/// promptly and do its I/O inside the returned future.
pub trait Transport: Send + Sync + 'static {
    fn open(&self, request: OpenRequest) -> BoxFuture<'static, Result<ByteStream, SseError>>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn open(&self, request: OpenRequest) -> BoxFuture<'static, Result<ByteStream, SseError>> {
        (**self).open(request)
    }
}
