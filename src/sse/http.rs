//! HTTP transport — `reqwest` streaming response bodies.

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, StatusCode};

use crate::error::SseError;
use crate::sse::transport::{ByteStream, OpenRequest, Transport};

const EVENT_STREAM_MIME: &str = "text/event-stream";
const LAST_EVENT_ID: &str = "last-event-id";

/// Event-stream transport over `reqwest`.
///
/// The client is cheap to clone; every [`Transport::open`] call issues one
/// `GET` and streams the response body.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn open(&self, request: OpenRequest) -> BoxFuture<'static, Result<ByteStream, SseError>> {
        let client = self.client.clone();
        Box::pin(async move {
            let headers = request_headers(&request)?;
            tracing::debug!("Opening event stream: {}", request.url);

            let response = client.get(&request.url).headers(headers).send().await?;

            let status = response.status();
            if status != StatusCode::OK {
                return Err(SseError::BadStatus {
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_ascii_lowercase();
            if !content_type.starts_with(EVENT_STREAM_MIME) {
                return Err(SseError::UnexpectedContentType(content_type));
            }

            Ok(response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| SseError::Read(e.to_string())))
                .boxed())
        })
    }
}

fn request_headers(request: &OpenRequest) -> Result<HeaderMap, SseError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM_MIME));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    if let Some(id) = &request.last_event_id {
        let value = HeaderValue::from_str(id).map_err(|e| SseError::InvalidHeader {
            name: LAST_EVENT_ID.to_string(),
            reason: e.to_string(),
        })?;
        headers.insert(HeaderName::from_static(LAST_EVENT_ID), value);
    }

    for (name, value) in &request.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| SseError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| SseError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers_defaults() {
        let headers = request_headers(&OpenRequest::new("http://localhost/stream")).unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), "text/event-stream");
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-cache");
        assert!(headers.get(LAST_EVENT_ID).is_none());
    }

    #[test]
    fn test_request_headers_include_last_event_id_and_extras() {
        let request = OpenRequest {
            last_event_id: Some("42".into()),
            headers: vec![("Authorization".into(), "Bearer abc".into())],
            ..OpenRequest::new("http://localhost/stream")
        };
        let headers = request_headers(&request).unwrap();
        assert_eq!(headers.get("Last-Event-ID").unwrap(), "42");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer abc");
    }

    #[test]
    fn test_request_headers_reject_invalid_name() {
        let request = OpenRequest {
            headers: vec![("bad header".into(), "x".into())],
            ..OpenRequest::new("http://localhost/stream")
        };
        assert!(matches!(
            request_headers(&request),
            Err(SseError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_request_headers_reject_newline_in_last_event_id() {
        let request = OpenRequest {
            last_event_id: Some("1\n2".into()),
            ..OpenRequest::new("http://localhost/stream")
        };
        assert!(matches!(
            request_headers(&request),
            Err(SseError::InvalidHeader { .. })
        ));
    }
}
