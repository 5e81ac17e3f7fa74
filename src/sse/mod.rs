//! Server-sent-events layer — parsing, transport, reconnection, client.
//!
//! The client is transport-agnostic: `http` feature → `reqwest` (http.rs).
//! Tests and embedders can plug in any [`Transport`].

pub mod backoff;
pub mod client;
pub mod decode;
pub mod parse;
pub mod state;
pub mod transport;

#[cfg(feature = "http")]
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use crate::error::SseError;

pub use backoff::ReconnectPolicy;
pub use client::{SseClient, SseClientBuilder};
pub use decode::{EventDecoder, JsonDecoder};
pub use parse::{EventParser, FrameStream, SseFrame, DEFAULT_EVENT, DEFAULT_MAX_LINE_LEN};
pub use state::{ClientState, ConnectionMachine, ConnectionState, ErrorAction};
pub use transport::{ByteStream, OpenRequest, Transport};

#[cfg(feature = "http")]
pub use http::HttpTransport;

// ─── SseOptions ──────────────────────────────────────────────────────────────

/// Configuration for the event-stream client.
#[derive(Debug, Clone, PartialEq)]
pub struct SseOptions {
    /// Named channel to listen to. `None` listens to `message`. Applied to
    /// decoders with a selectable channel (see [`EventDecoder::listen_to`]).
    pub event_name: Option<String>,
    /// Reconnect automatically after transport errors.
    pub reconnect: bool,
    /// Base backoff delay; retry k waits `reconnect_interval * 2^k`.
    pub reconnect_interval: Duration,
    /// Automatic retries before settling in `Disconnected`.
    pub max_reconnect_attempts: u32,
    /// Upper bound on a single backoff delay.
    pub max_reconnect_delay: Option<Duration>,
    /// Randomize backoff delays by up to ±25%.
    pub jitter: bool,
    /// Time allowed for the server to start responding.
    pub connect_timeout: Duration,
    /// Send `Last-Event-ID` on reconnect.
    pub resume: bool,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Longest line accepted from the server before the stream is failed.
    pub max_line_length: usize,
}

impl Default for SseOptions {
    fn default() -> Self {
        Self {
            event_name: None,
            reconnect: true,
            reconnect_interval: Duration::from_millis(3000),
            max_reconnect_attempts: 10,
            max_reconnect_delay: None,
            jitter: false,
            connect_timeout: Duration::from_secs(30),
            resume: true,
            headers: Vec::new(),
            max_line_length: DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl SseOptions {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            enabled: self.reconnect,
            base_interval: self.reconnect_interval,
            max_attempts: self.max_reconnect_attempts,
            max_delay: self.max_reconnect_delay,
            jitter: self.jitter,
        }
    }
}

// ─── SseHandlers ─────────────────────────────────────────────────────────────

type MessageFn<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&SseError) + Send + Sync>;
type NotifyFn = Arc<dyn Fn() + Send + Sync>;

/// Optional lifecycle callbacks.
///
/// They run on the client's background task, never while the client's state
/// lock is held. No callback of a connection starts after `disconnect()` or
/// `reconnect()` has returned; those calls wait for an in-flight callback to
/// finish, so a callback must not call them itself.
pub struct SseHandlers<T> {
    message: Option<MessageFn<T>>,
    error: Option<ErrorFn>,
    open: Option<NotifyFn>,
    close: Option<NotifyFn>,
}

impl<T> SseHandlers<T> {
    pub fn new() -> Self {
        Self {
            message: None,
            error: None,
            open: None,
            close: None,
        }
    }

    pub fn on_message(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.message = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&SseError) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.open = Some(Arc::new(f));
        self
    }

    pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.close = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_message(&self, payload: &T) {
        if let Some(f) = &self.message {
            f(payload);
        }
    }

    pub(crate) fn emit_error(&self, error: &SseError) {
        if let Some(f) = &self.error {
            f(error);
        }
    }

    pub(crate) fn emit_open(&self) {
        if let Some(f) = &self.open {
            f();
        }
    }

    pub(crate) fn emit_close(&self) {
        if let Some(f) = &self.close {
            f();
        }
    }
}

impl<T> Default for SseHandlers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SseHandlers<T> {
    fn clone(&self) -> Self {
        Self {
            message: self.message.clone(),
            error: self.error.clone(),
            open: self.open.clone(),
            close: self.close.clone(),
        }
    }
}

impl<T> std::fmt::Debug for SseHandlers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseHandlers")
            .field("on_message", &self.message.is_some())
            .field("on_error", &self.error.is_some())
            .field("on_open", &self.open.is_some())
            .field("on_close", &self.close.is_some())
            .finish()
    }
}
