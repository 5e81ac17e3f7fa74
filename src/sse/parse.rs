//! `text/event-stream` parsing.
//!
//! The parser is incremental: byte chunks are pushed as they arrive from the
//! transport and an [`SseFrame`] is dispatched on every blank line. Field
//! handling follows the HTML living standard's event-stream interpretation
//! rules (`event`, `data`, `id`, `retry`, `:` comments, CR/LF/CRLF line ends,
//! leading BOM).

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use pin_project_lite::pin_project;

use crate::error::SseError;

/// Event type used when a block carries no `event:` field.
pub const DEFAULT_EVENT: &str = "message";

/// Longest line the parser buffers before failing the stream.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024 * 1024;

// ─── SseFrame ────────────────────────────────────────────────────────────────

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event type (`"message"` when the server did not name one).
    pub event: String,
    /// Payload; multiple `data:` lines are joined with `\n`.
    pub data: String,
    /// Last event ID in effect when this frame was dispatched.
    pub id: Option<String>,
    /// Reconnection time announced in this block, if any.
    pub retry: Option<Duration>,
}

impl SseFrame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_retry(mut self, retry: Duration) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Serialize to wire format, terminated by a blank line.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if self.event != DEFAULT_EVENT {
            out.push_str("event: ");
            out.push_str(&self.event);
            out.push('\n');
        }
        if let Some(id) = &self.id {
            out.push_str("id: ");
            out.push_str(id);
            out.push('\n');
        }
        if let Some(retry) = self.retry {
            out.push_str(&format!("retry: {}\n", retry.as_millis()));
        }
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

// ─── EventParser ─────────────────────────────────────────────────────────────

/// Incremental event-stream parser for a single connection.
#[derive(Debug)]
pub struct EventParser {
    line: Vec<u8>,
    max_line_len: usize,
    skip_lf: bool,
    started: bool,
    event_type: String,
    data: String,
    last_event_id: Option<String>,
    retry: Option<Duration>,
    reconnection_time: Option<Duration>,
}

impl Default for EventParser {
    fn default() -> Self {
        Self {
            line: Vec::new(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            skip_lf: false,
            started: false,
            event_type: String::new(),
            data: String::new(),
            last_event_id: None,
            retry: None,
            reconnection_time: None,
        }
    }
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap on a single buffered line, in bytes.
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    /// Start with a known last event ID (resuming an earlier stream).
    pub fn resuming(last_event_id: Option<String>) -> Self {
        Self {
            last_event_id,
            ..Self::default()
        }
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Most recent `retry:` value seen on this stream.
    pub fn reconnection_time(&self) -> Option<Duration> {
        self.reconnection_time
    }

    /// Push a chunk of bytes and return any frames it completed.
    ///
    /// Fails with [`SseError::Read`] once a line grows past the configured
    /// maximum without a line terminator; the partial line is discarded.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>, SseError> {
        let mut frames = Vec::new();
        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => self.finish_line(&mut frames),
                b'\r' => {
                    self.finish_line(&mut frames);
                    self.skip_lf = true;
                }
                _ => {
                    if self.line.len() >= self.max_line_len {
                        self.line.clear();
                        return Err(SseError::Read(format!(
                            "line exceeds {} bytes",
                            self.max_line_len
                        )));
                    }
                    self.line.push(byte);
                }
            }
        }
        Ok(frames)
    }

    fn finish_line(&mut self, frames: &mut Vec<SseFrame>) {
        let raw = std::mem::take(&mut self.line);
        let decoded = String::from_utf8_lossy(&raw);
        let mut line: &str = &decoded;
        if !self.started {
            self.started = true;
            line = line.strip_prefix('\u{feff}').unwrap_or(line);
        }
        if let Some(frame) = self.process_line(line) {
            frames.push(frame);
        }
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => self.event_type = value.to_string(),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "id" => {
                if !value.contains('\0') {
                    self.last_event_id = (!value.is_empty()).then(|| value.to_string());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse::<u64>() {
                        let retry = Duration::from_millis(ms);
                        self.retry = Some(retry);
                        self.reconnection_time = Some(retry);
                    }
                }
            }
            other => {
                tracing::debug!("Ignoring unknown SSE field: {}", other);
            }
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event_type = std::mem::take(&mut self.event_type);
        let retry = self.retry.take();
        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }

        Some(SseFrame {
            event: if event_type.is_empty() {
                DEFAULT_EVENT.to_string()
            } else {
                event_type
            },
            data,
            id: self.last_event_id.clone(),
            retry,
        })
    }
}

// ─── FrameStream ─────────────────────────────────────────────────────────────

pin_project! {
    /// Adapts a stream of byte chunks into a stream of [`SseFrame`]s.
    ///
    /// A partially received event is discarded when the inner stream ends.
    pub struct FrameStream<S> {
        #[pin]
        inner: S,
        parser: EventParser,
        ready: VecDeque<SseFrame>,
        done: bool,
    }
}

impl<S> FrameStream<S> {
    pub fn new(inner: S) -> Self {
        Self::with_parser(inner, EventParser::new())
    }

    pub fn with_parser(inner: S, parser: EventParser) -> Self {
        Self {
            inner,
            parser,
            ready: VecDeque::new(),
            done: false,
        }
    }

    pub fn parser(&self) -> &EventParser {
        &self.parser
    }
}

impl<S> Stream for FrameStream<S>
where
    S: Stream<Item = Result<Bytes, SseError>>,
{
    type Item = Result<SseFrame, SseError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(frame) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if *this.done {
                return Poll::Ready(None);
            }
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => match this.parser.feed(&chunk) {
                    Ok(frames) => this.ready.extend(frames),
                    Err(e) => {
                        *this.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => *this.done = true,
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
