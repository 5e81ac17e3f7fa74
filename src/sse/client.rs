//! Reconnecting event-stream client.
//!
//! Full implementation with:
//! - Background tokio task per client for connection management
//! - Exponential backoff reconnection up to a configurable ceiling
//! - `Last-Event-ID` tracking + resend on reconnect
//! - Channel filtering and payload decoding via [`EventDecoder`]
//! - Synchronous `disconnect()` that no stale timer can outlive
//!
//! Every state transition made by the background task happens under the
//! client's state lock and first checks the connection generation. `connect`,
//! `disconnect` and `reconnect` bump the generation under the same lock, so
//! once `disconnect()` returns the superseded task can no longer touch state
//! or open a connection, even if it has not been polled since the abort.
//!
//! Callbacks run under a separate dispatch gate, after a second generation
//! check. Bumping the generation also takes the gate, so `disconnect()` waits
//! out a callback already in flight and no later callback can start.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{SseError, SseResult};
use crate::sse::decode::EventDecoder;
use crate::sse::parse::{EventParser, FrameStream, SseFrame};
use crate::sse::state::{ClientState, ConnectionMachine, ConnectionState, ErrorAction};
use crate::sse::transport::{ByteStream, OpenRequest, Transport};
use crate::sse::{SseHandlers, SseOptions};

#[cfg(feature = "http")]
use crate::sse::{decode::JsonDecoder, http::HttpTransport};

// ─── Shared state ────────────────────────────────────────────────────────────

struct Shared<T> {
    machine: ConnectionMachine<T>,
    generation: u64,
}

struct Inner<D: EventDecoder, Tr> {
    url: String,
    options: SseOptions,
    decoder: D,
    transport: Tr,
    handlers: SseHandlers<D::Output>,
    shared: Mutex<Shared<D::Output>>,
    /// Held while a callback runs; lock order is `dispatch` then `shared`.
    dispatch: Mutex<()>,
    state_tx: watch::Sender<ConnectionState>,
}

/// How a connected stream stopped.
enum StreamEnd {
    Failed(SseError),
    Superseded,
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Builder for [`SseClient`].
pub struct SseClientBuilder<T> {
    url: String,
    options: SseOptions,
    handlers: SseHandlers<T>,
}

impl<T> SseClientBuilder<T> {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: SseOptions::default(),
            handlers: SseHandlers::new(),
        }
    }

    pub fn options(mut self, options: SseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn handlers(mut self, handlers: SseHandlers<T>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn on_message(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.handlers = self.handlers.on_message(f);
        self
    }

    pub fn on_error(mut self, f: impl Fn(&SseError) + Send + Sync + 'static) -> Self {
        self.handlers = self.handlers.on_error(f);
        self
    }

    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.handlers = self.handlers.on_open(f);
        self
    }

    pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.handlers = self.handlers.on_close(f);
        self
    }

    /// Finish the client. `options.event_name`, when set, is applied to the
    /// decoder; decoders with fixed channels keep their own.
    pub fn build<D, Tr>(self, mut decoder: D, transport: Tr) -> SseClient<D, Tr>
    where
        T: Clone + Send + Sync + 'static,
        D: EventDecoder<Output = T>,
        Tr: Transport,
    {
        if let Some(name) = &self.options.event_name {
            if !decoder.listen_to(name) {
                tracing::warn!("Decoder has fixed channels, ignoring event_name '{}'", name);
            }
        }

        let policy = self.options.reconnect_policy();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        SseClient {
            inner: Arc::new(Inner {
                url: self.url,
                options: self.options,
                decoder,
                transport,
                handlers: self.handlers,
                shared: Mutex::new(Shared {
                    machine: ConnectionMachine::new(policy),
                    generation: 0,
                }),
                dispatch: Mutex::new(()),
                state_tx,
            }),
            task_handle: None,
        }
    }
}

#[cfg(feature = "http")]
impl<T> SseClientBuilder<T>
where
    T: serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// JSON payloads on `options.event_name` (or `message`) over HTTP.
    pub fn build_json(self) -> SseClient<JsonDecoder<T>, HttpTransport> {
        self.build(JsonDecoder::new(), HttpTransport::new())
    }
}

// ─── Public SseClient ────────────────────────────────────────────────────────

/// Reconnecting server-sent-events client.
///
/// # Example
///
/// ```ignore
/// use tickstream_sdk::sse::{SseClientBuilder, SseOptions};
///
/// let mut client = SseClientBuilder::<serde_json::Value>::new("http://localhost:3000/events")
///     .options(SseOptions { event_name: Some("price".into()), ..Default::default() })
///     .on_message(|v| println!("{v}"))
///     .build_json();
///
/// client.connect()?;
/// // ...
/// client.disconnect();
/// ```
pub struct SseClient<D: EventDecoder, Tr: Transport> {
    inner: Arc<Inner<D, Tr>>,
    task_handle: Option<JoinHandle<()>>,
}

impl<D: EventDecoder, Tr: Transport> SseClient<D, Tr> {
    pub fn new(url: impl Into<String>, options: SseOptions, decoder: D, transport: Tr) -> Self {
        SseClientBuilder::new(url).options(options).build(decoder, transport)
    }

    pub fn builder(url: impl Into<String>) -> SseClientBuilder<D::Output> {
        SseClientBuilder::new(url)
    }

    /// Open the stream.
    ///
    /// No-op unless the client is `Disconnected` (it is already connected,
    /// connecting, or waiting out a backoff delay). Starting from a closed
    /// client begins a fresh retry cycle.
    pub fn connect(&mut self) -> SseResult<()> {
        if self.is_active() {
            tracing::debug!("Already connected or connecting, skipping");
            return Ok(());
        }
        self.spawn_fresh()
    }

    /// Close the stream and cancel any pending reconnect.
    ///
    /// Synchronous and idempotent: `on_close` fires only if the client was
    /// not already closed.
    pub fn disconnect(&mut self) {
        let closed = {
            let _gate = self.inner.dispatch.lock();
            let mut shared = self.inner.shared.lock();
            shared.generation += 1;
            let closed = shared.machine.on_close();
            self.inner.publish(&shared.machine);
            closed
        };

        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }

        if closed {
            tracing::info!("Event stream closed by caller: {}", self.inner.url);
            self.inner.handlers.emit_close();
        }
    }

    /// Force a fresh connection attempt.
    ///
    /// Tears down the current connection or pending retry, resets the
    /// reconnect counter, and starts a new connection task.
    pub fn reconnect(&mut self) -> SseResult<()> {
        tracing::info!("Manual reconnection requested");
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
        self.spawn_fresh()
    }

    /// Snapshot of the client's observable state.
    pub fn state(&self) -> ClientState<D::Output> {
        self.inner.shared.lock().machine.state().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.shared.lock().machine.connection_state()
    }

    /// Most recent decoded payload.
    pub fn data(&self) -> Option<D::Output> {
        self.inner.shared.lock().machine.state().data.clone()
    }

    /// Most recent transport error.
    pub fn error(&self) -> Option<SseError> {
        self.inner.shared.lock().machine.state().error.clone()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.shared.lock().machine.state().reconnect_attempts
    }

    pub fn last_event_id(&self) -> Option<String> {
        self.inner.shared.lock().machine.state().last_event_id.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    /// Subscribe to connection-state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn options(&self) -> &SseOptions {
        &self.inner.options
    }

    fn is_active(&self) -> bool {
        let running = self
            .task_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false);
        running && self.connection_state() != ConnectionState::Disconnected
    }

    fn spawn_fresh(&mut self) -> SseResult<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SseError::NoRuntime)?;

        let generation = {
            let _gate = self.inner.dispatch.lock();
            let mut shared = self.inner.shared.lock();
            shared.generation += 1;
            shared.machine.reset_attempts();
            shared.machine.on_connecting();
            self.inner.publish(&shared.machine);
            shared.generation
        };

        tracing::info!("Connecting to event stream: {}", self.inner.url);
        let handle = runtime.spawn(run_task(Arc::clone(&self.inner), generation));
        self.task_handle = Some(handle);
        Ok(())
    }
}

impl<D: EventDecoder, Tr: Transport> Drop for SseClient<D, Tr> {
    fn drop(&mut self) {
        {
            let _gate = self.inner.dispatch.lock();
            self.inner.shared.lock().generation += 1;
        }
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

// ─── Transitions (task side) ─────────────────────────────────────────────────

impl<D: EventDecoder, Tr: Transport> Inner<D, Tr> {
    fn publish(&self, machine: &ConnectionMachine<D::Output>) {
        let current = machine.connection_state();
        self.state_tx.send_if_modified(|state| {
            if *state == current {
                false
            } else {
                *state = current;
                true
            }
        });
    }

    /// Run callbacks unless `generation` was superseded; `false` if it was.
    fn emit_if_current(&self, generation: u64, emit: impl FnOnce()) -> bool {
        let _gate = self.dispatch.lock();
        if self.shared.lock().generation != generation {
            return false;
        }
        emit();
        true
    }

    /// Start the next attempt; `None` if superseded.
    ///
    /// The transport is asked to open under the state lock, so no attempt
    /// starts once `disconnect()` has bumped the generation.
    fn begin_attempt(&self, generation: u64) -> Option<BoxFuture<'static, SseResult<ByteStream>>> {
        let shared = self.shared.lock();
        if shared.generation != generation {
            return None;
        }
        let request = OpenRequest {
            url: self.url.clone(),
            last_event_id: if self.options.resume {
                shared.machine.state().last_event_id.clone()
            } else {
                None
            },
            headers: self.options.headers.clone(),
        };
        Some(self.transport.open(request))
    }

    fn opened(&self, generation: u64) -> bool {
        {
            let mut shared = self.shared.lock();
            if shared.generation != generation {
                return false;
            }
            shared.machine.on_open();
            self.publish(&shared.machine);
        }
        tracing::info!("Event stream connected: {}", self.url);
        self.emit_if_current(generation, || self.handlers.emit_open())
    }

    /// Route one frame; `false` if superseded.
    fn deliver(&self, generation: u64, frame: SseFrame) -> bool {
        if let Some(retry) = frame.retry {
            tracing::debug!(
                "Server suggested retry of {}ms; client backoff policy applies",
                retry.as_millis()
            );
        }

        let decoded = self
            .decoder
            .accepts(&frame.event)
            .then(|| self.decoder.decode(&frame));

        let payload = {
            let mut shared = self.shared.lock();
            if shared.generation != generation {
                return false;
            }
            shared.machine.on_event_id(frame.id.clone());
            match decoded {
                Some(Ok(payload)) => {
                    shared.machine.on_message(payload.clone());
                    Some(payload)
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        "Dropping malformed '{}' event: {} (raw: {})",
                        frame.event,
                        e,
                        frame.data
                    );
                    None
                }
                None => {
                    tracing::trace!("Ignoring event on unsubscribed channel: {}", frame.event);
                    None
                }
            }
        };

        match payload {
            Some(payload) => {
                self.emit_if_current(generation, || self.handlers.emit_message(&payload))
            }
            None => true,
        }
    }

    /// Record a transport failure; `None` if superseded.
    fn failed(&self, generation: u64, error: SseError) -> Option<ErrorAction> {
        let action = {
            let mut shared = self.shared.lock();
            if shared.generation != generation {
                return None;
            }
            let action = shared.machine.on_error(error.clone());
            self.publish(&shared.machine);
            action
        };

        tracing::error!("Event stream error: {}", error);
        if action == ErrorAction::GiveUp && self.options.reconnect {
            tracing::warn!(
                "Max reconnection attempts ({}) reached",
                self.options.max_reconnect_attempts
            );
        }

        let current = self.emit_if_current(generation, || {
            self.handlers.emit_error(&error);
            if action == ErrorAction::GiveUp {
                self.handlers.emit_close();
            }
        });
        current.then_some(action)
    }

    /// A backoff delay elapsed; `false` if superseded.
    fn retry(&self, generation: u64) -> bool {
        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return false;
        }
        shared.machine.on_retry();
        self.publish(&shared.machine);
        true
    }

    async fn consume(&self, generation: u64, body: ByteStream) -> StreamEnd {
        let resume_from = self.shared.lock().machine.state().last_event_id.clone();
        let parser =
            EventParser::resuming(resume_from).with_max_line_len(self.options.max_line_length);
        let mut frames = FrameStream::with_parser(body, parser);

        while let Some(item) = frames.next().await {
            match item {
                Ok(frame) => {
                    if !self.deliver(generation, frame) {
                        return StreamEnd::Superseded;
                    }
                }
                Err(e) => return StreamEnd::Failed(e),
            }
        }
        StreamEnd::Failed(SseError::StreamEnded)
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_task<D: EventDecoder, Tr: Transport>(inner: Arc<Inner<D, Tr>>, generation: u64) {
    loop {
        // ── 1. Attempt connection ────────────────────────────────────────
        let Some(open) = inner.begin_attempt(generation) else {
            return;
        };

        let timeout = inner.options.connect_timeout;
        let opened = tokio::time::timeout(timeout, open)
            .await
            .unwrap_or_else(|_| Err(SseError::Timeout(timeout.as_millis() as u64)));

        // ── 2. Connected: read until the stream breaks ───────────────────
        let error = match opened {
            Ok(body) => {
                if !inner.opened(generation) {
                    return;
                }
                match inner.consume(generation, body).await {
                    StreamEnd::Failed(e) => e,
                    StreamEnd::Superseded => return,
                }
            }
            Err(e) => e,
        };

        // ── 3. Post-disconnect decision ──────────────────────────────────
        match inner.failed(generation, error) {
            Some(ErrorAction::Retry { delay, attempt }) => {
                tracing::info!(
                    "Reconnect attempt {}/{} in {}ms",
                    attempt,
                    inner.options.max_reconnect_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                if !inner.retry(generation) {
                    return;
                }
            }
            Some(ErrorAction::GiveUp) | None => return,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::decode::JsonDecoder;

    struct NeverTransport;

    impl Transport for NeverTransport {
        fn open(&self, _: OpenRequest) -> BoxFuture<'static, Result<ByteStream, SseError>> {
            Box::pin(futures_util::future::pending())
        }
    }

    fn client() -> SseClient<JsonDecoder<u32>, NeverTransport> {
        SseClient::new(
            "http://localhost/stream",
            SseOptions::default(),
            JsonDecoder::new(),
            NeverTransport,
        )
    }

    #[test]
    fn test_new_client_is_disconnected() {
        let c = client();
        assert_eq!(c.connection_state(), ConnectionState::Disconnected);
        assert_eq!(c.reconnect_attempts(), 0);
        assert!(c.data().is_none());
        assert!(c.task_handle.is_none());
    }

    #[test]
    fn test_connect_without_runtime_errors() {
        let mut c = client();
        assert_eq!(c.connect(), Err(SseError::NoRuntime));
        assert_eq!(c.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_disconnect_when_never_connected_is_quiet() {
        let closes = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let seen = Arc::clone(&closes);
        let mut c = SseClientBuilder::new("http://localhost/stream")
            .on_close(move || {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            })
            .build(JsonDecoder::<u32>::new(), NeverTransport);
        c.disconnect();
        c.disconnect();
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_build_applies_event_name_to_decoder() {
        let c = SseClient::new(
            "http://localhost/stream",
            SseOptions {
                event_name: Some("price".into()),
                ..SseOptions::default()
            },
            JsonDecoder::<u32>::new(),
            NeverTransport,
        );
        assert!(c.inner.decoder.accepts("price"));
        assert!(!c.inner.decoder.accepts("message"));
        assert_eq!(c.options().event_name.as_deref(), Some("price"));
    }

    #[test]
    fn test_builder_without_event_name_listens_to_message() {
        let c = SseClient::<JsonDecoder<u32>, NeverTransport>::builder("http://localhost/stream")
            .build(JsonDecoder::new(), NeverTransport);
        assert_eq!(c.inner.decoder.event_name(), "message");
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_build_json_uses_event_name() {
        let c = SseClientBuilder::<u32>::new("http://localhost/stream")
            .options(SseOptions {
                event_name: Some("price".into()),
                ..SseOptions::default()
            })
            .build_json();
        assert_eq!(c.inner.decoder.event_name(), "price");
        assert_eq!(c.url(), "http://localhost/stream");
        assert_eq!(c.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_is_idempotent_while_active() {
        let mut c = client();
        c.connect().unwrap();
        let generation = c.inner.shared.lock().generation;
        c.connect().unwrap();
        assert_eq!(c.inner.shared.lock().generation, generation);
        assert_eq!(c.connection_state(), ConnectionState::Connecting);
        c.disconnect();
        assert_eq!(c.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_watch_state_tracks_transitions() {
        let mut c = client();
        let rx = c.watch_state();
        assert_eq!(*rx.borrow(), ConnectionState::Disconnected);
        c.connect().unwrap();
        assert_eq!(*rx.borrow(), ConnectionState::Connecting);
        c.disconnect();
        assert_eq!(*rx.borrow(), ConnectionState::Disconnected);
    }
}
