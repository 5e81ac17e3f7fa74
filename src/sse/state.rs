//! Connection state container with named transitions.
//!
//! All mutations of a client's observable state go through
//! [`ConnectionMachine`]. The machine is synchronous and owns no I/O, so the
//! client's background task (or a test) decides when each transition happens.

use std::time::Duration;

use crate::error::SseError;
use crate::sse::backoff::ReconnectPolicy;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    Connecting,
    Connected,
    #[default]
    Disconnected,
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Read-only snapshot of a client's state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientState<T> {
    /// Most recent decoded payload.
    pub data: Option<T>,
    pub connection_state: ConnectionState,
    /// Most recent transport error; cleared on a successful open.
    pub error: Option<SseError>,
    /// Automatic retries since the last successful open.
    pub reconnect_attempts: u32,
    /// Last `id:` seen on the stream, re-sent as `Last-Event-ID` on reconnect.
    pub last_event_id: Option<String>,
}

impl<T> Default for ClientState<T> {
    fn default() -> Self {
        Self {
            data: None,
            connection_state: ConnectionState::Disconnected,
            error: None,
            reconnect_attempts: 0,
            last_event_id: None,
        }
    }
}

/// What the driver must do after a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Wait `delay`, then call [`ConnectionMachine::on_retry`] and reconnect.
    Retry { delay: Duration, attempt: u32 },
    /// Retries exhausted or disabled; the connection is now closed.
    GiveUp,
}

/// State machine behind [`SseClient`](crate::sse::client::SseClient).
#[derive(Debug, Clone)]
pub struct ConnectionMachine<T> {
    policy: ReconnectPolicy,
    state: ClientState<T>,
}

impl<T> ConnectionMachine<T> {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ClientState::default(),
        }
    }

    pub fn state(&self) -> &ClientState<T> {
        &self.state
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state.connection_state
    }

    /// A connection attempt is starting.
    pub fn on_connecting(&mut self) {
        self.state.connection_state = ConnectionState::Connecting;
    }

    /// The stream opened successfully.
    pub fn on_open(&mut self) {
        self.state.connection_state = ConnectionState::Connected;
        self.state.error = None;
        self.state.reconnect_attempts = 0;
    }

    /// A payload was decoded.
    pub fn on_message(&mut self, data: T) {
        self.state.data = Some(data);
    }

    /// Last event ID in effect for the frame just dispatched. `None` after
    /// the server reset it with an empty `id:` field.
    pub fn on_event_id(&mut self, id: Option<String>) {
        self.state.last_event_id = id;
    }

    /// The connection failed or dropped.
    pub fn on_error(&mut self, error: SseError) -> ErrorAction {
        self.state.connection_state = ConnectionState::Error;
        self.state.error = Some(error);

        let attempts = self.state.reconnect_attempts;
        if self.policy.should_retry(attempts) {
            ErrorAction::Retry {
                delay: self.policy.delay_for_attempt(attempts),
                attempt: attempts + 1,
            }
        } else {
            self.state.connection_state = ConnectionState::Disconnected;
            ErrorAction::GiveUp
        }
    }

    /// A scheduled retry fired.
    pub fn on_retry(&mut self) {
        self.state.reconnect_attempts += 1;
        self.state.connection_state = ConnectionState::Connecting;
    }

    /// The caller closed the connection. Returns `false` if it was already closed.
    pub fn on_close(&mut self) -> bool {
        let was_open = self.state.connection_state != ConnectionState::Disconnected;
        self.state.connection_state = ConnectionState::Disconnected;
        was_open
    }

    /// Start a fresh retry cycle (manual reconnect).
    pub fn reset_attempts(&mut self) {
        self.state.reconnect_attempts = 0;
    }
}
