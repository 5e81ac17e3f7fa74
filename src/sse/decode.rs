//! Turning dispatched frames into typed payloads.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::SseError;
use crate::sse::parse::{SseFrame, DEFAULT_EVENT};

/// Selects which event channels a client listens to and decodes their payloads.
///
/// Frames on channels the decoder does not accept are ignored. A decode error
/// drops that one frame; it never affects the connection.
pub trait EventDecoder: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    fn accepts(&self, event: &str) -> bool;

    fn decode(&self, frame: &SseFrame) -> Result<Self::Output, SseError>;

    /// Switch to a single named channel. Returns `false` if this decoder's
    /// channels are fixed.
    fn listen_to(&mut self, _event_name: &str) -> bool {
        false
    }
}

/// Decodes JSON payloads from a single channel.
///
/// Listens to the default `message` channel unless an event name is given.
pub struct JsonDecoder<T> {
    event_name: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            event_name: None,
            _marker: PhantomData,
        }
    }

    pub fn for_event(event_name: impl Into<String>) -> Self {
        Self {
            event_name: Some(event_name.into()),
            _marker: PhantomData,
        }
    }

    pub fn event_name(&self) -> &str {
        self.event_name.as_deref().unwrap_or(DEFAULT_EVENT)
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("event_name", &self.event_name())
            .finish()
    }
}

impl<T> EventDecoder for JsonDecoder<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Output = T;

    fn accepts(&self, event: &str) -> bool {
        event == self.event_name()
    }

    fn decode(&self, frame: &SseFrame) -> Result<T, SseError> {
        Ok(serde_json::from_str(&frame.data)?)
    }

    fn listen_to(&mut self, event_name: &str) -> bool {
        self.event_name = Some(event_name.to_string());
        true
    }
}
