//! Wire types for the market-data stream.

use serde::{Deserialize, Serialize};

use super::{EventKind, MarketDataPoint};
use crate::error::SseError;
use crate::sse::{EventDecoder, SseFrame};

/// Liveness signal. Not user-facing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub timestamp: i64,
}

/// One decoded event from any of the market-data channels.
///
/// Lifecycle payloads (`connected`, `error`) carry free-form JSON; a body
/// that is not JSON is kept as a string.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    Price(MarketDataPoint),
    Heartbeat(Heartbeat),
    Connected(serde_json::Value),
    Error(serde_json::Value),
}

impl MarketEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MarketEvent::Price(_) => EventKind::Price,
            MarketEvent::Heartbeat(_) => EventKind::Heartbeat,
            MarketEvent::Connected(_) => EventKind::Connected,
            MarketEvent::Error(_) => EventKind::Error,
        }
    }
}

/// Decodes `price`, `heartbeat`, `connected` and `error` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketEventDecoder;

impl EventDecoder for MarketEventDecoder {
    type Output = MarketEvent;

    fn accepts(&self, event: &str) -> bool {
        EventKind::from_event_name(event).is_some()
    }

    fn decode(&self, frame: &SseFrame) -> Result<MarketEvent, SseError> {
        let kind = EventKind::from_event_name(&frame.event).ok_or_else(|| {
            SseError::MessageParseError(format!("unexpected event: {}", frame.event))
        })?;

        Ok(match kind {
            EventKind::Price => MarketEvent::Price(serde_json::from_str(&frame.data)?),
            EventKind::Heartbeat => MarketEvent::Heartbeat(serde_json::from_str(&frame.data)?),
            EventKind::Connected => MarketEvent::Connected(lenient_json(&frame.data)),
            EventKind::Error => MarketEvent::Error(lenient_json(&frame.data)),
        })
    }
}

fn lenient_json(data: &str) -> serde_json::Value {
    serde_json::from_str(data).unwrap_or_else(|_| serde_json::Value::String(data.to_string()))
}
