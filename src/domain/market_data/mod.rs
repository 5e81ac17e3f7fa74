//! Market-data domain — price ticks, bounded history, derived stats.

pub mod client;
pub mod state;
pub mod wire;

use crate::shared::Symbol;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use client::{MarketDataFeed, MarketDataOptions};
pub use state::{MarketDataState, DEFAULT_MAX_HISTORY};
pub use wire::{Heartbeat, MarketEvent, MarketEventDecoder};

/// One price tick for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataPoint {
    pub symbol: Symbol,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: f64,
    pub bid: f64,
    pub ask: f64,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl MarketDataPoint {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

/// Lowest and highest price over a history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Statistics derived from the current history. All zero when empty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub total_data_points: usize,
    pub average_price: f64,
    pub price_range: PriceRange,
}

impl MarketStats {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a MarketDataPoint>) -> Self {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        for point in points {
            count += 1;
            sum += point.price;
            min = min.min(point.price);
            max = max.max(point.price);
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            total_data_points: count,
            average_price: sum / count as f64,
            price_range: PriceRange { min, max },
        }
    }
}

/// Named channels on the market-data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Price,
    Heartbeat,
    Connected,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Price,
        EventKind::Heartbeat,
        EventKind::Connected,
        EventKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Price => "price",
            EventKind::Heartbeat => "heartbeat",
            EventKind::Connected => "connected",
            EventKind::Error => "error",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-channel receive counters. Only ever incremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventCounts {
    pub price: u64,
    pub heartbeat: u64,
    pub connected: u64,
    pub error: u64,
}

impl EventCounts {
    pub fn get(&self, kind: EventKind) -> u64 {
        match kind {
            EventKind::Price => self.price,
            EventKind::Heartbeat => self.heartbeat,
            EventKind::Connected => self.connected,
            EventKind::Error => self.error,
        }
    }

    pub fn total(&self) -> u64 {
        self.price + self.heartbeat + self.connected + self.error
    }

    pub(crate) fn record(&mut self, kind: EventKind) {
        let slot = match kind {
            EventKind::Price => &mut self.price,
            EventKind::Heartbeat => &mut self.heartbeat,
            EventKind::Connected => &mut self.connected,
            EventKind::Error => &mut self.error,
        };
        *slot = slot.saturating_add(1);
    }
}
