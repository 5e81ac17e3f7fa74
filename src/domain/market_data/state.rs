//! Market-data state container — app-owned, SDK-provided update logic.

use std::collections::{HashSet, VecDeque};

use super::wire::{Heartbeat, MarketEvent};
use super::{EventCounts, MarketDataPoint, MarketStats};
use crate::shared::Symbol;

pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Aggregates decoded market events into latest tick, bounded history,
/// and per-channel counters.
///
/// History is kept in arrival order; once `max_history` is reached the
/// oldest point is evicted first.
#[derive(Debug, Clone)]
pub struct MarketDataState {
    max_history: usize,
    symbols: Option<HashSet<Symbol>>,
    latest: Option<MarketDataPoint>,
    history: VecDeque<MarketDataPoint>,
    event_counts: EventCounts,
    last_heartbeat: Option<Heartbeat>,
    last_server_error: Option<serde_json::Value>,
}

impl Default for MarketDataState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl MarketDataState {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            symbols: None,
            latest: None,
            history: VecDeque::with_capacity(max_history.min(DEFAULT_MAX_HISTORY)),
            event_counts: EventCounts::default(),
            last_heartbeat: None,
            last_server_error: None,
        }
    }

    /// Only keep points whose symbol is in `symbols`.
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        self.symbols = Some(symbols.into_iter().map(Into::into).collect());
        self
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, event: &MarketEvent) {
        self.event_counts.record(event.kind());

        match event {
            MarketEvent::Price(point) => self.push(point.clone()),
            MarketEvent::Heartbeat(hb) => self.last_heartbeat = Some(*hb),
            MarketEvent::Connected(info) => {
                tracing::debug!("Market stream acknowledged connection: {}", info);
            }
            MarketEvent::Error(payload) => {
                tracing::warn!("Market stream reported error: {}", payload);
                self.last_server_error = Some(payload.clone());
            }
        }
    }

    /// Push a price point, subject to the symbol filter and history cap.
    pub fn push(&mut self, point: MarketDataPoint) {
        if !self.is_tracked(&point.symbol) {
            tracing::trace!("Ignoring untracked symbol: {}", point.symbol);
            return;
        }

        if self.max_history > 0 {
            while self.history.len() >= self.max_history {
                self.history.pop_front();
            }
            self.history.push_back(point.clone());
        }
        self.latest = Some(point);
    }

    pub fn is_tracked(&self, symbol: &Symbol) -> bool {
        self.symbols
            .as_ref()
            .map(|allowed| allowed.contains(symbol))
            .unwrap_or(true)
    }

    /// Empty the history. Latest tick and counters are kept.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn latest_data(&self) -> Option<&MarketDataPoint> {
        self.latest.as_ref()
    }

    pub fn data_history(&self) -> &VecDeque<MarketDataPoint> {
        &self.history
    }

    pub fn stats(&self) -> MarketStats {
        MarketStats::from_points(&self.history)
    }

    pub fn event_counts(&self) -> EventCounts {
        self.event_counts
    }

    pub fn last_heartbeat(&self) -> Option<Heartbeat> {
        self.last_heartbeat
    }

    pub fn last_server_error(&self) -> Option<&serde_json::Value> {
        self.last_server_error.as_ref()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn symbols(&self) -> Option<&HashSet<Symbol>> {
        self.symbols.as_ref()
    }
}
