//! Market-data feed — one reconnecting stream feeding a shared aggregator.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::state::{MarketDataState, DEFAULT_MAX_HISTORY};
use super::wire::{Heartbeat, MarketEvent, MarketEventDecoder};
use super::{EventCounts, MarketDataPoint, MarketStats};
use crate::error::{SseError, SseResult};
use crate::shared::Symbol;
use crate::sse::{ConnectionState, SseClient, SseClientBuilder, SseHandlers, SseOptions, Transport};

#[cfg(feature = "http")]
use crate::sse::HttpTransport;

/// Configuration for [`MarketDataFeed`].
#[derive(Debug, Clone)]
pub struct MarketDataOptions {
    pub max_history: usize,
    /// Allow-list of symbols. `None` keeps every symbol.
    pub symbols: Option<Vec<Symbol>>,
    pub sse: SseOptions,
    /// Caller callbacks. `on_message` sees every decoded event after the
    /// feed's state has been updated.
    pub handlers: SseHandlers<MarketEvent>,
}

impl Default for MarketDataOptions {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            symbols: None,
            sse: SseOptions::default(),
            handlers: SseHandlers::new(),
        }
    }
}

impl MarketDataOptions {
    fn initial_state(&self) -> MarketDataState {
        let state = MarketDataState::new(self.max_history);
        match &self.symbols {
            Some(symbols) => state.with_symbols(symbols.iter().cloned()),
            None => state,
        }
    }
}

/// Live market data over a reconnecting event stream.
///
/// # Example
///
/// ```ignore
/// use tickstream_sdk::prelude::*;
///
/// let mut feed = MarketDataFeed::new(
///     "http://localhost:3000/api/sse/market-data",
///     MarketDataOptions { max_history: 50, ..Default::default() },
/// );
/// feed.connect()?;
///
/// if let Some(tick) = feed.latest_data() {
///     println!("{} {}", tick.symbol, tick.price);
/// }
/// println!("avg {}", feed.stats().average_price);
/// ```
pub struct MarketDataFeed<Tr: Transport> {
    client: SseClient<MarketEventDecoder, Tr>,
    state: Arc<Mutex<MarketDataState>>,
}

#[cfg(feature = "http")]
impl MarketDataFeed<HttpTransport> {
    pub fn new(url: impl Into<String>, options: MarketDataOptions) -> Self {
        Self::with_transport(url, options, HttpTransport::new())
    }
}

impl<Tr: Transport> MarketDataFeed<Tr> {
    pub fn with_transport(url: impl Into<String>, options: MarketDataOptions, transport: Tr) -> Self {
        let state = Arc::new(Mutex::new(options.initial_state()));

        let user = options.handlers.clone();
        let sink = Arc::clone(&state);
        let handlers = options.handlers.on_message(move |event: &MarketEvent| {
            sink.lock().apply(event);
            user.emit_message(event);
        });

        let client = SseClientBuilder::new(url)
            .options(options.sse)
            .handlers(handlers)
            .build(MarketEventDecoder, transport);

        Self { client, state }
    }

    pub fn connect(&mut self) -> SseResult<()> {
        self.client.connect()
    }

    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }

    pub fn reconnect(&mut self) -> SseResult<()> {
        self.client.reconnect()
    }

    pub fn latest_data(&self) -> Option<MarketDataPoint> {
        self.state.lock().latest_data().cloned()
    }

    /// History in arrival order, oldest first.
    pub fn data_history(&self) -> Vec<MarketDataPoint> {
        self.state.lock().data_history().iter().cloned().collect()
    }

    pub fn stats(&self) -> MarketStats {
        self.state.lock().stats()
    }

    /// Empty the history without touching the connection.
    pub fn clear_history(&self) {
        self.state.lock().clear_history();
    }

    pub fn event_counts(&self) -> EventCounts {
        self.state.lock().event_counts()
    }

    pub fn last_heartbeat(&self) -> Option<Heartbeat> {
        self.state.lock().last_heartbeat()
    }

    pub fn last_server_error(&self) -> Option<serde_json::Value> {
        self.state.lock().last_server_error().cloned()
    }

    /// Copy of the aggregated state.
    pub fn snapshot(&self) -> MarketDataState {
        self.state.lock().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.client.connection_state()
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub fn error(&self) -> Option<SseError> {
        self.client.error()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.client.reconnect_attempts()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.client.watch_state()
    }

    pub fn client(&self) -> &SseClient<MarketEventDecoder, Tr> {
        &self.client
    }
}
