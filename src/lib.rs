//! # Tickstream SDK
//!
//! Reconnecting server-sent-events client with a market-data aggregation
//! layer on top.
//!
//! ## Architecture
//!
//! The SDK is organized in layers:
//!
//! 1. **Core** — Shared newtypes, errors, network constants
//! 2. **Event stream** — SSE parser, transport seam (`reqwest` behind `http`),
//!    backoff policy, connection state machine, `SseClient`
//! 3. **Domain** — `MarketDataFeed`: price ticks, bounded history, stats
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tickstream_sdk::prelude::*;
//!
//! let mut feed = MarketDataFeed::new(DEFAULT_STREAM_URL, MarketDataOptions::default());
//! feed.connect()?;
//!
//! let stats = feed.stats();
//! println!("{} points, avg {}", stats.total_data_points, stats.average_price);
//! ```

// ── Layer 1: Core ────────────────────────────────────────────────────────────

/// Shared newtypes used across all domains.
pub mod shared;

/// Unified SDK error types.
pub mod error;

/// Network URL constants.
pub mod network;

// ── Layer 2: Event stream ────────────────────────────────────────────────────

/// Server-sent-events client: parsing, transport, reconnection.
pub mod sse;

// ── Layer 3: Domain ──────────────────────────────────────────────────────────

/// Domain modules (vertical slices): types, wire types, state, feeds.
pub mod domain;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    // Shared newtypes
    pub use crate::shared::{parse_symbol_list, Symbol};

    // Market data
    pub use crate::domain::market_data::{
        EventCounts, EventKind, Heartbeat, MarketDataFeed, MarketDataOptions, MarketDataPoint,
        MarketDataState, MarketEvent, MarketEventDecoder, MarketStats, PriceRange,
    };

    // Event stream
    pub use crate::sse::{
        ClientState, ConnectionState, EventDecoder, JsonDecoder, ReconnectPolicy, SseClient,
        SseClientBuilder, SseFrame, SseHandlers, SseOptions, Transport,
    };
    #[cfg(feature = "http")]
    pub use crate::sse::HttpTransport;

    // Errors
    pub use crate::error::{SdkError, SseError, SseResult};

    // Network
    pub use crate::network::DEFAULT_STREAM_URL;
}
