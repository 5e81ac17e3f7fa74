//! Live market-data feed demo.
//!
//! Connects to a market-data event stream, prints each tick, and reports
//! rolling stats every few seconds until Ctrl-C.
//!
//! ```bash
//! TICKSTREAM_URL=http://localhost:3000/api/sse/market-data \
//! TICKSTREAM_SYMBOLS=BTCUSDT,ETHUSDT \
//! RUST_LOG=info,tickstream_sdk=debug \
//! cargo run --example market_feed --features native
//! ```

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use tickstream_sdk::network::{STREAM_SYMBOLS_ENV, STREAM_URL_ENV};
use tickstream_sdk::prelude::*;

#[tokio::main]
async fn main() -> Result<(), SdkError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::var(STREAM_URL_ENV).unwrap_or_else(|_| DEFAULT_STREAM_URL.to_string());
    let symbols = std::env::var(STREAM_SYMBOLS_ENV)
        .ok()
        .map(|s| parse_symbol_list(&s))
        .transpose()?;

    let handlers = SseHandlers::new()
        .on_open(|| tracing::info!("stream open"))
        .on_close(|| tracing::warn!("stream closed"))
        .on_error(|e| tracing::warn!("stream error: {e}"))
        .on_message(|event: &MarketEvent| {
            if let MarketEvent::Price(p) = event {
                println!(
                    "{:<10} {:>12.2} {:>+8.2}% bid {:.2} ask {:.2}",
                    p.symbol, p.price, p.change_percent, p.bid, p.ask
                );
            }
        });

    let mut feed = MarketDataFeed::new(
        url,
        MarketDataOptions {
            max_history: 50,
            symbols,
            handlers,
            ..Default::default()
        },
    );
    feed.connect()?;

    let mut report = tokio::time::interval(Duration::from_secs(10));
    loop {
        tokio::select! {
            _ = report.tick() => {
                println!(
                    "[{}] stats {} | events {}",
                    feed.connection_state(),
                    serde_json::to_string(&feed.stats())?,
                    serde_json::to_string(&feed.event_counts())?,
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    feed.disconnect();
    Ok(())
}
