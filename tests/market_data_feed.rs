//! End-to-end tests for the market-data feed over a scripted stream.

mod common;

use std::time::Duration;

use tokio::sync::mpsc;

use common::{event, recv, Script, ScriptedTransport};
use tickstream_sdk::prelude::*;

const BTC_TICK: &str = r#"{"symbol":"BTCUSDT","price":65000,"change":120,"changePercent":0.18,"volume":1000,"bid":64995,"ask":65005,"timestamp":1700000000000}"#;

fn tick_json(symbol: &str, price: f64) -> String {
    format!(
        r#"{{"symbol":"{symbol}","price":{price},"change":0,"changePercent":0,"volume":1,"bid":{price},"ask":{price},"timestamp":1700000000000}}"#
    )
}

/// Feed over a live script plus a channel that sees every decoded event.
fn live_feed(
    options: MarketDataOptions,
) -> (
    MarketDataFeed<ScriptedTransport>,
    mpsc::UnboundedSender<Result<bytes::Bytes, SseError>>,
    mpsc::UnboundedReceiver<MarketEvent>,
) {
    let (script, stream) = Script::live();
    let (transport, _opened) = ScriptedTransport::new(vec![script]);
    let (tx, events) = mpsc::unbounded_channel();
    let options = MarketDataOptions {
        handlers: options.handlers.on_message(move |e: &MarketEvent| {
            let _ = tx.send(e.clone());
        }),
        ..options
    };
    let feed = MarketDataFeed::with_transport("http://test/market", options, transport);
    (feed, stream, events)
}

fn send(stream: &mpsc::UnboundedSender<Result<bytes::Bytes, SseError>>, name: &str, data: &str) {
    stream.send(Ok(event(name, data).into())).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_btcusdt_tick_end_to_end() {
    let (mut feed, stream, mut events) = live_feed(MarketDataOptions::default());
    feed.connect().unwrap();

    send(&stream, "connected", r#"{"clientId":"c1"}"#);
    send(&stream, "price", BTC_TICK);
    assert_eq!(recv(&mut events).await.kind(), EventKind::Connected);
    assert_eq!(recv(&mut events).await.kind(), EventKind::Price);

    let expected = MarketDataPoint {
        symbol: Symbol::from("BTCUSDT"),
        price: 65000.0,
        change: 120.0,
        change_percent: 0.18,
        volume: 1000.0,
        bid: 64995.0,
        ask: 65005.0,
        timestamp: 1_700_000_000_000,
    };
    assert_eq!(feed.latest_data(), Some(expected));
    assert_eq!(feed.data_history().len(), 1);
    assert_eq!(feed.stats().average_price, 65000.0);
    assert_eq!(feed.connection_state(), ConnectionState::Connected);

    let counts = feed.event_counts();
    assert_eq!(counts.connected, 1);
    assert_eq!(counts.price, 1);
    feed.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_history_cap_keeps_newest_in_order() {
    let (mut feed, stream, mut events) = live_feed(MarketDataOptions {
        max_history: 2,
        ..Default::default()
    });
    feed.connect().unwrap();

    for price in [10.0, 20.0, 30.0] {
        send(&stream, "price", &tick_json("BTCUSDT", price));
    }
    for _ in 0..3 {
        recv(&mut events).await;
    }

    let prices: Vec<f64> = feed.data_history().iter().map(|p| p.price).collect();
    assert_eq!(prices, [20.0, 30.0]);
    let stats = feed.stats();
    assert_eq!(stats.total_data_points, 2);
    assert_eq!(stats.average_price, 25.0);
    assert_eq!(stats.price_range, PriceRange { min: 20.0, max: 30.0 });
    feed.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_symbol_filter_end_to_end() {
    let (mut feed, stream, mut events) = live_feed(MarketDataOptions {
        symbols: Some(vec![Symbol::from("ETHUSDT")]),
        ..Default::default()
    });
    feed.connect().unwrap();

    send(&stream, "price", &tick_json("BTCUSDT", 65000.0));
    send(&stream, "price", &tick_json("ETHUSDT", 3200.0));
    send(&stream, "price", &tick_json("SOLUSDT", 150.0));
    for _ in 0..3 {
        recv(&mut events).await;
    }

    let history = feed.data_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].symbol.as_str(), "ETHUSDT");
    assert_eq!(feed.latest_data().unwrap().symbol.as_str(), "ETHUSDT");
    assert_eq!(feed.event_counts().price, 3);
    feed.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_malformed_price_leaves_state_unchanged() {
    let (mut feed, stream, mut events) = live_feed(MarketDataOptions::default());
    feed.connect().unwrap();

    send(&stream, "price", r#"{"symbol":"BTCUSDT","price":"#);
    send(&stream, "heartbeat", r#"{"timestamp":1700000005000}"#);
    assert_eq!(recv(&mut events).await.kind(), EventKind::Heartbeat);

    assert_eq!(feed.connection_state(), ConnectionState::Connected);
    assert!(feed.latest_data().is_none());
    assert!(feed.data_history().is_empty());
    assert!(feed.error().is_none());
    assert_eq!(feed.event_counts().price, 0);
    assert_eq!(
        feed.last_heartbeat(),
        Some(Heartbeat {
            timestamp: 1_700_000_005_000
        })
    );
    feed.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_server_error_event_is_recorded_not_fatal() {
    let (mut feed, stream, mut events) = live_feed(MarketDataOptions::default());
    feed.connect().unwrap();

    send(&stream, "error", r#"{"message":"upstream stalled"}"#);
    recv(&mut events).await;

    assert_eq!(feed.connection_state(), ConnectionState::Connected);
    assert_eq!(feed.event_counts().error, 1);
    assert_eq!(
        feed.last_server_error(),
        Some(serde_json::json!({"message": "upstream stalled"}))
    );
    feed.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_clear_history_keeps_connection() {
    let (mut feed, stream, mut events) = live_feed(MarketDataOptions::default());
    feed.connect().unwrap();

    send(&stream, "price", BTC_TICK);
    recv(&mut events).await;
    feed.clear_history();

    assert!(feed.data_history().is_empty());
    assert_eq!(feed.stats(), MarketStats::default());
    assert_eq!(feed.connection_state(), ConnectionState::Connected);
    assert_eq!(feed.event_counts().price, 1);

    send(&stream, "price", BTC_TICK);
    recv(&mut events).await;
    assert_eq!(feed.data_history().len(), 1);
    feed.disconnect();
    assert_eq!(feed.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_state_survives_reconnect() {
    let (transport, mut opened) = ScriptedTransport::new(vec![
        Script::then_end([event("price", BTC_TICK)]),
        Script::idle(),
    ]);
    let mut feed = MarketDataFeed::with_transport(
        "http://test/market",
        MarketDataOptions {
            sse: SseOptions {
                reconnect_interval: Duration::from_millis(50),
                ..SseOptions::default()
            },
            ..Default::default()
        },
        transport,
    );

    feed.connect().unwrap();
    common::next_open(&mut opened).await;
    common::next_open(&mut opened).await;

    let mut state = feed.watch_state();
    tokio::time::timeout(
        common::WAIT,
        state.wait_for(|s| *s == ConnectionState::Connected),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(feed.data_history().len(), 1);
    assert_eq!(feed.reconnect_attempts(), 0);
    feed.disconnect();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_state_is_frozen_once_disconnected() {
    let (mut feed, stream, _events) = live_feed(MarketDataOptions {
        max_history: 10_000,
        ..Default::default()
    });
    for i in 0..2_000 {
        send(&stream, "price", &tick_json("BTCUSDT", 65_000.0 + f64::from(i)));
    }

    feed.connect().unwrap();
    tokio::time::timeout(Duration::from_secs(10), async {
        while feed.event_counts().price == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("no tick applied");

    feed.disconnect();
    let counts = feed.event_counts();
    let history = feed.data_history().len();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(feed.event_counts(), counts);
    assert_eq!(feed.data_history().len(), history);
}
