//! Network URL constants for the Tickstream SDK.

/// Default market-data event-stream URL (local demo server).
pub const DEFAULT_STREAM_URL: &str = "http://localhost:3000/api/sse/market-data";

/// Environment variable read by the demos to override the stream URL.
pub const STREAM_URL_ENV: &str = "TICKSTREAM_URL";

/// Environment variable read by the demos for a comma-separated symbol filter.
pub const STREAM_SYMBOLS_ENV: &str = "TICKSTREAM_SYMBOLS";
