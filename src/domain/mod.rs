//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains:
//! - `mod.rs` — Rich domain types
//! - `wire.rs` — Serde structs and the decoder for stream payloads
//! - `state.rs` — State containers with update methods (stream-driven data)
//! - `client.rs` — Feed that wires a stream client to its state

pub mod market_data;
