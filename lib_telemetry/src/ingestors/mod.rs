//! # Live Ingestors
//!
//! Concrete [`crate::engine::LiveTransport`] implementations.
//!
//! ## Contained Modules:
//! - **`sensor_wss`**: the WebSocket client for the backend sensor stream.

/// The WebSocket client for the per-tenant sensor stream.
pub mod sensor_wss;

pub use sensor_wss::WsTransport;
