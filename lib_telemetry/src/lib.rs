//! # lib_telemetry
//!
//! Client-side reconciliation engine for IoT sensor telemetry. A consumer
//! picks a sensor and either streams it live over a WebSocket or loads a
//! historic window over HTTP; both paths converge on the same
//! [`model::Reading`] shape and are exposed as observable cells.
//!
//! ## Features
//! - **`ws`**: [`ingestors::WsTransport`], the tokio-tungstenite live transport.
//! - **`http`**: [`retrieve::HttpHistoricSource`] and [`retrieve::HttpSensorSource`],
//!   the retrying HTTP clients for history and the sensor listing.
//!
//! Both are enabled by default. Without them only the engine and its
//! transport traits are built.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod engine;
pub mod error;
pub mod model;
pub mod observable;

#[cfg(feature = "ws")]
pub mod ingestors;
#[cfg(feature = "http")]
pub mod retrieve;

// --- Public API Re-exports ---
pub use engine::{
    ActiveMode, EventSink, HistoricSource, HistoryQuery, LiveTransport, SensorSource,
    SessionSettings, SessionSnapshot, StaticCatalog, StreamEvent, TelemetrySession,
    TransportHandle,
};
pub use error::TelemetryError;
pub use model::{
    default_catalog, find_sensor, ConnectionPhase, ConnectionStatus, HistoricRecord, Reading,
    Sensor, TenantIdentity,
};
pub use observable::Observable;
