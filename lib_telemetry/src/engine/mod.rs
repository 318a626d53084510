//! # Reconciliation Engine
//!
//! Transport-independent core of the crate. Everything here is driven
//! either by socket events fed through an [`connection::EventSink`] or by
//! the result of a [`history::HistoricSource`] fetch, so the whole state
//! machine can be exercised without a network.
//!
//! ## Contained Modules:
//! - **`parser`**: socket frame to [`crate::model::Reading`].
//! - **`normalizer`**: historic rows to readings.
//! - **`live_buffer`**: the bounded live window.
//! - **`connection`**: socket lifecycle and event dispatch.
//! - **`history`**: the historic fetch seam.
//! - **`sensors`**: the sensor listing seam.
//! - **`session`**: the facade consumers talk to.

pub mod connection;
pub mod history;
pub mod live_buffer;
pub mod normalizer;
pub mod parser;
pub mod sensors;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{EventSink, LiveTransport, StreamEvent, TransportHandle};
pub use history::{HistoricSource, HistoryQuery};
pub use sensors::{SensorSource, StaticCatalog};
pub use session::{ActiveMode, SessionSettings, SessionSnapshot, TelemetrySession};
