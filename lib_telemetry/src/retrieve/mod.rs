//! # Data Retrieval Module
//!
//! HTTP clients for request/response data.
//!
//! ## Contained Modules:
//! - **`ky_http`**: a generic JSON client with retry middleware.
//! - **`history_http`**: the [`crate::engine::HistoricSource`] backed by it.
//! - **`sensors_http`**: the [`crate::engine::SensorSource`] backed by it.

pub mod history_http;
pub mod ky_http;
pub mod sensors_http;

pub use history_http::HttpHistoricSource;
pub use ky_http::{ApiClient, ApiResponse};
pub use sensors_http::HttpSensorSource;
