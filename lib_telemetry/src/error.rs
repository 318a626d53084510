//! # Telemetry Errors
//!
//! Session-level failures are stored in observable cells rather than
//! returned across the session boundary, so every variant is `Clone` and
//! comparable and carries only owned strings.

use thiserror::Error;

/// Failures a telemetry session can record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    /// The tenant has no routing key, so no live endpoint can be built.
    #[error("tenant routing key is not available")]
    MissingRoutingKey,

    /// The tenant has no numeric id, so no historic window can be requested.
    #[error("tenant id is not available")]
    MissingTenantId,

    /// The live base URL could not be combined with the routing key.
    #[error("invalid live endpoint: {0}")]
    InvalidEndpoint(String),

    /// The socket failed to connect or failed while reading.
    #[error("live transport error: {0}")]
    Transport(String),

    /// The server dropped the socket without a close handshake.
    #[error("live stream closed unexpectedly (code {code:?}): {reason}")]
    UnexpectedClose { code: Option<u16>, reason: String },

    /// A backend request could not be sent or its body could not be decoded.
    #[error("backend request failed: {0}")]
    Fetch(String),

    /// A backend endpoint answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

impl TelemetryError {
    /// True for failures raised before any I/O was attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            TelemetryError::MissingRoutingKey | TelemetryError::MissingTenantId
        )
    }
}
