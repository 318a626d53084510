//! # Telemetry Data Model
//!
//! Shared types for both acquisition paths. Live frames and historic rows
//! converge on [`Reading`], so consumers never need to know where a data
//! point came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Gateway placeholder for readings rebuilt from historic rows.
pub const GATEWAY_UNKNOWN: &str = "unknown";

/// Field the historic normalizer uses for sensor types without a rule.
pub const FALLBACK_VALUE_FIELD: &str = "value";

/// A sensor definition: identity plus display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: String,
    pub name: String,
    pub sensor_type: String,
    pub unit: String,
}

impl Sensor {
    pub fn new(id: &str, name: &str, sensor_type: &str, unit: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            sensor_type: sensor_type.to_string(),
            unit: unit.to_string(),
        }
    }
}

/// The sensors published by the gateway simulator.
pub fn default_catalog() -> Vec<Sensor> {
    vec![
        Sensor::new("heart_rate", "Heart Rate Monitor", "heart_rate", "bpm"),
        Sensor::new("blood_oxygen", "Blood Oxygen Sensor", "blood_oxygen", "%"),
    ]
}

/// Looks a sensor up by id.
pub fn find_sensor<'a>(catalog: &'a [Sensor], id: &str) -> Option<&'a Sensor> {
    catalog.iter().find(|s| s.id == id)
}

/// Name of the decoded field holding the chartable scalar for a sensor type.
///
/// `None` means the type has no rule and callers apply their own fallback.
pub fn value_field(sensor_type: &str) -> Option<&'static str> {
    match sensor_type {
        "heart_rate" => Some("bpm"),
        "blood_oxygen" => Some("spO2"),
        _ => None,
    }
}

/// Tenant data handed over by the auth collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantIdentity {
    /// Opaque key addressing the tenant's live feed.
    pub routing_key: Option<String>,
    /// Numeric tenant id used by the historic endpoint.
    pub tenant_id: Option<u64>,
    pub name: Option<String>,
}

impl TenantIdentity {
    pub fn new(routing_key: impl Into<String>, tenant_id: u64) -> Self {
        Self {
            routing_key: Some(routing_key.into()),
            tenant_id: Some(tenant_id),
            name: None,
        }
    }

    /// The routing key, ignoring blank values.
    pub fn routing_key(&self) -> Option<&str> {
        self.routing_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// The tenant id, ignoring zero.
    pub fn tenant_id(&self) -> Option<u64> {
        self.tenant_id.filter(|id| *id > 0)
    }
}

/// A frame exactly as the live socket delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    /// `sensors.<tenant>.<gateway>.<sensorType>`
    pub subject: String,
    /// JSON-encoded payload string, or an already decoded object.
    pub data: Value,
    /// Sender clock, milliseconds since the Unix epoch.
    pub timestamp: f64,
}

/// The normalized data point shared by the live and historic paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub tenant: String,
    pub gateway: String,
    pub sensor_type: String,
    pub decoded_data: Map<String, Value>,
    /// Always finite.
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// One row of the historic endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricRecord {
    pub tenant_id: u64,
    pub metric: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Lifecycle of the live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
    Errored,
}

/// What the UI shows for the live feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionStatus {
    Live,
    Error,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    /// Projects the phase and error flag onto the UI status. An error wins.
    pub fn from_phase(phase: ConnectionPhase, has_error: bool) -> Self {
        if has_error {
            ConnectionStatus::Error
        } else if phase == ConnectionPhase::Open {
            ConnectionStatus::Live
        } else {
            ConnectionStatus::Disconnected
        }
    }
}
