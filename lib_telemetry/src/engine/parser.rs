//! # Message Parser
//!
//! Turns a live frame into a [`Reading`]. Pure and total: malformed input is
//! logged at debug level and dropped, never raised.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::model::{value_field, RawMessage, Reading};

/// First segment of every sensor subject.
pub const ROUTING_PREFIX: &str = "sensors";

/// Routing fields carried by a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub tenant: String,
    pub gateway: String,
    pub sensor_type: String,
}

/// Splits `sensors.<tenant>.<gateway>.<sensorType>`.
///
/// Exactly four non-empty segments are required.
pub fn parse_subject(subject: &str) -> Option<Subject> {
    let segments: Vec<&str> = subject.split('.').collect();
    let [prefix, tenant, gateway, sensor_type] = segments.as_slice() else {
        return None;
    };
    if *prefix != ROUTING_PREFIX || [tenant, gateway, sensor_type].iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(Subject {
        tenant: tenant.to_string(),
        gateway: gateway.to_string(),
        sensor_type: sensor_type.to_string(),
    })
}

/// Decodes a socket text frame and parses it.
pub fn parse_frame(text: &str) -> Option<Reading> {
    match serde_json::from_str::<RawMessage>(text) {
        Ok(raw) => parse(&raw),
        Err(e) => {
            log::debug!("Dropping undecodable frame: {}", e);
            None
        }
    }
}

/// Parses a raw message into a reading, or `None` if any part is malformed.
pub fn parse(raw: &RawMessage) -> Option<Reading> {
    let Some(subject) = parse_subject(&raw.subject) else {
        log::debug!("Dropping message with malformed subject '{}'", raw.subject);
        return None;
    };

    let Some(decoded) = decode_payload(&raw.data) else {
        log::debug!("Dropping message on '{}': payload is not a JSON object", raw.subject);
        return None;
    };

    let Some(value) = extract_value(&subject.sensor_type, &decoded) else {
        log::debug!("Dropping message on '{}': no usable value field", raw.subject);
        return None;
    };

    let Some(timestamp) = timestamp_from_millis(raw.timestamp) else {
        log::debug!("Dropping message on '{}': bad timestamp {}", raw.subject, raw.timestamp);
        return None;
    };

    Some(Reading {
        tenant: subject.tenant,
        gateway: subject.gateway,
        sensor_type: subject.sensor_type,
        decoded_data: decoded,
        value,
        timestamp,
    })
}

/// Accepts a JSON-encoded string or an inline object.
fn decode_payload(data: &Value) -> Option<Map<String, Value>> {
    let decoded = match data {
        Value::String(encoded) => serde_json::from_str::<Value>(encoded).ok()?,
        Value::Object(_) => data.clone(),
        _ => return None,
    };
    match decoded {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Picks the chartable scalar out of a decoded payload.
///
/// Types with a rule must carry that field as a number. Other types take the
/// first numeric field in ascending key order, or 0 when there is none.
pub fn extract_value(sensor_type: &str, decoded: &Map<String, Value>) -> Option<f64> {
    match value_field(sensor_type) {
        Some(field) => decoded
            .get(field)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite()),
        None => {
            let mut keys: Vec<&String> = decoded.keys().collect();
            keys.sort();
            let first = keys
                .into_iter()
                .filter_map(|k| decoded.get(k).and_then(Value::as_f64))
                .find(|v| v.is_finite());
            Some(first.unwrap_or(0.0))
        }
    }
}

fn timestamp_from_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}
