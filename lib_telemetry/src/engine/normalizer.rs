//! # Historic Normalizer
//!
//! Rebuilds historic rows into the same [`Reading`] shape the live parser
//! produces, so a chart fed from either path renders identically.

use serde_json::{Map, Value};

use crate::model::{
    value_field, HistoricRecord, Reading, Sensor, FALLBACK_VALUE_FIELD, GATEWAY_UNKNOWN,
};

/// Maps backend rows onto readings for `sensor`, preserving order.
///
/// Rows with a non-finite value are skipped.
pub fn normalize(records: &[HistoricRecord], sensor: &Sensor) -> Vec<Reading> {
    let field = value_field(&sensor.sensor_type).unwrap_or(FALLBACK_VALUE_FIELD);

    records
        .iter()
        .filter_map(|record| normalize_record(record, sensor, field))
        .collect()
}

fn normalize_record(record: &HistoricRecord, sensor: &Sensor, field: &str) -> Option<Reading> {
    let number = serde_json::Number::from_f64(record.value)?;

    let mut decoded = Map::new();
    decoded.insert(field.to_string(), Value::Number(number));

    Some(Reading {
        tenant: record.tenant_id.to_string(),
        gateway: GATEWAY_UNKNOWN.to_string(),
        sensor_type: sensor.sensor_type.clone(),
        decoded_data: decoded,
        value: record.value,
        timestamp: record.timestamp,
    })
}
