//! # HTTP Sensor Source
//!
//! `GET <sensors_path>` against the backend, answering
//! `{"sensors": [...]}`. A `null` or missing list is an empty listing.

use std::time::Duration;

use serde::Deserialize;

use crate::engine::sensors::SensorSource;
use crate::error::TelemetryError;
use crate::model::Sensor;
use crate::retrieve::ky_http::ApiClient;

/// Path of the sensor listing relative to the API base.
pub const DEFAULT_SENSORS_PATH: &str = "api/sensors";

#[derive(Debug, Deserialize)]
struct SensorsPayload {
    #[serde(default)]
    sensors: Option<Vec<Sensor>>,
}

/// [`SensorSource`] over the backend REST API.
#[derive(Debug, Clone)]
pub struct HttpSensorSource {
    client: ApiClient,
    sensors_path: String,
}

impl HttpSensorSource {
    /// `api_base` is the absolute API root, e.g. `http://localhost:8080/`.
    pub fn new(api_base: &str, max_retries: u32, timeout: Duration) -> Result<Self, TelemetryError> {
        let client = ApiClient::new(api_base, None, max_retries, timeout)
            .map_err(|e| TelemetryError::InvalidEndpoint(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: ApiClient) -> Self {
        Self {
            client,
            sensors_path: DEFAULT_SENSORS_PATH.to_string(),
        }
    }

    pub fn with_path(mut self, sensors_path: impl Into<String>) -> Self {
        self.sensors_path = sensors_path.into();
        self
    }
}

impl SensorSource for HttpSensorSource {
    async fn fetch_sensors(&self) -> Result<Vec<Sensor>, TelemetryError> {
        let response = self
            .client
            .get_json::<SensorsPayload>(&self.sensors_path, &[])
            .await
            .map_err(|e| TelemetryError::Fetch(format!("{:#}", e)))?;

        if !response.success {
            return Err(TelemetryError::HttpStatus {
                status: response.status,
                body: response.error_body.unwrap_or_default(),
            });
        }

        let sensors = response
            .data
            .and_then(|payload| payload.sensors)
            .unwrap_or_default();
        log::debug!("Sensor listing: {} entries", sensors.len());
        Ok(sensors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> Vec<Sensor> {
        serde_json::from_str::<SensorsPayload>(body)
            .unwrap()
            .sensors
            .unwrap_or_default()
    }

    #[test]
    fn null_or_missing_list_is_empty() {
        assert!(decode(r#"{"sensors":null}"#).is_empty());
        assert!(decode("{}").is_empty());
    }

    #[test]
    fn listed_sensors_use_camel_case_fields() {
        let sensors = decode(
            r#"{"sensors":[{"id":"temp","name":"Temperature","sensorType":"temperature","unit":"°C"}]}"#,
        );
        assert_eq!(
            sensors,
            vec![Sensor::new("temp", "Temperature", "temperature", "°C")]
        );
    }

    #[test]
    fn invalid_api_base_is_an_endpoint_error() {
        assert!(matches!(
            HttpSensorSource::new("not a url", 0, Duration::from_secs(1)),
            Err(TelemetryError::InvalidEndpoint(_))
        ));
    }
}
