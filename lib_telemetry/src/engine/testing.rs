//! Test doubles for the transport seams.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::engine::connection::{EventSink, LiveTransport, StreamEvent, TransportHandle};
use crate::engine::history::{HistoricSource, HistoryQuery};
use crate::engine::sensors::SensorSource;
use crate::error::TelemetryError;
use crate::model::{HistoricRecord, Sensor};

pub fn heart_rate() -> Sensor {
    Sensor::new("heart_rate", "Heart Rate Monitor", "heart_rate", "bpm")
}

pub fn spo2() -> Sensor {
    Sensor::new("blood_oxygen", "Blood Oxygen Sensor", "blood_oxygen", "%")
}

/// A socket frame as the backend forwards it, payload JSON-encoded.
pub fn frame(sensor_type: &str, payload: &str) -> String {
    serde_json::json!({
        "subject": format!("sensors.tenant_1.gw_1.{}", sensor_type),
        "data": payload,
        "timestamp": 1_714_557_600_000u64,
    })
    .to_string()
}

type Opened = (Url, EventSink, TransportHandle);

/// Records every open request and hands the sinks back to the test.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    opened: Arc<Mutex<Vec<Opened>>>,
    open_immediately: bool,
}

impl RecordingTransport {
    /// Reports `Open` from inside `open`.
    pub fn opening_immediately() -> Self {
        Self {
            open_immediately: true,
            ..Self::default()
        }
    }

    pub fn opened(&self) -> Vec<Opened> {
        self.opened.lock().unwrap().clone()
    }

    pub fn last_sink(&self) -> EventSink {
        self.opened().last().map(|o| o.1.clone()).expect("nothing opened")
    }
}

impl LiveTransport for RecordingTransport {
    fn open(&self, endpoint: Url, sink: EventSink) -> TransportHandle {
        let handle = TransportHandle::new(CancellationToken::new());
        self.opened
            .lock()
            .unwrap()
            .push((endpoint, sink.clone(), handle.clone()));
        if self.open_immediately {
            sink.emit(StreamEvent::Open);
        }
        handle
    }
}

/// Returns a canned result, optionally held back until released.
pub struct StubHistory {
    result: Result<Vec<HistoricRecord>, TelemetryError>,
    gate: Option<Arc<Notify>>,
    queries: Mutex<Vec<HistoryQuery>>,
}

impl StubHistory {
    pub fn returning(result: Result<Vec<HistoricRecord>, TelemetryError>) -> Self {
        Self {
            result,
            gate: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(result: Result<Vec<HistoricRecord>, TelemetryError>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::returning(result)
        }
    }

    pub fn queries(&self) -> Vec<HistoryQuery> {
        self.queries.lock().unwrap().clone()
    }
}

impl HistoricSource for StubHistory {
    async fn fetch_history(
        &self,
        query: HistoryQuery,
    ) -> Result<Vec<HistoricRecord>, TelemetryError> {
        self.queries.lock().unwrap().push(query);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.clone()
    }
}

/// Sensor listing with a canned result.
pub struct StubSensors(pub Result<Vec<Sensor>, TelemetryError>);

impl SensorSource for StubSensors {
    async fn fetch_sensors(&self) -> Result<Vec<Sensor>, TelemetryError> {
        self.0.clone()
    }
}
