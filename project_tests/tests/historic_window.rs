use std::time::Duration;

use lib_telemetry::ingestors::WsTransport;
use lib_telemetry::retrieve::HttpHistoricSource;
use lib_telemetry::{
    default_catalog, Sensor, SessionSettings, TelemetryError, TelemetrySession, TenantIdentity,
};
use project_tests::{Reply, MockBackend};
use serde_json::{json, Value};

type Session = TelemetrySession<WsTransport, HttpHistoricSource>;

fn sensor(id: &str) -> Sensor {
    default_catalog().into_iter().find(|s| s.id == id).unwrap()
}

fn session(backend: &MockBackend) -> Session {
    let history = HttpHistoricSource::new(&backend.api_base_url(), 0, Duration::from_secs(2)).unwrap();
    let session = TelemetrySession::new(
        WsTransport::default(),
        history,
        SessionSettings {
            live_base_url: backend.live_base_url(),
            ..SessionSettings::default()
        },
    );
    session.set_tenant(TenantIdentity::new("tenant_1", 1));
    session
}

fn rows(metric: &str, values: &[f64]) -> Vec<Value> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            json!({
                "tenantId": 1,
                "metric": metric,
                "timestamp": format!("2024-05-01T10:{:02}:00Z", i),
                "value": v,
            })
        })
        .collect()
}

#[tokio::test]
async fn window_is_fetched_and_normalized() {
    let backend = MockBackend::start().await.unwrap();
    backend.set_history(Reply::Json(json!({
        "data": rows("heart_rate", &[70.0, 72.0, 75.0]),
        "count": 3,
    })));
    let session = session(&backend);

    session.select_historic(sensor("heart_rate"), 60).unwrap().await.unwrap();

    let readings = session.historic_readings();
    assert_eq!(readings.len(), 3);
    assert_eq!(readings[1].decoded_data["bpm"], json!(72.0));
    assert_eq!(readings[1].value, 72.0);
    assert_eq!(readings[0].gateway, "unknown");
    assert_eq!(readings[0].tenant, "1");
    assert_eq!(session.historic_error(), None);
    assert!(!session.historic_loading());
    assert!(session.is_historic_mode());
    assert!(!session.is_live_mode());

    let requests = backend.history_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["tenant_id"], "1");
    assert_eq!(requests[0]["metric"], "heart_rate");
    assert_eq!(requests[0]["limit"], "60");
}

#[tokio::test]
async fn null_data_is_an_empty_window() {
    let backend = MockBackend::start().await.unwrap();
    backend.set_history(Reply::Json(json!({ "data": null, "count": 0 })));
    let session = session(&backend);

    session.select_historic(sensor("blood_oxygen"), 15).unwrap().await.unwrap();
    assert!(session.historic_readings().is_empty());
    assert_eq!(session.historic_error(), None);
    assert!(!session.is_historic_mode());
}

#[tokio::test]
async fn bare_array_is_accepted() {
    let backend = MockBackend::start().await.unwrap();
    backend.set_history(Reply::Json(Value::Array(rows("blood_oxygen", &[97.0, 98.5]))));
    let session = session(&backend);

    session.select_historic(sensor("blood_oxygen"), 15).unwrap().await.unwrap();
    let readings = session.historic_readings();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[1].decoded_data["spO2"], json!(98.5));
}

#[tokio::test]
async fn server_error_is_reported_with_status() {
    let backend = MockBackend::start().await.unwrap();
    backend.set_history(Reply::Status(500, "failed to query history".into()));
    let session = session(&backend);

    session.select_historic(sensor("heart_rate"), 60).unwrap().await.unwrap();
    assert_eq!(
        session.historic_error(),
        Some(TelemetryError::HttpStatus {
            status: 500,
            body: "failed to query history".into()
        })
    );
    assert!(session.historic_readings().is_empty());
    assert!(!session.historic_loading());
}

#[tokio::test]
async fn unreachable_backend_is_a_fetch_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let session = TelemetrySession::new(
        WsTransport::default(),
        HttpHistoricSource::new(&base, 0, Duration::from_secs(2)).unwrap(),
        SessionSettings::default(),
    );
    session.set_tenant(TenantIdentity::new("tenant_1", 1));

    session.select_historic(sensor("heart_rate"), 60).unwrap().await.unwrap();
    assert!(matches!(session.historic_error(), Some(TelemetryError::Fetch(_))));
}

#[tokio::test]
async fn oversized_window_is_clamped() {
    let backend = MockBackend::start().await.unwrap();
    let session = session(&backend);

    session.select_historic(sensor("heart_rate"), 1_000_000).unwrap().await.unwrap();
    assert_eq!(backend.history_requests()[0]["limit"], "10000");
}
