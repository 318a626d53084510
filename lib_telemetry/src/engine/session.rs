//! # Telemetry Session
//!
//! The single mutation surface a UI talks to. It owns which sensor is
//! selected and which mode is active, and exposes everything else as
//! observable cells:
//!
//! - `select_live` / `select_historic` tear the previous session down
//!   completely before starting the new one.
//! - `reset` is the full teardown used when the consumer goes away.
//! - Failures never escape: they land in `live_error` / `historic_error`.
//!
//! Nothing here blocks. `select_historic` spawns the fetch on the current
//! tokio runtime and hands back its `JoinHandle` for callers that want to
//! wait.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::engine::connection::{LiveTransport, StreamConnection};
use crate::engine::history::{HistoricSource, HistoryQuery};
use crate::engine::live_buffer::MAX_LIVE_READINGS;
use crate::engine::normalizer::normalize;
use crate::engine::sensors::{SensorDirectory, SensorSource, StaticCatalog};
use crate::error::TelemetryError;
use crate::model::{
    ConnectionPhase, ConnectionStatus, HistoricRecord, Reading, Sensor, TenantIdentity,
};
use crate::observable::Observable;

/// Static knobs of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Live endpoint prefix; the routing key is appended as a path segment.
    pub live_base_url: String,
    pub live_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            live_base_url: "ws://localhost:8080/ws/sensors/".to_string(),
            live_capacity: MAX_LIVE_READINGS,
        }
    }
}

/// The last thing the consumer asked for, kept so it can be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveMode {
    #[default]
    None,
    Live,
    Historic { window_minutes: u32 },
}

/// Every consumer-facing value at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub selected_sensor: Option<Sensor>,
    pub live_readings: Vec<Reading>,
    pub latest_reading: Option<Reading>,
    pub connection_status: ConnectionStatus,
    pub live_error: Option<String>,
    pub historic_readings: Vec<Reading>,
    pub historic_loading: bool,
    pub historic_error: Option<String>,
    pub is_live_mode: bool,
    pub is_historic_mode: bool,
}

struct HistoricState {
    /// Bumped on every new request and every clear; guards all writes.
    generation: Mutex<u64>,
    readings: Observable<Vec<Reading>>,
    loading: Observable<bool>,
    error: Observable<Option<TelemetryError>>,
}

impl HistoricState {
    fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            readings: Observable::default(),
            loading: Observable::default(),
            error: Observable::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn clear(&self) {
        let mut generation = self.lock();
        *generation += 1;
        self.readings.set(Vec::new());
        self.loading.set(false);
        self.error.set(None);
    }

    fn begin(&self) -> u64 {
        let mut generation = self.lock();
        *generation += 1;
        self.loading.set(true);
        *generation
    }

    fn fail(&self, error: TelemetryError) {
        let _generation = self.lock();
        self.error.set(Some(error));
    }

    fn complete(
        &self,
        generation: u64,
        sensor: &Sensor,
        result: Result<Vec<HistoricRecord>, TelemetryError>,
    ) {
        let current = self.lock();
        if *current != generation {
            log::debug!(
                "Discarding historic result #{} (current #{})",
                generation,
                *current
            );
            return;
        }
        match result {
            Ok(records) => {
                let readings = normalize(&records, sensor);
                log::info!(
                    "Loaded {} historic readings for '{}'",
                    readings.len(),
                    sensor.id
                );
                self.readings.set(readings);
                self.error.set(None);
            }
            Err(e) => {
                log::warn!("Historic fetch for '{}' failed: {}", sensor.id, e);
                self.readings.set(Vec::new());
                self.error.set(Some(e));
            }
        }
        self.loading.set(false);
    }
}

/// Owner of the selected sensor, the active mode and every exposed cell.
///
/// `S` lists the selectable sensors; the default serves the built-in catalog.
pub struct TelemetrySession<T: LiveTransport, H: HistoricSource, S: SensorSource = StaticCatalog> {
    connection: StreamConnection<T>,
    history: Arc<H>,
    historic: Arc<HistoricState>,
    sensor_source: Arc<S>,
    directory: Arc<SensorDirectory>,
    tenant: Observable<TenantIdentity>,
    selected: Observable<Option<Sensor>>,
    mode: Mutex<ActiveMode>,
}

impl<T: LiveTransport, H: HistoricSource> TelemetrySession<T, H> {
    pub fn new(transport: T, history: H, settings: SessionSettings) -> Self {
        Self::with_sensor_source(transport, history, StaticCatalog, settings)
    }
}

impl<T: LiveTransport, H: HistoricSource, S: SensorSource> TelemetrySession<T, H, S> {
    pub fn with_sensor_source(transport: T, history: H, sensors: S, settings: SessionSettings) -> Self {
        Self {
            connection: StreamConnection::with_capacity(
                transport,
                settings.live_base_url,
                settings.live_capacity,
            ),
            history: Arc::new(history),
            historic: Arc::new(HistoricState::new()),
            sensor_source: Arc::new(sensors),
            directory: Arc::new(SensorDirectory::default()),
            tenant: Observable::default(),
            selected: Observable::default(),
            mode: Mutex::new(ActiveMode::None),
        }
    }

    /// Installs the tenant the next selection will use.
    pub fn set_tenant(&self, tenant: TenantIdentity) {
        self.tenant.set(tenant);
    }

    pub fn tenant(&self) -> TenantIdentity {
        self.tenant.get()
    }

    /// Streams `sensor` live, replacing whatever was shown before.
    pub fn select_live(&self, sensor: Sensor) {
        self.teardown();
        self.selected.set(Some(sensor.clone()));
        self.set_mode(ActiveMode::Live);

        let tenant = self.tenant.get();
        match tenant.routing_key() {
            Some(key) => {
                self.connection.connect(sensor, key);
            }
            None => {
                log::warn!("Cannot stream '{}': no tenant routing key", sensor.id);
                self.connection
                    .fail(Some(sensor), TelemetryError::MissingRoutingKey);
            }
        }
    }

    /// Loads the last `window_minutes` of `sensor`, replacing whatever was
    /// shown before.
    ///
    /// Returns the fetch task, or `None` when no fetch was started (missing
    /// tenant id, no tokio runtime); the failure is then in `historic_error`.
    pub fn select_historic(&self, sensor: Sensor, window_minutes: u32) -> Option<JoinHandle<()>> {
        self.teardown();
        self.selected.set(Some(sensor.clone()));
        self.set_mode(ActiveMode::Historic { window_minutes });

        let Some(tenant_id) = self.tenant.get().tenant_id() else {
            log::warn!("Cannot load history for '{}': no tenant id", sensor.id);
            self.historic.fail(TelemetryError::MissingTenantId);
            return None;
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::error!("Cannot load history for '{}': {}", sensor.id, e);
                self.historic
                    .fail(TelemetryError::Fetch(format!("no async runtime: {}", e)));
                return None;
            }
        };

        let query = HistoryQuery::for_window(tenant_id, &sensor, window_minutes);
        log::info!(
            "Requesting {} historic rows of '{}' for tenant {}",
            query.limit,
            query.metric,
            tenant_id
        );

        let generation = self.historic.begin();
        let source = Arc::clone(&self.history);
        let state = Arc::clone(&self.historic);

        Some(runtime.spawn(async move {
            let result = source.fetch_history(query).await;
            state.complete(generation, &sensor, result);
        }))
    }

    /// Refreshes the sensor listing.
    ///
    /// Independent of the live and historic state; `reset` leaves it alone.
    /// Returns the fetch task, or `None` outside a tokio runtime (recorded
    /// in `sensors_error`).
    pub fn load_sensors(&self) -> Option<JoinHandle<()>> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                log::error!("Cannot load sensors: {}", e);
                self.directory
                    .fail(TelemetryError::Fetch(format!("no async runtime: {}", e)));
                return None;
            }
        };

        let generation = self.directory.begin();
        let source = Arc::clone(&self.sensor_source);
        let directory = Arc::clone(&self.directory);

        Some(runtime.spawn(async move {
            let result = source.fetch_sensors().await;
            directory.complete(generation, result);
        }))
    }

    /// Empties the sensor listing and drops any load in flight.
    pub fn clear_sensors(&self) {
        self.directory.clear();
    }

    pub fn sensors(&self) -> Vec<Sensor> {
        self.directory.sensors.get()
    }

    pub fn sensors_loading(&self) -> bool {
        self.directory.loading.get()
    }

    pub fn sensors_error(&self) -> Option<TelemetryError> {
        self.directory.error.get()
    }

    /// A sensor from the current listing.
    pub fn listed_sensor(&self, id: &str) -> Option<Sensor> {
        self.directory.find(id)
    }

    pub fn subscribe_sensors(&self) -> watch::Receiver<Vec<Sensor>> {
        self.directory.sensors.subscribe()
    }

    pub fn subscribe_sensors_loading(&self) -> watch::Receiver<bool> {
        self.directory.loading.subscribe()
    }

    pub fn subscribe_sensors_error(&self) -> watch::Receiver<Option<TelemetryError>> {
        self.directory.error.subscribe()
    }

    /// Repeats the last selection for the selected sensor.
    pub fn retry(&self) -> Option<JoinHandle<()>> {
        let sensor = self.selected.get()?;
        match self.current_mode() {
            ActiveMode::Live => {
                self.select_live(sensor);
                None
            }
            ActiveMode::Historic { window_minutes } => self.select_historic(sensor, window_minutes),
            ActiveMode::None => None,
        }
    }

    /// Full teardown: socket closed, every cell cleared, nothing selected.
    pub fn reset(&self) {
        self.teardown();
        self.selected.set(None);
        self.set_mode(ActiveMode::None);
    }

    fn teardown(&self) {
        self.connection.disconnect();
        self.historic.clear();
    }

    fn set_mode(&self, mode: ActiveMode) {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    pub fn current_mode(&self) -> ActiveMode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn selected_sensor(&self) -> Option<Sensor> {
        self.selected.get()
    }

    pub fn live_readings(&self) -> Vec<Reading> {
        self.connection.readings()
    }

    /// Last element of the live window.
    pub fn latest_reading(&self) -> Option<Reading> {
        self.connection.latest_reading()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    pub fn connection_phase(&self) -> ConnectionPhase {
        self.connection.phase()
    }

    pub fn live_error(&self) -> Option<TelemetryError> {
        self.connection.error()
    }

    pub fn historic_readings(&self) -> Vec<Reading> {
        self.historic.readings.get()
    }

    pub fn historic_loading(&self) -> bool {
        self.historic.loading.get()
    }

    pub fn historic_error(&self) -> Option<TelemetryError> {
        self.historic.error.get()
    }

    /// Connected, failed, or still showing live data.
    pub fn is_live_mode(&self) -> bool {
        self.connection.status() == ConnectionStatus::Live
            || self.connection.error().is_some()
            || self.connection.has_readings()
    }

    pub fn is_historic_mode(&self) -> bool {
        !self.is_live_mode() && self.historic.readings.with(|r| !r.is_empty())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let live_readings = self.live_readings();
        SessionSnapshot {
            selected_sensor: self.selected_sensor(),
            latest_reading: live_readings.last().cloned(),
            live_readings,
            connection_status: self.connection_status(),
            live_error: self.live_error().map(|e| e.to_string()),
            historic_readings: self.historic_readings(),
            historic_loading: self.historic_loading(),
            historic_error: self.historic_error().map(|e| e.to_string()),
            is_live_mode: self.is_live_mode(),
            is_historic_mode: self.is_historic_mode(),
        }
    }

    pub fn subscribe_selected_sensor(&self) -> watch::Receiver<Option<Sensor>> {
        self.selected.subscribe()
    }

    pub fn subscribe_live_readings(&self) -> watch::Receiver<Vec<Reading>> {
        self.connection.subscribe_readings()
    }

    pub fn subscribe_connection_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.subscribe_status()
    }

    pub fn subscribe_live_error(&self) -> watch::Receiver<Option<TelemetryError>> {
        self.connection.subscribe_error()
    }

    pub fn subscribe_historic_readings(&self) -> watch::Receiver<Vec<Reading>> {
        self.historic.readings.subscribe()
    }

    pub fn subscribe_historic_loading(&self) -> watch::Receiver<bool> {
        self.historic.loading.subscribe()
    }

    pub fn subscribe_historic_error(&self) -> watch::Receiver<Option<TelemetryError>> {
        self.historic.error.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &StreamConnection<T> {
        &self.connection
    }

    pub fn history(&self) -> &H {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::connection::StreamEvent;
    use crate::engine::testing::{
        frame, heart_rate, spo2, RecordingTransport, StubHistory, StubSensors,
    };
    use chrono::{TimeZone, Utc};
    use tokio::sync::Notify;

    type Session = TelemetrySession<RecordingTransport, StubHistory>;

    fn session(history: StubHistory) -> Session {
        let session = TelemetrySession::new(RecordingTransport::default(), history, SessionSettings::default());
        session.set_tenant(TenantIdentity::new("tenant_1", 1));
        session
    }

    fn records(values: &[f64]) -> Vec<HistoricRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| HistoricRecord {
                tenant_id: 1,
                metric: "heart_rate".into(),
                timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, i as u32, 0).unwrap(),
                value: *v,
            })
            .collect()
    }

    fn emit(session: &Session, event: StreamEvent) -> bool {
        session.connection().transport().last_sink().emit(event)
    }

    fn bpm(value: u32) -> StreamEvent {
        StreamEvent::Message(frame("heart_rate", &format!(r#"{{"bpm":{}}}"#, value)))
    }

    fn live_values(session: &Session) -> Vec<f64> {
        session.live_readings().iter().map(|r| r.value).collect()
    }

    #[test]
    fn live_scenario_filters_other_sensor_types() {
        let session = session(StubHistory::returning(Ok(vec![])));
        session.select_live(heart_rate());
        assert_eq!(session.selected_sensor(), Some(heart_rate()));

        emit(&session, StreamEvent::Open);
        for v in [60, 62, 65] {
            emit(&session, bpm(v));
        }
        assert_eq!(live_values(&session), vec![60.0, 62.0, 65.0]);
        assert_eq!(session.latest_reading().map(|r| r.value), Some(65.0));
        assert_eq!(session.connection_status(), ConnectionStatus::Live);
        assert!(session.is_live_mode());
        assert!(!session.is_historic_mode());

        emit(&session, StreamEvent::Message(frame("blood_oxygen", r#"{"spO2":97.0}"#)));
        assert_eq!(live_values(&session), vec![60.0, 62.0, 65.0]);
    }

    #[test]
    fn switching_sensor_discards_the_old_window() {
        let session = session(StubHistory::returning(Ok(vec![])));
        session.select_live(heart_rate());
        let old_sink = session.connection().transport().last_sink();
        old_sink.emit(StreamEvent::Open);
        old_sink.emit(bpm(70));

        session.select_live(spo2());
        assert!(session.live_readings().is_empty());
        assert!(!old_sink.emit(bpm(71)));

        emit(&session, StreamEvent::Open);
        emit(&session, bpm(72));
        emit(&session, StreamEvent::Message(frame("blood_oxygen", r#"{"spO2":96.5}"#)));
        let readings = session.live_readings();
        assert_eq!(readings.len(), 1);
        assert!(readings.iter().all(|r| r.sensor_type == "blood_oxygen"));
    }

    #[test]
    fn missing_routing_key_is_a_live_error() {
        let session = session(StubHistory::returning(Ok(vec![])));
        session.set_tenant(TenantIdentity::default());
        session.select_live(heart_rate());

        assert_eq!(session.live_error(), Some(TelemetryError::MissingRoutingKey));
        assert_eq!(session.connection_status(), ConnectionStatus::Error);
        assert!(session.connection().transport().opened().is_empty());
        assert!(session.is_live_mode());
    }

    #[test]
    fn reset_twice_leaves_everything_empty() {
        let session = session(StubHistory::returning(Ok(vec![])));
        session.select_live(heart_rate());
        emit(&session, StreamEvent::Open);
        emit(&session, bpm(80));

        session.reset();
        session.reset();
        let snapshot = session.snapshot();
        assert_eq!(snapshot.selected_sensor, None);
        assert!(snapshot.live_readings.is_empty());
        assert_eq!(snapshot.latest_reading, None);
        assert_eq!(snapshot.connection_status, ConnectionStatus::Disconnected);
        assert_eq!(session.connection_phase(), ConnectionPhase::Idle);
        assert!(!snapshot.is_live_mode && !snapshot.is_historic_mode);
        assert_eq!(session.current_mode(), ActiveMode::None);
    }

    #[tokio::test]
    async fn historic_fetch_is_normalized() {
        let session = session(StubHistory::returning(Ok(records(&[70.0, 72.0]))));
        let task = session.select_historic(heart_rate(), 60).unwrap();
        task.await.unwrap();

        let readings = session.historic_readings();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].decoded_data["bpm"].as_f64(), Some(72.0));
        assert!(!session.historic_loading());
        assert_eq!(session.historic_error(), None);
        assert!(session.is_historic_mode());
        assert!(!session.is_live_mode());

        let queries = session.history().queries();
        assert_eq!(queries, vec![HistoryQuery { tenant_id: 1, metric: "heart_rate".into(), limit: 60 }]);
    }

    #[tokio::test]
    async fn loading_flag_spans_the_fetch() {
        let gate = Arc::new(Notify::new());
        let session = session(StubHistory::gated(Ok(records(&[70.0])), Arc::clone(&gate)));
        let task = session.select_historic(heart_rate(), 30).unwrap();
        assert!(session.historic_loading());

        gate.notify_one();
        task.await.unwrap();
        assert!(!session.historic_loading());
        assert_eq!(session.historic_readings().len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_sets_error_and_leaves_data_empty() {
        let failure = TelemetryError::HttpStatus { status: 500, body: "query failed".into() };
        let session = session(StubHistory::returning(Err(failure.clone())));
        session.select_historic(heart_rate(), 60).unwrap().await.unwrap();

        assert_eq!(session.historic_error(), Some(failure));
        assert!(session.historic_readings().is_empty());
        assert!(!session.historic_loading());
    }

    #[tokio::test]
    async fn missing_tenant_id_fails_without_fetching() {
        let session = session(StubHistory::returning(Ok(records(&[70.0]))));
        session.set_tenant(TenantIdentity { routing_key: Some("tenant_1".into()), tenant_id: None, name: None });

        assert!(session.select_historic(heart_rate(), 60).is_none());
        assert_eq!(session.historic_error(), Some(TelemetryError::MissingTenantId));
        assert!(!session.historic_loading());
        assert!(session.history().queries().is_empty());
    }

    #[tokio::test]
    async fn superseded_historic_result_is_discarded() {
        let gate = Arc::new(Notify::new());
        let session = session(StubHistory::gated(Ok(records(&[70.0])), Arc::clone(&gate)));
        let task = session.select_historic(heart_rate(), 60).unwrap();

        session.select_live(spo2());
        gate.notify_one();
        task.await.unwrap();

        assert!(session.historic_readings().is_empty());
        assert!(!session.historic_loading());
        assert_eq!(session.selected_sensor(), Some(spo2()));
    }

    #[tokio::test]
    async fn selecting_historic_tears_down_live() {
        let session = session(StubHistory::returning(Ok(records(&[70.0]))));
        session.select_live(heart_rate());
        emit(&session, StreamEvent::Open);
        emit(&session, bpm(90));
        let live_handle = session.connection().transport().opened()[0].2.clone();

        session.select_historic(heart_rate(), 60).unwrap().await.unwrap();
        assert!(live_handle.is_closed());
        assert!(session.live_readings().is_empty());
        assert_eq!(session.connection_status(), ConnectionStatus::Disconnected);
        assert!(session.is_historic_mode());
    }

    #[tokio::test]
    async fn retry_repeats_the_last_selection() {
        let session = session(StubHistory::returning(Ok(records(&[70.0]))));
        session.select_live(heart_rate());
        emit(&session, StreamEvent::Error("reset by peer".into()));
        assert_eq!(session.connection_status(), ConnectionStatus::Error);

        assert!(session.retry().is_none());
        assert_eq!(session.connection().transport().opened().len(), 2);
        assert_eq!(session.connection_status(), ConnectionStatus::Disconnected);

        session.select_historic(spo2(), 15).unwrap().await.unwrap();
        session.retry().unwrap().await.unwrap();
        assert_eq!(session.history().queries().len(), 2);
        assert_eq!(session.history().queries()[1].limit, 15);
    }

    #[test]
    fn subscribers_observe_live_updates() {
        let session = session(StubHistory::returning(Ok(vec![])));
        let mut readings = session.subscribe_live_readings();
        session.select_live(heart_rate());
        emit(&session, StreamEvent::Open);
        emit(&session, bpm(61));
        assert!(readings.has_changed().unwrap());
        assert_eq!(readings.borrow_and_update().len(), 1);
    }

    #[test]
    fn live_window_always_matches_the_selected_sensor() {
        let session = session(StubHistory::returning(Ok(vec![])));
        session.select_live(heart_rate());
        let first = session.connection().transport().last_sink();
        first.emit(StreamEvent::Open);

        session.select_live(spo2());
        let second = session.connection().transport().last_sink();
        first.emit(StreamEvent::Open);
        first.emit(bpm(70));
        second.emit(StreamEvent::Open);
        second.emit(bpm(71));
        second.emit(StreamEvent::Message(frame("blood_oxygen", r#"{"spO2":97.0}"#)));

        let selected = session.selected_sensor().unwrap();
        assert_eq!(session.connection().active_sensor(), Some(selected.clone()));
        let live: Vec<String> = session.live_readings().into_iter().map(|r| r.sensor_type).collect();
        assert_eq!(live, vec![selected.sensor_type]);

        session.reset();
        assert_eq!(session.selected_sensor(), None);
        assert_eq!(session.connection().active_sensor(), None);
    }

    #[tokio::test]
    async fn sensor_listing_defaults_to_the_catalog() {
        let session = session(StubHistory::returning(Ok(vec![])));
        assert!(session.sensors().is_empty());

        session.load_sensors().unwrap().await.unwrap();
        assert_eq!(session.sensors(), vec![heart_rate(), spo2()]);
        assert!(!session.sensors_loading());
        assert_eq!(session.sensors_error(), None);
        assert_eq!(session.listed_sensor("blood_oxygen"), Some(spo2()));

        session.select_live(heart_rate());
        session.reset();
        assert_eq!(session.sensors().len(), 2);

        session.clear_sensors();
        assert!(session.sensors().is_empty());
    }

    #[tokio::test]
    async fn sensor_listing_failure_is_recorded() {
        let failure = TelemetryError::HttpStatus { status: 401, body: "unauthorized".into() };
        let session = TelemetrySession::with_sensor_source(
            RecordingTransport::default(),
            StubHistory::returning(Ok(vec![])),
            StubSensors(Err(failure.clone())),
            SessionSettings::default(),
        );
        let mut loading = session.subscribe_sensors_loading();

        session.load_sensors().unwrap().await.unwrap();
        assert!(loading.has_changed().unwrap());
        assert_eq!(session.sensors_error(), Some(failure));
        assert!(session.sensors().is_empty());
        assert!(!session.sensors_loading());
    }
}
