//! # Stream Connection Manager
//!
//! Owns the live socket lifecycle for a single sensor subscription.
//!
//! ## State machine
//! `Idle -> Connecting -> Open -> {Closed, Errored}`. `Closed` and `Errored`
//! go back to `Idle` through a teardown before any new attempt, which
//! [`StreamConnection::connect`] always performs first.
//!
//! ## Event dispatch
//! Transports never touch state directly. They receive an [`EventSink`]
//! stamped with the generation of the attempt they serve and report
//! [`StreamEvent`]s through it. Every connect and every teardown bumps the
//! generation, so events from a superseded socket are discarded no matter
//! how late they arrive. Tests drive the same path by emitting synthetic
//! events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::engine::live_buffer::{LiveBuffer, MAX_LIVE_READINGS};
use crate::engine::parser::parse_frame;
use crate::error::TelemetryError;
use crate::model::{ConnectionPhase, ConnectionStatus, Reading, Sensor};
use crate::observable::Observable;

/// Something the socket reported.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Open,
    /// A text frame, still encoded.
    Message(String),
    Error(String),
    /// `clean` is true when the close handshake completed.
    Close {
        clean: bool,
        code: Option<u16>,
        reason: String,
    },
}

impl StreamEvent {
    fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Open => "open",
            StreamEvent::Message(_) => "message",
            StreamEvent::Error(_) => "error",
            StreamEvent::Close { .. } => "close",
        }
    }
}

/// Opens sockets on behalf of a [`StreamConnection`].
///
/// `open` must return immediately; the outcome is reported through `sink`.
pub trait LiveTransport: Send + Sync + 'static {
    fn open(&self, endpoint: Url, sink: EventSink) -> TransportHandle;
}

/// Close request for one open socket. Closing is fire-and-forget.
#[derive(Debug, Clone, Default)]
pub struct TransportHandle {
    cancel: CancellationToken,
}

impl TransportHandle {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// The channel a transport reports through, bound to one connection attempt.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    core: Weak<ConnectionCore>,
}

impl EventSink {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Delivers an event. Returns `false` once the attempt is over, either
    /// because it was superseded or because the event ended it; the
    /// transport should stop reading then.
    pub fn emit(&self, event: StreamEvent) -> bool {
        match self.core.upgrade() {
            Some(core) => core.handle_event(self.generation, event),
            None => false,
        }
    }

    /// True while this attempt is still the current one.
    pub fn is_current(&self) -> bool {
        self.core
            .upgrade()
            .is_some_and(|core| core.lock().generation == self.generation)
    }
}

/// Builds the live endpoint: the base URL with the routing key appended as
/// a single percent-encoded path segment.
pub fn live_endpoint(base: &str, routing_key: &str) -> Result<Url, TelemetryError> {
    let mut url =
        Url::parse(base).map_err(|e| TelemetryError::InvalidEndpoint(format!("{}: {}", base, e)))?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(TelemetryError::InvalidEndpoint(format!(
            "unsupported scheme '{}' in {}",
            url.scheme(),
            base
        )));
    }

    url.path_segments_mut()
        .map_err(|_| TelemetryError::InvalidEndpoint(format!("{} cannot take a path", base)))?
        .pop_if_empty()
        .push(routing_key);

    Ok(url)
}

#[derive(Debug)]
struct ConnectionInner {
    phase: ConnectionPhase,
    generation: u64,
    active_sensor: Option<Sensor>,
    handle: Option<TransportHandle>,
    buffer: LiveBuffer,
    error: Option<TelemetryError>,
}

#[derive(Debug)]
pub(crate) struct ConnectionCore {
    inner: Mutex<ConnectionInner>,
    readings: Observable<Vec<Reading>>,
    phase: Observable<ConnectionPhase>,
    status: Observable<ConnectionStatus>,
    error: Observable<Option<TelemetryError>>,
}

impl ConnectionCore {
    fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(ConnectionInner {
                phase: ConnectionPhase::Idle,
                generation: 0,
                active_sensor: None,
                handle: None,
                buffer: LiveBuffer::new(capacity),
                error: None,
            }),
            readings: Observable::default(),
            phase: Observable::default(),
            status: Observable::default(),
            error: Observable::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Back to `Idle` with nothing selected. Closes the socket without
    /// waiting and invalidates its sink.
    fn teardown(&self, inner: &mut ConnectionInner) {
        if let Some(handle) = inner.handle.take() {
            handle.close();
        }
        inner.generation += 1;
        inner.phase = ConnectionPhase::Idle;
        inner.active_sensor = None;
        inner.error = None;
        inner.buffer.clear();
        self.readings.set(Vec::new());
    }

    fn publish(&self, inner: &ConnectionInner) {
        self.phase.set(inner.phase);
        self.error.set(inner.error.clone());
        self.status
            .set(ConnectionStatus::from_phase(inner.phase, inner.error.is_some()));
    }

    fn handle_event(&self, generation: u64, event: StreamEvent) -> bool {
        let mut inner = self.lock();
        if generation != inner.generation {
            log::debug!(
                "Discarding {} event from superseded connection #{} (current #{})",
                event.kind(),
                generation,
                inner.generation
            );
            return false;
        }

        match event {
            StreamEvent::Open => {
                if inner.phase == ConnectionPhase::Connecting {
                    inner.phase = ConnectionPhase::Open;
                    inner.error = None;
                    log::info!("Live stream #{} open", generation);
                }
            }
            StreamEvent::Message(text) => {
                if inner.phase != ConnectionPhase::Open {
                    log::trace!("Ignoring frame while {:?}", inner.phase);
                    return inner.phase == ConnectionPhase::Connecting;
                }
                let Some(reading) = parse_frame(&text) else {
                    return true;
                };
                let accepted = inner
                    .active_sensor
                    .as_ref()
                    .is_some_and(|sensor| sensor.sensor_type == reading.sensor_type);
                if !accepted {
                    log::trace!("Filtered out '{}' reading", reading.sensor_type);
                    return true;
                }
                inner.buffer.push(reading);
                let snapshot = inner.buffer.snapshot();
                self.readings.update(|readings| *readings = snapshot);
                return true;
            }
            StreamEvent::Error(message) => {
                log::warn!("Live stream #{} failed: {}", generation, message);
                inner.phase = ConnectionPhase::Errored;
                inner.error = Some(TelemetryError::Transport(message));
            }
            StreamEvent::Close {
                clean,
                code,
                reason,
            } => {
                if inner.phase == ConnectionPhase::Errored {
                    log::debug!("Close after error on stream #{}, keeping the error", generation);
                } else {
                    inner.phase = ConnectionPhase::Closed;
                    if clean {
                        log::info!("Live stream #{} closed (code {:?})", generation, code);
                    } else {
                        log::warn!("Live stream #{} dropped (code {:?}): {}", generation, code, reason);
                        inner.error = Some(TelemetryError::UnexpectedClose { code, reason });
                    }
                }
            }
        }

        self.publish(&inner);
        matches!(
            inner.phase,
            ConnectionPhase::Connecting | ConnectionPhase::Open
        )
    }
}

/// Single live subscription over a [`LiveTransport`].
///
/// Owned and driven by a `TelemetrySession`; not constructible outside the crate.
pub struct StreamConnection<T: LiveTransport> {
    core: Arc<ConnectionCore>,
    transport: T,
    base_url: String,
}

impl<T: LiveTransport> StreamConnection<T> {
    /// `base_url` is the live endpoint prefix, e.g. `ws://host/ws/sensors/`.
    #[cfg(test)]
    pub(crate) fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self::with_capacity(transport, base_url, MAX_LIVE_READINGS)
    }

    pub(crate) fn with_capacity(transport: T, base_url: impl Into<String>, capacity: usize) -> Self {
        Self {
            core: Arc::new(ConnectionCore::new(capacity)),
            transport,
            base_url: base_url.into(),
        }
    }

    /// Starts streaming `sensor`, closing any previous socket first.
    ///
    /// Returns the generation of the new attempt.
    pub(crate) fn connect(&self, sensor: Sensor, routing_key: &str) -> u64 {
        let endpoint = live_endpoint(&self.base_url, routing_key);

        let generation = {
            let mut inner = self.core.lock();
            self.core.teardown(&mut inner);
            inner.active_sensor = Some(sensor.clone());
            match &endpoint {
                Ok(_) => inner.phase = ConnectionPhase::Connecting,
                Err(e) => {
                    log::warn!("Cannot stream '{}': {}", sensor.id, e);
                    inner.phase = ConnectionPhase::Errored;
                    inner.error = Some(e.clone());
                }
            }
            self.core.publish(&inner);
            inner.generation
        };

        let Ok(endpoint) = endpoint else {
            return generation;
        };

        log::info!(
            "Connecting live stream #{} for '{}' at {}",
            generation,
            sensor.id,
            endpoint
        );

        // The lock is released here so a transport may report synchronously.
        let sink = EventSink {
            generation,
            core: Arc::downgrade(&self.core),
        };
        let handle = self.transport.open(endpoint, sink);

        let mut inner = self.core.lock();
        if inner.generation == generation {
            inner.handle = Some(handle);
        } else {
            handle.close();
        }
        generation
    }

    /// Records a failure that prevented connecting at all.
    pub(crate) fn fail(&self, sensor: Option<Sensor>, error: TelemetryError) {
        let mut inner = self.core.lock();
        self.core.teardown(&mut inner);
        inner.active_sensor = sensor;
        inner.phase = ConnectionPhase::Errored;
        inner.error = Some(error);
        self.core.publish(&inner);
    }

    /// Closes the socket if any and clears everything. Idempotent.
    pub(crate) fn disconnect(&self) {
        let mut inner = self.core.lock();
        let was_active = inner.phase != ConnectionPhase::Idle || inner.handle.is_some();
        self.core.teardown(&mut inner);
        self.core.publish(&inner);
        if was_active {
            log::info!("Live stream disconnected");
        }
    }

    /// Feeds an event as if the transport of `generation` had sent it.
    pub(crate) fn handle_event(&self, generation: u64, event: StreamEvent) -> bool {
        self.core.handle_event(generation, event)
    }

    pub fn generation(&self) -> u64 {
        self.core.lock().generation
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.core.phase.get()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.core.status.get()
    }

    pub fn error(&self) -> Option<TelemetryError> {
        self.core.error.get()
    }

    pub fn active_sensor(&self) -> Option<Sensor> {
        self.core.lock().active_sensor.clone()
    }

    /// Snapshot of the live window in arrival order.
    pub fn readings(&self) -> Vec<Reading> {
        self.core.readings.get()
    }

    pub fn latest_reading(&self) -> Option<Reading> {
        self.core.readings.with(|readings| readings.last().cloned())
    }

    pub fn has_readings(&self) -> bool {
        self.core.readings.with(|readings| !readings.is_empty())
    }

    pub fn subscribe_readings(&self) -> watch::Receiver<Vec<Reading>> {
        self.core.readings.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.core.status.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<TelemetryError>> {
        self.core.error.subscribe()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: LiveTransport> Drop for StreamConnection<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.core.lock().handle.take() {
            handle.close();
        }
    }
}
