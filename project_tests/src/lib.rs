//! # Mock Dashboard Backend
//!
//! An in-process axum server exposing the routes the telemetry engine
//! talks to:
//!
//! - `GET /ws/sensors/{key}`: upgrades to a WebSocket and forwards whatever
//!   the test pushes with [`MockBackend::push`], framed like the real
//!   backend forwards its message bus (`{subject, data, timestamp}`).
//! - `GET /api/history`: answers with the configured [`Reply`] and
//!   records the query parameters.
//! - `GET /api/sensors`: answers with the configured [`Reply`], by default
//!   `{"sensors": null}`.
//!
//! Bound to `127.0.0.1:0`; the server stops when the [`MockBackend`] drops.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

/// What every open socket is told to do next.
#[derive(Debug, Clone)]
pub enum Push {
    Frame(String),
    Close { code: u16, reason: String },
    /// Ends the socket without a close frame.
    Drop,
}

/// Canned answer of a REST route.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16, String),
}

/// Socket counters as seen by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketStats {
    pub accepted: usize,
    pub open: usize,
}

struct BackendState {
    feed: broadcast::Sender<Push>,
    stats: watch::Sender<SocketStats>,
    routing_keys: Mutex<Vec<String>>,
    history: Mutex<Reply>,
    history_requests: Mutex<Vec<HashMap<String, String>>>,
    sensors: Mutex<Reply>,
    sensors_requests: Mutex<usize>,
}

pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    shutdown: CancellationToken,
}

impl MockBackend {
    pub async fn start() -> anyhow::Result<Self> {
        let (feed, _) = broadcast::channel(256);
        let (stats, _) = watch::channel(SocketStats::default());
        let state = Arc::new(BackendState {
            feed,
            stats,
            routing_keys: Mutex::new(Vec::new()),
            history: Mutex::new(Reply::Json(json!({ "data": null, "count": 0 }))),
            history_requests: Mutex::new(Vec::new()),
            sensors: Mutex::new(Reply::Json(json!({ "sensors": null }))),
            sensors_requests: Mutex::new(0),
        });

        let app = Router::new()
            .route("/ws/sensors/{key}", get(live_handler))
            .route("/api/history", get(history_handler))
            .route("/api/sensors", get(sensors_handler))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                stop.cancelled().await;
            });
            if let Err(e) = server.await {
                log::error!("Mock backend stopped: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            shutdown,
        })
    }

    /// `ws://127.0.0.1:<port>/ws/sensors/`
    pub fn live_base_url(&self) -> String {
        format!("ws://{}/ws/sensors/", self.addr)
    }

    /// `http://127.0.0.1:<port>/`
    pub fn api_base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn push(&self, push: Push) {
        // No receiver simply means no socket is open.
        let _ = self.state.feed.send(push);
    }

    pub fn push_reading(&self, sensor_type: &str, payload: Value) {
        self.push(Push::Frame(sensor_frame("tenant_1", "gw_1", sensor_type, &payload, 1_714_557_600_000)));
    }

    pub fn set_history(&self, reply: Reply) {
        if let Ok(mut history) = self.state.history.lock() {
            *history = reply;
        }
    }

    pub fn history_requests(&self) -> Vec<HashMap<String, String>> {
        self.state
            .history_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn set_sensors(&self, reply: Reply) {
        if let Ok(mut sensors) = self.state.sensors.lock() {
            *sensors = reply;
        }
    }

    pub fn sensors_requests(&self) -> usize {
        self.state.sensors_requests.lock().map(|n| *n).unwrap_or_default()
    }

    pub fn routing_keys(&self) -> Vec<String> {
        self.state
            .routing_keys
            .lock()
            .map(|k| k.clone())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> SocketStats {
        *self.state.stats.borrow()
    }

    /// Waits up to five seconds for the socket counters to satisfy `cond`.
    pub async fn wait_for_sockets(&self, cond: impl Fn(SocketStats) -> bool) -> anyhow::Result<()> {
        let mut stats = self.state.stats.subscribe();
        tokio::time::timeout(Duration::from_secs(5), stats.wait_for(|s| cond(*s)))
            .await
            .map_err(|_| anyhow::anyhow!("socket stats never matched, last {:?}", self.stats()))??;
        Ok(())
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// One frame as the backend forwards it: the bus payload stays a JSON string.
pub fn sensor_frame(tenant: &str, gateway: &str, sensor_type: &str, payload: &Value, timestamp_ms: i64) -> String {
    json!({
        "subject": format!("sensors.{}.{}.{}", tenant, gateway, sensor_type),
        "data": payload.to_string(),
        "timestamp": timestamp_ms,
    })
    .to_string()
}

/// Polls `cond` every 10ms for up to five seconds.
pub async fn eventually(what: &str, cond: impl Fn() -> bool) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

async fn live_handler(
    ws: WebSocketUpgrade,
    Path(key): Path<String>,
    State(state): State<Arc<BackendState>>,
) -> Response {
    if let Ok(mut keys) = state.routing_keys.lock() {
        keys.push(key);
    }
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: Arc<BackendState>) {
    let mut feed = state.feed.subscribe();
    state.stats.send_modify(|s| {
        s.accepted += 1;
        s.open += 1;
    });

    loop {
        tokio::select! {
            push = feed.recv() => {
                let outcome = match push {
                    Ok(Push::Frame(text)) => socket.send(Message::Text(text.into())).await,
                    Ok(Push::Close { code, reason }) => {
                        let frame = CloseFrame { code, reason: reason.into() };
                        let _ = socket.send(Message::Close(Some(frame))).await;
                        break;
                    }
                    Ok(Push::Drop) | Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => Ok(()),
                };
                if outcome.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.stats.send_modify(|s| s.open -= 1);
}

async fn history_handler(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<BackendState>>,
) -> Response {
    if let Ok(mut requests) = state.history_requests.lock() {
        requests.push(params);
    }
    let reply = state
        .history
        .lock()
        .map(|h| h.clone())
        .unwrap_or(Reply::Status(500, "poisoned".into()));
    reply.into_response()
}

async fn sensors_handler(State(state): State<Arc<BackendState>>) -> Response {
    if let Ok(mut requests) = state.sensors_requests.lock() {
        *requests += 1;
    }
    let reply = state
        .sensors
        .lock()
        .map(|s| s.clone())
        .unwrap_or(Reply::Status(500, "poisoned".into()));
    reply.into_response()
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Json(body) => Json(body).into_response(),
            Reply::Status(status, body) => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, body).into_response()
            }
        }
    }
}
