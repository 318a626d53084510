//! # Sensor WSS Ingestor
//!
//! WebSocket transport for the per-tenant sensor stream. Each `open` spawns
//! one task on the current tokio runtime that connects, reports every frame
//! to its [`EventSink`] and exits on the first terminal event or when the
//! returned handle is closed. It never reconnects on its own.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::engine::connection::{EventSink, LiveTransport, StreamEvent, TransportHandle};

type SensorStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live transport over `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsTransport {
    connect_timeout: Option<Duration>,
}

impl Default for WsTransport {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl WsTransport {
    /// `None` waits for the handshake indefinitely.
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }
}

impl LiveTransport for WsTransport {
    fn open(&self, endpoint: Url, sink: EventSink) -> TransportHandle {
        let cancel = CancellationToken::new();
        let handle = TransportHandle::new(cancel.clone());

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(run_socket(endpoint, sink, cancel, self.connect_timeout));
            }
            Err(e) => {
                log::error!("Cannot open {}: {}", endpoint, e);
                sink.emit(StreamEvent::Error(format!("no async runtime: {}", e)));
            }
        }
        handle
    }
}

async fn establish(endpoint: &Url, connect_timeout: Option<Duration>) -> Result<SensorStream, String> {
    let connect = connect_async(endpoint.as_str());
    let result = match connect_timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| format!("handshake timed out after {}s", limit.as_secs_f32()))?,
        None => connect.await,
    };
    result.map(|(stream, _)| stream).map_err(|e| e.to_string())
}

async fn run_socket(
    endpoint: Url,
    sink: EventSink,
    cancel: CancellationToken,
    connect_timeout: Option<Duration>,
) {
    log::debug!("Opening sensor stream #{} at {}", sink.generation(), endpoint);

    let stream = tokio::select! {
        _ = cancel.cancelled() => {
            log::debug!("Stream #{} cancelled before connecting", sink.generation());
            return;
        }
        result = establish(&endpoint, connect_timeout) => result,
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("Failed to connect to {}: {}", endpoint, e);
            sink.emit(StreamEvent::Error(e));
            return;
        }
    };

    let (mut write, mut read) = stream.split();
    if sink.emit(StreamEvent::Open) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("Closing stream #{} on request", sink.generation());
                    break;
                }
                msg = read.next() => {
                    let event = match msg {
                        Some(Ok(Message::Text(text))) => StreamEvent::Message(text.to_string()),
                        Some(Ok(Message::Binary(bin))) => match String::from_utf8(bin.to_vec()) {
                            Ok(text) => StreamEvent::Message(text),
                            Err(_) => {
                                log::debug!("Dropping non UTF-8 binary frame ({} bytes)", bin.len());
                                continue;
                            }
                        },
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                                .unwrap_or((None, String::new()));
                            StreamEvent::Close { clean: true, code, reason }
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => StreamEvent::Error(e.to_string()),
                        None => StreamEvent::Close {
                            clean: false,
                            code: None,
                            reason: "stream ended without a close frame".to_string(),
                        },
                    };
                    let terminal = !matches!(event, StreamEvent::Message(_));
                    if !sink.emit(event) || terminal {
                        break;
                    }
                }
            }
        }
    }

    if let Err(e) = write.close().await {
        log::trace!("Close of stream #{} not delivered: {}", sink.generation(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::connection::StreamConnection;
    use crate::engine::testing::heart_rate;
    use crate::error::TelemetryError;
    use crate::model::{ConnectionPhase, ConnectionStatus};

    #[test]
    fn open_outside_a_runtime_reports_an_error() {
        let conn = StreamConnection::new(WsTransport::default(), "ws://127.0.0.1:9/ws/sensors/");
        conn.connect(heart_rate(), "tenant_1");
        assert_eq!(conn.phase(), ConnectionPhase::Errored);
        assert!(matches!(conn.error(), Some(TelemetryError::Transport(_))));
    }

    #[tokio::test]
    async fn refused_connection_becomes_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let conn = StreamConnection::new(
            WsTransport::new(Some(Duration::from_secs(2))),
            format!("ws://127.0.0.1:{}/ws/sensors/", port),
        );
        let mut status = conn.subscribe_status();
        conn.connect(heart_rate(), "tenant_1");

        tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| *s == ConnectionStatus::Error))
            .await
            .expect("no error reported")
            .unwrap();
        assert!(matches!(conn.error(), Some(TelemetryError::Transport(_))));
    }
}
