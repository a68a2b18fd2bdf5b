//! Duplex transport behind the stream engine.
//!
//! [`Transport`] opens connections and [`Connection`] moves text frames. The
//! engine only sees these traits, so its state machine runs unchanged over a
//! real websocket or a scripted test double.
//!
//! [`WsTransport`] is the `tokio-tungstenite` implementation. Each connection
//! is owned by a driver task that multiplexes outbound frames, inbound frames
//! and the heartbeat. Dropping the [`WsConnection`] closes the command channel;
//! the driver then sends a close frame (bounded by the close timeout) and
//! exits, so a consumer that abandons a stream still releases the socket.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secgemini_settings::StreamSettings;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use crate::errors::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One open duplex connection carrying JSON text frames.
///
/// Dropping a connection must release it without further awaiting.
#[async_trait]
pub trait Connection: Send {
    /// Send one frame.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Next inbound frame; `Ok(None)` once the connection is gone.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Close gracefully. Never fails; problems are logged.
    async fn close(&mut self);
}

/// Opens [`Connection`]s.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to `url`.
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError>;
}

/// Heartbeat and timeout tuning for [`WsTransport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WsConfig {
    /// Interval between pings.
    pub ping_interval: Duration,
    /// Pong deadline after a ping.
    pub ping_timeout: Duration,
    /// Handshake bound.
    pub connect_timeout: Duration,
    /// Close handshake bound.
    pub close_timeout: Duration,
}

impl WsConfig {
    /// Values from the stream settings.
    pub fn from_settings(settings: &StreamSettings) -> Self {
        Self {
            ping_interval: settings.ping_interval(),
            ping_timeout: settings.ping_timeout(),
            connect_timeout: settings.connect_timeout(),
            close_timeout: settings.close_timeout(),
        }
    }
}

impl Default for WsConfig {
    fn default() -> Self {
        Self::from_settings(&StreamSettings::default())
    }
}

/// Websocket transport over `tokio-tungstenite`.
#[derive(Clone, Debug, Default)]
pub struct WsTransport {
    config: WsConfig,
}

impl WsTransport {
    /// Transport with the given tuning.
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError> {
        let target = redact(url);
        let (ws, _) = tokio::time::timeout(self.config.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout {
                operation: "websocket handshake",
                timeout: self.config.connect_timeout,
            })?
            .map_err(|e| TransportError::Connect {
                url: target.clone(),
                message: e.to_string(),
            })?;
        debug!(url = %target, "websocket connected");
        Ok(Box::new(WsConnection::spawn(ws, self.config)))
    }
}

/// A websocket connection driven by a background task.
pub struct WsConnection {
    outbound: Option<mpsc::Sender<String>>,
    inbound: mpsc::Receiver<Result<String, TransportError>>,
    driver: Option<JoinHandle<()>>,
    close_timeout: Duration,
}

impl WsConnection {
    fn spawn(ws: WsStream, config: WsConfig) -> Self {
        let (out_tx, out_rx) = mpsc::channel(32);
        let (in_tx, in_rx) = mpsc::channel(64);
        let driver = tokio::spawn(drive(ws, out_rx, in_tx, config));
        Self {
            outbound: Some(out_tx),
            inbound: in_rx,
            driver: Some(driver),
            close_timeout: config.close_timeout,
        }
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let Some(outbound) = &self.outbound else {
            return Err(TransportError::closed("connection already closed"));
        };
        outbound
            .send(frame)
            .await
            .map_err(|_| TransportError::closed("websocket driver stopped"))
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        match self.inbound.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        drop(self.outbound.take());
        let Some(driver) = self.driver.take() else {
            return;
        };
        // The driver bounds its own close handshake; this covers a driver
        // stuck delivering an inbound frame.
        let grace = self.close_timeout + Duration::from_secs(1);
        if tokio::time::timeout(grace, driver).await.is_err() {
            warn!(timeout_ms = grace.as_millis(), "websocket close timed out");
        }
    }
}

async fn drive(
    ws: WsStream,
    mut out_rx: mpsc::Receiver<String>,
    in_tx: mpsc::Sender<Result<String, TransportError>>,
    config: WsConfig,
) {
    let (mut sink, mut source) = ws.split();
    let mut ping = tokio::time::interval_at(Instant::now() + config.ping_interval, config.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ping_sent_at: Option<Instant> = None;

    loop {
        let pong_deadline = ping_sent_at.map_or_else(far_future, |sent| sent + config.ping_timeout);
        tokio::select! {
            frame = out_rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = sink.send(WsMessage::Text(frame.into())).await {
                    let _ = in_tx.send(Err(TransportError::Io { message: e.to_string() })).await;
                    break;
                }
            }
            incoming = source.next() => {
                let frame = match incoming {
                    Some(Ok(WsMessage::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            warn!(bytes = bytes.len(), "ignoring non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Some(Ok(WsMessage::Pong(_))) => {
                        ping_sent_at = None;
                        continue;
                    }
                    Some(Ok(WsMessage::Close(close))) => {
                        let reason = close.map(|c| c.reason.to_string()).unwrap_or_default();
                        let _ = in_tx.send(Err(TransportError::closed(reason))).await;
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        let _ = in_tx.send(Err(TransportError::Io { message: e.to_string() })).await;
                        break;
                    }
                    None => {
                        let _ = in_tx.send(Err(TransportError::closed("stream ended"))).await;
                        break;
                    }
                };
                if in_tx.send(Ok(frame)).await.is_err() {
                    break;
                }
            }
            _ = ping.tick() => {
                if ping_sent_at.is_none() {
                    ping_sent_at = Some(Instant::now());
                }
                if let Err(e) = sink.send(WsMessage::Ping(Default::default())).await {
                    let _ = in_tx.send(Err(TransportError::Heartbeat { message: e.to_string() })).await;
                    break;
                }
            }
            () = tokio::time::sleep_until(pong_deadline), if ping_sent_at.is_some() => {
                let message = format!("no pong within {}ms", config.ping_timeout.as_millis());
                let _ = in_tx.send(Err(TransportError::Heartbeat { message })).await;
                break;
            }
        }
    }

    if tokio::time::timeout(config.close_timeout, sink.close()).await.is_err() {
        debug!("close handshake timed out");
    }
}

fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400 * 365)
}

/// `url` with the `api_key` query value masked, for logs and errors.
pub(crate) fn redact(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" { "***".to_owned() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    let mut clean = url.clone();
    let _ = clean.query_pairs_mut().clear().extend_pairs(pairs);
    clean.to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
