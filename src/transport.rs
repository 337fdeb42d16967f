//! Transport layer — how envelopes reach the gateway.
//!
//! DESIGN
//! ======
//! The connection manager talks to a `Transport` behind a trait object and
//! obtains one through a `Connector`, so tests inject channel-backed fakes
//! and production uses [`NetConnector`]. Two transports exist, tried in
//! preference order: a persistent WebSocket, then an HTTP long-polling
//! fallback for networks that break WebSocket upgrades.
//!
//! WIRE CONTRACT
//! =============
//! - WebSocket: one JSON envelope per text frame; the credential rides as a
//!   `token` query parameter on the upgrade URL.
//! - Polling: `GET {base}{ns}/handshake` validates the credential, then
//!   `GET {base}{ns}/poll` long-polls and returns a JSON array of envelopes
//!   (204 when the window elapses empty); `POST {base}{ns}/emit` sends one
//!   envelope per request.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::envelope::Namespace;

// =============================================================================
// TYPES
// =============================================================================

/// Available transport channels, in connection preference order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    WebSocket,
    Polling,
}

impl TransportKind {
    /// Preference order tried on every connection attempt.
    pub const PREFERENCE: [Self; 2] = [Self::WebSocket, Self::Polling];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebSocket => "websocket",
            Self::Polling => "polling",
        }
    }
}

/// Where and as whom to connect. Built by the connection manager from the
/// client config once a credential is known to exist.
#[derive(Clone, Debug)]
pub struct Endpoint {
    pub namespace: Namespace,
    /// Gateway origin, e.g. `https://park.example.com`.
    pub base_url: String,
    pub credential: String,
}

impl Endpoint {
    /// WebSocket upgrade URL with the credential attached.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let origin = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{origin}{}?token={}", self.namespace.path(), self.credential)
    }

    #[must_use]
    pub fn handshake_url(&self) -> String {
        format!("{}{}/handshake?token={}", self.base_url, self.namespace.path(), self.credential)
    }

    #[must_use]
    pub fn poll_url(&self) -> String {
        format!("{}{}/poll?token={}", self.base_url, self.namespace.path(), self.credential)
    }

    #[must_use]
    pub fn emit_url(&self) -> String {
        format!("{}{}/emit?token={}", self.base_url, self.namespace.path(), self.credential)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket error: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("polling endpoint returned status {0}")]
    PollStatus(u16),
    #[error("transport closed")]
    Closed,
}

// =============================================================================
// TRAITS
// =============================================================================

/// One live channel to the gateway carrying envelope text both ways.
#[async_trait]
pub trait Transport: Send {
    /// Send one encoded envelope. Fire-and-forget from the caller's view;
    /// an error here drops the transport and triggers reconnection.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Receive the next inbound envelope text. `None` means the channel is
    /// gone and will not produce more.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Release the channel. Idempotent, best effort.
    async fn close(&mut self);
}

/// Opens transports. The production implementation dials the network; tests
/// substitute a recording fake.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        kind: TransportKind,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

// =============================================================================
// NETWORK CONNECTOR
// =============================================================================

/// Real network connector: WebSocket first, long-polling on demand.
pub struct NetConnector {
    http: reqwest::Client,
}

impl NetConnector {
    #[must_use]
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }
}

impl Default for NetConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for NetConnector {
    async fn open(
        &self,
        kind: TransportKind,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn Transport>, TransportError> {
        match kind {
            TransportKind::WebSocket => {
                let (stream, _response) = connect_async(endpoint.ws_url())
                    .await
                    .map_err(|error| TransportError::WsConnect(Box::new(error)))?;
                Ok(Box::new(WsTransport { stream }))
            }
            TransportKind::Polling => {
                let transport = PollingTransport {
                    http: self.http.clone(),
                    endpoint: endpoint.clone(),
                    backlog: VecDeque::new(),
                };
                transport.handshake().await?;
                Ok(Box::new(transport))
            }
        }
    }
}

// =============================================================================
// WEBSOCKET TRANSPORT
// =============================================================================

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|error| TransportError::Ws(Box::new(error)))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(_)) => return None,
                // Ping/pong are answered by the protocol layer; binary
                // frames are not part of this contract.
                Ok(_) => {}
                Err(error) => return Some(Err(TransportError::Ws(Box::new(error)))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

// =============================================================================
// POLLING TRANSPORT
// =============================================================================

struct PollingTransport {
    http: reqwest::Client,
    endpoint: Endpoint,
    /// Envelopes from the last poll batch not yet handed to the caller.
    backlog: VecDeque<String>,
}

impl PollingTransport {
    async fn handshake(&self) -> Result<(), TransportError> {
        let response = self.http.get(self.endpoint.handshake_url()).send().await?;
        if !response.status().is_success() {
            return Err(TransportError::PollStatus(response.status().as_u16()));
        }
        Ok(())
    }

    async fn poll_batch(&mut self) -> Result<(), TransportError> {
        let response = self.http.get(self.endpoint.poll_url()).send().await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(TransportError::PollStatus(response.status().as_u16()));
        }

        let batch: Vec<Value> = response.json().await?;
        for envelope in batch {
            self.backlog.push_back(envelope.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for PollingTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let response = self
            .http
            .post(self.endpoint.emit_url())
            .header(CONTENT_TYPE, "application/json")
            .body(text)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::PollStatus(response.status().as_u16()));
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            if let Some(text) = self.backlog.pop_front() {
                return Some(Ok(text));
            }
            if let Err(error) = self.poll_batch().await {
                return Some(Err(error));
            }
        }
    }

    async fn close(&mut self) {
        self.backlog.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
