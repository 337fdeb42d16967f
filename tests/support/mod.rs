//! Shared test support: a channel-backed connector that records every
//! opened transport and every envelope the client sends.

// Each test binary compiles its own copy and uses a different subset.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use kioskwire::{
    Connector, Endpoint, Envelope, ServerEvent, Transport, TransportError, TransportKind,
};

/// One recorded `Connector::open` call.
#[derive(Clone, Debug)]
pub struct OpenRecord {
    pub kind: TransportKind,
    pub url: String,
    pub credential: String,
}

/// One fake transport's shared state. The test feeds inbound envelopes and
/// inspects what the client sent.
pub struct MockLink {
    sent: Mutex<Vec<String>>,
    closed: AtomicBool,
    inbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl MockLink {
    /// Push one gateway event to the client.
    pub fn push(&self, event: &ServerEvent) {
        let text = event.to_envelope().expect("envelope").encode().expect("encode");
        self.push_raw(&text);
    }

    /// Push raw wire text (for malformed-input cases).
    pub fn push_raw(&self, text: &str) {
        if let Some(tx) = self.inbound.lock().expect("lock").as_ref() {
            let _ = tx.send(text.to_owned());
        }
    }

    /// Simulate the gateway dropping the connection.
    pub fn close_from_server(&self) {
        *self.inbound.lock().expect("lock") = None;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Envelopes the client has sent so far, in order.
    pub fn sent(&self) -> Vec<Envelope> {
        self.sent
            .lock()
            .expect("lock")
            .iter()
            .map(|text| Envelope::decode(text).expect("sent envelope"))
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("lock").len()
    }
}

struct MockInner {
    opened: Mutex<Vec<OpenRecord>>,
    links: Mutex<Vec<Arc<MockLink>>>,
    refuse_websocket: AtomicBool,
    refuse_remaining: AtomicU32,
}

/// Recording connector handed to `with_parts`.
pub struct MockConnector {
    inner: Arc<MockInner>,
}

/// Test-side view of the connector's recordings.
#[derive(Clone)]
pub struct MockHandle {
    inner: Arc<MockInner>,
}

pub fn mock_connector() -> (Arc<MockConnector>, MockHandle) {
    let inner = Arc::new(MockInner {
        opened: Mutex::new(Vec::new()),
        links: Mutex::new(Vec::new()),
        refuse_websocket: AtomicBool::new(false),
        refuse_remaining: AtomicU32::new(0),
    });
    (
        Arc::new(MockConnector { inner: Arc::clone(&inner) }),
        MockHandle { inner },
    )
}

impl MockHandle {
    pub fn open_count(&self) -> usize {
        self.inner.opened.lock().expect("lock").len()
    }

    pub fn opened(&self) -> Vec<OpenRecord> {
        self.inner.opened.lock().expect("lock").clone()
    }

    /// Latest live link, waiting for the client to open one.
    pub async fn link(&self) -> Arc<MockLink> {
        wait_until(|| !self.inner.links.lock().expect("lock").is_empty()).await;
        self.inner
            .links
            .lock()
            .expect("lock")
            .last()
            .map(Arc::clone)
            .expect("link")
    }

    pub fn link_count(&self) -> usize {
        self.inner.links.lock().expect("lock").len()
    }

    /// Make WebSocket opens fail so the client falls back to polling.
    pub fn refuse_websocket(&self) {
        self.inner.refuse_websocket.store(true, Ordering::SeqCst);
    }

    /// Fail the next `count` opens regardless of transport kind.
    pub fn refuse_next(&self, count: u32) {
        self.inner.refuse_remaining.store(count, Ordering::SeqCst);
    }
}

struct MockTransport {
    link: Arc<MockLink>,
    inbound: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.link.sent.lock().expect("lock").push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.link.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(
        &self,
        kind: TransportKind,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let url = match kind {
            TransportKind::WebSocket => endpoint.ws_url(),
            TransportKind::Polling => endpoint.poll_url(),
        };
        self.inner.opened.lock().expect("lock").push(OpenRecord {
            kind,
            url,
            credential: endpoint.credential.clone(),
        });

        let remaining = self.inner.refuse_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.inner.refuse_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::Closed);
        }
        if kind == TransportKind::WebSocket && self.inner.refuse_websocket.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let link = Arc::new(MockLink {
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            inbound: Mutex::new(Some(tx)),
        });
        self.inner.links.lock().expect("lock").push(Arc::clone(&link));
        Ok(Box::new(MockTransport { link, inbound: rx }))
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(condition(), "condition not met within 2s");
}
