//! Connection manager — one authenticated realtime channel per client.
//!
//! ARCHITECTURE
//! ============
//! A `Connection` owns exactly one live transport at a time plus the
//! listener registry its consumer subscribes through. `connect` spawns a
//! background loop that opens transports in preference order, pumps
//! envelopes both ways, and retries per the injected reconnect policy.
//! Completion is observed only through synthesized events, never by
//! blocking: `<namespace>_connected`, `<namespace>_disconnected`, and
//! `error` flow through the registry like any gateway-pushed event.
//!
//! FAILURE SEMANTICS
//! =================
//! No public operation throws. A missing credential skips connection
//! entirely. Connect failures become `error` events; exhausting the retry
//! budget is silence. `emit` while disconnected is a silent drop (matching
//! the gateway contract — nothing is queued for replay).
//!
//! LIFECYCLE
//! =========
//! 1. `connect` → loop opens a transport, fires `<ns>_connected`
//! 2. inbound envelopes → decode → registry dispatch (synchronous, in order)
//! 3. transport drops → `<ns>_disconnected`, policy-driven retry
//! 4. `disconnect` → flush queued sends, close transport, clear registry

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backoff::ReconnectPolicy;
use crate::config::ClientConfig;
use crate::envelope::{Envelope, Namespace};
use crate::event::{EventKind, ServerEvent};
use crate::outbound::ClientEvent;
use crate::registry::{Callback, ListenerRegistry, Subscription};
use crate::transport::{Connector, Endpoint, Transport, TransportError, TransportKind};

// =============================================================================
// CONNECTION
// =============================================================================

/// One logical client's channel to a gateway namespace.
pub struct Connection {
    namespace: Namespace,
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    policy: Arc<dyn ReconnectPolicy>,
    registry: Arc<Mutex<ListenerRegistry>>,
    connected: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Build a connection without dialing anything.
    #[must_use]
    pub fn new(
        namespace: Namespace,
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        policy: Arc<dyn ReconnectPolicy>,
    ) -> Self {
        Self {
            namespace,
            config,
            connector,
            policy,
            registry: Arc::new(Mutex::new(ListenerRegistry::new())),
            connected: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
            outbound: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Start the connection loop. Without a credential this is a deliberate
    /// no-op — "not yet authenticated" is a valid state, not a failure.
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        if self.closed.load(Ordering::SeqCst) {
            debug!(namespace = self.namespace.as_str(), "connection disposed; connect ignored");
            return;
        }
        let Some(credential) = self.config.credential().map(ToOwned::to_owned) else {
            debug!(
                namespace = self.namespace.as_str(),
                "no credential available; connection attempt skipped"
            );
            return;
        };

        let mut task = lock(&self.task);
        if task.is_some() {
            debug!(namespace = self.namespace.as_str(), "connection loop already running");
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.outbound) = Some(tx);

        let context = LoopContext {
            endpoint: Endpoint {
                namespace: self.namespace,
                base_url: self.config.socket_base_url(),
                credential,
            },
            connector: Arc::clone(&self.connector),
            policy: Arc::clone(&self.policy),
            registry: Arc::clone(&self.registry),
            connected: Arc::clone(&self.connected),
            closed: Arc::clone(&self.closed),
        };
        *task = Some(tokio::spawn(context.run(rx)));
    }

    /// Live transport flag. False when no transport exists. Never panics.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Queue one event for the gateway. Fire-and-forget: while disconnected
    /// the event is dropped silently, not queued for replay.
    pub fn emit(&self, event: ClientEvent) {
        if !self.is_connected() {
            debug!(event = event.name(), "not connected; event dropped");
            return;
        }

        let text = match event.to_envelope().and_then(|envelope| envelope.encode()) {
            Ok(text) => text,
            Err(error) => {
                warn!(event = event.name(), error = %error, "event encode failed; dropped");
                return;
            }
        };

        if let Some(tx) = lock(&self.outbound).as_ref() {
            // A closed channel means teardown raced us; dropping is correct.
            let _ = tx.send(text);
        }
    }

    /// Subscribe `callback` to one event kind. The returned subscription is
    /// the removal capability.
    #[must_use]
    pub fn on<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        lock(&self.registry).on(kind, Arc::new(callback) as Callback)
    }

    /// Remove exactly the callback behind `subscription`.
    pub fn off(&self, subscription: &Subscription) {
        lock(&self.registry).off(subscription);
    }

    /// Total callbacks currently registered.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Tear the connection down. Idempotent. Queued outbound envelopes are
    /// flushed best-effort, the transport is closed, the registry cleared —
    /// a message arriving mid-teardown is a silent drop, and the disposed
    /// connection cannot emit again.
    pub fn disconnect(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.connected.store(false, Ordering::SeqCst);
        // Dropping the sender lets the loop drain already-queued envelopes,
        // then close the transport and exit on its own.
        *lock(&self.outbound) = None;
        drop(lock(&self.task).take());
        lock(&self.registry).clear();
        info!(namespace = self.namespace.as_str(), "connection disposed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// CONNECTION LOOP
// =============================================================================

/// Everything the background loop owns. Holds no reference to the
/// `Connection` itself so teardown never blocks on the loop.
struct LoopContext {
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
    policy: Arc<dyn ReconnectPolicy>,
    registry: Arc<Mutex<ListenerRegistry>>,
    connected: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl LoopContext {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<String>) {
        let namespace = self.endpoint.namespace;
        let mut attempt: u32 = 0;

        loop {
            if self.closed.load(Ordering::SeqCst) {
                break;
            }

            match self.open_preferred().await {
                Ok(mut transport) => {
                    if self.closed.load(Ordering::SeqCst) {
                        transport.close().await;
                        break;
                    }
                    attempt = 0;
                    self.connected.store(true, Ordering::SeqCst);
                    info!(namespace = namespace.as_str(), "transport established");
                    self.dispatch(&ServerEvent::connected(namespace));

                    self.session(transport.as_mut(), &mut rx).await;

                    self.connected.store(false, Ordering::SeqCst);
                    transport.close().await;
                    // Whatever was queued but unsent dies with the transport.
                    while rx.try_recv().is_ok() {}

                    if self.closed.load(Ordering::SeqCst) {
                        break;
                    }
                    info!(namespace = namespace.as_str(), "transport dropped");
                    self.dispatch(&ServerEvent::disconnected(namespace));
                }
                Err(error) => {
                    if self.closed.load(Ordering::SeqCst) {
                        break;
                    }
                    warn!(namespace = namespace.as_str(), error = %error, "connect failed");
                    self.dispatch(&ServerEvent::connect_error(error.to_string()));
                }
            }

            attempt = attempt.saturating_add(1);
            // Budget exhausted: stop retrying. Deliberately no terminal
            // "gave up" event — silence after repeated errors is the signal.
            let Some(delay) = self.policy.next_delay(attempt) else {
                break;
            };
            tokio::time::sleep(delay).await;
        }

        self.connected.store(false, Ordering::SeqCst);
    }

    /// Try each transport kind in preference order; return the first that
    /// opens, or the last error when all refuse.
    async fn open_preferred(&self) -> Result<Box<dyn Transport>, TransportError> {
        let mut last = TransportError::Closed;
        for kind in TransportKind::PREFERENCE {
            match self.connector.open(kind, &self.endpoint).await {
                Ok(transport) => {
                    if kind != TransportKind::WebSocket {
                        info!(
                            namespace = self.endpoint.namespace.as_str(),
                            transport = kind.as_str(),
                            "fell back to secondary transport"
                        );
                    }
                    return Ok(transport);
                }
                Err(error) => {
                    warn!(transport = kind.as_str(), error = %error, "transport open failed");
                    last = error;
                }
            }
        }
        Err(last)
    }

    /// Pump one live transport until it drops or the consumer disconnects.
    async fn session(
        &self,
        transport: &mut dyn Transport,
        rx: &mut mpsc::UnboundedReceiver<String>,
    ) {
        loop {
            tokio::select! {
                outbound = rx.recv() => {
                    match outbound {
                        Some(text) => {
                            if let Err(error) = transport.send(text).await {
                                warn!(error = %error, "send failed; dropping transport");
                                break;
                            }
                        }
                        // Sender gone: disconnect() was called and the queue
                        // is fully drained.
                        None => break,
                    }
                }
                inbound = transport.recv() => {
                    match inbound {
                        Some(Ok(text)) => self.dispatch_text(&text),
                        Some(Err(error)) => {
                            warn!(error = %error, "receive failed; dropping transport");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }
    }

    /// Decode and dispatch one inbound envelope. Undecodable input is logged
    /// and dropped — the wire is not trusted to be well-formed.
    fn dispatch_text(&self, text: &str) {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(error) => {
                debug!(error = %error, "undecodable envelope dropped");
                return;
            }
        };
        match ServerEvent::decode(&envelope) {
            Ok(event) => self.dispatch(&event),
            Err(error) => {
                debug!(event = envelope.event.as_str(), error = %error, "event dropped");
            }
        }
    }

    /// Fan out through the registry. Callbacks run synchronously on this
    /// task, in insertion order, with the lock released so they may
    /// re-subscribe. After teardown this is a silent no-op.
    fn dispatch(&self, event: &ServerEvent) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let callbacks = lock(&self.registry).callbacks_for(event.kind());
        for callback in callbacks {
            callback(event);
        }
    }
}
