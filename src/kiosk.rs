//! Kiosk client — drives one terminal's session lifecycle over `/kiosk`.
//!
//! DESIGN
//! ======
//! The client owns the connection plus a tracker holding the current
//! session id, inferred stage, and the customer's accumulated selections.
//! The gateway assigns the session id on `session_created`; every
//! session-scoped emitter is a guarded no-op until then (there is nothing
//! to attach the id to, so the call is dropped rather than queued). The
//! locally inferred stage is a convenience — a gateway `state_transition`
//! always wins.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::debug;

use crate::backoff::{FixedDelay, ReconnectPolicy};
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::envelope::Namespace;
use crate::event::{EventKind, ServerEvent};
use crate::outbound::{
    AnimalSelectedPayload, ClientEvent, DurationSelectedPayload, DurationTier,
    MotionCompletedPayload, PaymentCompletedPayload, PaymentMethod, PaymentMethodPayload,
    PaymentOutcome, PersonDetectedPayload, SessionCancelledPayload, TicketQrPayload,
    UserInputPayload, VideoTemplatePayload,
};
use crate::registry::Subscription;
use crate::stage::SessionStage;
use crate::transport::{Connector, NetConnector};

// =============================================================================
// SESSION TRACKER
// =============================================================================

/// One end-to-end customer interaction, as known client-side.
#[derive(Clone, Debug)]
pub struct KioskSession {
    /// Gateway-assigned opaque identifier.
    pub id: String,
    pub animal_id: Option<String>,
    pub user_name: Option<String>,
    pub user_message: Option<String>,
    pub duration: Option<DurationTier>,
    pub payment_method: Option<PaymentMethod>,
    pub transaction_id: Option<String>,
    pub video_template_id: Option<String>,
    pub ticket_downloaded: bool,
}

impl KioskSession {
    fn new(id: String) -> Self {
        Self {
            id,
            animal_id: None,
            user_name: None,
            user_message: None,
            duration: None,
            payment_method: None,
            transaction_id: None,
            video_template_id: None,
            ticket_downloaded: false,
        }
    }
}

#[derive(Default)]
struct SessionTracker {
    stage: SessionStage,
    session: Option<KioskSession>,
}

impl SessionTracker {
    fn record(&mut self, event: &ClientEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match event {
            ClientEvent::AnimalSelected(p) => session.animal_id = Some(p.animal_id.clone()),
            ClientEvent::UserInputSubmitted(p) => {
                session.user_name = Some(p.user_name.clone());
                session.user_message = Some(p.user_message.clone());
            }
            ClientEvent::DurationSelected(p) => session.duration = Some(p.duration),
            ClientEvent::PaymentMethodSelected(p) => {
                session.payment_method = Some(p.payment_method);
            }
            ClientEvent::PaymentCompleted(p) => {
                session.transaction_id = Some(p.transaction_id.clone());
            }
            ClientEvent::VideoTemplateSelected(p) => {
                session.video_template_id = Some(p.template_id.clone());
            }
            ClientEvent::TicketQrDownloaded(_) => session.ticket_downloaded = true,
            _ => {}
        }
    }
}

// =============================================================================
// KIOSK CLIENT
// =============================================================================

/// Client instance for one kiosk terminal.
pub struct KioskClient {
    kiosk_id: String,
    conn: Arc<Connection>,
    tracker: Arc<Mutex<SessionTracker>>,
}

impl KioskClient {
    /// Production client over the real network connector with the default
    /// reconnect policy.
    #[must_use]
    pub fn new(kiosk_id: impl Into<String>, config: ClientConfig) -> Self {
        Self::with_parts(
            kiosk_id,
            config,
            Arc::new(NetConnector::new()),
            Arc::new(FixedDelay::default()),
        )
    }

    /// Client with an injected connector and reconnect policy.
    #[must_use]
    pub fn with_parts(
        kiosk_id: impl Into<String>,
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        policy: Arc<dyn ReconnectPolicy>,
    ) -> Self {
        let conn = Arc::new(Connection::new(Namespace::Kiosk, config, connector, policy));
        let tracker = Arc::new(Mutex::new(SessionTracker::default()));

        // Gateway-driven lifecycle: session id assignment, authoritative
        // stage overrides, completion.
        let _created = {
            let tracker = Arc::clone(&tracker);
            conn.on(EventKind::SessionCreated, move |event| {
                if let ServerEvent::SessionCreated(payload) = event {
                    let mut t = lock(&tracker);
                    t.session = Some(KioskSession::new(payload.session_id.clone()));
                    t.stage = SessionStage::CapturingMotion;
                }
            })
        };
        let _transition = {
            let tracker = Arc::clone(&tracker);
            conn.on(EventKind::StateTransition, move |event| {
                if let ServerEvent::StateTransition(payload) = event {
                    lock(&tracker).stage = payload.state;
                }
            })
        };
        let _completed = {
            let tracker = Arc::clone(&tracker);
            conn.on(EventKind::SessionCompleted, move |_event| {
                let mut t = lock(&tracker);
                t.stage = SessionStage::Completed;
                t.session = None;
            })
        };

        Self { kiosk_id: kiosk_id.into(), conn, tracker }
    }

    pub fn connect(&self) {
        self.conn.connect();
    }

    pub fn disconnect(&self) {
        self.conn.disconnect();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    #[must_use]
    pub fn on<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.conn.on(kind, callback)
    }

    pub fn off(&self, subscription: &Subscription) {
        self.conn.off(subscription);
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.conn.listener_count()
    }

    /// Gateway-assigned id of the active session, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        lock(&self.tracker).session.as_ref().map(|session| session.id.clone())
    }

    /// Snapshot of the active session.
    #[must_use]
    pub fn session(&self) -> Option<KioskSession> {
        lock(&self.tracker).session.clone()
    }

    /// Current stage as inferred locally and corrected by the gateway.
    #[must_use]
    pub fn stage(&self) -> SessionStage {
        lock(&self.tracker).stage
    }

    // -------------------------------------------------------------------------
    // Emitters
    // -------------------------------------------------------------------------

    /// A customer stepped in front of the terminal. Kiosk-scoped: no
    /// session exists yet. A fresh detection after a terminal stage starts
    /// the next interaction from `idle`.
    pub fn person_detected(&self, confidence: Option<f64>) {
        {
            let mut t = lock(&self.tracker);
            if t.stage.is_terminal() {
                t.stage = SessionStage::Idle;
                t.session = None;
            }
        }
        self.advance(ClientEvent::PersonDetected(PersonDetectedPayload {
            kiosk_id: self.kiosk_id.clone(),
            confidence,
        }));
    }

    pub fn motion_completed(&self, motion_data: Option<Value>) {
        let Some(session_id) = self.session_scoped("motion_completed") else {
            return;
        };
        self.advance(ClientEvent::MotionCompleted(MotionCompletedPayload {
            session_id,
            motion_data,
        }));
    }

    pub fn animal_selected(&self, animal_id: &str) {
        let Some(session_id) = self.session_scoped("animal_selected") else {
            return;
        };
        self.advance(ClientEvent::AnimalSelected(AnimalSelectedPayload {
            session_id,
            animal_id: animal_id.to_owned(),
        }));
    }

    pub fn user_input_submitted(&self, user_name: &str, user_message: &str) {
        let Some(session_id) = self.session_scoped("user_input_submitted") else {
            return;
        };
        self.advance(ClientEvent::UserInputSubmitted(UserInputPayload {
            session_id,
            user_name: user_name.to_owned(),
            user_message: user_message.to_owned(),
        }));
    }

    pub fn duration_selected(&self, duration: DurationTier) {
        let Some(session_id) = self.session_scoped("duration_selected") else {
            return;
        };
        self.advance(ClientEvent::DurationSelected(DurationSelectedPayload {
            session_id,
            duration,
        }));
    }

    pub fn payment_method_selected(&self, payment_method: PaymentMethod) {
        let Some(session_id) = self.session_scoped("payment_method_selected") else {
            return;
        };
        self.advance(ClientEvent::PaymentMethodSelected(PaymentMethodPayload {
            session_id,
            payment_method,
        }));
    }

    pub fn payment_completed(&self, transaction_id: &str, status: PaymentOutcome) {
        let Some(session_id) = self.session_scoped("payment_completed") else {
            return;
        };
        self.advance(ClientEvent::PaymentCompleted(PaymentCompletedPayload {
            session_id,
            transaction_id: transaction_id.to_owned(),
            status,
        }));
    }

    pub fn video_template_selected(&self, template_id: &str) {
        let Some(session_id) = self.session_scoped("video_template_selected") else {
            return;
        };
        self.advance(ClientEvent::VideoTemplateSelected(VideoTemplatePayload {
            session_id,
            template_id: template_id.to_owned(),
        }));
    }

    pub fn ticket_qr_downloaded(&self) {
        let Some(session_id) = self.session_scoped("ticket_qr_downloaded") else {
            return;
        };
        self.advance(ClientEvent::TicketQrDownloaded(TicketQrPayload { session_id }));
    }

    /// Abort the interaction. The session is cleared locally; the gateway
    /// receives the reason verbatim.
    pub fn session_cancelled(&self, reason: Option<&str>) {
        let Some(session_id) = self.session_scoped("session_cancelled") else {
            return;
        };
        self.advance(ClientEvent::SessionCancelled(SessionCancelledPayload {
            session_id,
            reason: reason.map(ToOwned::to_owned),
        }));
        lock(&self.tracker).session = None;
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Session-scope guard: the id of the active session, or a logged drop.
    fn session_scoped(&self, event: &'static str) -> Option<String> {
        let session_id = self.session_id();
        if session_id.is_none() {
            debug!(event, "no active session; event dropped");
        }
        session_id
    }

    /// Advance the inferred stage, record selections, and emit.
    fn advance(&self, event: ClientEvent) {
        {
            let mut t = lock(&self.tracker);
            t.stage = t.stage.after_emit(&event);
            t.record(&event);
        }
        self.conn.emit(event);
    }
}

fn lock(tracker: &Mutex<SessionTracker>) -> std::sync::MutexGuard<'_, SessionTracker> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}
