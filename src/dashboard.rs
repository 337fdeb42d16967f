//! Dashboard client — observes project activity over `/dashboard`.
//!
//! DESIGN
//! ======
//! Aggregate updates are push-to-invalidate, pull-to-refresh: the gateway
//! says *that* something changed, never *what*. [`CacheInvalidator`] turns
//! those signals into query-key invalidations for whatever query cache the
//! UI layer runs; the consumer re-fetches authoritative data over REST.
//! Per-entity change events (`schedule_*`, `content_pc_*`) are relayed
//! through the registry one by one — coalescing bursts is the consumer's
//! call.

use std::mem;
use std::sync::{Arc, Mutex, PoisonError};

use crate::backoff::{FixedDelay, ReconnectPolicy};
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::envelope::Namespace;
use crate::event::{EventKind, ServerEvent};
use crate::outbound::{ClientEvent, ProjectRoomPayload};
use crate::registry::Subscription;
use crate::transport::{Connector, NetConnector};

/// Query key invalidated when aggregate statistics change.
pub const STATISTICS_QUERY_KEY: &[&str] = &["statistics"];

/// Query key invalidated on the catch-all dashboard update signal.
pub const DASHBOARD_QUERY_KEY: &[&str] = &["dashboard"];

// =============================================================================
// DASHBOARD CLIENT
// =============================================================================

/// Client instance for one dashboard viewer.
pub struct DashboardClient {
    conn: Arc<Connection>,
}

impl DashboardClient {
    /// Production client over the real network connector with the default
    /// reconnect policy.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_parts(config, Arc::new(NetConnector::new()), Arc::new(FixedDelay::default()))
    }

    /// Client with an injected connector and reconnect policy.
    #[must_use]
    pub fn with_parts(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        policy: Arc<dyn ReconnectPolicy>,
    ) -> Self {
        Self { conn: Arc::new(Connection::new(Namespace::Dashboard, config, connector, policy)) }
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

    /// Subscribe to one project's broadcasts. Thin pass-through: no local
    /// bookkeeping, and a silent drop while disconnected. Desired-scope
    /// tracking lives in [`crate::rooms::ProjectScope`].
    pub fn join_project_room(&self, project_id: &str) {
        self.conn
            .emit(ClientEvent::JoinProject(ProjectRoomPayload { project_id: project_id.to_owned() }));
    }

    /// Leave one project's broadcasts. Same pass-through semantics as join.
    pub fn leave_project_room(&self, project_id: &str) {
        self.conn
            .emit(ClientEvent::LeaveProject(ProjectRoomPayload { project_id: project_id.to_owned() }));
    }

    pub(crate) fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.conn)
    }
}

// =============================================================================
// CACHE INVALIDATOR
// =============================================================================

/// Bridges change notifications to the consumer's query cache. The hook
/// receives a query key and nothing else — payloads never carry data.
pub struct CacheInvalidator {
    conn: Arc<Connection>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl CacheInvalidator {
    /// Wire the invalidation hook to `statistics_updated` and
    /// `dashboard_update`.
    #[must_use]
    pub fn attach<F>(client: &DashboardClient, hook: F) -> Self
    where
        F: Fn(&'static [&'static str]) + Send + Sync + 'static,
    {
        let conn = client.connection();
        let hook = Arc::new(hook);

        let statistics = {
            let hook = Arc::clone(&hook);
            conn.on(EventKind::StatisticsUpdated, move |_event| hook(STATISTICS_QUERY_KEY))
        };
        let general = conn.on(EventKind::DashboardUpdate, move |_event| hook(DASHBOARD_QUERY_KEY));

        Self { conn, subscriptions: Mutex::new(vec![statistics, general]) }
    }

    /// Unhook both listeners. Idempotent.
    pub fn detach(&self) {
        let subscriptions = mem::take(
            &mut *self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for subscription in &subscriptions {
            self.conn.off(subscription);
        }
    }
}
