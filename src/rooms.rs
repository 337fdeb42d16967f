//! Project scope — desired-room tracking one layer above the pass-through
//! join/leave calls.
//!
//! DESIGN
//! ======
//! The room calls themselves are stateless (see
//! [`DashboardClient::join_project_room`]); this owner tracks which project
//! the viewer currently wants. On a scope change it leaves the old room and
//! joins the new one; on every `dashboard_connected` it re-issues the join,
//! which covers both "scope was set before the connection existed" and
//! reconnects. Teardown leaves the room before the caller disconnects.

use std::sync::{Arc, Mutex, PoisonError};

use crate::connection::Connection;
use crate::dashboard::DashboardClient;
use crate::event::EventKind;
use crate::outbound::{ClientEvent, ProjectRoomPayload};
use crate::registry::Subscription;

/// Owner of one dashboard view's desired project scope.
pub struct ProjectScope {
    conn: Arc<Connection>,
    desired: Arc<Mutex<Option<String>>>,
    rejoin: Mutex<Option<Subscription>>,
}

impl ProjectScope {
    /// Create the scope owner and register its re-join listener. Create it
    /// before calling `connect` so the first `dashboard_connected` already
    /// joins a previously requested scope.
    #[must_use]
    pub fn new(client: &DashboardClient) -> Self {
        let conn = client.connection();
        let desired = Arc::new(Mutex::new(None));

        let rejoin = {
            let desired = Arc::clone(&desired);
            // Weak: the registry lives inside the connection, so a strong
            // handle here would keep the connection alive through its own
            // listener.
            let weak = Arc::downgrade(&conn);
            conn.on(EventKind::DashboardConnected, move |_event| {
                let Some(conn) = weak.upgrade() else {
                    return;
                };
                let Some(project_id) = lock(&desired).clone() else {
                    return;
                };
                conn.emit(ClientEvent::JoinProject(ProjectRoomPayload { project_id }));
            })
        };

        Self { conn, desired, rejoin: Mutex::new(Some(rejoin)) }
    }

    /// Change the desired project. `None` leaves the current room without
    /// joining another. Setting the already-desired project is a no-op.
    pub fn set_project(&self, next: Option<&str>) {
        let mut desired = lock(&self.desired);
        if desired.as_deref() == next {
            return;
        }

        if let Some(previous) = desired.take() {
            self.conn
                .emit(ClientEvent::LeaveProject(ProjectRoomPayload { project_id: previous }));
        }
        if let Some(project_id) = next {
            *desired = Some(project_id.to_owned());
            self.conn.emit(ClientEvent::JoinProject(ProjectRoomPayload {
                project_id: project_id.to_owned(),
            }));
        }
    }

    /// Currently desired project, if any.
    #[must_use]
    pub fn project(&self) -> Option<String> {
        lock(&self.desired).clone()
    }

    /// Leave the current room (if any) and drop the re-join listener. Call
    /// before disconnecting the client.
    pub fn teardown(&self) {
        if let Some(project_id) = lock(&self.desired).take() {
            self.conn.emit(ClientEvent::LeaveProject(ProjectRoomPayload { project_id }));
        }
        if let Some(subscription) = lock(&self.rejoin).take() {
            self.conn.off(&subscription);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
