//! Listener registry — per-connection fan-out of typed events.
//!
//! DESIGN
//! ======
//! Each connection owns one registry mapping an event kind to the callbacks
//! subscribed to it. Removal uses the stable token handed back by `on`, so
//! two subscriptions of the same closure stay independently removable.
//! Dispatch walks callbacks in insertion order; dispatching a kind nobody
//! listens to is a no-op. Clearing the registry stops all further dispatch,
//! including messages already in flight at teardown.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::HashMap;
use std::sync::Arc;

use crate::event::{EventKind, ServerEvent};

/// Shared callback invoked with each dispatched event.
pub type Callback = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Capability returned by [`ListenerRegistry::on`]. Passing it back to `off`
/// removes exactly the callback it was issued for.
#[derive(Debug)]
pub struct Subscription {
    kind: EventKind,
    token: u64,
}

impl Subscription {
    /// Kind this subscription listens to.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// Event-kind to callback-set mapping for one connection.
#[derive(Default)]
pub struct ListenerRegistry {
    next_token: u64,
    listeners: HashMap<EventKind, Vec<(u64, Callback)>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` under `kind`.
    #[must_use]
    pub fn on(&mut self, kind: EventKind, callback: Callback) -> Subscription {
        let token = self.next_token;
        self.next_token += 1;
        self.listeners.entry(kind).or_default().push((token, callback));
        Subscription { kind, token }
    }

    /// Remove the callback identified by `subscription`. Returns whether a
    /// callback was actually removed (false after `clear` or a double `off`).
    pub fn off(&mut self, subscription: &Subscription) -> bool {
        let Some(entries) = self.listeners.get_mut(&subscription.kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(token, _)| *token != subscription.token);
        let removed = entries.len() < before;
        if entries.is_empty() {
            self.listeners.remove(&subscription.kind);
        }
        removed
    }

    /// Invoke every callback registered for the event's kind, in insertion
    /// order. No listeners is a silent no-op.
    pub fn dispatch(&self, event: &ServerEvent) {
        let Some(entries) = self.listeners.get(&event.kind()) else {
            return;
        };
        for (_, callback) in entries {
            callback(event);
        }
    }

    /// Snapshot the callbacks for one kind. Lets the dispatch loop invoke
    /// callbacks without holding the registry lock, so a callback may
    /// re-enter `on`/`off`.
    pub(crate) fn callbacks_for(&self, kind: EventKind) -> Vec<Callback> {
        self.listeners
            .get(&kind)
            .map(|entries| entries.iter().map(|(_, callback)| Arc::clone(callback)).collect())
            .unwrap_or_default()
    }

    /// Drop every callback. Previously issued subscriptions become inert.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Total registered callbacks across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
