//! kioskwire — realtime client core for the kiosk platform.
//!
//! ARCHITECTURE
//! ============
//! Two client instances speak one wire format over separate namespaces:
//! [`KioskClient`] drives a terminal's session lifecycle on `/kiosk`, and
//! [`DashboardClient`] observes project activity on `/dashboard`. Both own
//! a [`Connection`] — an authenticated transport plus a typed listener
//! registry — and never share state with each other.
//!
//! Inbound envelopes decode into [`ServerEvent`] at the connection
//! boundary; outbound traffic is a [`ClientEvent`]. REST CRUD, token
//! acquisition, and UI rendering live outside this crate: on aggregate
//! changes the dashboard side only signals staleness
//! ([`CacheInvalidator`]), and the consumer re-fetches over REST.

pub mod backoff;
pub mod config;
pub mod connection;
pub mod dashboard;
pub mod envelope;
pub mod event;
pub mod kiosk;
pub mod outbound;
pub mod registry;
pub mod rooms;
pub mod stage;
pub mod transport;

pub use backoff::{ExponentialBackoff, FixedDelay, ReconnectPolicy};
pub use config::ClientConfig;
pub use connection::Connection;
pub use dashboard::{CacheInvalidator, DASHBOARD_QUERY_KEY, DashboardClient, STATISTICS_QUERY_KEY};
pub use envelope::{CodecError, Envelope, Namespace};
pub use event::{CONNECT_ERROR_CODE, EventKind, ServerEvent};
pub use kiosk::{KioskClient, KioskSession};
pub use outbound::{ClientEvent, DurationTier, PaymentMethod, PaymentOutcome};
pub use registry::{ListenerRegistry, Subscription};
pub use rooms::ProjectScope;
pub use stage::SessionStage;
pub use transport::{Connector, Endpoint, NetConnector, Transport, TransportError, TransportKind};
