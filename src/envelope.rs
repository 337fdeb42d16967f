//! Envelope — the universal message unit on the realtime wire.
//!
//! DESIGN
//! ======
//! Every message exchanged with the gateway is an envelope: a discriminant
//! event name plus a free-form JSON payload. Inbound envelopes are decoded
//! into typed events at the connection boundary; outbound envelopes are
//! produced from typed client events. The envelope itself never inspects
//! its payload.
//!
//! Kiosk-originated envelopes additionally repeat the event name inside the
//! payload (`data.event`) — the gateway correlates on the payload copy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Payload key carrying the repeated event name on kiosk-originated envelopes.
pub const EVENT_FIELD: &str = "event";

/// Payload key carrying the session identifier on session-scoped envelopes.
pub const SESSION_FIELD: &str = "sessionId";

// =============================================================================
// TYPES
// =============================================================================

/// Logical channel space on the shared transport. Kiosk terminals and
/// dashboard viewers speak the same wire format over separate namespaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Kiosk,
    Dashboard,
}

impl Namespace {
    /// URL path of the namespace, e.g. `"/kiosk"`.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Kiosk => "/kiosk",
            Self::Dashboard => "/dashboard",
        }
    }

    /// Bare namespace label used in logs and synthesized event names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kiosk => "kiosk",
            Self::Dashboard => "dashboard",
        }
    }
}

/// Error returned by envelope encode/decode and typed payload decode.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw text is not a valid JSON envelope.
    #[error("invalid envelope json: {0}")]
    Json(#[from] serde_json::Error),
    /// The envelope's event name is not part of the protocol.
    #[error("unknown event name: {0}")]
    UnknownEvent(String),
    /// The payload does not match the shape declared for the event.
    #[error("invalid payload for `{event}`: {source}")]
    Payload {
        event: &'static str,
        source: serde_json::Error,
    },
}

/// The named, payload-carrying unit of communication.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event discriminant, e.g. `"session_created"`.
    pub event: String,
    /// Free-form JSON payload. Defaults to an empty object when absent.
    #[serde(default = "empty_object")]
    pub data: Value,
}

pub(crate) fn empty_object() -> Value {
    Value::Object(Map::new())
}

// =============================================================================
// CONSTRUCTORS & CODEC
// =============================================================================

impl Envelope {
    /// Create an envelope with an empty payload.
    pub fn new(event: impl Into<String>) -> Self {
        Self { event: event.into(), data: empty_object() }
    }

    /// Insert one payload key. Non-object payloads are left untouched.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Value::Object(map) = &mut self.data {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Decode an envelope from wire text.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode the envelope to wire text.
    pub fn encode(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// TESTS
// =============================================================================
