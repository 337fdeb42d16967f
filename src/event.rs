//! Server-pushed events, decoded at the connection boundary.
//!
//! DESIGN
//! ======
//! Inbound envelopes are matched by event name and their payloads decoded
//! into one struct per event — a payload-shape mismatch is caught here, not
//! deep inside a consumer callback. Dashboard per-entity change events keep
//! their payloads opaque (`Value`): the entity wire shapes belong to the
//! REST layer, and this core only relays the notification.
//!
//! The `<namespace>_connected` / `<namespace>_disconnected` / connect-time
//! `error` events are synthesized locally by the connection manager; they
//! flow through the same registry as gateway-pushed events.

#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope::{CodecError, Envelope, Namespace};
use crate::outbound::PaymentOutcome;
use crate::stage::SessionStage;

/// Fixed code carried by locally synthesized transport `error` events.
pub const CONNECT_ERROR_CODE: &str = "connection_error";

// =============================================================================
// EVENT KIND
// =============================================================================

/// Discriminant of every observable event. Registry keys are kinds, not
/// free-form strings, so a subscription to a nonexistent event cannot be
/// expressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Synthesized by the connection manager.
    KioskConnected,
    KioskDisconnected,
    DashboardConnected,
    DashboardDisconnected,
    // Kiosk namespace, gateway-pushed.
    SessionCreated,
    StateTransition,
    PaymentQrGenerated,
    PaymentStatusUpdated,
    VideoGenerationProgress,
    VideoGenerationCompleted,
    TicketGenerated,
    SessionCompleted,
    Error,
    // Dashboard namespace, gateway-pushed.
    DashboardUpdate,
    ScheduleStatusUpdate,
    ScheduleCreated,
    ScheduleUpdated,
    ScheduleDeleted,
    ContentPcStatusUpdate,
    ContentPcCreated,
    ContentPcUpdated,
    ContentPcDeleted,
    StatisticsUpdated,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 23] = [
        Self::KioskConnected,
        Self::KioskDisconnected,
        Self::DashboardConnected,
        Self::DashboardDisconnected,
        Self::SessionCreated,
        Self::StateTransition,
        Self::PaymentQrGenerated,
        Self::PaymentStatusUpdated,
        Self::VideoGenerationProgress,
        Self::VideoGenerationCompleted,
        Self::TicketGenerated,
        Self::SessionCompleted,
        Self::Error,
        Self::DashboardUpdate,
        Self::ScheduleStatusUpdate,
        Self::ScheduleCreated,
        Self::ScheduleUpdated,
        Self::ScheduleDeleted,
        Self::ContentPcStatusUpdate,
        Self::ContentPcCreated,
        Self::ContentPcUpdated,
        Self::ContentPcDeleted,
        Self::StatisticsUpdated,
    ];

    /// Wire event name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::KioskConnected => "kiosk_connected",
            Self::KioskDisconnected => "kiosk_disconnected",
            Self::DashboardConnected => "dashboard_connected",
            Self::DashboardDisconnected => "dashboard_disconnected",
            Self::SessionCreated => "session_created",
            Self::StateTransition => "state_transition",
            Self::PaymentQrGenerated => "payment_qr_generated",
            Self::PaymentStatusUpdated => "payment_status_updated",
            Self::VideoGenerationProgress => "video_generation_progress",
            Self::VideoGenerationCompleted => "video_generation_completed",
            Self::TicketGenerated => "ticket_generated",
            Self::SessionCompleted => "session_completed",
            Self::Error => "error",
            Self::DashboardUpdate => "dashboard_update",
            Self::ScheduleStatusUpdate => "schedule_status_update",
            Self::ScheduleCreated => "schedule_created",
            Self::ScheduleUpdated => "schedule_updated",
            Self::ScheduleDeleted => "schedule_deleted",
            Self::ContentPcStatusUpdate => "content_pc_status_update",
            Self::ContentPcCreated => "content_pc_created",
            Self::ContentPcUpdated => "content_pc_updated",
            Self::ContentPcDeleted => "content_pc_deleted",
            Self::StatisticsUpdated => "statistics_updated",
        }
    }

    /// Parse a wire event name. `None` for names outside the protocol.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Empty payload of the synthesized connected/disconnected events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectedPayload {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedPayload {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kiosk_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransitionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub state: SessionStage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQrPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_data: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: PaymentOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoProgressPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Completion fraction or percentage as sent by the media pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCompletedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_data: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCompletedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// `error` payload. Gateway errors pass through unchanged: unknown fields
/// land in `extra` and survive re-encoding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// SERVER EVENT
// =============================================================================

/// Every event observable through the listener registry.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    KioskConnected(ConnectedPayload),
    KioskDisconnected(ConnectedPayload),
    DashboardConnected(ConnectedPayload),
    DashboardDisconnected(ConnectedPayload),
    SessionCreated(SessionCreatedPayload),
    StateTransition(StateTransitionPayload),
    PaymentQrGenerated(PaymentQrPayload),
    PaymentStatusUpdated(PaymentStatusPayload),
    VideoGenerationProgress(VideoProgressPayload),
    VideoGenerationCompleted(VideoCompletedPayload),
    TicketGenerated(TicketPayload),
    SessionCompleted(SessionCompletedPayload),
    Error(ErrorPayload),
    DashboardUpdate(Value),
    ScheduleStatusUpdate(Value),
    ScheduleCreated(Value),
    ScheduleUpdated(Value),
    ScheduleDeleted(Value),
    ContentPcStatusUpdate(Value),
    ContentPcCreated(Value),
    ContentPcUpdated(Value),
    ContentPcDeleted(Value),
    StatisticsUpdated(Value),
}

fn payload<T: serde::de::DeserializeOwned>(
    kind: EventKind,
    data: Value,
) -> Result<T, CodecError> {
    serde_json::from_value(data).map_err(|source| CodecError::Payload { event: kind.name(), source })
}

impl ServerEvent {
    /// Discriminant of this event, the registry key.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::KioskConnected(_) => EventKind::KioskConnected,
            Self::KioskDisconnected(_) => EventKind::KioskDisconnected,
            Self::DashboardConnected(_) => EventKind::DashboardConnected,
            Self::DashboardDisconnected(_) => EventKind::DashboardDisconnected,
            Self::SessionCreated(_) => EventKind::SessionCreated,
            Self::StateTransition(_) => EventKind::StateTransition,
            Self::PaymentQrGenerated(_) => EventKind::PaymentQrGenerated,
            Self::PaymentStatusUpdated(_) => EventKind::PaymentStatusUpdated,
            Self::VideoGenerationProgress(_) => EventKind::VideoGenerationProgress,
            Self::VideoGenerationCompleted(_) => EventKind::VideoGenerationCompleted,
            Self::TicketGenerated(_) => EventKind::TicketGenerated,
            Self::SessionCompleted(_) => EventKind::SessionCompleted,
            Self::Error(_) => EventKind::Error,
            Self::DashboardUpdate(_) => EventKind::DashboardUpdate,
            Self::ScheduleStatusUpdate(_) => EventKind::ScheduleStatusUpdate,
            Self::ScheduleCreated(_) => EventKind::ScheduleCreated,
            Self::ScheduleUpdated(_) => EventKind::ScheduleUpdated,
            Self::ScheduleDeleted(_) => EventKind::ScheduleDeleted,
            Self::ContentPcStatusUpdate(_) => EventKind::ContentPcStatusUpdate,
            Self::ContentPcCreated(_) => EventKind::ContentPcCreated,
            Self::ContentPcUpdated(_) => EventKind::ContentPcUpdated,
            Self::ContentPcDeleted(_) => EventKind::ContentPcDeleted,
            Self::StatisticsUpdated(_) => EventKind::StatisticsUpdated,
        }
    }

    /// Decode a wire envelope into a typed event.
    pub fn decode(envelope: &Envelope) -> Result<Self, CodecError> {
        let kind = EventKind::from_name(&envelope.event)
            .ok_or_else(|| CodecError::UnknownEvent(envelope.event.clone()))?;
        Self::from_kind(kind, envelope.data.clone())
    }

    fn from_kind(kind: EventKind, data: Value) -> Result<Self, CodecError> {
        Ok(match kind {
            EventKind::KioskConnected => Self::KioskConnected(payload(kind, data)?),
            EventKind::KioskDisconnected => Self::KioskDisconnected(payload(kind, data)?),
            EventKind::DashboardConnected => Self::DashboardConnected(payload(kind, data)?),
            EventKind::DashboardDisconnected => Self::DashboardDisconnected(payload(kind, data)?),
            EventKind::SessionCreated => Self::SessionCreated(payload(kind, data)?),
            EventKind::StateTransition => Self::StateTransition(payload(kind, data)?),
            EventKind::PaymentQrGenerated => Self::PaymentQrGenerated(payload(kind, data)?),
            EventKind::PaymentStatusUpdated => Self::PaymentStatusUpdated(payload(kind, data)?),
            EventKind::VideoGenerationProgress => {
                Self::VideoGenerationProgress(payload(kind, data)?)
            }
            EventKind::VideoGenerationCompleted => {
                Self::VideoGenerationCompleted(payload(kind, data)?)
            }
            EventKind::TicketGenerated => Self::TicketGenerated(payload(kind, data)?),
            EventKind::SessionCompleted => Self::SessionCompleted(payload(kind, data)?),
            EventKind::Error => Self::Error(payload(kind, data)?),
            EventKind::DashboardUpdate => Self::DashboardUpdate(data),
            EventKind::ScheduleStatusUpdate => Self::ScheduleStatusUpdate(data),
            EventKind::ScheduleCreated => Self::ScheduleCreated(data),
            EventKind::ScheduleUpdated => Self::ScheduleUpdated(data),
            EventKind::ScheduleDeleted => Self::ScheduleDeleted(data),
            EventKind::ContentPcStatusUpdate => Self::ContentPcStatusUpdate(data),
            EventKind::ContentPcCreated => Self::ContentPcCreated(data),
            EventKind::ContentPcUpdated => Self::ContentPcUpdated(data),
            EventKind::ContentPcDeleted => Self::ContentPcDeleted(data),
            EventKind::StatisticsUpdated => Self::StatisticsUpdated(data),
        })
    }

    /// Re-encode the event as a wire envelope. The contract is symmetric, so
    /// a gateway implementation can reuse this side unchanged.
    pub fn to_envelope(&self) -> Result<Envelope, CodecError> {
        let serialized = match self {
            Self::KioskConnected(p)
            | Self::KioskDisconnected(p)
            | Self::DashboardConnected(p)
            | Self::DashboardDisconnected(p) => serde_json::to_value(p),
            Self::SessionCreated(p) => serde_json::to_value(p),
            Self::StateTransition(p) => serde_json::to_value(p),
            Self::PaymentQrGenerated(p) => serde_json::to_value(p),
            Self::PaymentStatusUpdated(p) => serde_json::to_value(p),
            Self::VideoGenerationProgress(p) => serde_json::to_value(p),
            Self::VideoGenerationCompleted(p) => serde_json::to_value(p),
            Self::TicketGenerated(p) => serde_json::to_value(p),
            Self::SessionCompleted(p) => serde_json::to_value(p),
            Self::Error(p) => serde_json::to_value(p),
            Self::DashboardUpdate(v)
            | Self::ScheduleStatusUpdate(v)
            | Self::ScheduleCreated(v)
            | Self::ScheduleUpdated(v)
            | Self::ScheduleDeleted(v)
            | Self::ContentPcStatusUpdate(v)
            | Self::ContentPcCreated(v)
            | Self::ContentPcUpdated(v)
            | Self::ContentPcDeleted(v)
            | Self::StatisticsUpdated(v) => Ok(v.clone()),
        };

        let data = serialized
            .map_err(|source| CodecError::Payload { event: self.kind().name(), source })?;
        Ok(Envelope { event: self.kind().name().to_owned(), data })
    }

    /// Synthesized `<namespace>_connected` event.
    #[must_use]
    pub fn connected(namespace: Namespace) -> Self {
        match namespace {
            Namespace::Kiosk => Self::KioskConnected(ConnectedPayload {}),
            Namespace::Dashboard => Self::DashboardConnected(ConnectedPayload {}),
        }
    }

    /// Synthesized `<namespace>_disconnected` event.
    #[must_use]
    pub fn disconnected(namespace: Namespace) -> Self {
        match namespace {
            Namespace::Kiosk => Self::KioskDisconnected(ConnectedPayload {}),
            Namespace::Dashboard => Self::DashboardDisconnected(ConnectedPayload {}),
        }
    }

    /// Synthesized transport-failure `error` event.
    #[must_use]
    pub fn connect_error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            code: Some(CONNECT_ERROR_CODE.to_owned()),
            message: Some(message.into()),
            extra: Map::new(),
        })
    }
}
