//! Client-originated events and their wire payloads.
//!
//! DESIGN
//! ======
//! One tagged variant per event the client may emit, each carrying an
//! explicit payload struct serialized with the gateway's camelCase field
//! names. Kiosk-side events repeat their event name inside the payload
//! (gateway correlation requirement); the dashboard room messages do not.

#[cfg(test)]
#[path = "outbound_test.rs"]
mod outbound_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::{CodecError, EVENT_FIELD, Envelope};

// =============================================================================
// PROTOCOL VALUE ENUMS
// =============================================================================

/// Ticket validity tier offered during duration selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationTier {
    #[serde(rename = "1_day")]
    OneDay,
    #[serde(rename = "30_days")]
    ThirtyDays,
    #[serde(rename = "6_months")]
    SixMonths,
    #[serde(rename = "1_year")]
    OneYear,
}

impl DurationTier {
    /// Wire value of the tier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1_day",
            Self::ThirtyDays => "30_days",
            Self::SixMonths => "6_months",
            Self::OneYear => "1_year",
        }
    }
}

/// Payment instrument picked at the kiosk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    MobileQr,
    CreditCard,
}

impl PaymentMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MobileQr => "mobile_qr",
            Self::CreditCard => "credit_card",
        }
    }
}

/// Terminal outcome of one payment attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Completed,
    Failed,
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// `person_detected` — kiosk-scoped; no session exists yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetectedPayload {
    pub kiosk_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionCompletedPayload {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_data: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalSelectedPayload {
    pub session_id: String,
    pub animal_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInputPayload {
    pub session_id: String,
    pub user_name: String,
    pub user_message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationSelectedPayload {
    pub session_id: String,
    pub duration: DurationTier,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodPayload {
    pub session_id: String,
    pub payment_method: PaymentMethod,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompletedPayload {
    pub session_id: String,
    pub transaction_id: String,
    pub status: PaymentOutcome,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTemplatePayload {
    pub session_id: String,
    pub template_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketQrPayload {
    pub session_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCancelledPayload {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// `join_project` / `leave_project` — dashboard room membership messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRoomPayload {
    pub project_id: String,
}

// =============================================================================
// CLIENT EVENT
// =============================================================================

/// Every event this client may put on the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    PersonDetected(PersonDetectedPayload),
    MotionCompleted(MotionCompletedPayload),
    AnimalSelected(AnimalSelectedPayload),
    UserInputSubmitted(UserInputPayload),
    DurationSelected(DurationSelectedPayload),
    PaymentMethodSelected(PaymentMethodPayload),
    PaymentCompleted(PaymentCompletedPayload),
    VideoTemplateSelected(VideoTemplatePayload),
    TicketQrDownloaded(TicketQrPayload),
    SessionCancelled(SessionCancelledPayload),
    JoinProject(ProjectRoomPayload),
    LeaveProject(ProjectRoomPayload),
}

impl ClientEvent {
    /// Wire event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PersonDetected(_) => "person_detected",
            Self::MotionCompleted(_) => "motion_completed",
            Self::AnimalSelected(_) => "animal_selected",
            Self::UserInputSubmitted(_) => "user_input_submitted",
            Self::DurationSelected(_) => "duration_selected",
            Self::PaymentMethodSelected(_) => "payment_method_selected",
            Self::PaymentCompleted(_) => "payment_completed",
            Self::VideoTemplateSelected(_) => "video_template_selected",
            Self::TicketQrDownloaded(_) => "ticket_qr_downloaded",
            Self::SessionCancelled(_) => "session_cancelled",
            Self::JoinProject(_) => "join_project",
            Self::LeaveProject(_) => "leave_project",
        }
    }

    /// Kiosk-originated envelopes repeat the event name inside the payload.
    /// Room membership messages are dispatched on the transport name alone.
    #[must_use]
    pub fn embeds_event_name(&self) -> bool {
        !matches!(self, Self::JoinProject(_) | Self::LeaveProject(_))
    }

    /// Build the wire envelope for this event.
    pub fn to_envelope(&self) -> Result<Envelope, CodecError> {
        let serialized = match self {
            Self::PersonDetected(p) => serde_json::to_value(p),
            Self::MotionCompleted(p) => serde_json::to_value(p),
            Self::AnimalSelected(p) => serde_json::to_value(p),
            Self::UserInputSubmitted(p) => serde_json::to_value(p),
            Self::DurationSelected(p) => serde_json::to_value(p),
            Self::PaymentMethodSelected(p) => serde_json::to_value(p),
            Self::PaymentCompleted(p) => serde_json::to_value(p),
            Self::VideoTemplateSelected(p) => serde_json::to_value(p),
            Self::TicketQrDownloaded(p) => serde_json::to_value(p),
            Self::SessionCancelled(p) => serde_json::to_value(p),
            Self::JoinProject(p) => serde_json::to_value(p),
            Self::LeaveProject(p) => serde_json::to_value(p),
        };

        let mut data = serialized.map_err(|source| CodecError::Payload { event: self.name(), source })?;
        if self.embeds_event_name() {
            if let Value::Object(map) = &mut data {
                map.insert(EVENT_FIELD.to_owned(), Value::String(self.name().to_owned()));
            }
        }

        Ok(Envelope { event: self.name().to_owned(), data })
    }
}
