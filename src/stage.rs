//! Session stage machine for one kiosk customer interaction.
//!
//! DESIGN
//! ======
//! The stage advances as the kiosk emits lifecycle events, in the fixed
//! order of the self-service flow. Emitting an event from the wrong stage
//! leaves the stage unchanged — the gateway enforces ordering; this side is
//! a convenience inference. A `state_transition` pushed by the gateway is
//! authoritative and overwrites whatever was inferred locally.

#[cfg(test)]
#[path = "stage_test.rs"]
mod stage_test;

use serde::{Deserialize, Serialize};

use crate::outbound::{ClientEvent, PaymentOutcome};

/// Logical stage of a kiosk session, from attract loop to ticket in hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    #[default]
    Idle,
    AwaitingPresence,
    CapturingMotion,
    SelectingTemplate,
    CollectingInput,
    SelectingDuration,
    SelectingPaymentMethod,
    ProcessingPayment,
    GeneratingMedia,
    TicketReady,
    Completed,
    Cancelled,
    Error,
}

impl SessionStage {
    /// Wire value of the stage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingPresence => "awaiting_presence",
            Self::CapturingMotion => "capturing_motion",
            Self::SelectingTemplate => "selecting_template",
            Self::CollectingInput => "collecting_input",
            Self::SelectingDuration => "selecting_duration",
            Self::SelectingPaymentMethod => "selecting_payment_method",
            Self::ProcessingPayment => "processing_payment",
            Self::GeneratingMedia => "generating_media",
            Self::TicketReady => "ticket_ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }

    /// Terminal stages end the interaction; only a fresh presence detection
    /// starts a new one.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Error)
    }

    /// Stage after emitting `event` from this stage.
    ///
    /// Out-of-order emissions keep the current stage. A failed payment stays
    /// in `processing_payment`; the customer re-selects a payment method and
    /// retries (retry policy lives on the gateway). Cancellation is accepted
    /// from any non-terminal stage.
    #[must_use]
    pub fn after_emit(self, event: &ClientEvent) -> Self {
        match (self, event) {
            (Self::Idle, ClientEvent::PersonDetected(_)) => Self::AwaitingPresence,
            (Self::CapturingMotion, ClientEvent::MotionCompleted(_)) => Self::SelectingTemplate,
            (Self::SelectingTemplate, ClientEvent::AnimalSelected(_)) => Self::CollectingInput,
            (Self::CollectingInput, ClientEvent::UserInputSubmitted(_)) => Self::SelectingDuration,
            (Self::SelectingDuration, ClientEvent::DurationSelected(_)) => {
                Self::SelectingPaymentMethod
            }
            (Self::SelectingPaymentMethod, ClientEvent::PaymentMethodSelected(_)) => {
                Self::ProcessingPayment
            }
            (Self::ProcessingPayment, ClientEvent::PaymentCompleted(payload))
                if payload.status == PaymentOutcome::Completed =>
            {
                Self::GeneratingMedia
            }
            (stage, ClientEvent::SessionCancelled(_)) if !stage.is_terminal() => Self::Cancelled,
            (stage, _) => stage,
        }
    }
}
