//! Kiosk session lifecycle against a recording mock transport.

mod support;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use kioskwire::event::{SessionCreatedPayload, StateTransitionPayload};
use kioskwire::{
    ClientConfig, DurationTier, FixedDelay, KioskClient, PaymentMethod, PaymentOutcome,
    ServerEvent, SessionStage,
};
use support::{MockHandle, mock_connector, wait_until};

fn kiosk_client() -> (KioskClient, MockHandle) {
    let (connector, handle) = mock_connector();
    let config = ClientConfig::new("https://park.example.test/api/v1").with_credential("tok");
    let client = KioskClient::with_parts(
        "kiosk-7",
        config,
        connector,
        Arc::new(FixedDelay::new(0, Duration::from_millis(10))),
    );
    (client, handle)
}

fn session_created(session_id: &str) -> ServerEvent {
    ServerEvent::SessionCreated(SessionCreatedPayload {
        session_id: session_id.to_owned(),
        kiosk_id: Some("kiosk-7".to_owned()),
    })
}

#[tokio::test]
async fn kiosk_connects_to_its_namespace() {
    let (client, handle) = kiosk_client();
    client.connect();
    wait_until(|| client.is_connected()).await;

    let opened = handle.opened();
    assert!(opened[0].url.contains("/kiosk"), "url: {}", opened[0].url);
    client.disconnect();
}

#[tokio::test]
async fn session_scoped_emitters_are_no_ops_without_a_session() {
    let (client, handle) = kiosk_client();
    client.connect();
    wait_until(|| client.is_connected()).await;
    let link = handle.link().await;

    client.motion_completed(None);
    client.animal_selected("otter");
    client.user_input_submitted("Mina", "hi");
    client.duration_selected(DurationTier::OneDay);
    client.payment_method_selected(PaymentMethod::CreditCard);
    client.payment_completed("txn-1", PaymentOutcome::Completed);
    client.video_template_selected("tpl-1");
    client.ticket_qr_downloaded();
    client.session_cancelled(None);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(link.sent_count(), 0);

    client.disconnect();
}

#[tokio::test]
async fn person_detected_is_kiosk_scoped_and_needs_no_session() {
    let (client, handle) = kiosk_client();
    client.connect();
    wait_until(|| client.is_connected()).await;
    let link = handle.link().await;

    client.person_detected(Some(0.88));
    wait_until(|| link.sent_count() == 1).await;

    let sent = link.sent();
    assert_eq!(sent[0].event, "person_detected");
    assert_eq!(sent[0].data.get("kioskId").and_then(Value::as_str), Some("kiosk-7"));
    assert_eq!(sent[0].data.get("confidence").and_then(Value::as_f64), Some(0.88));
    assert_eq!(sent[0].data.get("event").and_then(Value::as_str), Some("person_detected"));
    assert_eq!(client.stage(), SessionStage::AwaitingPresence);

    client.disconnect();
}

#[tokio::test]
async fn full_happy_path_tracks_stage_and_selections() {
    let (client, handle) = kiosk_client();
    client.connect();
    wait_until(|| client.is_connected()).await;
    let link = handle.link().await;

    client.person_detected(None);
    link.push(&session_created("s-42"));
    wait_until(|| client.session_id().is_some()).await;
    assert_eq!(client.stage(), SessionStage::CapturingMotion);

    client.motion_completed(Some(json!({"frames": 90})));
    assert_eq!(client.stage(), SessionStage::SelectingTemplate);

    client.animal_selected("otter");
    assert_eq!(client.stage(), SessionStage::CollectingInput);

    client.user_input_submitted("Mina", "hello park");
    assert_eq!(client.stage(), SessionStage::SelectingDuration);

    client.duration_selected(DurationTier::ThirtyDays);
    assert_eq!(client.stage(), SessionStage::SelectingPaymentMethod);

    client.payment_method_selected(PaymentMethod::MobileQr);
    assert_eq!(client.stage(), SessionStage::ProcessingPayment);

    client.payment_completed("txn-9", PaymentOutcome::Completed);
    assert_eq!(client.stage(), SessionStage::GeneratingMedia);

    client.video_template_selected("tpl-2");
    client.ticket_qr_downloaded();

    let session = client.session().expect("session");
    assert_eq!(session.id, "s-42");
    assert_eq!(session.animal_id.as_deref(), Some("otter"));
    assert_eq!(session.user_name.as_deref(), Some("Mina"));
    assert_eq!(session.user_message.as_deref(), Some("hello park"));
    assert_eq!(session.duration, Some(DurationTier::ThirtyDays));
    assert_eq!(session.payment_method, Some(PaymentMethod::MobileQr));
    assert_eq!(session.transaction_id.as_deref(), Some("txn-9"));
    assert_eq!(session.video_template_id.as_deref(), Some("tpl-2"));
    assert!(session.ticket_downloaded);

    // Every session-scoped envelope carried the id and its own name.
    wait_until(|| link.sent_count() == 9).await;
    for envelope in link.sent().iter().skip(1) {
        assert_eq!(envelope.data.get("sessionId").and_then(Value::as_str), Some("s-42"));
        assert_eq!(
            envelope.data.get("event").and_then(Value::as_str),
            Some(envelope.event.as_str())
        );
    }

    client.disconnect();
}

#[tokio::test]
async fn failed_payment_keeps_processing_payment() {
    let (client, handle) = kiosk_client();
    client.connect();
    wait_until(|| client.is_connected()).await;
    let link = handle.link().await;

    link.push(&session_created("s-1"));
    wait_until(|| client.session_id().is_some()).await;

    link.push(&ServerEvent::StateTransition(StateTransitionPayload {
        session_id: Some("s-1".to_owned()),
        state: SessionStage::ProcessingPayment,
    }));
    wait_until(|| client.stage() == SessionStage::ProcessingPayment).await;

    client.payment_completed("txn-1", PaymentOutcome::Failed);
    assert_eq!(client.stage(), SessionStage::ProcessingPayment);

    client.payment_completed("txn-2", PaymentOutcome::Completed);
    assert_eq!(client.stage(), SessionStage::GeneratingMedia);

    client.disconnect();
}

#[tokio::test]
async fn gateway_state_transition_overrides_local_inference() {
    let (client, handle) = kiosk_client();
    client.connect();
    wait_until(|| client.is_connected()).await;
    let link = handle.link().await;

    link.push(&session_created("s-1"));
    wait_until(|| client.session_id().is_some()).await;
    assert_eq!(client.stage(), SessionStage::CapturingMotion);

    // The gateway disagrees with the local inference; it wins.
    link.push(&ServerEvent::StateTransition(StateTransitionPayload {
        session_id: Some("s-1".to_owned()),
        state: SessionStage::TicketReady,
    }));
    wait_until(|| client.stage() == SessionStage::TicketReady).await;

    client.disconnect();
}

#[tokio::test]
async fn session_completed_clears_the_session() {
    let (client, handle) = kiosk_client();
    client.connect();
    wait_until(|| client.is_connected()).await;
    let link = handle.link().await;

    link.push(&session_created("s-1"));
    wait_until(|| client.session_id().is_some()).await;

    link.push_raw(r#"{"event":"session_completed","data":{"sessionId":"s-1"}}"#);
    wait_until(|| client.session_id().is_none()).await;
    assert_eq!(client.stage(), SessionStage::Completed);

    // Emitters are guarded again until the next session exists.
    client.animal_selected("otter");
    tokio::time::sleep(Duration::from_millis(50)).await;
    let sent = link.sent();
    assert!(sent.iter().all(|envelope| envelope.event != "animal_selected"));

    client.disconnect();
}

#[tokio::test]
async fn cancellation_reaches_cancelled_and_clears_the_session() {
    let (client, handle) = kiosk_client();
    client.connect();
    wait_until(|| client.is_connected()).await;
    let link = handle.link().await;

    link.push(&session_created("s-1"));
    wait_until(|| client.session_id().is_some()).await;

    client.session_cancelled(Some("customer walked away"));
    assert_eq!(client.stage(), SessionStage::Cancelled);
    assert!(client.session_id().is_none());

    wait_until(|| link.sent_count() == 1).await;
    let sent = link.sent();
    assert_eq!(sent[0].event, "session_cancelled");
    assert_eq!(
        sent[0].data.get("reason").and_then(Value::as_str),
        Some("customer walked away")
    );

    // A fresh customer restarts the flow from idle.
    client.person_detected(None);
    assert_eq!(client.stage(), SessionStage::AwaitingPresence);

    client.disconnect();
}
