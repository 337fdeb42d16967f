//! Connection manager behavior against a recording mock transport.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use kioskwire::{
    CONNECT_ERROR_CODE, ClientConfig, DashboardClient, EventKind, FixedDelay, ServerEvent,
    TransportKind,
};
use support::{mock_connector, wait_until};

fn config_with_token() -> ClientConfig {
    ClientConfig::new("https://park.example.test/api/v1").with_credential("tok")
}

fn no_retry() -> Arc<FixedDelay> {
    Arc::new(FixedDelay::new(0, Duration::from_millis(10)))
}

#[tokio::test]
async fn no_credential_never_opens_a_transport() {
    let (connector, handle) = mock_connector();
    let config = ClientConfig::new("https://park.example.test/api/v1");
    let client = DashboardClient::with_parts(config, connector, no_retry());

    client.connect();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(handle.open_count(), 0);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn credential_opens_one_transport_to_the_namespace() {
    let (connector, handle) = mock_connector();
    let client = DashboardClient::with_parts(config_with_token(), connector, no_retry());

    client.connect();
    wait_until(|| client.is_connected()).await;

    let opened = handle.opened();
    assert_eq!(opened.len(), 1);
    assert_eq!(opened[0].kind, TransportKind::WebSocket);
    assert!(opened[0].url.contains("/dashboard"), "url: {}", opened[0].url);
    assert_eq!(opened[0].credential, "tok");

    client.disconnect();
}

#[tokio::test]
async fn transport_connect_synthesizes_dashboard_connected() {
    let (connector, _handle) = mock_connector();
    let client = DashboardClient::with_parts(config_with_token(), connector, no_retry());

    let received = Arc::new(Mutex::new(Vec::new()));
    let _sub = {
        let received = Arc::clone(&received);
        client.on(EventKind::DashboardConnected, move |event| {
            received.lock().expect("lock").push(event.clone());
        })
    };

    client.connect();
    wait_until(|| !received.lock().expect("lock").is_empty()).await;

    let events = received.lock().expect("lock");
    assert_eq!(events.len(), 1);
    let envelope = events[0].to_envelope().expect("envelope");
    assert_eq!(envelope.event, "dashboard_connected");
    assert_eq!(envelope.data, json!({}));

    drop(events);
    client.disconnect();
}

#[tokio::test]
async fn is_connected_tracks_the_live_transport() {
    let (connector, handle) = mock_connector();
    let client = DashboardClient::with_parts(config_with_token(), connector, no_retry());

    assert!(!client.is_connected());

    client.connect();
    wait_until(|| client.is_connected()).await;

    let link = handle.link().await;
    link.close_from_server();
    wait_until(|| !client.is_connected()).await;
}

#[tokio::test]
async fn disconnect_is_idempotent_and_closes_the_transport() {
    let (connector, handle) = mock_connector();
    let client = DashboardClient::with_parts(config_with_token(), connector, no_retry());

    client.connect();
    wait_until(|| client.is_connected()).await;
    let link = handle.link().await;

    client.disconnect();
    client.disconnect();

    wait_until(|| link.is_closed()).await;
    assert!(!client.is_connected());
    assert_eq!(client.listener_count(), 0);
}

#[tokio::test]
async fn connect_failure_surfaces_as_error_event_not_panic() {
    let (connector, handle) = mock_connector();
    handle.refuse_next(2); // both preference kinds fail once each

    let client = DashboardClient::with_parts(config_with_token(), connector, no_retry());

    let errors = Arc::new(Mutex::new(Vec::new()));
    let _sub = {
        let errors = Arc::clone(&errors);
        client.on(EventKind::Error, move |event| {
            if let ServerEvent::Error(payload) = event {
                errors.lock().expect("lock").push(payload.clone());
            }
        })
    };

    client.connect();
    wait_until(|| !errors.lock().expect("lock").is_empty()).await;

    let errors = errors.lock().expect("lock");
    assert_eq!(errors[0].code.as_deref(), Some(CONNECT_ERROR_CODE));
    assert!(errors[0].message.is_some());
}

#[tokio::test]
async fn retry_budget_is_bounded_then_silent() {
    let (connector, handle) = mock_connector();
    handle.refuse_next(u32::MAX);

    let policy = Arc::new(FixedDelay::new(2, Duration::from_millis(20)));
    let client = DashboardClient::with_parts(config_with_token(), connector, policy);

    client.connect();
    // initial attempt + 2 retries, each trying both transport kinds
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.open_count(), 6);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn websocket_refusal_falls_back_to_polling() {
    let (connector, handle) = mock_connector();
    handle.refuse_websocket();

    let client = DashboardClient::with_parts(config_with_token(), connector, no_retry());

    client.connect();
    wait_until(|| client.is_connected()).await;

    let opened = handle.opened();
    assert_eq!(opened.len(), 2);
    assert_eq!(opened[0].kind, TransportKind::WebSocket);
    assert_eq!(opened[1].kind, TransportKind::Polling);

    client.disconnect();
}

#[tokio::test]
async fn server_drop_reconnects_and_synthesizes_both_events() {
    let (connector, handle) = mock_connector();
    let policy = Arc::new(FixedDelay::new(3, Duration::from_millis(20)));
    let client = DashboardClient::with_parts(config_with_token(), connector, policy);

    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in [EventKind::DashboardConnected, EventKind::DashboardDisconnected] {
        let seen = Arc::clone(&seen);
        let _sub = client.on(kind, move |event| {
            seen.lock().expect("lock").push(event.kind());
        });
    }

    client.connect();
    wait_until(|| client.is_connected()).await;

    handle.link().await.close_from_server();
    wait_until(|| handle.link_count() >= 2).await;
    wait_until(|| seen.lock().expect("lock").len() >= 3).await;

    let seen = seen.lock().expect("lock").clone();
    assert_eq!(
        seen,
        vec![
            EventKind::DashboardConnected,
            EventKind::DashboardDisconnected,
            EventKind::DashboardConnected,
        ]
    );

    client.disconnect();
}

#[tokio::test]
async fn late_message_after_disconnect_is_silently_dropped() {
    let (connector, handle) = mock_connector();
    let client = DashboardClient::with_parts(config_with_token(), connector, no_retry());

    let hits = Arc::new(AtomicUsize::new(0));
    let _sub = {
        let hits = Arc::clone(&hits);
        client.on(EventKind::StatisticsUpdated, move |_event| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    };

    client.connect();
    wait_until(|| client.is_connected()).await;
    let link = handle.link().await;

    client.disconnect();
    link.push(&ServerEvent::StatisticsUpdated(json!({})));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_wire_text_is_dropped_without_crashing() {
    let (connector, handle) = mock_connector();
    let client = DashboardClient::with_parts(config_with_token(), connector, no_retry());

    let hits = Arc::new(AtomicUsize::new(0));
    let _sub = {
        let hits = Arc::clone(&hits);
        client.on(EventKind::StatisticsUpdated, move |_event| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    };

    client.connect();
    wait_until(|| client.is_connected()).await;
    let link = handle.link().await;

    link.push_raw("not json at all");
    link.push_raw(r#"{"event":"mystery_event","data":{}}"#);
    link.push(&ServerEvent::StatisticsUpdated(json!({})));

    wait_until(|| hits.load(Ordering::SeqCst) == 1).await;
    client.disconnect();
}
