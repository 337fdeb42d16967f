//! kiosk-sim — walks one scripted customer session against a live gateway.
//!
//! Operator tool for smoke-testing a deployment: connects as a kiosk
//! terminal, drives the happy path from presence detection to payment, and
//! prints every gateway event on the way. Exits zero once the gateway
//! reports `session_completed`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use uuid::Uuid;

use kioskwire::{
    ClientConfig, DurationTier, EventKind, KioskClient, PaymentMethod, PaymentOutcome, ServerEvent,
};

#[derive(Parser, Debug)]
#[command(name = "kiosk-sim", about = "Scripted kiosk session driver for the realtime gateway")]
struct Args {
    /// Platform API base URL; the gateway origin is derived from it.
    #[arg(long, env = "KIOSKWIRE_BASE_URL", default_value = "http://127.0.0.1:3000/api/v1")]
    base_url: String,

    /// Bearer credential for the transport handshake.
    #[arg(long, env = "KIOSKWIRE_TOKEN")]
    token: Option<String>,

    #[arg(long, default_value = "kiosk-sim-1")]
    kiosk_id: String,

    #[arg(long, default_value = "otter")]
    animal_id: String,

    #[arg(long, default_value = "Visitor")]
    user_name: String,

    #[arg(long, default_value = "Hello from the park!")]
    user_message: String,

    /// Ticket duration tier: 1_day, 30_days, 6_months, or 1_year.
    #[arg(long, default_value = "1_day", value_parser = parse_tier)]
    duration: DurationTier,

    /// Seconds to wait for each gateway milestone before giving up.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn parse_tier(value: &str) -> Result<DurationTier, String> {
    match value {
        "1_day" => Ok(DurationTier::OneDay),
        "30_days" => Ok(DurationTier::ThirtyDays),
        "6_months" => Ok(DurationTier::SixMonths),
        "1_year" => Ok(DurationTier::OneYear),
        other => Err(format!("unknown duration tier: {other}")),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let Some(token) = args.token.clone() else {
        eprintln!("no credential; pass --token or set KIOSKWIRE_TOKEN");
        std::process::exit(1);
    };

    let config = ClientConfig::new(args.base_url.clone()).with_credential(token);
    let client = KioskClient::new(args.kiosk_id.clone(), config);
    let timeout = Duration::from_secs(args.timeout_secs);

    let _events = client.on(EventKind::StateTransition, |event| {
        if let ServerEvent::StateTransition(payload) = event {
            println!("gateway: stage -> {}", payload.state.as_str());
        }
    });
    let _progress = client.on(EventKind::VideoGenerationProgress, |event| {
        if let ServerEvent::VideoGenerationProgress(payload) = event {
            println!("gateway: video progress {:?}", payload.progress);
        }
    });
    let _ticket = client.on(EventKind::TicketGenerated, |event| {
        if let ServerEvent::TicketGenerated(payload) = event {
            println!("gateway: ticket {:?}", payload.ticket_id);
        }
    });
    let _errors = client.on(EventKind::Error, |event| {
        if let ServerEvent::Error(payload) = event {
            eprintln!("gateway error: {:?} {:?}", payload.code, payload.message);
        }
    });

    let done = Arc::new(AtomicBool::new(false));
    let _completed = {
        let done = Arc::clone(&done);
        client.on(EventKind::SessionCompleted, move |_event| {
            done.store(true, Ordering::SeqCst);
        })
    };

    client.connect();
    if !wait_for(timeout, || client.is_connected()).await {
        eprintln!("gateway did not accept the connection within {timeout:?}");
        std::process::exit(1);
    }
    println!("connected as {}", args.kiosk_id);

    client.person_detected(Some(0.97));
    if !wait_for(timeout, || client.session_id().is_some()).await {
        eprintln!("gateway did not create a session within {timeout:?}");
        client.disconnect();
        std::process::exit(1);
    }
    println!("session {}", client.session_id().unwrap_or_default());

    let pace = Duration::from_millis(400);
    client.motion_completed(Some(json!({"frames": 120, "durationMs": 4000})));
    tokio::time::sleep(pace).await;
    client.animal_selected(&args.animal_id);
    tokio::time::sleep(pace).await;
    client.user_input_submitted(&args.user_name, &args.user_message);
    tokio::time::sleep(pace).await;
    client.duration_selected(args.duration);
    tokio::time::sleep(pace).await;
    client.payment_method_selected(PaymentMethod::MobileQr);
    tokio::time::sleep(pace).await;
    client.payment_completed(&format!("txn-{}", Uuid::new_v4()), PaymentOutcome::Completed);

    if wait_for(timeout, || done.load(Ordering::SeqCst)).await {
        println!("session completed");
    } else {
        eprintln!("gateway did not complete the session within {timeout:?}");
    }

    client.disconnect();
}

async fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}
