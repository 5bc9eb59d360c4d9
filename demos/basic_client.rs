//! Basic realtime client session.
//!
//! Demonstrates:
//! - Creating a registry with the WebSocket provider
//! - Connecting with callbacks and an identity
//! - Queueing messages before the connection is up
//! - Surviving drops until Ctrl+C
//!
//! Usage:
//!   cargo run --example basic_client
//!   cargo run --example basic_client -- ws://127.0.0.1:4000
//!   cargo run --example basic_client -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use anyhow::Context;
use realtime_transport::{
    ClientCallbacks, ClientKind, ClientRegistry, HeadlessEnvironment, Identity, WebSocketProvider,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_TARGET: &str = "ws://127.0.0.1:3000";

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    target: String,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self {
            debug: args.iter().any(|a| a == "--debug"),
            target: args
                .iter()
                .find(|a| !a.starts_with("--"))
                .cloned()
                .unwrap_or_else(|| DEFAULT_TARGET.to_string()),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "realtime_transport=debug"
    } else {
        "realtime_transport=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Basic Client ===\n");

    // ========================================================================
    // Registry
    // ========================================================================

    println!("[1] Creating registry...");
    println!("    Target: {}", args.target);

    let registry = ClientRegistry::new(
        Arc::new(WebSocketProvider::new()),
        Arc::new(HeadlessEnvironment::new()),
    )
    .with_default_target(args.target.parse().context("invalid target URL")?);

    let chat = registry.get_client(ClientKind::Chat, None, None, None)?;
    println!("    ✓ Client '{}' ready\n", chat.id());

    // ========================================================================
    // Queue Before Connect
    // ========================================================================

    println!("[2] Queueing a message while offline...");
    let seq = chat.emit_with_queue("sendMessage", json!({ "text": "hello from the queue" }));
    println!("    ✓ Queued as #{seq} ({} pending)\n", chat.queued_len());

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[3] Connecting...");

    let callbacks = ClientCallbacks::new()
        .on_connect(|| println!("    ✓ Connected"))
        .on_disconnect(|reason| println!("    ! Disconnected: {reason}"))
        .on_connect_error(|error| println!("    ! Connect error: {error}"))
        .on_authenticated(|username| println!("    ✓ Authenticated as {username}"))
        .on_authentication_failed(|data| println!("    ! Authentication failed: {data}"))
        .on_message(|event, data| println!("    <- {event}: {data}"))
        .on_notification(|record| println!("    * {}: {}", record.sender, record.preview))
        .on_message_lost(|lost| println!("    ! {} message(s) lost", lost.len()));

    chat.connect(callbacks, Some(Identity::new("demo")))?;
    println!("    State: {}\n", chat.connection_state());

    // ========================================================================
    // Wait
    // ========================================================================

    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await?;

    registry.disconnect_all();
    println!("\n=== Done ===");
    Ok(())
}
