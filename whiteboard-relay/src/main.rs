//! Whiteboard relay server -- room-scoped WebSocket broadcast.
//!
//! Clients connect to `ws://<host>:<port>/<room-name>` and every frame one
//! client sends is forwarded to the other clients in the same room. A plain
//! HTTP `GET` on the same port answers a liveness check.
//!
//! # Usage
//!
//! ```bash
//! # Run on default port 1234
//! cargo run --bin whiteboard-relay
//!
//! # Run on a custom port
//! PORT=8080 cargo run --bin whiteboard-relay
//!
//! # Bind a specific interface and cap frame size
//! RELAY_HOST=127.0.0.1 RELAY_MAX_MESSAGE_SIZE=1048576 cargo run --bin whiteboard-relay
//! ```

use std::sync::Arc;

use clap::Parser;
use whiteboard_relay::config::{RelayCliArgs, RelayConfig};
use whiteboard_relay::relay::{self, RelayState};

#[tokio::main]
async fn main() {
    let cli = RelayCliArgs::parse();

    let config = match RelayConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let state = Arc::new(RelayState::with_max_message_size(config.max_message_size));

    let (bound_addr, mut handle) =
        match relay::start_server_with_state(&config.bind_addr(), Arc::clone(&state)).await {
            Ok(started) => started,
            Err(e) => {
                tracing::error!(error = %e, "failed to start relay server");
                std::process::exit(1);
            }
        };

    tracing::info!(
        addr = %bound_addr,
        port = bound_addr.port(),
        url = %config.room_url_template(bound_addr.port()),
        "whiteboard relay running"
    );

    tokio::select! {
        result = relay::wait_for_server(&mut handle) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "relay server stopped");
                std::process::exit(1);
            }
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::warn!(error = %e, "failed to listen for shutdown signal");
                if let Err(e) = relay::wait_for_server(&mut handle).await {
                    tracing::error!(error = %e, "relay server stopped");
                    std::process::exit(1);
                }
                return;
            }
            tracing::info!("shutting down");
            state.close_all_connections().await;
            // Let writer tasks flush the close frames.
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            handle.abort();
        }
    }
}
