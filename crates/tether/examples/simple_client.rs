//! Connect to a WebSocket server and log everything it sends.
//!
//! Run with: cargo run -p tether --example simple_client -- ws://127.0.0.1:8080/ws
//!
//! Set `RUST_LOG=tether_net=debug` for state transitions and frame traces.

use std::sync::Arc;
use std::time::Duration;

use tether::dispatch::LogDispatcher;
use tether::{ClientConfig, StopReason, WebSocketClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8080/ws".to_string());

    let config = ClientConfig::new(url)
        .reconnect_delay(Duration::from_secs(2))
        .max_reconnect_attempts(5)
        .handshake_timeout(Duration::from_secs(10));
    let client = Arc::new(WebSocketClient::new_tcp(config, LogDispatcher));

    client
        .state_changed
        .connect(|state| tracing::info!("state: {state}"));
    client
        .connected
        .connect(|endpoint| tracing::info!("connected to {endpoint}"));
    client
        .message_received
        .connect(|message| println!("<- {}", message.as_text().unwrap_or("<binary>")));

    // Stop cleanly on Ctrl-C.
    let token = client.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    match client.run().await? {
        StopReason::Cancelled => println!("stopped"),
        StopReason::AttemptsExhausted { attempts } => {
            println!("server unreachable after {attempts} attempts");
        }
    }
    Ok(())
}
