//! Run the device firmware's client loop on a host.
//!
//! Reads `tether.toml` (or the path given as the first argument), decides
//! whether the device would boot into provisioning, and otherwise runs the
//! LED/ping dispatcher against the configured server until Ctrl-C.
//!
//! Run with: cargo run -p tether --example device_client -- tether.toml

use std::time::Duration;

use tether::config::DeviceConfig;
use tether::dispatch::{BinaryOutput, DeviceDispatcher, MemoryOutput};
use tether::link::{InterfaceLink, StartupMode};
use tether::{AlwaysUp, ClientError, LinkProvider, StopReason, TcpConnector, WebSocketClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tether=info,tether_net=info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tether.toml".to_string());
    let config = DeviceConfig::load_or_default(&path)?;

    if config.startup_mode() == StartupMode::Provision {
        println!("no usable link credentials in {path}; the device would start provisioning");
        println!("add a [link] section with ssid and password to connect");
        return Ok(());
    }

    let reason = match InterfaceLink::new() {
        Ok(link) => run(config, link).await?,
        Err(e) => {
            tracing::warn!("interface monitoring unavailable ({e}), assuming link is up");
            run(config, AlwaysUp).await?
        }
    };
    println!("client stopped: {reason}");
    Ok(())
}

async fn run<L: LinkProvider>(config: DeviceConfig, link: L) -> Result<StopReason, ClientError> {
    let output = MemoryOutput::new();
    let dispatcher = DeviceDispatcher::new(output.clone()).device_name(config.device.name);

    let mut connector = TcpConnector::new().no_delay(true);
    if let Some(timeout) = config.client.connect_timeout {
        connector = connector.connect_timeout(timeout);
    }
    let client = WebSocketClient::new(config.client, link, connector, dispatcher);

    client
        .state_changed
        .connect(|state| tracing::info!("state: {state}"));
    client.error.connect(|e| tracing::warn!("client error: {e}"));

    let token = client.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    // Mirror the LED level to the console.
    let watcher = tokio::spawn(async move {
        let mut last = output.level();
        loop {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let level = output.level();
            if level != last {
                println!("LED {}", if level { "on" } else { "off" });
                last = level;
            }
        }
    });

    let reason = client.run().await;
    watcher.abort();
    reason
}
