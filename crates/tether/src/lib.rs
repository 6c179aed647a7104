//! tether - a WebSocket client for devices that must stay connected.
//!
//! This is the umbrella crate that re-exports the public APIs of the
//! workspace and adds the on-disk device configuration.
//!
//! # Example
//!
//! ```no_run
//! use tether::config::DeviceConfig;
//! use tether::dispatch::{DeviceDispatcher, MemoryOutput};
//! use tether::link::StartupMode;
//! use tether::WebSocketClient;
//!
//! # async fn boot() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DeviceConfig::load_or_default("tether.toml")?;
//! if config.startup_mode() == StartupMode::Provision {
//!     // Hand over to the provisioning portal.
//!     return Ok(());
//! }
//!
//! let dispatcher =
//!     DeviceDispatcher::new(MemoryOutput::new()).device_name(config.device.name.clone());
//! let client = WebSocketClient::new_tcp(config.client, dispatcher);
//! let reason = client.run().await?;
//! println!("client stopped: {reason}");
//! # Ok(())
//! # }
//! ```

pub use tether_core::*;
pub use tether_net::*;

pub mod config;
pub mod prelude;
