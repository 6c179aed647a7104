//! Prelude module for tether.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use tether::prelude::*;
//! ```
//!
//! This provides access to:
//! - The client and its configuration (`WebSocketClient`, `ClientConfig`)
//! - Lifecycle states and stop reasons
//! - Dispatch (`Dispatcher`, `DeviceDispatcher`, `DispatchTable`)
//! - Link providers and the boot-time startup decision
//! - The on-disk device configuration

// ============================================================================
// Client
// ============================================================================

pub use tether_net::{
    ClientConfig, ConnectionState, MessageSender, StopReason, TcpConnector, WebSocketClient,
};

// ============================================================================
// Messages and Dispatch
// ============================================================================

pub use tether_net::dispatch::{
    DeviceDispatcher, DispatchTable, Envelope, EnvelopeKind, LedAction, MemoryOutput,
};
pub use tether_net::{Dispatcher, Message, SessionInfo};

// ============================================================================
// Link
// ============================================================================

#[cfg(feature = "interface-link")]
pub use tether_net::link::InterfaceLink;
pub use tether_net::link::{LinkCredentials, StartupMode};
pub use tether_net::{AlwaysUp, LinkProvider};

// ============================================================================
// Core Systems
// ============================================================================

pub use tether_core::{CancellationToken, Signal};

// ============================================================================
// Errors
// ============================================================================

pub use tether_net::{ClientError, DispatchError};

// ============================================================================
// Configuration
// ============================================================================

pub use crate::config::{ConfigError, DeviceConfig};
