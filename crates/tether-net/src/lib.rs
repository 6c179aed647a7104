//! Networking for tether.
//!
//! This crate implements a WebSocket client for devices that must stay
//! connected on an unreliable link:
//!
//! - **URL parsing**: `ws://`/`wss://` endpoints with a fallback path
//! - **Handshake**: a hand-built HTTP/1.1 upgrade over any byte stream
//! - **Transport**: message framing via `tokio-tungstenite`
//! - **Lifecycle**: a state machine that reconnects with a fixed delay and
//!   an optional attempt ceiling
//! - **Dispatch**: pluggable handling of inbound JSON messages
//! - **Link**: the contract with whatever manages the network link
//!
//! # Quick Start
//!
//! ```ignore
//! use tether_net::{ClientConfig, StopReason, WebSocketClient};
//! use tether_net::dispatch::{DeviceDispatcher, MemoryOutput};
//!
//! let config = ClientConfig::new("ws://192.168.1.100:8080/ws")
//!     .max_reconnect_attempts(0);
//! let client = WebSocketClient::new_tcp(config, DeviceDispatcher::new(MemoryOutput::new()));
//!
//! client.state_changed.connect(|state| println!("state: {state}"));
//!
//! match client.run().await? {
//!     StopReason::Cancelled => println!("stopped"),
//!     StopReason::AttemptsExhausted { attempts } => println!("gave up after {attempts}"),
//! }
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──link down──▶ LinkDown ──reassociated──┐
//!      │                         ▲                     ▼
//!      └──────stream open────────┼──────────────▶ Handshaking ──101──▶ Connected
//!                                │                     │                   │
//!                          delay │                     ▼                   ▼
//!                                └──────────────── Closing ◀───────────────┘
//!                                                      │
//!                                      attempts spent  ▼
//!                                                Disconnected
//! ```
//!
//! Each trip through `Closing` counts one attempt; reaching `Connected`
//! clears the count. Link outages are waited out without counting.
//!
//! # Custom Dispatch
//!
//! ```ignore
//! use tether_net::dispatch::{DispatchTable, Envelope, EnvelopeKind};
//!
//! let table = DispatchTable::new()
//!     .on(EnvelopeKind::Welcome, |env| {
//!         println!("{env:?}");
//!         Ok(Vec::new())
//!     })
//!     .fallback(|msg| {
//!         println!("unhandled: {:?}", msg.kind());
//!         Ok(Vec::new())
//!     });
//! ```

pub mod client;
pub mod dispatch;
mod error;
pub mod handshake;
pub mod link;
pub mod transport;
pub mod url;

pub use error::{
    ClientError, DispatchError, HandshakeError, LinkError, ParseError, Result, TransportError,
};

// Re-export commonly used types at the crate root
pub use client::{
    ClientConfig, ConnectionState, Connector, MessageSender, ReconnectCounter, ReconnectDecision,
    StopReason, TcpConnector, WebSocketClient,
};
pub use dispatch::{Dispatcher, SessionInfo};
pub use handshake::{HandshakeKey, Upgraded, perform_handshake};
pub use link::{AlwaysUp, LinkProvider};
pub use transport::{FrameTransport, InboundMessage, Message, OutboundMessage, WsTransport};
pub use url::EndpointDescriptor;
