//! The reconnecting client and its configuration.

mod config;
mod connector;
mod lifecycle;
mod reconnect;
mod state;

pub use config::{
    ClientConfig, DEFAULT_FALLBACK_PATH, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY,
    DEFAULT_SERVER_URL, opt_secs, secs,
};
pub use connector::{Connector, TcpConnector};
pub use lifecycle::{MessageSender, WebSocketClient};
pub use reconnect::{ReconnectCounter, ReconnectDecision};
pub use state::{ConnectionState, StopReason};
