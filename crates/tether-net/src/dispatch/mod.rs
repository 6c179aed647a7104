//! Interpreting inbound messages.
//!
//! A [`Dispatcher`] sees every message the server sends while the client is
//! connected, and returns the replies to send back. Dispatchers run inline
//! in the message loop, so they must not block.
//!
//! Errors are reported, not fatal: the client logs any [`DispatchError`]
//! and keeps the session, unless the error is
//! [`DispatchError::Fatal`].

use std::net::IpAddr;

use tether_core::logging::targets;

use crate::error::DispatchError;
use crate::transport::Message;
use crate::url::EndpointDescriptor;

mod device;
mod envelope;
mod output;
mod table;

pub use device::{DEFAULT_DEVICE_NAME, DeviceDispatcher};
pub use envelope::{Envelope, EnvelopeKind, LedAction};
pub use output::{BinaryOutput, MemoryOutput};
pub use table::DispatchTable;

/// Facts about a session that just reached `Connected`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    /// The endpoint the session is connected to.
    pub endpoint: EndpointDescriptor,
    /// The server's status line.
    pub status_line: String,
    /// The device's own address, if the link provider knows it.
    pub local_address: Option<IpAddr>,
}

/// Handles inbound messages for a connected session.
pub trait Dispatcher: Send {
    /// Called once per session after the upgrade. Returned messages are
    /// sent before anything is read.
    fn on_connect(&mut self, session: &SessionInfo) -> Vec<Message> {
        let _ = session;
        Vec::new()
    }

    /// Handle one inbound message and return the replies.
    fn on_message(&mut self, message: &Message) -> Result<Vec<Message>, DispatchError>;

    /// Called once per session when it ends, however it ends.
    fn on_disconnect(&mut self) {}
}

/// Logs every message and never replies.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDispatcher;

impl Dispatcher for LogDispatcher {
    fn on_connect(&mut self, session: &SessionInfo) -> Vec<Message> {
        tracing::info!(target: targets::DISPATCH, endpoint = %session.endpoint, "session started");
        Vec::new()
    }

    fn on_message(&mut self, message: &Message) -> Result<Vec<Message>, DispatchError> {
        match message {
            Message::Text(text) => {
                tracing::info!(target: targets::DISPATCH, %text, "message received");
            }
            Message::Binary(data) => {
                tracing::info!(target: targets::DISPATCH, len = data.len(), "binary message received");
            }
        }
        Ok(Vec::new())
    }

    fn on_disconnect(&mut self) {
        tracing::info!(target: targets::DISPATCH, "session ended");
    }
}
