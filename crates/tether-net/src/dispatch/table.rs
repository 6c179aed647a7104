//! Closure-based dispatch keyed by envelope type.

use std::collections::HashMap;
use std::fmt;

use tether_core::logging::targets;

use super::envelope::{Envelope, EnvelopeKind};
use super::{Dispatcher, SessionInfo};
use crate::error::DispatchError;
use crate::transport::Message;

type Handler = Box<dyn FnMut(&Envelope) -> Result<Vec<Message>, DispatchError> + Send>;
type Fallback = Box<dyn FnMut(&Message) -> Result<Vec<Message>, DispatchError> + Send>;
type ConnectHook = Box<dyn FnMut(&SessionInfo) -> Vec<Message> + Send>;

/// A dispatcher assembled from per-type handlers.
///
/// Messages whose type has no handler, including types this crate does
/// not know, go to the fallback if one is set and are otherwise reported
/// as [`DispatchError::UnknownType`].
///
/// # Example
///
/// ```
/// use tether_net::dispatch::{DispatchTable, Envelope, EnvelopeKind};
///
/// let table = DispatchTable::new().on(EnvelopeKind::Ping, |_| {
///     Ok(vec![Envelope::Pong { timestamp: 0.0 }.to_message()?])
/// });
/// assert!(table.handles(EnvelopeKind::Ping));
/// ```
#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<EnvelopeKind, Handler>,
    fallback: Option<Fallback>,
    connect_hook: Option<ConnectHook>,
}

impl DispatchTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub fn on<F>(mut self, kind: EnvelopeKind, handler: F) -> Self
    where
        F: FnMut(&Envelope) -> Result<Vec<Message>, DispatchError> + Send + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Handle messages no registered handler claims.
    pub fn fallback<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Message) -> Result<Vec<Message>, DispatchError> + Send + 'static,
    {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Produce messages when a session starts.
    pub fn on_connect<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&SessionInfo) -> Vec<Message> + Send + 'static,
    {
        self.connect_hook = Some(Box::new(hook));
        self
    }

    /// Whether a handler is registered for `kind`.
    pub fn handles(&self, kind: EnvelopeKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    fn fall_through(&mut self, message: &Message, tag: String) -> Result<Vec<Message>, DispatchError> {
        match self.fallback.as_mut() {
            Some(fallback) => fallback(message),
            None => Err(DispatchError::UnknownType(tag)),
        }
    }
}

impl Dispatcher for DispatchTable {
    fn on_connect(&mut self, session: &SessionInfo) -> Vec<Message> {
        self.connect_hook
            .as_mut()
            .map(|hook| hook(session))
            .unwrap_or_default()
    }

    fn on_message(&mut self, message: &Message) -> Result<Vec<Message>, DispatchError> {
        match Envelope::decode(message) {
            Ok(envelope) => {
                let kind = envelope.kind();
                match self.handlers.get_mut(&kind) {
                    Some(handler) => handler(&envelope),
                    None => {
                        tracing::trace!(target: targets::DISPATCH, %kind, "no handler registered");
                        self.fall_through(message, kind.to_string())
                    }
                }
            }
            Err(DispatchError::UnknownType(tag)) => self.fall_through(message, tag),
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
