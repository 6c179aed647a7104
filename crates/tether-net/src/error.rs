//! Error types for the networking crate.
//!
//! Every error here is `Clone` so it can be published on the client's
//! `error` signal as well as returned.

use std::time::Duration;

use thiserror::Error;

/// A configured WebSocket URL could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The URL carries a scheme other than `ws://` or `wss://`.
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    /// Nothing precedes the port or path separator.
    #[error("URL has an empty host")]
    EmptyHost,

    /// The port is not a number in `1..=65535`.
    #[error("invalid port '{0}'")]
    InvalidPort(String),

    /// A bracketed IPv6 literal is missing its closing bracket.
    #[error("unterminated IPv6 literal in '{0}'")]
    UnterminatedIpv6(String),
}

/// The HTTP upgrade exchange failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The peer closed the stream before the header terminator arrived.
    #[error("connection closed during handshake")]
    ConnectionClosed,

    /// The server answered with something other than `101 Switching Protocols`.
    #[error("handshake rejected: {preview}")]
    Rejected {
        /// The first bytes of the response, for diagnostics.
        preview: String,
    },

    /// Reading or writing the raw stream failed.
    #[error("handshake transport error: {0}")]
    Transport(String),

    /// The response headers grew past the accepted size without terminating.
    #[error("handshake response exceeded {limit} bytes")]
    Oversized {
        /// The size limit that was hit.
        limit: usize,
    },
}

/// The upgraded frame stream failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Underlying I/O failure.
    #[error("transport I/O error: {0}")]
    Io(String),

    /// The peer violated the framing protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::Io(e) => Self::Io(e.to_string()),
            other => Self::Protocol(other.to_string()),
        }
    }
}

/// The network link could not be (re)established.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The link provider reported a failure.
    #[error("link unavailable: {0}")]
    Unavailable(String),

    /// The link did not come up within the association window.
    #[error("link did not come up within {0:?}")]
    TimedOut(Duration),
}

/// A dispatcher could not handle an inbound message.
///
/// Every variant except [`Fatal`](Self::Fatal) is logged and swallowed by
/// the client; the connection stays up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The payload is not a decodable envelope.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The envelope's `type` is not one this dispatcher knows.
    #[error("unknown message type '{0}'")]
    UnknownType(String),

    /// A handler failed while processing a well-formed message.
    #[error("handler failed: {0}")]
    Handler(String),

    /// The dispatcher asks for the session to be torn down.
    #[error("fatal dispatch error: {0}")]
    Fatal(String),
}

impl DispatchError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Any failure observed by the connection lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The configured URL is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The network link is down.
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The TCP connection could not be opened.
    #[error("failed to open stream to {address}: {message}")]
    Connect {
        /// The `host:port` that was dialled.
        address: String,
        /// The underlying error.
        message: String,
    },

    /// The upgrade handshake failed.
    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    /// The frame stream failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server closed the frame stream.
    #[error("connection closed by server")]
    EndOfStream,

    /// A dispatcher failure (fatal or not).
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// An externally configured deadline expired.
    #[error("{operation} timed out after {after:?}")]
    TimedOut {
        /// The operation that was cut short.
        operation: &'static str,
        /// The deadline that expired.
        after: Duration,
    },

    /// A message was queued while no session was open.
    #[error("not connected")]
    NotConnected,

    /// `run` was called while the client was already running.
    #[error("client is already running")]
    AlreadyRunning,
}

/// A specialized Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
