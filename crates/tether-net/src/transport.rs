//! Message framing over an upgraded stream.
//!
//! The client only needs two operations from the framing layer: write one
//! message and read the next one. [`FrameTransport`] names that contract so
//! the lifecycle can be driven by any implementation; [`WsTransport`] is the
//! production one, backed by `tokio-tungstenite` running on a stream that
//! has already been upgraded by [`crate::handshake`].

use std::fmt;
use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::Role;

use tether_core::logging::targets;

use crate::error::TransportError;
use crate::handshake::Upgraded;

/// A single application message.
#[derive(Clone, PartialEq, Eq)]
pub enum Message {
    /// A UTF-8 text frame.
    Text(String),
    /// A binary frame.
    Binary(Vec<u8>),
}

/// A message received from the server.
pub type InboundMessage = Message;
/// A message queued for the server.
pub type OutboundMessage = Message;

impl Message {
    /// Create a text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a binary message.
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::Binary(data.into())
    }

    /// Serialize `value` as a JSON text message.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_string(value).map(Self::Text)
    }

    /// The text payload, if this is a text message.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// The raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The logical type tag: the `type` field of a JSON object payload.
    ///
    /// Returns `None` for payloads that are not a JSON object or carry no
    /// string `type`.
    pub fn kind(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(self.as_bytes()).ok()?;
        value.get("type")?.as_str().map(str::to_string)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Binary(data) => write!(f, "Binary({} bytes)", data.len()),
        }
    }
}

impl From<Message> for WsMessage {
    fn from(message: Message) -> Self {
        match message {
            Message::Text(text) => WsMessage::text(text),
            Message::Binary(data) => WsMessage::binary(data),
        }
    }
}

/// Framed message exchange over an upgraded stream.
///
/// Control frames (ping, pong, close) are handled inside the implementation
/// and never surface as messages.
pub trait FrameTransport: Send {
    /// Write one message and flush it.
    fn write_message(
        &mut self,
        message: Message,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Read the next application message. `Ok(None)` means the peer ended
    /// the stream.
    fn read_message(
        &mut self,
    ) -> impl Future<Output = Result<Option<Message>, TransportError>> + Send;

    /// Close the stream. Best effort: callers log failures and move on.
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// [`FrameTransport`] backed by `tokio-tungstenite`.
pub struct WsTransport<S> {
    inner: WebSocketStream<S>,
}

impl<S> WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Start framing on a stream that has completed the upgrade handshake.
    ///
    /// `upgraded.leftover` is replayed ahead of the stream so frames that
    /// arrived together with the response headers are not lost.
    pub async fn from_upgraded(stream: S, upgraded: Upgraded) -> Self {
        let inner =
            WebSocketStream::from_partially_read(stream, upgraded.leftover, Role::Client, None)
                .await;
        Self { inner }
    }
}

impl<S> FrameTransport for WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_message(&mut self, message: Message) -> Result<(), TransportError> {
        tracing::trace!(target: targets::TRANSPORT, len = message.len(), "writing message");
        self.inner.send(message.into()).await.map_err(Into::into)
    }

    async fn read_message(&mut self) -> Result<Option<Message>, TransportError> {
        loop {
            match self.inner.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    return Ok(Some(Message::Text(text.as_str().to_string())));
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    return Ok(Some(Message::Binary(data.to_vec())));
                }
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {
                    // Pongs are queued by tungstenite and flushed on the next I/O.
                }
                Some(Ok(WsMessage::Frame(_))) => {}
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::debug!(target: targets::TRANSPORT, ?frame, "close frame received");
                    return Ok(None);
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Ok(None);
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.inner.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_reads_type_field() {
        assert_eq!(
            Message::text(r#"{"type":"ping"}"#).kind().as_deref(),
            Some("ping")
        );
        assert_eq!(Message::text(r#"{"kind":"ping"}"#).kind(), None);
        assert_eq!(Message::text("not json").kind(), None);
        assert_eq!(Message::text(r#"{"type":3}"#).kind(), None);
        assert_eq!(
            Message::binary(br#"{"type":"echo"}"#.to_vec()).kind().as_deref(),
            Some("echo")
        );
    }

    #[test]
    fn test_json_builds_text() {
        let msg = Message::json(&serde_json::json!({"type": "pong"})).unwrap();
        assert_eq!(msg.as_text(), Some(r#"{"type":"pong"}"#));
        assert_eq!(msg.len(), 15);
    }

    #[test]
    fn test_debug_hides_binary_payload() {
        assert_eq!(format!("{:?}", Message::binary(vec![1, 2, 3])), "Binary(3 bytes)");
    }
}
