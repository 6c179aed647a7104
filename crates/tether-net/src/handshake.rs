//! The HTTP/1.1 upgrade exchange.
//!
//! The handshake is written by hand rather than delegated to the framing
//! crate so the request is byte-for-byte what constrained servers expect,
//! and so the same code can run over any byte stream (TCP, an in-memory
//! duplex in tests). Once the server answers `101`, the stream and any
//! bytes read past the header terminator are handed to the frame transport.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use tether_core::logging::targets;

use crate::error::HandshakeError;
use crate::url::EndpointDescriptor;

/// Upper bound on the response header section.
pub const MAX_RESPONSE_HEADER_BYTES: usize = 8192;

/// Number of response bytes quoted in a rejection.
const REJECT_PREVIEW_BYTES: usize = 100;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const SWITCHING_PROTOCOLS: &[u8] = b"HTTP/1.1 101";
const READ_CHUNK: usize = 512;

/// The 16-byte nonce sent as `Sec-WebSocket-Key`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct HandshakeKey([u8; 16]);

impl HandshakeKey {
    /// A fresh random key.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// The fixed key `00 01 .. 0f` used by older device firmware.
    ///
    /// Only useful against servers that were written to expect it.
    pub fn legacy() -> Self {
        let mut bytes = [0u8; 16];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        Self(bytes)
    }

    /// Use caller-supplied bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The raw nonce.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Base64 form, as it appears on the wire.
    pub fn encode(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Debug for HandshakeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandshakeKey").field(&self.encode()).finish()
    }
}

/// A successful upgrade.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upgraded {
    /// The response status line, without its CRLF.
    pub status_line: String,
    /// Bytes received after the header terminator. These already belong to
    /// the frame stream.
    pub leftover: Vec<u8>,
}

/// Compose the upgrade request for `endpoint`.
pub fn build_request(endpoint: &EndpointDescriptor, key: &HandshakeKey) -> String {
    format!(
        "GET {} HTTP/1.1\r\n\
         Host: {}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n",
        endpoint.path,
        endpoint.host,
        key.encode()
    )
}

/// Send the upgrade request over `stream` and validate the response.
///
/// The request is written in a single `write_all` followed by a flush. The
/// response is accumulated until `\r\n\r\n`; the status line must carry
/// `HTTP/1.1 101`. No deadline is applied here: callers wrap this future
/// in their own timeout.
///
/// # Errors
///
/// - [`HandshakeError::ConnectionClosed`] if the peer closes before the
///   header terminator.
/// - [`HandshakeError::Rejected`] for any non-101 response.
/// - [`HandshakeError::Oversized`] if the headers exceed
///   [`MAX_RESPONSE_HEADER_BYTES`].
/// - [`HandshakeError::Transport`] on I/O failure.
pub async fn perform_handshake<S>(
    stream: &mut S,
    endpoint: &EndpointDescriptor,
    key: &HandshakeKey,
) -> Result<Upgraded, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = build_request(endpoint, key);
    tracing::debug!(
        target: targets::HANDSHAKE,
        host = %endpoint.host,
        path = %endpoint.path,
        "sending upgrade request"
    );

    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| HandshakeError::Transport(e.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|e| HandshakeError::Transport(e.to_string()))?;

    let (buf, header_end) = read_header_section(stream).await?;
    let headers = &buf[..header_end];

    if !contains(headers, SWITCHING_PROTOCOLS) {
        let preview_len = buf.len().min(REJECT_PREVIEW_BYTES);
        let preview = String::from_utf8_lossy(&buf[..preview_len]).into_owned();
        tracing::warn!(target: targets::HANDSHAKE, %preview, "upgrade rejected");
        return Err(HandshakeError::Rejected { preview });
    }

    let status_line = headers
        .split(|&b| b == b'\n')
        .next()
        .map(|line| String::from_utf8_lossy(line).trim_end().to_string())
        .unwrap_or_default();
    let leftover = buf[header_end + HEADER_TERMINATOR.len()..].to_vec();

    tracing::debug!(
        target: targets::HANDSHAKE,
        %status_line,
        leftover = leftover.len(),
        "upgrade accepted"
    );

    Ok(Upgraded {
        status_line,
        leftover,
    })
}

/// Read until the header terminator, returning the buffer and the offset of
/// the terminator within it.
async fn read_header_section<S>(stream: &mut S) -> Result<(Vec<u8>, usize), HandshakeError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| HandshakeError::Transport(e.to_string()))?;
        if n == 0 {
            tracing::debug!(
                target: targets::HANDSHAKE,
                received = buf.len(),
                "peer closed before end of headers"
            );
            return Err(HandshakeError::ConnectionClosed);
        }

        // Only rescan the tail that could hold a newly completed terminator.
        let scan_from = buf.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
        buf.extend_from_slice(&chunk[..n]);

        if let Some(pos) = find(&buf[scan_from..], HEADER_TERMINATOR) {
            return Ok((buf, scan_from + pos));
        }

        if buf.len() > MAX_RESPONSE_HEADER_BYTES {
            return Err(HandshakeError::Oversized {
                limit: MAX_RESPONSE_HEADER_BYTES,
            });
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> EndpointDescriptor {
        EndpointDescriptor::parse("ws://192.168.1.100:8080/ws", "/ws").unwrap()
    }

    #[test]
    fn test_legacy_key_encoding() {
        assert_eq!(HandshakeKey::legacy().encode(), "AAECAwQFBgcICQoLDA0ODw==");
    }

    #[test]
    fn test_random_keys_differ() {
        assert_ne!(HandshakeKey::random(), HandshakeKey::random());
        assert_eq!(HandshakeKey::random().encode().len(), 24);
    }

    #[test]
    fn test_build_request_exact_bytes() {
        let request = build_request(&endpoint(), &HandshakeKey::legacy());
        assert_eq!(
            request,
            "GET /ws HTTP/1.1\r\n\
             Host: 192.168.1.100\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: AAECAwQFBgcICQoLDA0ODw==\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_find_terminator() {
        assert_eq!(find(b"HTTP/1.1 101\r\n\r\nxy", HEADER_TERMINATOR), Some(12));
        assert_eq!(find(b"HTTP/1.1 101\r\n", HEADER_TERMINATOR), None);
    }

    #[tokio::test]
    async fn test_terminator_split_across_reads() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let task = tokio::spawn(async move {
            let mut sink = [0u8; 1024];
            let _ = server.read(&mut sink).await;
            server.write_all(b"HTTP/1.1 101 Switching Protocols\r\n\r").await.unwrap();
            server.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            server.write_all(b"\n").await.unwrap();
            server
        });

        let upgraded = perform_handshake(&mut client, &endpoint(), &HandshakeKey::legacy())
            .await
            .unwrap();
        assert_eq!(upgraded.status_line, "HTTP/1.1 101 Switching Protocols");
        assert!(upgraded.leftover.is_empty());
        drop(task.await.unwrap());
    }
}
