//! Tests for the HTTP upgrade exchange over in-memory streams.

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use tether_net::handshake::MAX_RESPONSE_HEADER_BYTES;
use tether_net::{EndpointDescriptor, HandshakeError, HandshakeKey, perform_handshake};

const SWITCHING: &[u8] = b"HTTP/1.1 101 Switching Protocols\r\n\
Upgrade: websocket\r\n\
Connection: Upgrade\r\n\
Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n";

fn endpoint() -> EndpointDescriptor {
    EndpointDescriptor::parse("ws://127.0.0.1:8080/ws", "/ws").unwrap()
}

/// Read the request head from the client side of a duplex pair.
async fn read_request(server: &mut DuplexStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 256];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = server.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before finishing request");
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn test_switching_protocols_succeeds() {
    let (mut client, mut server) = tokio::io::duplex(16 * 1024);

    let server_task = tokio::spawn(async move {
        let request = read_request(&mut server).await;
        server.write_all(SWITCHING).await.unwrap();
        (request, server)
    });

    let upgraded = perform_handshake(&mut client, &endpoint(), &HandshakeKey::legacy())
        .await
        .unwrap();
    assert_eq!(upgraded.status_line, "HTTP/1.1 101 Switching Protocols");
    assert!(upgraded.leftover.is_empty());

    let (request, _server) = server_task.await.unwrap();
    assert!(request.starts_with("GET /ws HTTP/1.1\r\nHost: 127.0.0.1\r\n"));
    assert!(request.contains("Sec-WebSocket-Key: AAECAwQFBgcICQoLDA0ODw==\r\n"));
    assert!(request.ends_with("Sec-WebSocket-Version: 13\r\n\r\n"));
}

#[tokio::test]
async fn test_bytes_after_headers_are_kept() {
    let (mut client, mut server) = tokio::io::duplex(16 * 1024);

    let server_task = tokio::spawn(async move {
        read_request(&mut server).await;
        let mut response = SWITCHING.to_vec();
        // An unmasked text frame carrying "hi".
        response.extend_from_slice(&[0x81, 0x02, b'h', b'i']);
        server.write_all(&response).await.unwrap();
        server
    });

    let upgraded = perform_handshake(&mut client, &endpoint(), &HandshakeKey::random())
        .await
        .unwrap();
    assert_eq!(upgraded.leftover, vec![0x81, 0x02, b'h', b'i']);
    drop(server_task.await.unwrap());
}

#[tokio::test]
async fn test_not_found_is_rejected() {
    let (mut client, mut server) = tokio::io::duplex(16 * 1024);

    tokio::spawn(async move {
        read_request(&mut server).await;
        server
            .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
        server
    });

    let err = perform_handshake(&mut client, &endpoint(), &HandshakeKey::random())
        .await
        .unwrap_err();
    match err {
        HandshakeError::Rejected { preview } => {
            assert!(preview.starts_with("HTTP/1.1 404 Not Found"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rejection_preview_is_truncated() {
    let (mut client, mut server) = tokio::io::duplex(16 * 1024);

    tokio::spawn(async move {
        read_request(&mut server).await;
        let mut response = b"HTTP/1.1 400 Bad Request\r\nX-Filler: ".to_vec();
        response.extend(std::iter::repeat_n(b'a', 300));
        response.extend_from_slice(b"\r\n\r\n");
        server.write_all(&response).await.unwrap();
        server
    });

    let err = perform_handshake(&mut client, &endpoint(), &HandshakeKey::random())
        .await
        .unwrap_err();
    let HandshakeError::Rejected { preview } = err else {
        panic!("expected Rejected");
    };
    assert_eq!(preview.len(), 100);
}

#[tokio::test]
async fn test_early_close_is_connection_closed() {
    let (mut client, mut server) = tokio::io::duplex(16 * 1024);

    tokio::spawn(async move {
        read_request(&mut server).await;
        server.write_all(b"HTTP/1.1 101 Swi").await.unwrap();
        drop(server);
    });

    let err = perform_handshake(&mut client, &endpoint(), &HandshakeKey::random())
        .await
        .unwrap_err();
    assert_eq!(err, HandshakeError::ConnectionClosed);
}

#[tokio::test]
async fn test_endless_headers_are_oversized() {
    let (mut client, mut server) = tokio::io::duplex(64 * 1024);

    tokio::spawn(async move {
        read_request(&mut server).await;
        let mut response = b"HTTP/1.1 101 Switching Protocols\r\n".to_vec();
        while response.len() <= MAX_RESPONSE_HEADER_BYTES + 512 {
            response.extend_from_slice(b"X-Padding: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n");
        }
        let _ = server.write_all(&response).await;
        server
    });

    let err = perform_handshake(&mut client, &endpoint(), &HandshakeKey::random())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        HandshakeError::Oversized {
            limit: MAX_RESPONSE_HEADER_BYTES
        }
    );
}
