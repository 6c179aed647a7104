//! Opening the raw byte stream for a connection attempt.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;

use tether_core::logging::targets;

use crate::error::ClientError;
use crate::url::EndpointDescriptor;

/// Opens the byte stream a handshake runs over.
pub trait Connector: Send + Sync {
    /// The stream type produced.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a stream to `endpoint`.
    fn connect(
        &self,
        endpoint: &EndpointDescriptor,
    ) -> impl Future<Output = Result<Self::Stream, ClientError>> + Send;
}

/// Plain TCP connector.
///
/// `wss://` endpoints are dialled in the clear; TLS is not provided.
#[derive(Clone, Debug, Default)]
pub struct TcpConnector {
    no_delay: bool,
    connect_timeout: Option<Duration>,
}

impl TcpConnector {
    /// Create a connector with default socket options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable TCP_NODELAY.
    pub fn no_delay(mut self, enabled: bool) -> Self {
        self.no_delay = enabled;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, endpoint: &EndpointDescriptor) -> Result<TcpStream, ClientError> {
        let addr = endpoint.address();
        if endpoint.secure {
            tracing::warn!(target: targets::CLIENT, %addr, "wss endpoint dialled without TLS");
        }

        let connect_err = |e: io::Error| ClientError::Connect {
            address: addr.clone(),
            message: e.to_string(),
        };

        let stream = match self.connect_timeout {
            Some(after) => match timeout(after, TcpStream::connect(&addr)).await {
                Ok(result) => result.map_err(connect_err)?,
                Err(_) => {
                    return Err(ClientError::TimedOut {
                        operation: "connect",
                        after,
                    });
                }
            },
            None => TcpStream::connect(&addr).await.map_err(connect_err)?,
        };

        if self.no_delay {
            stream.set_nodelay(true).map_err(connect_err)?;
        }

        tracing::debug!(target: targets::CLIENT, %addr, "stream open");
        Ok(stream)
    }
}
