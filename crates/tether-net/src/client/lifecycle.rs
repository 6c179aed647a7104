//! The reconnecting WebSocket client.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tether_core::logging::{span_names, targets};
use tether_core::{CancellationToken, Signal};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::Instrument;

use super::config::ClientConfig;
use super::connector::{Connector, TcpConnector};
use super::reconnect::{ReconnectCounter, ReconnectDecision};
use super::state::{ConnectionState, StopReason};
use crate::dispatch::{Dispatcher, SessionInfo};
use crate::error::{ClientError, Result};
use crate::handshake::perform_handshake;
use crate::link::{AlwaysUp, LinkProvider};
use crate::transport::{FrameTransport, Message, WsTransport};
use crate::url::EndpointDescriptor;

/// How long a best-effort close may take before the stream is dropped.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

type OutboundSlot = Arc<Mutex<Option<mpsc::UnboundedSender<Message>>>>;

/// How a single connection attempt ended.
enum SessionEnd {
    Cancelled,
    Failed(ClientError),
}

/// What woke the message loop.
enum Event {
    Cancelled,
    Outbound(Message),
    Inbound(Result<Option<Message>>),
}

/// Queues messages for the connected session.
///
/// Obtained from [`WebSocketClient::sender`]. Messages are written by the
/// client's own message loop, in order. Sending while no session is open
/// fails with [`ClientError::NotConnected`], and messages still queued when
/// a session ends are dropped.
#[derive(Clone, Debug)]
pub struct MessageSender {
    slot: OutboundSlot,
}

impl MessageSender {
    /// Queue a message.
    pub fn send(&self, message: Message) -> Result<()> {
        match self.slot.lock().as_ref() {
            Some(tx) => tx.send(message).map_err(|_| ClientError::NotConnected),
            None => Err(ClientError::NotConnected),
        }
    }

    /// Queue a text message.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(Message::text(text))
    }

    /// Whether a session is currently accepting messages.
    pub fn is_connected(&self) -> bool {
        self.slot.lock().is_some()
    }
}

/// Clears the running flag when `run` returns or is dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A WebSocket client that keeps itself connected.
///
/// [`run`](Self::run) drives the whole lifecycle on the calling task:
/// wait for the link, open a stream, upgrade it, exchange messages, and
/// on any failure close, wait the configured delay and start over. It
/// returns only when cancelled or after `max_reconnect_attempts`
/// consecutive cycles end without a session.
///
/// # Signals
///
/// - [`state_changed`](Self::state_changed): Emitted on every state transition
/// - [`connected`](Self::connected): Emitted when a session reaches `Connected`
/// - [`disconnected`](Self::disconnected): Emitted when a connected session ends
/// - [`message_received`](Self::message_received): Emitted for each inbound message, before dispatch
/// - [`error`](Self::error): Emitted for every failure, including ones that are retried
///
/// # Example
///
/// ```ignore
/// use tether_net::{ClientConfig, WebSocketClient};
/// use tether_net::dispatch::{DeviceDispatcher, MemoryOutput};
///
/// let config = ClientConfig::new("ws://192.168.1.100:8080/ws");
/// let client = WebSocketClient::new_tcp(config, DeviceDispatcher::new(MemoryOutput::new()));
///
/// client.connected.connect(|endpoint| println!("Connected to {endpoint}"));
/// client.error.connect(|e| eprintln!("{e}"));
///
/// let reason = client.run().await?;
/// ```
pub struct WebSocketClient<L, C, D> {
    config: ClientConfig,
    link: L,
    connector: C,
    dispatcher: Mutex<D>,
    state: Mutex<ConnectionState>,
    outbound: OutboundSlot,
    cancel: CancellationToken,
    is_running: AtomicBool,

    /// Signal emitted on every state transition.
    pub state_changed: Signal<ConnectionState>,
    /// Signal emitted when a session is established.
    pub connected: Signal<EndpointDescriptor>,
    /// Signal emitted when an established session ends.
    pub disconnected: Signal<()>,
    /// Signal emitted for each inbound message.
    pub message_received: Signal<Message>,
    /// Signal emitted when an error occurs.
    pub error: Signal<ClientError>,
}

impl<D: Dispatcher> WebSocketClient<AlwaysUp, TcpConnector, D> {
    /// Create a client that dials plain TCP on a host whose link is managed
    /// by the operating system.
    pub fn new_tcp(config: ClientConfig, dispatcher: D) -> Self {
        let connector = match config.connect_timeout {
            Some(t) => TcpConnector::new().no_delay(true).connect_timeout(t),
            None => TcpConnector::new().no_delay(true),
        };
        Self::new(config, AlwaysUp, connector, dispatcher)
    }
}

impl<L, C, D> WebSocketClient<L, C, D>
where
    L: LinkProvider,
    C: Connector,
    D: Dispatcher,
{
    /// Create a client from its collaborators.
    pub fn new(config: ClientConfig, link: L, connector: C, dispatcher: D) -> Self {
        Self {
            config,
            link,
            connector,
            dispatcher: Mutex::new(dispatcher),
            state: Mutex::new(ConnectionState::Disconnected),
            outbound: Arc::new(Mutex::new(None)),
            cancel: CancellationToken::new(),
            is_running: AtomicBool::new(false),
            state_changed: Signal::new(),
            connected: Signal::new(),
            disconnected: Signal::new(),
            message_received: Signal::new(),
            error: Signal::new(),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The link provider.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Check if the client is connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Check if [`run`](Self::run) is in progress.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// A handle for queueing outbound messages.
    pub fn sender(&self) -> MessageSender {
        MessageSender {
            slot: Arc::clone(&self.outbound),
        }
    }

    /// Queue a message for the connected session.
    pub fn send(&self, message: Message) -> Result<()> {
        self.sender().send(message)
    }

    /// A handle that stops [`run`](Self::run) when cancelled.
    ///
    /// Cancellation is sticky: a cancelled client stays stopped until the
    /// token is [`reset`](CancellationToken::reset).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request that [`run`](Self::run) stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Run `f` against the dispatcher.
    pub fn with_dispatcher<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.dispatcher.lock())
    }

    /// Drive the connection lifecycle until cancelled or out of attempts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AlreadyRunning`] if another `run` is in
    /// progress on this client. Every other failure is handled internally
    /// and reported on the [`error`](Self::error) signal.
    pub async fn run(&self) -> Result<StopReason> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyRunning);
        }
        let _running = RunningGuard(&self.is_running);

        tracing::info!(
            target: targets::CLIENT,
            url = %self.config.server_url,
            max_attempts = self.config.max_reconnect_attempts,
            delay = ?self.config.reconnect_delay,
            "client starting"
        );

        let reason = self.run_cycles().await;
        tracing::info!(target: targets::CLIENT, %reason, "client stopped");
        Ok(reason)
    }

    async fn run_cycles(&self) -> StopReason {
        let mut counter = ReconnectCounter::new(
            self.config.max_reconnect_attempts,
            self.config.reconnect_delay,
        );

        loop {
            if self.cancel.is_cancelled() {
                return self.stop_cancelled();
            }

            if !self.link.is_up() {
                self.set_state(ConnectionState::LinkDown);
                tracing::info!(target: targets::CLIENT, "link down, reassociating");
                match self.cancel.run_until_cancelled(self.link.reassociate()).await {
                    None => return self.stop_cancelled(),
                    Some(Ok(())) => {
                        tracing::info!(target: targets::CLIENT, "link up");
                    }
                    Some(Err(e)) => {
                        // Link failures are waited out and do not count as attempts.
                        tracing::warn!(target: targets::CLIENT, error = %e, "link unavailable");
                        self.error.emit(e.into());
                        if !self.pause(self.config.reconnect_delay).await {
                            return self.stop_cancelled();
                        }
                        continue;
                    }
                }
            }

            let span = tracing::info_span!(
                target: targets::CLIENT,
                span_names::CYCLE,
                attempt = counter.attempts() + 1
            );
            let err = match self.attempt(&mut counter).instrument(span).await {
                SessionEnd::Cancelled => return self.stop_cancelled(),
                SessionEnd::Failed(err) => err,
            };

            self.set_state(ConnectionState::Closing);
            match &err {
                ClientError::EndOfStream => {
                    tracing::info!(target: targets::CLIENT, "server closed the connection");
                }
                other => {
                    tracing::warn!(target: targets::CLIENT, error = %other, "connection attempt ended");
                }
            }
            self.error.emit(err);

            match counter.record_failure() {
                ReconnectDecision::Exhausted { attempts } => {
                    tracing::error!(
                        target: targets::CLIENT,
                        attempts,
                        "max reconnection attempts reached"
                    );
                    self.set_state(ConnectionState::Disconnected);
                    return StopReason::AttemptsExhausted { attempts };
                }
                ReconnectDecision::Retry(delay) => {
                    tracing::info!(
                        target: targets::CLIENT,
                        attempt = counter.attempts(),
                        max = counter.max(),
                        ?delay,
                        "reconnecting"
                    );
                    if !self.pause(delay).await {
                        return self.stop_cancelled();
                    }
                    self.set_state(ConnectionState::LinkDown);
                }
            }
        }
    }

    /// One trip from URL parsing to the end of the session.
    ///
    /// On failure the stream has already been released when this returns.
    async fn attempt(&self, counter: &mut ReconnectCounter) -> SessionEnd {
        let endpoint =
            match EndpointDescriptor::parse(&self.config.server_url, &self.config.fallback_path) {
                Ok(endpoint) => endpoint,
                Err(e) => return SessionEnd::Failed(e.into()),
            };

        let mut stream = match self
            .guarded(
                "connect",
                self.config.connect_timeout,
                self.connector.connect(&endpoint),
            )
            .await
        {
            Ok(stream) => stream,
            Err(end) => return end,
        };

        self.set_state(ConnectionState::Handshaking);
        let key = self.config.handshake_key();
        let handshake = self
            .guarded("handshake", self.config.handshake_timeout, async {
                perform_handshake(&mut stream, &endpoint, &key)
                    .await
                    .map_err(ClientError::from)
            })
            .await;
        let upgraded = match handshake {
            Ok(upgraded) => upgraded,
            Err(end) => {
                if matches!(end, SessionEnd::Failed(_)) {
                    self.set_state(ConnectionState::Closing);
                }
                if let Ok(Err(e)) = timeout(CLOSE_GRACE, stream.shutdown()).await {
                    tracing::debug!(target: targets::CLIENT, error = %e, "stream shutdown failed");
                }
                return end;
            }
        };

        let session = SessionInfo {
            endpoint: endpoint.clone(),
            status_line: upgraded.status_line.clone(),
            local_address: self.link.local_address(),
        };
        let mut transport = WsTransport::from_upgraded(stream, upgraded).await;

        counter.reset();
        self.set_state(ConnectionState::Connected);
        tracing::info!(target: targets::CLIENT, %endpoint, "connected");
        self.connected.emit(endpoint);

        let (tx, mut rx) = mpsc::unbounded_channel();
        *self.outbound.lock() = Some(tx);

        let span = tracing::info_span!(target: targets::CLIENT, span_names::SESSION);
        let end = self
            .message_loop(&mut transport, &mut rx, &session)
            .instrument(span)
            .await;

        self.outbound.lock().take();
        rx.close();
        let mut discarded = 0usize;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(target: targets::CLIENT, discarded, "dropped queued messages");
        }

        self.dispatcher.lock().on_disconnect();
        if matches!(end, SessionEnd::Failed(_)) {
            self.set_state(ConnectionState::Closing);
        }
        match timeout(CLOSE_GRACE, transport.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(target: targets::CLIENT, error = %e, "close failed");
            }
            Err(_) => {
                tracing::debug!(target: targets::CLIENT, "close timed out");
            }
        }
        self.disconnected.emit(());
        end
    }

    async fn message_loop<T: FrameTransport>(
        &self,
        transport: &mut T,
        outbound: &mut mpsc::UnboundedReceiver<Message>,
        session: &SessionInfo,
    ) -> SessionEnd {
        let greeting = self.dispatcher.lock().on_connect(session);
        for message in greeting {
            if let Err(end) = self.write(transport, message).await {
                return end;
            }
        }

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Event::Cancelled,
                Some(message) = outbound.recv() => Event::Outbound(message),
                read = read_next(transport, self.config.read_timeout) => Event::Inbound(read),
            };

            match event {
                Event::Cancelled => return SessionEnd::Cancelled,
                Event::Outbound(message) => {
                    if let Err(end) = self.write(transport, message).await {
                        return end;
                    }
                }
                Event::Inbound(Ok(Some(message))) => {
                    tracing::debug!(target: targets::CLIENT, len = message.len(), "message received");
                    self.message_received.emit(message.clone());

                    let result = self.dispatcher.lock().on_message(&message);
                    match result {
                        Ok(replies) => {
                            for reply in replies {
                                if let Err(end) = self.write(transport, reply).await {
                                    return end;
                                }
                            }
                        }
                        Err(e) if e.is_fatal() => {
                            return SessionEnd::Failed(e.into());
                        }
                        Err(e) => {
                            tracing::warn!(target: targets::CLIENT, error = %e, "message not handled");
                            self.error.emit(e.into());
                        }
                    }
                }
                Event::Inbound(Ok(None)) => return SessionEnd::Failed(ClientError::EndOfStream),
                Event::Inbound(Err(e)) => return SessionEnd::Failed(e),
            }
        }
    }

    async fn write<T: FrameTransport>(
        &self,
        transport: &mut T,
        message: Message,
    ) -> std::result::Result<(), SessionEnd> {
        self.guarded("write", None, async {
            transport.write_message(message).await.map_err(ClientError::from)
        })
        .await
    }

    /// Race `fut` against cancellation and an optional deadline.
    async fn guarded<T, F>(
        &self,
        operation: &'static str,
        deadline: Option<Duration>,
        fut: F,
    ) -> std::result::Result<T, SessionEnd>
    where
        F: Future<Output = Result<T>>,
    {
        let bounded = async {
            match deadline {
                Some(after) => match timeout(after, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(ClientError::TimedOut { operation, after }),
                },
                None => fut.await,
            }
        };
        match self.cancel.run_until_cancelled(bounded).await {
            None => Err(SessionEnd::Cancelled),
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(SessionEnd::Failed(e)),
        }
    }

    /// Sleep for `delay`. Returns `false` if cancelled first.
    async fn pause(&self, delay: Duration) -> bool {
        self.cancel
            .run_until_cancelled(tokio::time::sleep(delay))
            .await
            .is_some()
    }

    fn stop_cancelled(&self) -> StopReason {
        self.set_state(ConnectionState::Disconnected);
        StopReason::Cancelled
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = {
            let mut state = self.state.lock();
            if *state == next {
                return;
            }
            std::mem::replace(&mut *state, next)
        };
        debug_assert!(
            prev.can_transition_to(next),
            "illegal transition {prev} -> {next}"
        );
        tracing::debug!(target: targets::CLIENT, from = %prev, to = %next, "state changed");
        self.state_changed.emit(next);
    }
}

async fn read_next<T: FrameTransport>(
    transport: &mut T,
    deadline: Option<Duration>,
) -> Result<Option<Message>> {
    match deadline {
        Some(after) => match timeout(after, transport.read_message()).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ClientError::TimedOut {
                operation: "read",
                after,
            }),
        },
        None => transport.read_message().await.map_err(Into::into),
    }
}

impl<L, C, D> std::fmt::Debug for WebSocketClient<L, C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketClient")
            .field("server_url", &self.config.server_url)
            .field("state", &*self.state.lock())
            .field("is_running", &self.is_running.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
