//! Connection lifecycle states.

use std::fmt;

/// Current state of the client's connection lifecycle.
///
/// Exactly one state is current at a time; see
/// [`can_transition_to`](Self::can_transition_to) for the permitted moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No stream open. Initial and terminal state.
    #[default]
    Disconnected,
    /// Waiting for the network link to come back.
    LinkDown,
    /// Stream open, upgrade exchange in progress.
    Handshaking,
    /// Upgraded and exchanging messages.
    Connected,
    /// Releasing the stream after a failure or shutdown.
    Closing,
}

impl ConnectionState {
    /// Whether the lifecycle may move from `self` to `next`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, LinkDown | Handshaking | Closing)
                | (LinkDown, Handshaking | Closing | Disconnected)
                | (Handshaking, Connected | Closing | Disconnected)
                | (Connected, Closing | Disconnected)
                | (Closing, LinkDown | Disconnected)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::LinkDown => write!(f, "LinkDown"),
            Self::Handshaking => write!(f, "Handshaking"),
            Self::Connected => write!(f, "Connected"),
            Self::Closing => write!(f, "Closing"),
        }
    }
}

/// Why [`WebSocketClient::run`](super::WebSocketClient::run) returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The cancellation token fired.
    Cancelled,
    /// `max_reconnect_attempts` consecutive cycles ended without a session
    /// surviving.
    AttemptsExhausted {
        /// Attempts counted when the client gave up.
        attempts: u32,
    },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::AttemptsExhausted { attempts } => {
                write!(f, "gave up after {attempts} attempts")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionState::*;
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Disconnected.can_transition_to(Handshaking));
        assert!(Handshaking.can_transition_to(Connected));
        assert!(Connected.can_transition_to(Closing));
        assert!(Closing.can_transition_to(LinkDown));
        assert!(LinkDown.can_transition_to(Handshaking));
        assert!(Closing.can_transition_to(Disconnected));
    }

    #[test]
    fn test_forbidden_transitions() {
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!LinkDown.can_transition_to(Connected));
        assert!(!Connected.can_transition_to(Handshaking));
        assert!(!Connected.can_transition_to(LinkDown));
        assert!(!Closing.can_transition_to(Connected));
        assert!(!Closing.can_transition_to(Handshaking));
        for state in [Disconnected, LinkDown, Handshaking, Connected, Closing] {
            assert!(!state.can_transition_to(state));
        }
    }

    #[test]
    fn test_display_and_default() {
        assert_eq!(ConnectionState::default(), Disconnected);
        assert_eq!(LinkDown.to_string(), "LinkDown");
        assert_eq!(
            StopReason::AttemptsExhausted { attempts: 3 }.to_string(),
            "gave up after 3 attempts"
        );
    }
}
