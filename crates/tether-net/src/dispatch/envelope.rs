//! The JSON message envelope exchanged with the server.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::transport::Message;

/// A decoded application message, discriminated by its `type` field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Device report, sent on connect.
    Status {
        /// Device model name.
        device: String,
        /// Current output level.
        led_state: bool,
        /// The device's address, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ip: Option<String>,
    },
    /// Server request to drive the output.
    LedControl {
        /// What to do with the output.
        #[serde(default)]
        action: LedAction,
    },
    /// Liveness probe.
    Ping,
    /// Reply to [`Ping`](Self::Ping).
    Pong {
        /// Seconds since the Unix epoch.
        timestamp: f64,
    },
    /// Output level after a [`LedControl`](Self::LedControl).
    LedStatus {
        /// Current output level.
        state: bool,
    },
    /// Server greeting.
    Welcome {
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Periodic server broadcast.
    Periodic {
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Server echo of something the device sent.
    Echo {
        #[serde(default)]
        original: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

/// Requested output change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedAction {
    On,
    Off,
    Toggle,
    /// Anything else. Acknowledged without changing the output.
    #[default]
    #[serde(other)]
    Unknown,
}

/// The `type` tag of an [`Envelope`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Status,
    LedControl,
    Ping,
    Pong,
    LedStatus,
    Welcome,
    Periodic,
    Echo,
}

impl EnvelopeKind {
    /// Every kind, in declaration order.
    pub const ALL: [EnvelopeKind; 8] = [
        Self::Status,
        Self::LedControl,
        Self::Ping,
        Self::Pong,
        Self::LedStatus,
        Self::Welcome,
        Self::Periodic,
        Self::Echo,
    ];

    /// The wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::LedControl => "led_control",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::LedStatus => "led_status",
            Self::Welcome => "welcome",
            Self::Periodic => "periodic",
            Self::Echo => "echo",
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvelopeKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownType(s.to_string()))
    }
}

impl Envelope {
    /// The envelope's tag.
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Status { .. } => EnvelopeKind::Status,
            Self::LedControl { .. } => EnvelopeKind::LedControl,
            Self::Ping => EnvelopeKind::Ping,
            Self::Pong { .. } => EnvelopeKind::Pong,
            Self::LedStatus { .. } => EnvelopeKind::LedStatus,
            Self::Welcome { .. } => EnvelopeKind::Welcome,
            Self::Periodic { .. } => EnvelopeKind::Periodic,
            Self::Echo { .. } => EnvelopeKind::Echo,
        }
    }

    /// Decode an inbound message.
    ///
    /// Payloads that are not a JSON object with a string `type` are
    /// [`Malformed`](DispatchError::Malformed); an unrecognised tag is
    /// [`UnknownType`](DispatchError::UnknownType).
    pub fn decode(message: &Message) -> Result<Self, DispatchError> {
        let value: serde_json::Value = serde_json::from_slice(message.as_bytes())
            .map_err(|e| DispatchError::Malformed(e.to_string()))?;
        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| DispatchError::Malformed("missing string field 'type'".to_string()))?;
        tag.parse::<EnvelopeKind>()?;
        serde_json::from_value(value).map_err(|e| DispatchError::Malformed(e.to_string()))
    }

    /// Encode as a JSON text message.
    pub fn to_message(&self) -> Result<Message, DispatchError> {
        Message::json(self).map_err(|e| DispatchError::Handler(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_led_control_actions() {
        let env = Envelope::decode(&Message::text(
            r#"{"type":"led_control","action":"toggle"}"#,
        ))
        .unwrap();
        assert_eq!(env, Envelope::LedControl { action: LedAction::Toggle });

        let env =
            Envelope::decode(&Message::text(r#"{"type":"led_control","action":"blink"}"#))
                .unwrap();
        assert_eq!(env, Envelope::LedControl { action: LedAction::Unknown });

        let env = Envelope::decode(&Message::text(r#"{"type":"led_control"}"#)).unwrap();
        assert_eq!(env, Envelope::LedControl { action: LedAction::Unknown });
    }

    #[test]
    fn test_decode_server_messages() {
        let env = Envelope::decode(&Message::text(
            r#"{"type":"welcome","message":"hi","timestamp":"2024-01-01T00:00:00"}"#,
        ))
        .unwrap();
        assert_eq!(env.kind(), EnvelopeKind::Welcome);

        let env = Envelope::decode(&Message::text(r#"{"type":"ping","id":7}"#)).unwrap();
        assert_eq!(env, Envelope::Ping);
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            Envelope::decode(&Message::text("{not json")),
            Err(DispatchError::Malformed(_))
        ));
        assert!(matches!(
            Envelope::decode(&Message::text(r#"{"action":"on"}"#)),
            Err(DispatchError::Malformed(_))
        ));
        assert_eq!(
            Envelope::decode(&Message::text(r#"{"type":"reboot"}"#)),
            Err(DispatchError::UnknownType("reboot".to_string()))
        );
        assert!(matches!(
            Envelope::decode(&Message::text(r#"{"type":"pong"}"#)),
            Err(DispatchError::Malformed(_))
        ));
    }

    #[test]
    fn test_encode_status() {
        let msg = Envelope::Status {
            device: "ESP32".to_string(),
            led_state: false,
            ip: Some("192.168.1.50".to_string()),
        }
        .to_message()
        .unwrap();
        assert_eq!(
            msg.as_text(),
            Some(r#"{"type":"status","device":"ESP32","led_state":false,"ip":"192.168.1.50"}"#)
        );
        assert_eq!(Envelope::Ping.to_message().unwrap().as_text(), Some(r#"{"type":"ping"}"#));
    }

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in EnvelopeKind::ALL {
            assert_eq!(kind.as_str().parse::<EnvelopeKind>().unwrap(), kind);
        }
    }
}
