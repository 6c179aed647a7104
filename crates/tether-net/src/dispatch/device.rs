//! The stock device behaviour: status on connect, ping/pong, output control.

use chrono::Utc;
use tether_core::logging::targets;

use super::envelope::{Envelope, LedAction};
use super::output::BinaryOutput;
use super::{Dispatcher, SessionInfo};
use crate::error::DispatchError;
use crate::transport::Message;

/// Device name reported in the status message.
pub const DEFAULT_DEVICE_NAME: &str = "ESP32";

/// Dispatcher for a device with one on/off output.
///
/// - On connect, reports `status` with the device name, output level and
///   local address.
/// - `ping` is answered with `pong` carrying the current Unix time.
/// - `led_control` drives the output and is answered with `led_status`.
///   An unrecognised action leaves the output alone but is still answered.
/// - Server notices (`welcome`, `periodic`, `echo`) are logged.
#[derive(Debug)]
pub struct DeviceDispatcher<O> {
    device: String,
    output: O,
}

impl<O: BinaryOutput> DeviceDispatcher<O> {
    /// Create a dispatcher driving `output`.
    pub fn new(output: O) -> Self {
        Self {
            device: DEFAULT_DEVICE_NAME.to_string(),
            output,
        }
    }

    /// Set the device name reported on connect.
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device = name.into();
        self
    }

    /// The driven output.
    pub fn output(&self) -> &O {
        &self.output
    }

    fn apply(&mut self, action: LedAction) -> bool {
        match action {
            LedAction::On => self.output.set(true),
            LedAction::Off => self.output.set(false),
            LedAction::Toggle => {
                self.output.toggle();
            }
            LedAction::Unknown => {
                tracing::warn!(target: targets::DISPATCH, "unknown led action, output unchanged");
            }
        }
        let state = self.output.level();
        tracing::info!(target: targets::DISPATCH, ?action, state, "output updated");
        state
    }
}

impl<O: BinaryOutput> Dispatcher for DeviceDispatcher<O> {
    fn on_connect(&mut self, session: &SessionInfo) -> Vec<Message> {
        let status = Envelope::Status {
            device: self.device.clone(),
            led_state: self.output.level(),
            ip: session.local_address.map(|ip| ip.to_string()),
        };
        match status.to_message() {
            Ok(message) => vec![message],
            Err(e) => {
                tracing::warn!(target: targets::DISPATCH, error = %e, "could not encode status");
                Vec::new()
            }
        }
    }

    fn on_message(&mut self, message: &Message) -> Result<Vec<Message>, DispatchError> {
        let reply = match Envelope::decode(message)? {
            Envelope::LedControl { action } => Some(Envelope::LedStatus {
                state: self.apply(action),
            }),
            Envelope::Ping => Some(Envelope::Pong {
                timestamp: unix_seconds(),
            }),
            Envelope::Welcome { message, .. } | Envelope::Periodic { message, .. } => {
                tracing::info!(target: targets::DISPATCH, %message, "server notice");
                None
            }
            other => {
                tracing::debug!(target: targets::DISPATCH, kind = %other.kind(), "ignored");
                None
            }
        };

        reply.map(|env| env.to_message()).into_iter().collect()
    }
}

fn unix_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MemoryOutput;

    fn reply_of(dispatcher: &mut DeviceDispatcher<MemoryOutput>, text: &str) -> Vec<Envelope> {
        dispatcher
            .on_message(&Message::text(text))
            .unwrap()
            .iter()
            .map(|m| Envelope::decode(m).unwrap())
            .collect()
    }

    #[test]
    fn test_led_control_drives_output() {
        let output = MemoryOutput::new();
        let mut dispatcher = DeviceDispatcher::new(output.clone());

        assert_eq!(
            reply_of(&mut dispatcher, r#"{"type":"led_control","action":"on"}"#),
            vec![Envelope::LedStatus { state: true }]
        );
        assert!(output.level());

        assert_eq!(
            reply_of(&mut dispatcher, r#"{"type":"led_control","action":"toggle"}"#),
            vec![Envelope::LedStatus { state: false }]
        );
        assert!(!output.level());
    }

    #[test]
    fn test_unknown_action_still_acknowledged() {
        let output = MemoryOutput::new();
        let mut dispatcher = DeviceDispatcher::new(output.clone());
        reply_of(&mut dispatcher, r#"{"type":"led_control","action":"on"}"#);

        assert_eq!(
            reply_of(&mut dispatcher, r#"{"type":"led_control","action":"blink"}"#),
            vec![Envelope::LedStatus { state: true }]
        );
        assert!(output.level());
    }

    #[test]
    fn test_ping_gets_one_pong() {
        let mut dispatcher = DeviceDispatcher::new(MemoryOutput::new());
        let replies = reply_of(&mut dispatcher, r#"{"type":"ping"}"#);
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            Envelope::Pong { timestamp } => assert!(*timestamp > 1_600_000_000.0),
            other => panic!("expected pong, got {other:?}"),
        }
    }

    #[test]
    fn test_notices_produce_no_reply() {
        let mut dispatcher = DeviceDispatcher::new(MemoryOutput::new());
        assert!(reply_of(&mut dispatcher, r#"{"type":"welcome","message":"hi"}"#).is_empty());
        assert!(reply_of(&mut dispatcher, r#"{"type":"echo","original":"x"}"#).is_empty());
    }

    #[test]
    fn test_malformed_is_error_not_reply() {
        let mut dispatcher = DeviceDispatcher::new(MemoryOutput::new());
        assert!(matches!(
            dispatcher.on_message(&Message::text("garbage")),
            Err(DispatchError::Malformed(_))
        ));
    }
}
