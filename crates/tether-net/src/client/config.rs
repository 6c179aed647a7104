//! Configuration for the WebSocket client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::handshake::HandshakeKey;

/// Default server URL for a freshly flashed device.
pub const DEFAULT_SERVER_URL: &str = "ws://example.com";
/// Path used when the server URL carries none.
pub const DEFAULT_FALLBACK_PATH: &str = "/ws";
/// Pause between reconnect cycles.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// Consecutive failed cycles before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Immutable client settings, fixed at construction.
///
/// Durations are (de)serialized as fractional seconds.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tether_net::ClientConfig;
///
/// let config = ClientConfig::new("ws://192.168.1.100:8080/ws")
///     .reconnect_delay(Duration::from_secs(2))
///     .max_reconnect_attempts(0)
///     .handshake_timeout(Duration::from_secs(10));
/// assert!(config.is_unbounded());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// The WebSocket URL (`ws://` or `wss://`).
    pub server_url: String,
    /// Path substituted when `server_url` has none.
    pub fallback_path: String,
    /// Fixed pause between reconnect cycles.
    #[serde(with = "secs")]
    pub reconnect_delay: Duration,
    /// Consecutive failed cycles before stopping. `0` retries forever.
    pub max_reconnect_attempts: u32,
    /// Deadline for opening the TCP stream.
    #[serde(with = "opt_secs", skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<Duration>,
    /// Deadline for the upgrade exchange.
    #[serde(with = "opt_secs", skip_serializing_if = "Option::is_none")]
    pub handshake_timeout: Option<Duration>,
    /// Longest silence tolerated while connected.
    #[serde(with = "opt_secs", skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<Duration>,
    /// Send the fixed legacy `Sec-WebSocket-Key` instead of a random one.
    pub legacy_fixed_key: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            fallback_path: DEFAULT_FALLBACK_PATH.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            connect_timeout: None,
            handshake_timeout: None,
            read_timeout: None,
            legacy_fixed_key: false,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `server_url` with default settings.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Set the fallback path.
    pub fn fallback_path(mut self, path: impl Into<String>) -> Self {
        self.fallback_path = path.into();
        self
    }

    /// Set the delay between reconnect cycles.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the attempt ceiling. `0` means retry forever.
    pub fn max_reconnect_attempts(mut self, max: u32) -> Self {
        self.max_reconnect_attempts = max;
        self
    }

    /// Set the TCP connect deadline.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the handshake deadline.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }

    /// Set the read inactivity deadline.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Use the fixed legacy handshake key.
    pub fn legacy_fixed_key(mut self, enabled: bool) -> Self {
        self.legacy_fixed_key = enabled;
        self
    }

    /// Whether the client retries forever.
    pub fn is_unbounded(&self) -> bool {
        self.max_reconnect_attempts == 0
    }

    /// The key to send on the next handshake.
    pub fn handshake_key(&self) -> HandshakeKey {
        if self.legacy_fixed_key {
            HandshakeKey::legacy()
        } else {
            HandshakeKey::random()
        }
    }
}

/// `Duration` as fractional seconds.
pub mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    /// Serialize as `f64` seconds.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    /// Deserialize from non-negative `f64` seconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}

/// `Option<Duration>` as fractional seconds.
pub mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    /// Serialize as optional `f64` seconds.
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize from optional non-negative `f64` seconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_firmware() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "ws://example.com");
        assert_eq!(config.fallback_path, "/ws");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert!(config.connect_timeout.is_none());
        assert!(config.handshake_timeout.is_none());
        assert!(config.read_timeout.is_none());
        assert!(!config.is_unbounded());
    }

    #[test]
    fn test_handshake_key_selection() {
        let legacy = ClientConfig::default().legacy_fixed_key(true);
        assert_eq!(legacy.handshake_key(), HandshakeKey::legacy());
        assert_eq!(legacy.handshake_key(), legacy.handshake_key());

        let random = ClientConfig::default();
        assert_ne!(random.handshake_key(), HandshakeKey::legacy());
    }

    #[test]
    fn test_json_durations_as_seconds() {
        let config = ClientConfig::new("ws://h/p")
            .reconnect_delay(Duration::from_millis(1500))
            .read_timeout(Duration::from_secs(30));
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["reconnect_delay"], 1.5);
        assert_eq!(value["read_timeout"], 30.0);
        assert!(value.get("connect_timeout").is_none());

        let back: ClientConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_negative_delay_rejected() {
        let result: Result<ClientConfig, _> =
            serde_json::from_str(r#"{"reconnect_delay": -1.0}"#);
        assert!(result.is_err());
    }
}
