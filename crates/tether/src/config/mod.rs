//! Device configuration stored as TOML.
//!
//! A device keeps one small file holding its link credentials and client
//! settings. The file is read at boot to choose between connecting and
//! provisioning, and rewritten when the provisioning portal accepts new
//! credentials.
//!
//! ```toml
//! [device]
//! name = "ESP32"
//! force_provisioning = false
//!
//! [link]
//! ssid = "home"
//! password = "hunter2"
//!
//! [client]
//! server_url = "ws://192.168.1.100:8080/ws"
//! fallback_path = "/ws"
//! reconnect_delay = 5.0
//! max_reconnect_attempts = 10
//! legacy_fixed_key = false
//! ```
//!
//! Every section and field is optional; missing values take the factory
//! defaults.

mod error;

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tether_core::logging::targets;
use tether_net::ClientConfig;
use tether_net::dispatch::DEFAULT_DEVICE_NAME;
use tether_net::link::{ConnectRequest, LinkCredentials, StartupMode};

pub use error::{ConfigError, ConfigErrorKind, ConfigResult};

/// Identity and boot settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Name reported in status messages.
    pub name: String,
    /// Boot into provisioning even when credentials are stored.
    pub force_provisioning: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            force_provisioning: false,
        }
    }
}

/// Everything a device persists between boots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Identity and boot settings.
    pub device: DeviceSettings,
    /// Credentials for the link provider.
    pub link: LinkCredentials,
    /// WebSocket client settings.
    pub client: ClientConfig,
}

impl DeviceConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::invalid(e.to_string(), None))
    }

    /// Encode the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::encode(e.to_string()))
    }

    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::from_io(e, path))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| ConfigError::invalid(e.to_string(), Some(path)))?;
        tracing::debug!(
            target: targets::CONFIG,
            path = %path.display(),
            configured = config.link.is_configured(),
            "loaded device configuration"
        );
        Ok(config)
    }

    /// Read a configuration file, falling back to defaults when it is missing.
    ///
    /// Any other failure is returned.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(e) if e.is_not_found() => {
                tracing::info!(
                    target: targets::CONFIG,
                    path = %path.display(),
                    "no configuration file, using defaults"
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Write the configuration to `path`.
    ///
    /// The text goes to a temporary file in the same directory which then
    /// replaces `path`, so a reader never sees a half-written file.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let text = self.to_toml_string()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| ConfigError::from_io(e, path))?;
        temp.write_all(text.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| ConfigError::from_io(e, path))?;
        temp.persist(path)
            .map_err(|e| ConfigError::from_io(e.error, path))?;

        tracing::info!(
            target: targets::CONFIG,
            path = %path.display(),
            "saved device configuration"
        );
        Ok(())
    }

    /// The boot path this configuration calls for.
    pub fn startup_mode(&self) -> StartupMode {
        StartupMode::decide(&self.link, self.device.force_provisioning)
    }

    /// Store credentials accepted by the provisioning portal.
    ///
    /// Clears `force_provisioning` so the next boot connects.
    pub fn apply_credentials(&mut self, request: ConnectRequest) {
        tracing::info!(
            target: targets::CONFIG,
            ssid = %request.ssid,
            "storing new link credentials"
        );
        self.link = request.into();
        self.device.force_provisioning = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_file_is_factory_default() {
        let config = DeviceConfig::from_toml_str("").unwrap();
        assert_eq!(config, DeviceConfig::default());
        assert_eq!(config.client.server_url, "ws://example.com");
        assert_eq!(config.client.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.client.max_reconnect_attempts, 10);
        assert_eq!(config.device.name, "ESP32");
        assert_eq!(config.startup_mode(), StartupMode::Provision);
    }

    #[test]
    fn test_partial_sections() {
        let config = DeviceConfig::from_toml_str(
            r#"
            [link]
            ssid = "home"

            [client]
            server_url = "ws://10.0.0.2:8080/ws"
            reconnect_delay = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.link.ssid, "home");
        assert_eq!(config.link.password, "");
        assert_eq!(config.client.reconnect_delay, Duration::from_millis(500));
        assert_eq!(config.client.fallback_path, "/ws");
        assert_eq!(config.startup_mode(), StartupMode::Connect);
    }

    #[test]
    fn test_force_provisioning() {
        let mut config = DeviceConfig::default();
        config.link = LinkCredentials::new("home", "pw");
        config.device.force_provisioning = true;
        assert_eq!(config.startup_mode(), StartupMode::Provision);
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let err = DeviceConfig::from_toml_str("[client]\nmax_reconnect_attempts = \"lots\"")
            .unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::InvalidData);
        assert!(err.path().is_none());
    }

    #[test]
    fn test_encoded_text_parses_back() {
        let mut config = DeviceConfig::default();
        config.client = ClientConfig::new("ws://h:1/x").read_timeout(Duration::from_secs(30));
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[client]"));
        assert!(text.contains("read_timeout = 30.0"));
        assert!(!text.contains("connect_timeout"));
        assert_eq!(DeviceConfig::from_toml_str(&text).unwrap(), config);
    }
}
