//! Wire types shared with the provisioning portal, and the boot-time
//! choice between connecting and provisioning.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The SSID a freshly flashed device ships with.
pub const PLACEHOLDER_SSID: &str = "YOUR_WIFI_SSID";

/// Credentials handed to the link provider.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkCredentials {
    /// Network name.
    pub ssid: String,
    /// Network passphrase. Empty for open networks.
    pub password: String,
}

impl LinkCredentials {
    /// Create credentials.
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    /// Whether real credentials have been stored.
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty() && self.ssid != PLACEHOLDER_SSID
    }
}

impl std::fmt::Debug for LinkCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What the device should do after boot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupMode {
    /// Join the configured network and run the client.
    Connect,
    /// Serve the provisioning portal.
    Provision,
}

impl StartupMode {
    /// Pick the boot path. `force_provisioning` models a held setup button.
    pub fn decide(credentials: &LinkCredentials, force_provisioning: bool) -> Self {
        if force_provisioning || !credentials.is_configured() {
            Self::Provision
        } else {
            Self::Connect
        }
    }
}

/// One network from a scan, as listed by `GET /scan`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    /// Network name.
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i32,
    /// Whether the network requires a passphrase.
    pub security: bool,
}

impl ScanEntry {
    /// Signal quality as 1 to 4 bars.
    pub fn signal_bars(&self) -> u8 {
        match self.rssi {
            r if r >= -50 => 4,
            r if r >= -60 => 3,
            r if r >= -70 => 2,
            _ => 1,
        }
    }
}

/// Clean up raw scan results for display.
///
/// Hidden (empty) names are dropped, entries are ordered strongest first,
/// and repeated names keep only their strongest entry.
pub fn normalize_scan(entries: impl IntoIterator<Item = ScanEntry>) -> Vec<ScanEntry> {
    let mut entries: Vec<ScanEntry> = entries.into_iter().collect();
    entries.sort_by(|a, b| b.rssi.cmp(&a.rssi));

    let mut seen = HashSet::new();
    entries.retain(|e| !e.ssid.is_empty() && seen.insert(e.ssid.clone()));
    entries
}

/// Body of `POST /connect`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    /// Network to join.
    pub ssid: String,
    /// Its passphrase.
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("ssid", &self.ssid)
            .finish_non_exhaustive()
    }
}

impl From<ConnectRequest> for LinkCredentials {
    fn from(req: ConnectRequest) -> Self {
        Self {
            ssid: req.ssid,
            password: req.password,
        }
    }
}

/// Reply to `POST /connect`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    /// Whether the device joined the network.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
}

impl ConnectResponse {
    /// The reply sent after joining and saving credentials.
    pub fn connected() -> Self {
        Self {
            success: true,
            message: "Connected successfully".to_string(),
        }
    }

    /// A failure reply.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ssid: &str, rssi: i32) -> ScanEntry {
        ScanEntry {
            ssid: ssid.to_string(),
            rssi,
            security: true,
        }
    }

    #[test]
    fn test_normalize_scan() {
        let raw = vec![
            entry("home", -70),
            entry("", -30),
            entry("cafe", -55),
            entry("home", -45),
            entry("cafe", -80),
        ];
        let cleaned = normalize_scan(raw);
        assert_eq!(cleaned, vec![entry("home", -45), entry("cafe", -55)]);
    }

    #[test]
    fn test_signal_bars() {
        assert_eq!(entry("a", -40).signal_bars(), 4);
        assert_eq!(entry("a", -60).signal_bars(), 3);
        assert_eq!(entry("a", -65).signal_bars(), 2);
        assert_eq!(entry("a", -90).signal_bars(), 1);
    }

    #[test]
    fn test_startup_mode() {
        let placeholder = LinkCredentials::new(PLACEHOLDER_SSID, "YOUR_WIFI_PASSWORD");
        let empty = LinkCredentials::default();
        let real = LinkCredentials::new("home", "secret");

        assert_eq!(StartupMode::decide(&placeholder, false), StartupMode::Provision);
        assert_eq!(StartupMode::decide(&empty, false), StartupMode::Provision);
        assert_eq!(StartupMode::decide(&real, false), StartupMode::Connect);
        assert_eq!(StartupMode::decide(&real, true), StartupMode::Provision);
    }

    #[test]
    fn test_connect_wire_format() {
        let req: ConnectRequest =
            serde_json::from_str(r#"{"ssid":"home","password":"pw"}"#).unwrap();
        assert_eq!(LinkCredentials::from(req), LinkCredentials::new("home", "pw"));

        let body = serde_json::to_string(&ConnectResponse::connected()).unwrap();
        assert_eq!(body, r#"{"success":true,"message":"Connected successfully"}"#);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", LinkCredentials::new("home", "secret"));
        assert!(debug.contains("home"));
        assert!(!debug.contains("secret"));
    }
}
