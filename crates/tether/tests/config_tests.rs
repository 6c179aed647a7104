//! Tests for reading and writing device configuration files.

use std::time::Duration;

use tether::config::{ConfigErrorKind, DeviceConfig};
use tether::link::{ConnectRequest, LinkCredentials, StartupMode};
use tether::ClientConfig;

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tether.toml");

    let mut config = DeviceConfig::default();
    config.device.name = "porch-light".to_string();
    config.link = LinkCredentials::new("home", "hunter2");
    config.client = ClientConfig::new("ws://192.168.1.100:8080/ws")
        .reconnect_delay(Duration::from_millis(1500))
        .max_reconnect_attempts(0)
        .handshake_timeout(Duration::from_secs(10));
    config.save(&path).unwrap();

    let loaded = DeviceConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(loaded.client.is_unbounded());
    assert_eq!(loaded.startup_mode(), StartupMode::Connect);
}

#[test]
fn test_save_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tether.toml");
    std::fs::write(&path, "stale = true\n").unwrap();

    DeviceConfig::default().save(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(!text.contains("stale"));
    assert!(text.contains("server_url = \"ws://example.com\""));

    // Only the config file remains; the temporary file was renamed over it.
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = DeviceConfig::load(&path).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::NotFound);
    assert_eq!(err.path(), Some(path.as_path()));

    let config = DeviceConfig::load_or_default(&path).unwrap();
    assert_eq!(config, DeviceConfig::default());
    assert_eq!(config.startup_mode(), StartupMode::Provision);
}

#[test]
fn test_corrupt_file_is_not_defaulted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tether.toml");
    std::fs::write(&path, "[client\nserver_url = ").unwrap();

    let err = DeviceConfig::load_or_default(&path).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::InvalidData);
    assert_eq!(err.path(), Some(path.as_path()));
}

#[test]
fn test_placeholder_ssid_boots_into_provisioning() {
    let config = DeviceConfig::from_toml_str(
        r#"
        [link]
        ssid = "YOUR_WIFI_SSID"
        password = "YOUR_WIFI_PASSWORD"
        "#,
    )
    .unwrap();
    assert_eq!(config.startup_mode(), StartupMode::Provision);
}

#[test]
fn test_provisioned_credentials_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tether.toml");

    let mut config = DeviceConfig::default();
    config.device.force_provisioning = true;
    config.save(&path).unwrap();

    let request: ConnectRequest =
        serde_json::from_str(r#"{"ssid":"office","password":"pw"}"#).unwrap();
    let mut config = DeviceConfig::load(&path).unwrap();
    config.apply_credentials(request);
    config.save(&path).unwrap();

    let config = DeviceConfig::load(&path).unwrap();
    assert_eq!(config.link, LinkCredentials::new("office", "pw"));
    assert!(!config.device.force_provisioning);
    assert_eq!(config.startup_mode(), StartupMode::Connect);
}
