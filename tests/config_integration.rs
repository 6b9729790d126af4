//! Integration tests for configuration loading
//!
//! These tests validate that the configuration system reads environment
//! variables and files, and that the loaded values drive the listener model.

use meshplane::xds::{ListenerProtocol, OutboundTrafficMode, Protocol, TrafficDirection};
use meshplane::{AppConfig, Result};
use std::env;
use std::io::Write;
use std::sync::Mutex;

// Use a mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: [&str; 7] = [
    "MESHPLANE_ENABLE_INBOUND_SNIFFING",
    "MESHPLANE_ENABLE_OUTBOUND_SNIFFING",
    "MESHPLANE_OUTBOUND_TRAFFIC_POLICY",
    "MESHPLANE_EGRESS_DESTINATION",
    "MESHPLANE_MAX_PAYLOAD_BYTES",
    "MESHPLANE_LOG_LEVEL",
    "MESHPLANE_JSON_LOGGING",
];

/// Run `f` with the given variables set, restoring the environment afterwards
fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let saved: Vec<(&str, Option<String>)> =
        VARS.iter().map(|name| (*name, env::var(name).ok())).collect();
    for name in VARS {
        env::remove_var(name);
    }
    for (name, value) in vars {
        env::set_var(name, value);
    }

    let result = f();

    for (name, value) in saved {
        match value {
            Some(value) => env::set_var(name, value),
            None => env::remove_var(name),
        }
    }
    result
}

#[test]
fn test_config_environment_integration() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();

    let config = with_env(
        &[
            ("MESHPLANE_ENABLE_INBOUND_SNIFFING", "false"),
            ("MESHPLANE_OUTBOUND_TRAFFIC_POLICY", "REGISTRY_ONLY"),
            ("MESHPLANE_MAX_PAYLOAD_BYTES", "65536"),
        ],
        AppConfig::from_env,
    )?;

    assert!(!config.networking.enable_inbound_sniffing);
    assert!(config.networking.enable_outbound_sniffing);
    assert_eq!(config.networking.outbound_traffic_policy, OutboundTrafficMode::RegistryOnly);
    assert_eq!(config.networking.max_payload_bytes, 65536);

    let sniffing = config.networking.sniffing();
    assert_eq!(
        ListenerProtocol::resolve(Protocol::Unsupported, TrafficDirection::Inbound, &sniffing),
        ListenerProtocol::Tcp
    );
    assert_eq!(
        ListenerProtocol::resolve(Protocol::Unsupported, TrafficDirection::Outbound, &sniffing),
        ListenerProtocol::Auto
    );
    assert_eq!(config.networking.outbound_policy().catch_all_virtual_host().name, "block_all");

    Ok(())
}

#[test]
fn test_config_defaults_integration() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();

    let config = with_env(&[], AppConfig::from_env)?;
    assert!(config.networking.enable_inbound_sniffing);
    assert!(config.networking.enable_outbound_sniffing);
    assert_eq!(config.networking.outbound_traffic_policy, OutboundTrafficMode::AllowAny);
    assert_eq!(config.networking.egress_destination, None);
    assert_eq!(config.observability.log_level, "info");

    Ok(())
}

#[test]
fn test_config_invalid_environment() {
    let _guard = ENV_MUTEX.lock().unwrap();

    let result = with_env(&[("MESHPLANE_MAX_PAYLOAD_BYTES", "lots")], AppConfig::from_env);
    assert!(result.is_err());

    let result =
        with_env(&[("MESHPLANE_OUTBOUND_TRAFFIC_POLICY", "DENY_ALL")], AppConfig::from_env);
    assert!(result.is_err());

    let result = with_env(&[("MESHPLANE_MAX_PAYLOAD_BYTES", "0")], AppConfig::from_env);
    assert!(result.is_err());
}

#[test]
fn test_environment_overrides_file() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    writeln!(
        file,
        "[networking]\nenable_outbound_sniffing = false\negress_destination = \"egress-gateway\"\n"
    )?;

    let config = with_env(&[("MESHPLANE_NETWORKING__MAX_PAYLOAD_BYTES", "1024")], || {
        AppConfig::load(Some(file.path()))
    });
    env::remove_var("MESHPLANE_NETWORKING__MAX_PAYLOAD_BYTES");
    let config = config?;

    assert!(!config.networking.enable_outbound_sniffing);
    assert_eq!(config.networking.egress_destination.as_deref(), Some("egress-gateway"));
    assert_eq!(config.networking.max_payload_bytes, 1024);

    let vh = config.networking.outbound_policy().catch_all_virtual_host();
    assert_eq!(vh.name, "allow_any");

    Ok(())
}

#[test]
fn test_load_applies_flat_environment_overrides() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();

    let config = with_env(
        &[
            ("MESHPLANE_ENABLE_INBOUND_SNIFFING", "false"),
            ("MESHPLANE_OUTBOUND_TRAFFIC_POLICY", "registry-only"),
        ],
        || AppConfig::load(None),
    )?;

    assert!(!config.networking.enable_inbound_sniffing);
    assert!(config.networking.enable_outbound_sniffing);
    assert_eq!(config.networking.outbound_traffic_policy, OutboundTrafficMode::RegistryOnly);
    assert_eq!(
        ListenerProtocol::resolve(
            Protocol::Unsupported,
            TrafficDirection::Inbound,
            &config.networking.sniffing()
        ),
        ListenerProtocol::Tcp
    );

    Ok(())
}

#[test]
fn test_flat_environment_overrides_file() -> Result<()> {
    let _guard = ENV_MUTEX.lock().unwrap();

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
    writeln!(file, "networking:\n  enable_outbound_sniffing: true\n  max_payload_bytes: 2048")?;

    let config = with_env(&[("MESHPLANE_ENABLE_OUTBOUND_SNIFFING", "false")], || {
        AppConfig::load(Some(file.path()))
    })?;

    assert!(!config.networking.enable_outbound_sniffing);
    assert_eq!(config.networking.max_payload_bytes, 2048);

    Ok(())
}
