//! # Configuration Management
//!
//! Loads the sniffing flags, outbound traffic policy, payload limits and
//! logging settings that the listener model consumes.
//!
//! Two entry points exist. [`AppConfig::from_env`] reads a flat set of
//! `MESHPLANE_*` variables. [`AppConfig::load`] layers defaults, an optional
//! configuration file and nested `MESHPLANE_<SECTION>__<KEY>` overrides.

mod settings;

pub use settings::{AppConfig, NetworkingConfig, ObservabilityConfig, DEFAULT_MAX_PAYLOAD_BYTES};

use crate::xds::route::OutboundTrafficMode;
use crate::Result;
use std::path::Path;

/// Prefix shared by every environment variable meshplane reads
pub const ENV_PREFIX: &str = "MESHPLANE";

impl AppConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields with the flat `MESHPLANE_*` variables that are set.
    ///
    /// Unset variables leave the current value alone. An empty
    /// `MESHPLANE_EGRESS_DESTINATION` clears the destination.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        let networking = &mut self.networking;

        networking.enable_inbound_sniffing =
            env_bool("MESHPLANE_ENABLE_INBOUND_SNIFFING", networking.enable_inbound_sniffing);
        networking.enable_outbound_sniffing =
            env_bool("MESHPLANE_ENABLE_OUTBOUND_SNIFFING", networking.enable_outbound_sniffing);

        if let Ok(value) = std::env::var("MESHPLANE_OUTBOUND_TRAFFIC_POLICY") {
            networking.outbound_traffic_policy = value.parse::<OutboundTrafficMode>()?;
        }

        if let Ok(value) = std::env::var("MESHPLANE_EGRESS_DESTINATION") {
            networking.egress_destination = Some(value).filter(|d| !d.is_empty());
        }

        if let Ok(value) = std::env::var("MESHPLANE_MAX_PAYLOAD_BYTES") {
            networking.max_payload_bytes = value.parse().map_err(|e| {
                crate::Error::config(format!("Invalid MESHPLANE_MAX_PAYLOAD_BYTES: {}", e))
            })?;
        }

        if let Ok(level) = std::env::var("MESHPLANE_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        self.observability.json_logging =
            env_bool("MESHPLANE_JSON_LOGGING", self.observability.json_logging);

        Ok(())
    }

    /// Load configuration from an optional file plus environment overrides
    ///
    /// The file format follows its extension (YAML, TOML or JSON). Nested
    /// keys are overridden with `MESHPLANE_NETWORKING__MAX_PAYLOAD_BYTES`
    /// style variables, and the flat variables read by
    /// [`from_env`](Self::from_env) are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let mut config: AppConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.apply_env_overrides()?;
        config.validate()?;

        tracing::debug!(
            inbound_sniffing = config.networking.enable_inbound_sniffing,
            outbound_sniffing = config.networking.enable_outbound_sniffing,
            outbound_traffic_policy = %config.networking.outbound_traffic_policy,
            "Loaded meshplane configuration"
        );

        Ok(config)
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.networking.enable_inbound_sniffing);
        assert_eq!(config.networking.outbound_traffic_policy, OutboundTrafficMode::AllowAny);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "networking:\n  enable_inbound_sniffing: false\n  outbound_traffic_policy: REGISTRY_ONLY\n  max_payload_bytes: 2048\nobservability:\n  json_logging: true"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert!(!config.networking.enable_inbound_sniffing);
        assert!(config.networking.enable_outbound_sniffing);
        assert_eq!(config.networking.outbound_traffic_policy, OutboundTrafficMode::RegistryOnly);
        assert_eq!(config.networking.max_payload_bytes, 2048);
        assert!(config.observability.json_logging);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "networking:\n  max_payload_bytes: 0").unwrap();

        assert!(AppConfig::load(Some(file.path())).is_err());
    }
}
