//! # Configuration Settings
//!
//! Defines the configuration structure for meshplane.

use crate::errors::{Error, Result};
use crate::xds::route::{OutboundTrafficMode, OutboundTrafficPolicy};
use crate::xds::protocol::SniffingPolicy;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default upper bound for a single packed payload (4 MiB, envoy's default
/// gRPC message limit)
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener model configuration
    #[validate(nested)]
    pub networking: NetworkingConfig,

    /// Logging configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()?;
        Ok(())
    }

    fn validate_custom(&self) -> Result<()> {
        if let Some(destination) = &self.networking.egress_destination {
            if destination.trim().is_empty() {
                return Err(Error::validation_field(
                    "Egress destination cannot be blank",
                    "egress_destination",
                ));
            }
            if self.networking.outbound_traffic_policy == OutboundTrafficMode::RegistryOnly {
                tracing::warn!(
                    egress_destination = %destination,
                    "Egress destination is ignored while outbound traffic is REGISTRY_ONLY"
                );
            }
        }

        Ok(())
    }
}

/// Protocol resolution and catch-all routing configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NetworkingConfig {
    /// Auto-detect the protocol of inbound traffic with no declared protocol
    pub enable_inbound_sniffing: bool,

    /// Auto-detect the protocol of outbound traffic with no declared protocol
    pub enable_outbound_sniffing: bool,

    /// What happens to outbound traffic that matches no known service
    pub outbound_traffic_policy: OutboundTrafficMode,

    /// Explicit cluster for unmatched outbound traffic (ALLOW_ANY only)
    pub egress_destination: Option<String>,

    /// Largest payload the packer will produce, in bytes
    #[validate(range(min = 1, message = "Max payload bytes must be at least 1"))]
    pub max_payload_bytes: usize,
}

impl Default for NetworkingConfig {
    fn default() -> Self {
        Self {
            enable_inbound_sniffing: true,
            enable_outbound_sniffing: true,
            outbound_traffic_policy: OutboundTrafficMode::AllowAny,
            egress_destination: None,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl NetworkingConfig {
    /// Sniffing flags consumed by the protocol classifier
    pub fn sniffing(&self) -> SniffingPolicy {
        SniffingPolicy {
            inbound: self.enable_inbound_sniffing,
            outbound: self.enable_outbound_sniffing,
        }
    }

    /// Outbound policy consumed by the catch-all route builder
    pub fn outbound_policy(&self) -> OutboundTrafficPolicy {
        OutboundTrafficPolicy {
            mode: self.outbound_traffic_policy,
            egress_destination: self.egress_destination.clone(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or an EnvFilter directive
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}
