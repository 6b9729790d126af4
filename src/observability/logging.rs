//! # Structured Logging
//!
//! Installs the `tracing` subscriber and provides span macros for listener
//! build passes.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Create a tracing span for an xDS listener build step
///
/// ```rust,ignore
/// let span = xds_span!("build_listener", "virtualOutbound", class = ?class);
/// ```
#[macro_export]
macro_rules! xds_span {
    ($operation:expr, $listener:expr) => {
        tracing::info_span!(
            "xds_operation",
            operation = %$operation,
            listener = %$listener,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $listener:expr, $($field:tt)*) => {
        tracing::info_span!(
            "xds_operation",
            operation = %$operation,
            listener = %$listener,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `Ok(())`
/// without changes when a subscriber is already installed (e.g. in tests).
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::config_with_source(
                format!("Invalid log level '{}'", config.log_level),
                Box::new(e),
            )
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = if config.json_logging {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(
            log_level = %config.log_level,
            json_logging = config.json_logging,
            "Logging initialized"
        );
    }

    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &crate::config::AppConfig) {
    tracing::info!(
        inbound_sniffing = config.networking.enable_inbound_sniffing,
        outbound_sniffing = config.networking.enable_outbound_sniffing,
        outbound_traffic_policy = %config.networking.outbound_traffic_policy,
        egress_destination = ?config.networking.egress_destination,
        max_payload_bytes = config.networking.max_payload_bytes,
        "meshplane configuration"
    );
}
