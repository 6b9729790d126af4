//! # Observability
//!
//! Structured logging for meshplane, built on the `tracing` ecosystem.

pub mod logging;

pub use logging::{init_logging, log_config_info};
