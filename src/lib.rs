//! # meshplane
//!
//! Listener protocol resolution and fallback routing for an Envoy service-mesh
//! control plane. Given a service's declared protocol and the direction of
//! its traffic, meshplane decides how the proxy listener is configured:
//!
//! ```text
//! declared protocol + direction ─► ListenerProtocol ─► FilterChain ─► MutableObjects
//! tunnel types ─────────────────► TunnelAbility ────┘
//! outbound traffic policy ──────► catch-all VirtualHost
//! listener class ───────────────► TelemetryMode
//! sub-messages ─────────────────► PayloadPacker ─► google.protobuf.Any
//! ```
//!
//! Everything here is pure data transformation; generating complete
//! listener, route and cluster resources and serving them over xDS is left
//! to the surrounding control plane.
//!
//! ## Example
//!
//! ```rust
//! use meshplane::xds::{ListenerProtocol, Protocol, SniffingPolicy, TrafficDirection};
//!
//! let sniffing = SniffingPolicy { inbound: false, outbound: true };
//! let protocol =
//!     ListenerProtocol::resolve(Protocol::Unsupported, TrafficDirection::Inbound, &sniffing);
//! assert_eq!(protocol, ListenerProtocol::Tcp);
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod xds;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};
pub use observability::init_logging;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
