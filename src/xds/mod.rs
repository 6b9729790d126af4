//! Envoy listener model
//!
//! Decides how a proxy listener is configured for a service:
//! - which protocol family it handles ([`protocol`])
//! - which transport framing it uses ([`transport`])
//! - which tunnels its filter chains carry ([`tunnel`])
//! - what happens to traffic no route matches ([`route`])
//! - which side reports telemetry ([`telemetry`])
//!
//! [`listener`] holds the filter chain model and the per-pass build context,
//! and [`packing`] turns sub-messages into typed `Any` payloads.

pub mod listener;
pub mod packing;
pub mod protocol;
pub mod route;
pub mod telemetry;
pub mod transport;
pub mod tunnel;

pub use listener::{FilterChain, ListenerBuild, ListenerContributor, MutableObjects};
pub use packing::{message_to_any, message_to_any_with_error, PayloadPacker, TypedMessage};
pub use protocol::{ListenerProtocol, Protocol, SniffingPolicy};
pub use route::{
    build_catch_all_virtual_host, OutboundTrafficMode, OutboundTrafficPolicy, BLACK_HOLE,
    BLACK_HOLE_CLUSTER, PASSTHROUGH, PASSTHROUGH_CLUSTER,
};
pub use telemetry::{ListenerClass, TelemetryMode};
pub use transport::TransportProtocol;
pub use tunnel::{TunnelAbility, TunnelType};

pub use envoy_types::pb::envoy::config::core::v3::TrafficDirection;
