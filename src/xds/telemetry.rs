//! Listener classes and the telemetry orientation they imply

use envoy_types::pb::envoy::config::core::v3::TrafficDirection;
use serde::{Deserialize, Serialize};

/// Purpose of a listener, fixed once the listener is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerClass {
    #[default]
    Undefined,
    SidecarInbound,
    SidecarOutbound,
    Gateway,
}

impl ListenerClass {
    pub fn telemetry_mode(self) -> TelemetryMode {
        TelemetryMode::for_class(self)
    }

    /// Direction of the traffic this class of listener handles
    pub fn traffic_direction(self) -> TrafficDirection {
        match self {
            ListenerClass::SidecarInbound => TrafficDirection::Inbound,
            ListenerClass::SidecarOutbound | ListenerClass::Gateway => TrafficDirection::Outbound,
            ListenerClass::Undefined => TrafficDirection::Unspecified,
        }
    }
}

/// Whether telemetry is reported from the server or the client side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryMode {
    Server,
    Client,
}

impl TelemetryMode {
    pub fn for_class(class: ListenerClass) -> Self {
        match class {
            ListenerClass::SidecarInbound => TelemetryMode::Server,
            _ => TelemetryMode::Client,
        }
    }
}

impl From<ListenerClass> for TelemetryMode {
    fn from(class: ListenerClass) -> Self {
        TelemetryMode::for_class(class)
    }
}
