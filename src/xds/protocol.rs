//! Listener protocol classification
//!
//! Maps the protocol a service declares, together with the direction of the
//! traffic, onto the kind of listener envoy should be configured with.

use envoy_types::pb::envoy::config::core::v3::TrafficDirection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol declared on a service port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Grpc,
    GrpcWeb,
    Http,
    HttpProxy,
    Http2,
    Https,
    Tcp,
    Tls,
    Udp,
    Mongo,
    Redis,
    MySql,
    /// No declared protocol, or one this model does not know
    Unsupported,
}

impl Protocol {
    /// Every declared protocol, in canonical order
    pub const ALL: [Protocol; 13] = [
        Protocol::Grpc,
        Protocol::GrpcWeb,
        Protocol::Http,
        Protocol::HttpProxy,
        Protocol::Http2,
        Protocol::Https,
        Protocol::Tcp,
        Protocol::Tls,
        Protocol::Udp,
        Protocol::Mongo,
        Protocol::Redis,
        Protocol::MySql,
        Protocol::Unsupported,
    ];

    /// Parse a declared protocol name, case-insensitively.
    ///
    /// Unknown names map to [`Protocol::Unsupported`] rather than failing.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .filter(|p| *p != Protocol::Unsupported)
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
            .unwrap_or(Protocol::Unsupported)
    }

    /// Canonical name of the protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Grpc => "GRPC",
            Protocol::GrpcWeb => "GRPC-Web",
            Protocol::Http => "HTTP",
            Protocol::HttpProxy => "HTTP_PROXY",
            Protocol::Http2 => "HTTP2",
            Protocol::Https => "HTTPS",
            Protocol::Tcp => "TCP",
            Protocol::Tls => "TLS",
            Protocol::Udp => "UDP",
            Protocol::Mongo => "Mongo",
            Protocol::Redis => "Redis",
            Protocol::MySql => "MySQL",
            Protocol::Unsupported => "UnsupportedProtocol",
        }
    }

    /// HTTP family: terminated by an HTTP connection manager
    pub fn is_http(&self) -> bool {
        matches!(
            self,
            Protocol::Http | Protocol::Http2 | Protocol::HttpProxy | Protocol::Grpc | Protocol::GrpcWeb
        )
    }

    /// TCP family: proxied as opaque bytes at this layer
    pub fn is_tcp(&self) -> bool {
        matches!(
            self,
            Protocol::Tcp
                | Protocol::Https
                | Protocol::Tls
                | Protocol::Mongo
                | Protocol::Redis
                | Protocol::MySql
        )
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Protocol {
    fn from(name: &str) -> Self {
        Protocol::parse(name)
    }
}

/// Whether unspecified protocols are auto-detected, per traffic direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SniffingPolicy {
    pub inbound: bool,
    pub outbound: bool,
}

impl Default for SniffingPolicy {
    fn default() -> Self {
        Self { inbound: true, outbound: true }
    }
}

/// The protocol a listener (or one of its filter chains) is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerProtocol {
    /// Not handled by this classifier (UDP); the caller decides
    #[default]
    Unknown,
    Tcp,
    Http,
    /// Protocol is detected at runtime by envoy
    Auto,
}

impl ListenerProtocol {
    /// Resolve the listener protocol for a declared protocol and direction.
    ///
    /// An unsupported declared protocol resolves to `Tcp` when sniffing is
    /// disabled for the given direction and to `Auto` otherwise, including
    /// when the direction is unspecified.
    pub fn resolve(
        protocol: Protocol,
        direction: TrafficDirection,
        sniffing: &SniffingPolicy,
    ) -> Self {
        if protocol.is_http() {
            return ListenerProtocol::Http;
        }
        if protocol.is_tcp() {
            return ListenerProtocol::Tcp;
        }

        match protocol {
            Protocol::Udp => ListenerProtocol::Unknown,
            _ => {
                let sniffing_enabled = match direction {
                    TrafficDirection::Inbound => sniffing.inbound,
                    TrafficDirection::Outbound => sniffing.outbound,
                    TrafficDirection::Unspecified => true,
                };

                if !sniffing_enabled {
                    return ListenerProtocol::Tcp;
                }

                tracing::debug!(
                    declared_protocol = %protocol,
                    direction = direction.as_str_name(),
                    "No declared protocol, falling back to protocol sniffing"
                );
                ListenerProtocol::Auto
            }
        }
    }

    /// Resolve using a raw envoy traffic direction value.
    ///
    /// Values outside the known directions behave like `Unspecified`.
    pub fn resolve_raw(protocol: Protocol, direction: i32, sniffing: &SniffingPolicy) -> Self {
        let direction = TrafficDirection::try_from(direction).unwrap_or(TrafficDirection::Unspecified);
        Self::resolve(protocol, direction, sniffing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerProtocol::Unknown => "unknown",
            ListenerProtocol::Tcp => "tcp",
            ListenerProtocol::Http => "http",
            ListenerProtocol::Auto => "auto",
        }
    }
}

impl fmt::Display for ListenerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
