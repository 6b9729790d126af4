//! Transport framing of a listener

use envoy_types::pb::envoy::config::core::v3::socket_address::Protocol as SocketProtocol;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transport used by a listener's filter chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TransportProtocol {
    #[default]
    Tcp = 0,
    Quic = 1,
}

impl TransportProtocol {
    /// Socket protocol envoy binds the listener address with
    pub fn to_socket_protocol(self) -> SocketProtocol {
        match self {
            TransportProtocol::Tcp => SocketProtocol::Tcp,
            TransportProtocol::Quic => SocketProtocol::Udp,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportProtocol::Tcp => "tcp",
            TransportProtocol::Quic => "quic",
        }
    }

    /// Diagnostic name for a raw transport code; unknown codes render as `"unknown"`
    pub fn name_for_code(code: u8) -> &'static str {
        Self::try_from(code).map(Self::as_str).unwrap_or("unknown")
    }

    /// Socket protocol for a raw transport code; unknown codes fall back to TCP
    pub fn socket_protocol_for_code(code: u8) -> SocketProtocol {
        Self::try_from(code).unwrap_or_default().to_socket_protocol()
    }
}

impl TryFrom<u8> for TransportProtocol {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TransportProtocol::Tcp),
            1 => Ok(TransportProtocol::Quic),
            other => Err(other),
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportProtocol {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(TransportProtocol::Tcp),
            "quic" => Ok(TransportProtocol::Quic),
            other => Err(crate::Error::validation_field(
                format!("Unsupported transport protocol '{}'", other),
                "transport_protocol",
            )),
        }
    }
}
