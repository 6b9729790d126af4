//! Tunnel capabilities advertised by a filter chain
//!
//! Every [`TunnelType`] owns one bit. A [`TunnelAbility`] is the union of the
//! types a chain supports, so composing and querying keep working unchanged
//! when new types are added.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

pub const NO_TUNNEL_TYPE_NAME: &str = "notunnel";
pub const H2_TUNNEL_TYPE_NAME: &str = "H2Tunnel";

/// A single tunnel type, one bit wide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TunnelType(u32);

impl TunnelType {
    /// No tunnel support; composing with it changes nothing
    pub const NO_TUNNEL: TunnelType = TunnelType(0);
    /// HTTP/2 CONNECT tunneling
    pub const H2_TUNNEL: TunnelType = TunnelType(1 << 0);
    // Next tunnel type takes 1 << 1.

    /// Raw bit value
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Reinterpret raw bits, e.g. from a stored setting
    pub const fn from_bits(bits: u32) -> Self {
        TunnelType(bits)
    }

    pub fn name(self) -> &'static str {
        match self {
            TunnelType::H2_TUNNEL => H2_TUNNEL_TYPE_NAME,
            _ => NO_TUNNEL_TYPE_NAME,
        }
    }
}

impl fmt::Display for TunnelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of tunnel types supported by a filter chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TunnelAbility(u32);

impl TunnelAbility {
    /// Compose an ability from any number of tunnel types
    pub fn new(types: &[TunnelType]) -> Self {
        types.iter().copied().collect()
    }

    pub const fn none() -> Self {
        TunnelAbility(TunnelType::NO_TUNNEL.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, tunnel: TunnelType) -> bool {
        tunnel.0 != 0 && self.0 & tunnel.0 == tunnel.0
    }

    pub fn supports_h2_tunnel(self) -> bool {
        self.contains(TunnelType::H2_TUNNEL)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<TunnelType> for TunnelAbility {
    fn from_iter<I: IntoIterator<Item = TunnelType>>(iter: I) -> Self {
        iter.into_iter().fold(TunnelAbility::none(), |ability, tunnel| ability | tunnel)
    }
}

impl BitOr<TunnelType> for TunnelAbility {
    type Output = TunnelAbility;

    fn bitor(self, rhs: TunnelType) -> Self::Output {
        TunnelAbility(self.0 | rhs.0)
    }
}

impl BitOr for TunnelAbility {
    type Output = TunnelAbility;

    fn bitor(self, rhs: TunnelAbility) -> Self::Output {
        TunnelAbility(self.0 | rhs.0)
    }
}

impl BitOrAssign<TunnelType> for TunnelAbility {
    fn bitor_assign(&mut self, rhs: TunnelType) {
        self.0 |= rhs.0;
    }
}

impl From<TunnelType> for TunnelAbility {
    fn from(tunnel: TunnelType) -> Self {
        TunnelAbility(tunnel.0)
    }
}
