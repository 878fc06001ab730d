//! Connectivity snapshot published by a path monitor.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use crate::error::Error;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Whether the current path can carry traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PathStatus {
  Satisfied,
  #[default]
  Unsatisfied,
  /// An interface exists but must be brought up (dialled, associated) first.
  RequiresConnection,
}

impl fmt::Display for PathStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Satisfied => "satisfied",
      Self::Unsatisfied => "unsatisfied",
      Self::RequiresConnection => "requires_connection",
    })
  }
}

// ─── Interface type ──────────────────────────────────────────────────────────

/// The physical kind of a network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceType {
  Cellular,
  Wifi,
  WiredEthernet,
  Loopback,
  Other,
}

impl InterfaceType {
  /// Priority order used to pick a path's single connection type.
  pub const PREFERRED: [InterfaceType; 3] =
    [Self::Cellular, Self::Wifi, Self::WiredEthernet];
}

impl fmt::Display for InterfaceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Cellular => "cellular",
      Self::Wifi => "wifi",
      Self::WiredEthernet => "wired_ethernet",
      Self::Loopback => "loopback",
      Self::Other => "other",
    })
  }
}

impl FromStr for InterfaceType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "cellular" => Ok(Self::Cellular),
      "wifi" => Ok(Self::Wifi),
      "wired_ethernet" | "ethernet" | "wired" => Ok(Self::WiredEthernet),
      "loopback" => Ok(Self::Loopback),
      "other" => Ok(Self::Other),
      other => Err(Error::UnknownInterfaceType(other.to_string())),
    }
  }
}

// ─── Path ────────────────────────────────────────────────────────────────────

/// A point-in-time view of the host's connectivity.
#[derive(Debug, Clone)]
pub struct NetworkPath {
  pub status:         PathStatus,
  pub is_expensive:   bool,
  pub is_constrained: bool,
  /// Interfaces currently carrying traffic, in discovery order.
  pub interfaces:     Vec<InterfaceType>,
  pub observed_at:    DateTime<Utc>,
}

impl NetworkPath {
  /// A path with no usable interfaces.
  pub fn unsatisfied() -> Self {
    Self {
      status:         PathStatus::Unsatisfied,
      is_expensive:   false,
      is_constrained: false,
      interfaces:     Vec::new(),
      observed_at:    Utc::now(),
    }
  }

  /// A satisfied path over `interfaces`. Expensive iff any of them is cellular.
  pub fn satisfied(interfaces: impl IntoIterator<Item = InterfaceType>) -> Self {
    let interfaces: Vec<_> = interfaces.into_iter().collect();
    Self {
      status: PathStatus::Satisfied,
      is_expensive: interfaces.contains(&InterfaceType::Cellular),
      is_constrained: false,
      interfaces,
      observed_at: Utc::now(),
    }
  }

  pub fn is_active(&self) -> bool { self.status == PathStatus::Satisfied }

  pub fn uses(&self, kind: InterfaceType) -> bool {
    self.interfaces.contains(&kind)
  }

  /// The first of cellular, wifi, wired ethernet that this path uses, or
  /// [`InterfaceType::Other`].
  pub fn connection_type(&self) -> InterfaceType {
    InterfaceType::PREFERRED
      .into_iter()
      .find(|kind| self.uses(*kind))
      .unwrap_or(InterfaceType::Other)
  }

  /// Equality ignoring `observed_at`.
  pub fn same_as(&self, other: &NetworkPath) -> bool {
    self.status == other.status
      && self.is_expensive == other.is_expensive
      && self.is_constrained == other.is_constrained
      && self.interfaces == other.interfaces
  }
}

impl Default for NetworkPath {
  fn default() -> Self { Self::unsatisfied() }
}

impl fmt::Display for NetworkPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "Active: {}", self.is_active())?;
    writeln!(f, "Expensive: {}", self.is_expensive)?;
    writeln!(f, "Constrained: {}", self.is_constrained)?;
    write!(f, "ConnectionType: {}", self.connection_type())
  }
}
