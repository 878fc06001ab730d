//! Linux connectivity probe over `/sys/class/net`.
//!
//! Each entry under the root is one interface. The probe reads `operstate`,
//! `carrier` and `type` and looks for the wireless marker directories; it
//! never opens a socket.

use std::{
  fs,
  path::{Path, PathBuf},
};

use chrono::Utc;
use tether_core::path::{InterfaceType, NetworkPath, PathStatus};

use crate::{
  error::{Error, Result},
  source::PathSource,
};

/// Interface name prefixes used by modem drivers.
const CELLULAR_PREFIXES: [&str; 3] = ["wwan", "rmnet", "ccmni"];

/// `ARPHRD_ETHER` and `ARPHRD_LOOPBACK` from `if_arp.h`.
const ARPHRD_ETHER: &str = "1";
const ARPHRD_LOOPBACK: &str = "772";

/// Probes interface state from a sysfs-style directory tree.
#[derive(Debug, Clone)]
pub struct SysfsSource {
  root: PathBuf,
}

impl SysfsSource {
  pub const DEFAULT_ROOT: &'static str = "/sys/class/net";

  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }
}

impl Default for SysfsSource {
  fn default() -> Self { Self::new(Self::DEFAULT_ROOT) }
}

impl PathSource for SysfsSource {
  fn probe(&self) -> Result<NetworkPath> {
    let entries = fs::read_dir(&self.root).map_err(|source| Error::Io {
      path: self.root.clone(),
      source,
    })?;

    let mut names: Vec<String> = entries
      .filter_map(|entry| entry.ok())
      .map(|entry| entry.file_name().to_string_lossy().into_owned())
      .collect();
    names.sort();

    let mut interfaces = Vec::new();
    let mut dormant = false;

    for name in names {
      let dir = self.root.join(&name);
      let kind = classify(&dir, &name);
      if kind == InterfaceType::Loopback {
        continue;
      }

      match read_attr(&dir, "operstate").as_deref() {
        Some("up") => {}
        // Some drivers (tun, ppp) never report a definite state.
        Some("unknown") if read_attr(&dir, "carrier").as_deref() == Some("1") => {}
        Some("dormant") => {
          dormant = true;
          continue;
        }
        _ => continue,
      }

      if !interfaces.contains(&kind) {
        interfaces.push(kind);
      }
    }

    let status = if !interfaces.is_empty() {
      PathStatus::Satisfied
    } else if dormant {
      PathStatus::RequiresConnection
    } else {
      PathStatus::Unsatisfied
    };

    Ok(NetworkPath {
      status,
      is_expensive: interfaces.contains(&InterfaceType::Cellular),
      // Linux has no system-wide low-data mode to read.
      is_constrained: false,
      interfaces,
      observed_at: Utc::now(),
    })
  }
}

/// Classify one interface directory.
fn classify(dir: &Path, name: &str) -> InterfaceType {
  let arp_type = read_attr(dir, "type");
  if name == "lo" || arp_type.as_deref() == Some(ARPHRD_LOOPBACK) {
    return InterfaceType::Loopback;
  }
  if dir.join("wireless").exists() || dir.join("phy80211").exists() {
    return InterfaceType::Wifi;
  }
  if CELLULAR_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
    return InterfaceType::Cellular;
  }
  if arp_type.as_deref() == Some(ARPHRD_ETHER) {
    return InterfaceType::WiredEthernet;
  }
  InterfaceType::Other
}

/// Read a single-line attribute. Missing or unreadable attributes are `None`;
/// the kernel returns `EINVAL` for `carrier` on downed links.
fn read_attr(dir: &Path, attr: &str) -> Option<String> {
  fs::read_to_string(dir.join(attr))
    .ok()
    .map(|s| s.trim().to_string())
}
