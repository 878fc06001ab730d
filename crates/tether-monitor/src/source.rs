//! Where a monitor gets its connectivity snapshots from.

use std::sync::Arc;

use parking_lot::Mutex;
use tether_core::path::NetworkPath;

use crate::error::Result;

/// A blocking probe of the host's current connectivity.
///
/// Called from a blocking-pool thread, so implementations may touch the
/// filesystem or other synchronous platform APIs.
pub trait PathSource: Send + Sync + 'static {
  fn probe(&self) -> Result<NetworkPath>;
}

/// A source whose path is set by hand.
///
/// Cheap to clone; all clones share the same path.
#[derive(Clone, Default)]
pub struct StaticSource {
  path: Arc<Mutex<NetworkPath>>,
}

impl StaticSource {
  pub fn new(path: NetworkPath) -> Self {
    Self { path: Arc::new(Mutex::new(path)) }
  }

  /// Replace the path returned by the next probe.
  pub fn set(&self, path: NetworkPath) { *self.path.lock() = path; }
}

impl PathSource for StaticSource {
  fn probe(&self) -> Result<NetworkPath> { Ok(self.path.lock().clone()) }
}
