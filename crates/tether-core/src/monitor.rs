//! The `PathMonitor` trait.
//!
//! Implemented by `tether-monitor`. The request client depends on this
//! abstraction, not on any concrete monitor, so tests and embedders can inject
//! their own connectivity source.

use std::sync::Arc;

use crate::path::NetworkPath;

/// Callback invoked with every new path a monitor publishes.
pub type PathCallback = Arc<dyn Fn(&NetworkPath) + Send + Sync>;

/// Handle returned by [`PathMonitor::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A passive listener for host connectivity changes.
///
/// Monitors publish only changes: a callback is not invoked again for a path
/// that is the same (see [`NetworkPath::same_as`]) as the previous one.
pub trait PathMonitor: Send + Sync {
  /// The most recently observed path.
  fn current(&self) -> NetworkPath;

  /// Register `callback` for future path changes. Once a path has been
  /// published, the callback is also invoked with it before this returns.
  fn subscribe(&self, callback: PathCallback) -> SubscriptionId;

  /// Remove a subscription. Unknown ids are ignored.
  fn unsubscribe(&self, id: SubscriptionId);

  /// Tear the monitor down. Idempotent; no new callbacks start after it
  /// returns.
  fn stop(&self);
}
