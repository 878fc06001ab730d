//! Per-client rules on which network paths a request may use.

use std::{sync::Arc, time::Duration};

use tether_core::{
  monitor::{PathCallback, PathMonitor},
  path::NetworkPath,
};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{Refusal, RequestError};

/// Session-level restrictions evaluated against a [`PathMonitor`] before each
/// request is sent.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
  pub allows_expensive:       bool,
  pub allows_constrained:     bool,
  /// Hold requests until the path becomes active instead of failing fast.
  pub waits_for_connectivity: bool,
  /// Upper bound on the wait when `waits_for_connectivity` is set. A fetch
  /// that times out here is not retried.
  pub connectivity_timeout:   Duration,
  /// Ask intermediaries for a fresh response (`Cache-Control: no-cache`).
  pub ignore_local_cache:     bool,
}

impl Default for SessionPolicy {
  fn default() -> Self {
    Self {
      allows_expensive:       true,
      allows_constrained:     true,
      waits_for_connectivity: false,
      connectivity_timeout:   Duration::from_secs(30),
      ignore_local_cache:     false,
    }
  }
}

impl SessionPolicy {
  /// No expensive or constrained paths, wait for connectivity, bypass caches.
  pub fn restrictive() -> Self {
    Self {
      allows_expensive:       false,
      allows_constrained:     false,
      waits_for_connectivity: true,
      ignore_local_cache:     true,
      ..Self::default()
    }
  }

  /// Decide whether a request may go out on the monitor's current path.
  ///
  /// An inactive path is only an error when waiting for connectivity timed
  /// out; otherwise the request is attempted and fails in transport.
  pub(crate) async fn admit(&self, monitor: &dyn PathMonitor) -> Result<(), RequestError> {
    let mut path = monitor.current();
    if !path.is_active() && self.waits_for_connectivity {
      debug!(timeout = ?self.connectivity_timeout, "waiting for connectivity");
      path = wait_for_active(monitor, self.connectivity_timeout).await?;
    }

    if path.is_expensive && !self.allows_expensive {
      return Err(RequestError::Refused(Refusal::Expensive));
    }
    if path.is_constrained && !self.allows_constrained {
      return Err(RequestError::Refused(Refusal::Constrained));
    }
    Ok(())
  }
}

async fn wait_for_active(
  monitor: &dyn PathMonitor,
  timeout: Duration,
) -> Result<NetworkPath, RequestError> {
  let (tx, mut rx) = watch::channel(monitor.current());
  let callback: PathCallback = Arc::new(move |path: &NetworkPath| {
    tx.send_replace(path.clone());
  });
  let id = monitor.subscribe(callback);

  // The path may have turned active between the first read and subscribing.
  let latest = monitor.current();
  let outcome = if latest.is_active() {
    Ok(latest)
  } else {
    match tokio::time::timeout(timeout, rx.wait_for(NetworkPath::is_active)).await {
      Ok(Ok(path)) => Ok((*path).clone()),
      // Timed out, or the monitor stopped and dropped our sender.
      Ok(Err(_)) | Err(_) => Err(RequestError::NoConnectivity(timeout)),
    }
  };

  monitor.unsubscribe(id);
  outcome
}
