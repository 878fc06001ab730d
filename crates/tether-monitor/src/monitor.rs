//! The polling [`NetworkMonitor`].

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tether_core::{
  monitor::{PathCallback, PathMonitor, SubscriptionId},
  path::NetworkPath,
};
use tokio::{
  runtime::Handle,
  task::JoinHandle,
  time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{error::Result, source::PathSource};

// ─── Shared state ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct Subscribers {
  next_id:   u64,
  stopped:   bool,
  callbacks: Vec<(SubscriptionId, PathCallback)>,
  /// The path last handed to subscribers; replayed to late subscribers.
  last:      Option<NetworkPath>,
}

/// State shared between the monitor handle and its polling task.
#[derive(Default)]
struct Shared {
  current:     Mutex<NetworkPath>,
  subscribers: Mutex<Subscribers>,
}

impl Shared {
  /// Store `path` and notify subscribers if it differs from the current one
  /// (or unconditionally when `force` is set).
  ///
  /// Callbacks run outside both locks so they may call back into the monitor.
  fn publish(&self, path: NetworkPath, force: bool) {
    {
      let mut current = self.current.lock();
      if !force && current.same_as(&path) {
        return;
      }
      *current = path.clone();
    }

    let callbacks: Vec<(SubscriptionId, PathCallback)> = {
      let mut subscribers = self.subscribers.lock();
      if subscribers.stopped {
        return;
      }
      subscribers.last = Some(path.clone());
      subscribers.callbacks.clone()
    };

    debug!(
      status = %path.status,
      connection = %path.connection_type(),
      expensive = path.is_expensive,
      constrained = path.is_constrained,
      subscribers = callbacks.len(),
      "network path changed"
    );
    for (id, callback) in callbacks {
      if !self.is_subscribed(id) {
        continue;
      }
      callback(&path);
    }
  }

  /// False once `id` was unsubscribed or the monitor stopped.
  fn is_subscribed(&self, id: SubscriptionId) -> bool {
    let subscribers = self.subscribers.lock();
    !subscribers.stopped && subscribers.callbacks.iter().any(|(existing, _)| *existing == id)
  }
}

// ─── Monitor ──────────────────────────────────────────────────────────────────

/// Polls a [`PathSource`] on the current tokio runtime and publishes path
/// changes to subscribers.
///
/// The first probe is always published; later probes only when the path
/// changed. Subscribing after the first probe replays the last published path
/// to the new callback. Dropping the monitor stops it.
pub struct NetworkMonitor {
  shared: Arc<Shared>,
  task:   Mutex<Option<JoinHandle<()>>>,
}

impl NetworkMonitor {
  /// Spawn the polling task. Fails when called outside a tokio runtime.
  pub fn start<S: PathSource>(source: S, poll_interval: Duration) -> Result<Self> {
    let runtime = Handle::try_current()?;
    let shared = Arc::new(Shared::default());

    let task = runtime.spawn(poll(
      Arc::new(source),
      poll_interval,
      Arc::clone(&shared),
    ));
    info!(interval = ?poll_interval, "network monitor started");

    Ok(Self {
      shared,
      task: Mutex::new(Some(task)),
    })
  }

  pub fn is_running(&self) -> bool {
    self
      .task
      .lock()
      .as_ref()
      .is_some_and(|task| !task.is_finished())
  }
}

impl PathMonitor for NetworkMonitor {
  fn current(&self) -> NetworkPath { self.shared.current.lock().clone() }

  fn subscribe(&self, callback: PathCallback) -> SubscriptionId {
    let (id, replay) = {
      let mut subscribers = self.shared.subscribers.lock();
      let id = SubscriptionId(subscribers.next_id);
      subscribers.next_id += 1;
      if subscribers.stopped {
        return id;
      }
      subscribers.callbacks.push((id, Arc::clone(&callback)));
      (id, subscribers.last.clone())
    };

    // A subscriber arriving after the first probe still learns the current
    // path.
    if let Some(path) = replay {
      callback(&path);
    }
    id
  }

  fn unsubscribe(&self, id: SubscriptionId) {
    self
      .shared
      .subscribers
      .lock()
      .callbacks
      .retain(|(existing, _)| *existing != id);
  }

  fn stop(&self) {
    {
      let mut subscribers = self.shared.subscribers.lock();
      subscribers.stopped = true;
      subscribers.callbacks.clear();
    }
    if let Some(task) = self.task.lock().take() {
      task.abort();
      info!("network monitor stopped");
    }
  }
}

impl Drop for NetworkMonitor {
  fn drop(&mut self) { self.stop(); }
}

async fn poll<S: PathSource>(
  source: Arc<S>,
  poll_interval: Duration,
  shared: Arc<Shared>,
) {
  let mut ticker = time::interval(poll_interval);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
  let mut first = true;

  loop {
    ticker.tick().await;

    let probe_source = Arc::clone(&source);
    let path = match tokio::task::spawn_blocking(move || probe_source.probe()).await {
      Ok(Ok(path)) => path,
      Ok(Err(e)) => {
        warn!(error = %e, "network path probe failed; keeping previous path");
        continue;
      }
      Err(e) => {
        warn!(error = %e, "network path probe did not complete");
        continue;
      }
    };

    shared.publish(path, first);
    first = false;
  }
}
