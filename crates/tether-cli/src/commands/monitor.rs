//! `tether monitor`: print connectivity changes until interrupted.

use std::sync::Arc;

use anyhow::Context as _;
use tether_core::{
  monitor::{PathCallback, PathMonitor},
  path::{InterfaceType, NetworkPath},
};
use tether_http::{HttpClient, MainContext, SessionPolicy};
use tether_monitor::{NetworkMonitor, StaticSource, SysfsSource};
use tokio::sync::Notify;
use tracing::info;

use crate::settings::Settings;

/// Options for [`run`], straight from the command line.
pub struct MonitorArgs {
  /// Also request the probe page under the restrictive session policy.
  pub fetch:    bool,
  /// Stop after the first published path.
  pub once:     bool,
  /// Report a fixed satisfied path over these interfaces instead of probing.
  pub simulate: Vec<InterfaceType>,
}

pub async fn run(settings: &Settings, args: MonitorArgs) -> anyhow::Result<()> {
  let monitor = Arc::new(start_monitor(settings, &args.simulate)?);
  let (context, main) = MainContext::new();
  let first_update = Arc::new(Notify::new());

  let printer = main.clone();
  let notify = Arc::clone(&first_update);
  let callback: PathCallback = Arc::new(move |path: &NetworkPath| {
    let path = path.clone();
    printer.post(move || println!("{path}\n"));
    notify.notify_one();
  });
  monitor.subscribe(callback);

  if args.fetch {
    let client = HttpClient::new(settings.client_config())
      .context("failed to build HTTP client")?
      .with_monitor(monitor.clone(), SessionPolicy::restrictive());
    let url = settings.endpoints.probe_url.clone();
    let reporter = main.clone();
    tokio::spawn(async move {
      let outcome = client.get_bytes(&url).await;
      reporter.post(move || match outcome {
        Ok(body) => println!("Fetched {} bytes from {url}\n", body.len()),
        Err(e) => println!("Fetch from {url} failed: {e}\n"),
      });
    });
  }

  let stopper = Arc::clone(&monitor);
  let once = args.once;
  tokio::spawn(async move {
    tokio::select! {
      _ = first_update.notified(), if once => {}
      _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
    // Dropping the subscriber releases its handle and lets the context drain.
    stopper.stop();
  });
  drop(main);

  context.run().await;
  Ok(())
}

fn start_monitor(settings: &Settings, simulate: &[InterfaceType]) -> anyhow::Result<NetworkMonitor> {
  let interval = settings.poll_interval();
  let monitor = if simulate.is_empty() {
    let source = SysfsSource::new(&settings.monitor.sysfs_root);
    info!(root = %source.root().display(), "probing sysfs");
    NetworkMonitor::start(source, interval)?
  } else {
    let path = NetworkPath::satisfied(simulate.iter().copied());
    info!(connection = %path.connection_type(), "simulating network path");
    NetworkMonitor::start(StaticSource::new(path), interval)?
  };
  Ok(monitor)
}
