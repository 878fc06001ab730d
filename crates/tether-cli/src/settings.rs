//! Layered runtime settings: defaults, then `tether.toml`, then `TETHER_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;
use tether_http::ClientConfig;
use tether_monitor::SysfsSource;

// ─── Sections ─────────────────────────────────────────────────────────────────

/// Top-level settings, deserialised from the merged config sources.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub endpoints: Endpoints,
  pub http:      HttpSettings,
  pub monitor:   MonitorSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
  pub messages_url:  String,
  pub favorites_url: String,
  pub upload_url:    String,
  /// Page requested by `tether monitor --fetch`.
  pub probe_url:     String,
}

impl Default for Endpoints {
  fn default() -> Self {
    Self {
      messages_url:  "https://www.hackingwithswift.com/samples/user-messages.json".into(),
      favorites_url: "https://www.hackingwithswift.com/samples/user-favorites.json".into(),
      upload_url:    "https://reqres.in/api/users".into(),
      probe_url:     "https://www.hackingwithswift.com".into(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
  pub timeout_secs: u64,
  pub retries:      u32,
  pub user_agent:   Option<String>,
}

impl Default for HttpSettings {
  fn default() -> Self {
    let defaults = ClientConfig::default();
    Self {
      timeout_secs: defaults.timeout.as_secs(),
      retries:      defaults.retries,
      user_agent:   None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
  pub sysfs_root:       PathBuf,
  pub poll_interval_ms: u64,
}

impl Default for MonitorSettings {
  fn default() -> Self {
    Self {
      sysfs_root:       PathBuf::from(SysfsSource::DEFAULT_ROOT),
      poll_interval_ms: 1000,
    }
  }
}

// ─── Loading ──────────────────────────────────────────────────────────────────

/// `TETHER_<SECTION>__<KEY>`: one underscore after the prefix, two between
/// nested keys.
fn environment() -> config::Environment {
  config::Environment::with_prefix("TETHER")
    .prefix_separator("_")
    .separator("__")
    .try_parsing(true)
}

impl Settings {
  /// Load settings from `path` (optional) layered under `TETHER_*`
  /// environment variables, e.g. `TETHER_HTTP__RETRIES=2`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    Self::load_with(path, environment())
  }

  fn load_with(path: &Path, env: config::Environment) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()
      .with_context(|| format!("failed to read config from {}", path.display()))?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn client_config(&self) -> ClientConfig {
    let defaults = ClientConfig::default();
    ClientConfig {
      timeout:    Duration::from_secs(self.http.timeout_secs),
      retries:    self.http.retries,
      user_agent: self.http.user_agent.clone().unwrap_or(defaults.user_agent),
    }
  }

  pub fn poll_interval(&self) -> Duration {
    // A zero period would make the monitor's ticker panic.
    Duration::from_millis(self.monitor.poll_interval_ms.max(1))
  }
}
