//! Error type for `tether-monitor`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot read {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("monitor is not running inside a tokio runtime")]
  NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
