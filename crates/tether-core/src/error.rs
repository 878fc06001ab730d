//! Error types for `tether-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown interface type: {0:?}")]
  UnknownInterfaceType(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
