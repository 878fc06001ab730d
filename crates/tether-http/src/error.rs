//! Error types for `tether-http`.

use std::{fmt, time::Duration};

use thiserror::Error;

/// Which session-policy rule refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
  Expensive,
  Constrained,
}

impl fmt::Display for Refusal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Expensive => "expensive network access is not allowed",
      Self::Constrained => "constrained network access is not allowed",
    })
  }
}

/// A request that never produced a usable response body.
#[derive(Debug, Error)]
pub enum RequestError {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("cannot encode request body: {0}")]
  Encode(#[source] serde_json::Error),

  #[error("request refused: {0}")]
  Refused(Refusal),

  #[error("no connectivity after waiting {0:?}")]
  NoConnectivity(Duration),
}

impl RequestError {
  /// Whether a fetch may send the same request again. Connectivity timeouts
  /// and encode failures are final.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Transport(_) | Self::Refused(_))
  }
}

/// Why a fetch fell back to its default. Logged, never returned to callers
/// of [`HttpClient::fetch`](crate::HttpClient::fetch).
#[derive(Debug, Error)]
pub enum FetchError {
  #[error(transparent)]
  Request(#[from] RequestError),

  #[error("cannot decode response: {0}")]
  Decode(#[from] serde_json::Error),
}

/// Failure of an upload, split by whether a response body was received.
#[derive(Debug, Error)]
pub enum UploadError {
  #[error("upload failed: {0}")]
  UploadFailed(#[source] RequestError),

  #[error("cannot decode upload response: {0}")]
  DecodeFailed(#[source] serde_json::Error),
}

impl UploadError {
  pub fn is_decode_failure(&self) -> bool { matches!(self, Self::DecodeFailed(_)) }
}
