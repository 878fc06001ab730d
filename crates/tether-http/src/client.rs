//! Async HTTP client for fetch-with-fallback and JSON upload.

use std::{sync::Arc, time::Duration};

use reqwest::{
  Client, Method, RequestBuilder,
  header::{CACHE_CONTROL, CONTENT_TYPE},
};
use serde::{Serialize, de::DeserializeOwned};
use tether_core::monitor::PathMonitor;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
  error::{FetchError, RequestError, UploadError},
  main_context::MainHandle,
  policy::SessionPolicy,
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Connection settings shared by every request a client makes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
  /// Whole-request timeout, connect through body.
  pub timeout:    Duration,
  /// Extra attempts after a transport failure. Decode failures never retry.
  pub retries:    u32,
  pub user_agent: String,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      timeout:    Duration::from_secs(30),
      retries:    1,
      user_agent: concat!("tether/", env!("CARGO_PKG_VERSION")).to_string(),
    }
  }
}

/// Method and content type for [`HttpClient::upload_with_options`].
#[derive(Debug, Clone)]
pub struct UploadOptions {
  pub method:       Method,
  pub content_type: String,
}

impl Default for UploadOptions {
  fn default() -> Self {
    Self {
      method:       Method::POST,
      content_type: "application/json".to_string(),
    }
  }
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Async HTTP client for JSON endpoints.
///
/// Cheap to clone: the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpClient {
  client:  Client,
  config:  ClientConfig,
  policy:  SessionPolicy,
  monitor: Option<Arc<dyn PathMonitor>>,
}

impl HttpClient {
  pub fn new(config: ClientConfig) -> Result<Self, RequestError> {
    let client = Client::builder()
      .timeout(config.timeout)
      .user_agent(config.user_agent.as_str())
      .build()?;
    Ok(Self {
      client,
      config,
      policy: SessionPolicy::default(),
      monitor: None,
    })
  }

  /// Gate every request on `monitor`'s current path according to `policy`.
  pub fn with_monitor(mut self, monitor: Arc<dyn PathMonitor>, policy: SessionPolicy) -> Self {
    self.monitor = Some(monitor);
    self.policy = policy;
    self
  }

  // ── Transport ─────────────────────────────────────────────────────────────

  /// Send one request and collect its body. The status code is not checked:
  /// an error page is still a body, and whether it is usable is up to the
  /// decoder.
  async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, RequestError> {
    if let Some(monitor) = &self.monitor {
      self.policy.admit(monitor.as_ref()).await?;
    }

    let request = if self.policy.ignore_local_cache {
      request.header(CACHE_CONTROL, "no-cache")
    } else {
      request
    };

    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
      debug!(%status, url = %resp.url(), "non-success status; passing body through");
    }
    Ok(resp.bytes().await?.to_vec())
  }

  // ── Fetch ─────────────────────────────────────────────────────────────────

  /// `GET url` once and return the raw body, subject to the session policy.
  pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, RequestError> {
    debug!(%url, "GET (raw)");
    self.send(self.client.get(url)).await
  }

  /// `GET url` and decode the body, or `default` on any failure.
  ///
  /// A transport failure or policy refusal is retried
  /// [`ClientConfig::retries`] times (once by default). A body that does not
  /// decode, whatever its status, and a connectivity wait that timed out are
  /// not.
  pub async fn fetch<T: DeserializeOwned>(&self, url: &str, default: T) -> T {
    match self.try_fetch(url).await {
      Ok(value) => value,
      Err(e) => {
        warn!(%url, error = %e, "fetch failed; using default");
        default
      }
    }
  }

  async fn try_fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
    let mut attempt = 0;
    let body = loop {
      debug!(%url, attempt, "GET");
      match self.send(self.client.get(url)).await {
        Ok(body) => break body,
        Err(e) if e.is_retryable() && attempt < self.config.retries => {
          debug!(%url, error = %e, "GET failed; retrying");
          attempt += 1;
        }
        Err(e) => return Err(e.into()),
      }
    };
    Ok(serde_json::from_slice(&body)?)
  }

  /// Fetch two resources concurrently and return both once both finish.
  /// Each side falls back to its own default independently.
  pub async fn fetch_both<A, B>(&self, first: (&str, A), second: (&str, B)) -> (A, B)
  where
    A: DeserializeOwned,
    B: DeserializeOwned,
  {
    tokio::join!(
      self.fetch(first.0, first.1),
      self.fetch(second.0, second.1),
    )
  }

  /// Spawn [`fetch`](Self::fetch) and hand the value to `completion` on the
  /// main context. Aborting the returned task cancels the request.
  pub fn fetch_with<T, F>(&self, url: &str, default: T, main: &MainHandle, completion: F) -> JoinHandle<()>
  where
    T: DeserializeOwned + Send + 'static,
    F: FnOnce(T) + Send + 'static,
  {
    let client = self.clone();
    let url = url.to_string();
    let main = main.clone();
    tokio::spawn(async move {
      let value = client.fetch(&url, default).await;
      main.post(move || completion(value));
    })
  }

  /// Spawn [`fetch_both`](Self::fetch_both) and hand the pair to `completion`
  /// on the main context.
  pub fn fetch_both_with<A, B, F>(
    &self,
    first: (&str, A),
    second: (&str, B),
    main: &MainHandle,
    completion: F,
  ) -> JoinHandle<()>
  where
    A: DeserializeOwned + Send + 'static,
    B: DeserializeOwned + Send + 'static,
    F: FnOnce(A, B) + Send + 'static,
  {
    let client = self.clone();
    let (first_url, first_default) = (first.0.to_string(), first.1);
    let (second_url, second_default) = (second.0.to_string(), second.1);
    let main = main.clone();
    tokio::spawn(async move {
      let (a, b) = client
        .fetch_both(
          (first_url.as_str(), first_default),
          (second_url.as_str(), second_default),
        )
        .await;
      main.post(move || completion(a, b));
    })
  }

  // ── Upload ────────────────────────────────────────────────────────────────

  /// `POST url` with `data` as JSON and decode the JSON reply.
  pub async fn upload<I, O>(&self, data: &I, url: &str) -> Result<O, UploadError>
  where
    I: Serialize + ?Sized,
    O: DeserializeOwned,
  {
    self.upload_with_options(data, url, &UploadOptions::default()).await
  }

  /// [`upload`](Self::upload) with a caller-chosen method and content type.
  /// The body is JSON-encoded either way. Uploads are never retried.
  pub async fn upload_with_options<I, O>(
    &self,
    data: &I,
    url: &str,
    options: &UploadOptions,
  ) -> Result<O, UploadError>
  where
    I: Serialize + ?Sized,
    O: DeserializeOwned,
  {
    let body = serde_json::to_vec(data)
      .map_err(|e| UploadError::UploadFailed(RequestError::Encode(e)))?;

    debug!(%url, method = %options.method, bytes = body.len(), "upload");
    let request = self
      .client
      .request(options.method.clone(), url)
      .header(CONTENT_TYPE, options.content_type.as_str())
      .body(body);

    let reply = self.send(request).await.map_err(UploadError::UploadFailed)?;
    serde_json::from_slice(&reply).map_err(UploadError::DecodeFailed)
  }

  /// Spawn [`upload`](Self::upload) and hand the result to `completion` on
  /// the main context.
  pub fn upload_with<I, O, F>(&self, data: I, url: &str, main: &MainHandle, completion: F) -> JoinHandle<()>
  where
    I: Serialize + Send + Sync + 'static,
    O: DeserializeOwned + Send + 'static,
    F: FnOnce(Result<O, UploadError>) + Send + 'static,
  {
    let client = self.clone();
    let url = url.to_string();
    let main = main.clone();
    tokio::spawn(async move {
      let result = client.upload(&data, &url).await;
      main.post(move || completion(result));
    })
  }
}
