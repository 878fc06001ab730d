//! Integration tests for `HttpClient` against an in-process axum server.

use std::{
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use axum::{
  Json, Router,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  routing::{any, get, post},
};
use reqwest::Method;
use serde_json::{Value, json};
use tether_core::{
  model::{Favorites, Message, MovieStar},
  monitor::{PathCallback, PathMonitor, SubscriptionId},
  path::{InterfaceType, NetworkPath},
};
use tether_monitor::{NetworkMonitor, StaticSource};
use tokio::{
  io::{AsyncReadExt, AsyncWriteExt},
  net::{TcpListener, TcpStream},
  sync::mpsc,
};

use crate::{
  ClientConfig, HttpClient, MainContext, Refusal, RequestError, SessionPolicy,
  UploadError, UploadOptions,
};

type Hits = Arc<AtomicUsize>;

// ─── Server ──────────────────────────────────────────────────────────────────

fn routes(hits: Hits) -> Router {
  Router::new()
    .route("/messages", get(messages))
    .route("/favorites", get(|| async { Json(json!([2, 2, 3])) }))
    .route("/garbage", get(garbage))
    .route("/down", get(down))
    .route("/cache", get(cache_control))
    .route("/users", post(create_user))
    .route("/html", post(|| async { "<html><body>created</body></html>" }))
    .route("/reject", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>") }))
    .route("/invalid", post(invalid_user))
    .route("/echo", any(echo_request))
    .with_state(hits)
}

async fn messages() -> Json<Value> {
  Json(json!([
    { "id": 1, "from": "Tim", "message": "Lunch?" },
    { "id": 2, "from": "Craig", "message": "Hair force one" },
    { "id": 3, "from": "Phil", "message": "Can't innovate anymore" },
  ]))
}

async fn garbage(State(hits): State<Hits>) -> &'static str {
  hits.fetch_add(1, Ordering::SeqCst);
  "<html>not json</html>"
}

async fn down(State(hits): State<Hits>) -> StatusCode {
  hits.fetch_add(1, Ordering::SeqCst);
  StatusCode::SERVICE_UNAVAILABLE
}

/// A 422 whose body still has the shape the client asked for.
async fn invalid_user(Json(user): Json<Value>) -> (StatusCode, Json<Value>) {
  (StatusCode::UNPROCESSABLE_ENTITY, Json(user))
}

async fn cache_control(headers: HeaderMap) -> Json<Option<String>> {
  Json(
    headers
      .get(header::CACHE_CONTROL)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string),
  )
}

async fn create_user(
  State(hits): State<Hits>,
  Json(mut user): Json<Value>,
) -> (StatusCode, Json<Value>) {
  hits.fetch_add(1, Ordering::SeqCst);
  user["id"] = json!("412");
  user["createdAt"] = json!("2022-11-07T04:12:00.000Z");
  (StatusCode::CREATED, Json(user))
}

/// Reflect the request method and content type back as a `MovieStar`.
async fn echo_request(method: axum::http::Method, headers: HeaderMap) -> Json<Value> {
  let content_type = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
    .to_string();
  Json(json!({ "name": method.as_str(), "movies": [content_type] }))
}

async fn serve(hits: Hits) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, routes(hits)).await.unwrap();
  });
  format!("http://{addr}")
}

/// A URL on a port nothing is listening on.
async fn unreachable_url() -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);
  format!("http://{addr}/messages")
}

/// A raw TCP endpoint that hangs up on its first `drops` connections without
/// answering, then serves `[7]` to every later one.
async fn hangup_url(hits: Hits, drops: usize) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    while let Ok((stream, _)) = listener.accept().await {
      if hits.fetch_add(1, Ordering::SeqCst) < drops {
        drop(stream);
      } else {
        tokio::spawn(answer_seven(stream));
      }
    }
  });
  format!("http://{addr}/favorites")
}

async fn answer_seven(mut stream: TcpStream) {
  let mut request = Vec::new();
  let mut buf = [0u8; 1024];
  while !request.windows(4).any(|w| w == b"\r\n\r\n") {
    match stream.read(&mut buf).await {
      Ok(0) | Err(_) => return,
      Ok(n) => request.extend_from_slice(&buf[..n]),
    }
  }
  let _ = stream
    .write_all(
      b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
        content-length: 3\r\nconnection: close\r\n\r\n[7]",
    )
    .await;
  let _ = stream.shutdown().await;
}

/// Always offline. Counts how often a request started waiting on it.
#[derive(Default)]
struct OfflineMonitor {
  waits: AtomicUsize,
}

impl PathMonitor for OfflineMonitor {
  fn current(&self) -> NetworkPath { NetworkPath::unsatisfied() }

  fn subscribe(&self, _callback: PathCallback) -> SubscriptionId {
    SubscriptionId(self.waits.fetch_add(1, Ordering::SeqCst) as u64)
  }

  fn unsubscribe(&self, _id: SubscriptionId) {}

  fn stop(&self) {}
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn client() -> HttpClient {
  HttpClient::new(ClientConfig {
    timeout: Duration::from_secs(5),
    ..ClientConfig::default()
  })
  .unwrap()
}

fn fallback_messages() -> Vec<Message> {
  vec![Message { id: -1, from: "nobody".into(), message: "offline".into() }]
}

fn cate() -> MovieStar {
  MovieStar::new("Cate Blanchett", ["The Lord of the Rings", "Elizabeth"])
}

/// Start a monitor over a static path and wait for its first probe.
async fn monitor_with(path: NetworkPath) -> (Arc<NetworkMonitor>, StaticSource) {
  let source = StaticSource::new(path);
  let monitor = Arc::new(
    NetworkMonitor::start(source.clone(), Duration::from_millis(10)).unwrap(),
  );

  let (tx, mut rx) = mpsc::unbounded_channel();
  let callback: PathCallback = Arc::new(move |_: &NetworkPath| {
    let _ = tx.send(());
  });
  let id = monitor.subscribe(callback);
  tokio::time::timeout(Duration::from_secs(2), rx.recv())
    .await
    .expect("first probe");
  monitor.unsubscribe(id);

  (monitor, source)
}

// ─── Fetch ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_returns_decoded_value() {
  let base = serve(Hits::default()).await;

  let messages = client()
    .fetch(&format!("{base}/messages"), fallback_messages())
    .await;
  assert_eq!(messages.len(), 3);
  assert_eq!(messages[1], Message {
    id:      2,
    from:    "Craig".into(),
    message: "Hair force one".into(),
  });
}

#[tokio::test]
async fn fetch_returns_default_for_malformed_body_without_retrying() {
  let hits = Hits::default();
  let base = serve(hits.clone()).await;

  let messages = client()
    .fetch(&format!("{base}/garbage"), fallback_messages())
    .await;
  assert_eq!(messages, fallback_messages());
  assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fetch_returns_default_when_unreachable() {
  let url = unreachable_url().await;
  let favorites = client().fetch(&url, Favorites::default()).await;
  assert!(favorites.is_empty());
}

#[tokio::test]
async fn fetch_retries_once_then_falls_back() {
  let hits = Hits::default();
  let url = hangup_url(hits.clone(), usize::MAX).await;

  let favorites: Favorites = [42].into_iter().collect();
  let result = client().fetch(&url, favorites.clone()).await;
  assert_eq!(result, favorites);
  assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fetch_succeeds_on_the_retry() {
  let hits = Hits::default();
  let url = hangup_url(hits.clone(), 1).await;

  let favorites = client().fetch(&url, Favorites::default()).await;
  assert!(favorites.contains(7));
  assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fetch_without_retries_hits_once() {
  let hits = Hits::default();
  let url = hangup_url(hits.clone(), usize::MAX).await;
  let client = HttpClient::new(ClientConfig {
    retries: 0,
    ..ClientConfig::default()
  })
  .unwrap();

  client.fetch(&url, Favorites::default()).await;
  assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fetch_does_not_retry_an_error_status() {
  let hits = Hits::default();
  let base = serve(hits.clone()).await;

  let favorites: Favorites = [42].into_iter().collect();
  let result = client().fetch(&format!("{base}/down"), favorites.clone()).await;
  assert_eq!(result, favorites);
  assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn get_bytes_returns_raw_body_and_surfaces_errors() {
  let hits = Hits::default();
  let base = serve(hits.clone()).await;
  let client = client();

  let body = client.get_bytes(&format!("{base}/garbage")).await.unwrap();
  assert_eq!(body, b"<html>not json</html>");

  // A 503 still delivers its (empty) body.
  let body = client.get_bytes(&format!("{base}/down")).await.unwrap();
  assert!(body.is_empty());
  assert_eq!(hits.load(Ordering::SeqCst), 2);

  let err = client.get_bytes(&unreachable_url().await).await.unwrap_err();
  assert!(matches!(err, RequestError::Transport(_)));
}

// ─── Merge ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_both_combines_results() {
  let base = serve(Hits::default()).await;

  let messages_url = format!("{base}/messages");
  let favorites_url = format!("{base}/favorites");

  let (messages, favorites) = client()
    .fetch_both(
      (messages_url.as_str(), Vec::<Message>::new()),
      (favorites_url.as_str(), Favorites::default()),
    )
    .await;
  assert_eq!(messages.len(), 3);
  assert_eq!(favorites.len(), 2);
  assert!(favorites.contains(2));
}

#[tokio::test]
async fn fetch_both_falls_back_per_side() {
  let base = serve(Hits::default()).await;

  let fallback: Favorites = [99].into_iter().collect();
  let messages_url = format!("{base}/messages");
  let garbage_url = format!("{base}/garbage");

  let (messages, favorites) = client()
    .fetch_both(
      (messages_url.as_str(), Vec::<Message>::new()),
      (garbage_url.as_str(), fallback.clone()),
    )
    .await;
  assert_eq!(messages.len(), 3);
  assert_eq!(favorites, fallback);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fetch_both_with_delivers_on_main_context() {
  let base = serve(Hits::default()).await;
  let (context, main) = MainContext::new();
  let main_thread = std::thread::current().id();
  let delivered = Arc::new(Mutex::new(None));

  let messages_url = format!("{base}/messages");
  let favorites_url = format!("{base}/favorites");

  let slot = Arc::clone(&delivered);
  client().fetch_both_with(
    (messages_url.as_str(), Vec::<Message>::new()),
    (favorites_url.as_str(), Favorites::default()),
    &main,
    move |messages, favorites| {
      *slot.lock().unwrap() =
        Some((messages.len(), favorites.len(), std::thread::current().id()));
    },
  );
  drop(main);

  context.run().await;
  assert_eq!(*delivered.lock().unwrap(), Some((3, 2, main_thread)));
}

#[tokio::test]
async fn fetch_with_delivers_default_on_failure() {
  let url = unreachable_url().await;
  let (context, main) = MainContext::new();
  let delivered = Arc::new(Mutex::new(None));

  let slot = Arc::clone(&delivered);
  client().fetch_with(&url, fallback_messages(), &main, move |messages| {
    *slot.lock().unwrap() = Some(messages);
  });
  drop(main);

  context.run().await;
  assert_eq!(*delivered.lock().unwrap(), Some(fallback_messages()));
}

// ─── Upload ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_returns_decoded_reply() {
  let hits = Hits::default();
  let base = serve(hits.clone()).await;

  let star: MovieStar = client().upload(&cate(), &format!("{base}/users")).await.unwrap();
  assert_eq!(star, cate());
  assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upload_with_undecodable_reply_is_a_decode_failure() {
  let base = serve(Hits::default()).await;

  let err = client()
    .upload::<_, MovieStar>(&cate(), &format!("{base}/html"))
    .await
    .unwrap_err();
  assert!(err.is_decode_failure(), "{err}");
  assert!(matches!(err, UploadError::DecodeFailed(_)));
}

#[tokio::test]
async fn upload_to_unreachable_host_is_an_upload_failure() {
  let url = unreachable_url().await;

  let err = client().upload::<_, MovieStar>(&cate(), &url).await.unwrap_err();
  assert!(!err.is_decode_failure());
  assert!(matches!(err, UploadError::UploadFailed(RequestError::Transport(_))));
}

#[tokio::test]
async fn upload_error_page_is_a_decode_failure() {
  let base = serve(Hits::default()).await;

  let err = client()
    .upload::<_, MovieStar>(&cate(), &format!("{base}/reject"))
    .await
    .unwrap_err();
  assert!(err.is_decode_failure(), "{err}");
}

#[tokio::test]
async fn upload_decodes_reply_regardless_of_status() {
  let base = serve(Hits::default()).await;

  let star: MovieStar = client()
    .upload(&cate(), &format!("{base}/invalid"))
    .await
    .unwrap();
  assert_eq!(star, cate());
}

#[tokio::test]
async fn upload_with_options_sets_method_and_content_type() {
  let base = serve(Hits::default()).await;
  let options = UploadOptions {
    method:       Method::PUT,
    content_type: "application/vnd.tether+json".to_string(),
  };

  let echoed: MovieStar = client()
    .upload_with_options(&cate(), &format!("{base}/echo"), &options)
    .await
    .unwrap();
  assert_eq!(echoed.name, "PUT");
  assert_eq!(echoed.movies, vec!["application/vnd.tether+json".to_string()]);
}

#[tokio::test]
async fn upload_with_delivers_result_on_main_context() {
  let base = serve(Hits::default()).await;
  let (context, main) = MainContext::new();
  let delivered = Arc::new(Mutex::new(None));

  let slot = Arc::clone(&delivered);
  client().upload_with(
    cate(),
    &format!("{base}/users"),
    &main,
    move |result: Result<MovieStar, UploadError>| {
      *slot.lock().unwrap() = Some(result.map(|star| star.name));
    },
  );
  drop(main);

  context.run().await;
  let delivered = delivered.lock().unwrap().take().unwrap();
  assert_eq!(delivered.unwrap(), "Cate Blanchett");
}

// ─── Session policy ──────────────────────────────────────────────────────────

#[tokio::test]
async fn expensive_path_is_refused_when_disallowed() {
  let hits = Hits::default();
  let base = serve(hits.clone()).await;
  let (monitor, _source) = monitor_with(NetworkPath::satisfied([InterfaceType::Cellular])).await;
  let policy = SessionPolicy { allows_expensive: false, ..SessionPolicy::default() };
  let client = client().with_monitor(monitor, policy);

  let messages = client.fetch(&format!("{base}/down"), fallback_messages()).await;
  assert_eq!(messages, fallback_messages());
  assert_eq!(hits.load(Ordering::SeqCst), 0);

  let err = client
    .upload::<_, MovieStar>(&cate(), &format!("{base}/users"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    UploadError::UploadFailed(RequestError::Refused(Refusal::Expensive))
  ));
}

#[tokio::test]
async fn constrained_path_is_refused_when_disallowed() {
  let base = serve(Hits::default()).await;
  let mut path = NetworkPath::satisfied([InterfaceType::Wifi]);
  path.is_constrained = true;
  let (monitor, _source) = monitor_with(path).await;
  let client = client().with_monitor(monitor, SessionPolicy::restrictive());

  let err = client
    .upload::<_, MovieStar>(&cate(), &format!("{base}/users"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    UploadError::UploadFailed(RequestError::Refused(Refusal::Constrained))
  ));
}

#[tokio::test]
async fn restrictive_policy_allows_cheap_path_and_bypasses_cache() {
  let base = serve(Hits::default()).await;
  let (monitor, _source) = monitor_with(NetworkPath::satisfied([InterfaceType::Wifi])).await;
  let client = client().with_monitor(monitor, SessionPolicy::restrictive());

  let messages = client.fetch(&format!("{base}/messages"), Vec::<Message>::new()).await;
  assert_eq!(messages.len(), 3);

  let cache = client.fetch(&format!("{base}/cache"), None::<String>).await;
  assert_eq!(cache.as_deref(), Some("no-cache"));
}

#[tokio::test]
async fn default_policy_sends_no_cache_header() {
  let base = serve(Hits::default()).await;
  let cache = client()
    .fetch(&format!("{base}/cache"), Some("sentinel".to_string()))
    .await;
  assert_eq!(cache, None);
}

#[tokio::test]
async fn waits_for_connectivity_before_sending() {
  let base = serve(Hits::default()).await;
  let (monitor, source) = monitor_with(NetworkPath::unsatisfied()).await;
  let policy = SessionPolicy {
    waits_for_connectivity: true,
    connectivity_timeout: Duration::from_secs(5),
    ..SessionPolicy::default()
  };
  let client = client().with_monitor(monitor, policy);

  let url = format!("{base}/messages");
  let pending = tokio::spawn(async move { client.fetch(&url, Vec::<Message>::new()).await });

  tokio::time::sleep(Duration::from_millis(50)).await;
  assert!(!pending.is_finished());
  source.set(NetworkPath::satisfied([InterfaceType::WiredEthernet]));

  let messages = pending.await.unwrap();
  assert_eq!(messages.len(), 3);
}

#[tokio::test]
async fn connectivity_timeout_falls_back_without_sending() {
  let hits = Hits::default();
  let base = serve(hits.clone()).await;
  let (monitor, _source) = monitor_with(NetworkPath::unsatisfied()).await;
  let policy = SessionPolicy {
    waits_for_connectivity: true,
    connectivity_timeout: Duration::from_millis(50),
    ..SessionPolicy::default()
  };
  let client = client().with_monitor(monitor, policy);

  let messages = client.fetch(&format!("{base}/down"), fallback_messages()).await;
  assert_eq!(messages, fallback_messages());
  assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn connectivity_timeout_is_not_retried() {
  let monitor = Arc::new(OfflineMonitor::default());
  let policy = SessionPolicy {
    waits_for_connectivity: true,
    connectivity_timeout: Duration::from_millis(20),
    ..SessionPolicy::default()
  };
  let client = client().with_monitor(monitor.clone(), policy);

  let url = unreachable_url().await;
  let messages = client.fetch(&url, fallback_messages()).await;
  assert_eq!(messages, fallback_messages());
  assert_eq!(monitor.waits.load(Ordering::SeqCst), 1);
}
