//! `tether upload`: send a movie star record and report what comes back.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use anyhow::bail;
use tether_core::model::MovieStar;
use tether_http::{HttpClient, MainContext, UploadError};
use tracing::error;

pub async fn run(client: &HttpClient, url: &str, star: MovieStar) -> anyhow::Result<()> {
  let (context, main) = MainContext::new();
  let failed = Arc::new(AtomicBool::new(false));

  let flag = Arc::clone(&failed);
  client.upload_with(star, url, &main, move |result: Result<MovieStar, UploadError>| {
    match result {
      Ok(star) => println!("Received back {}", star.name),
      Err(e) => {
        error!(error = %e, decode = e.is_decode_failure(), "upload failed");
        flag.store(true, Ordering::SeqCst);
      }
    }
  });
  drop(main);

  context.run().await;
  if failed.load(Ordering::SeqCst) {
    bail!("upload to {url} failed");
  }
  Ok(())
}
