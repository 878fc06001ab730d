//! `tether messages`: fetch the inbox and the favorites list together.

use tether_core::model::{Favorites, Message, mark_favorites};
use tether_http::{HttpClient, MainContext};

use crate::settings::Endpoints;

pub async fn run(client: &HttpClient, endpoints: &Endpoints) -> anyhow::Result<()> {
  let (context, main) = MainContext::new();

  client.fetch_both_with(
    (endpoints.messages_url.as_str(), Vec::<Message>::new()),
    (endpoints.favorites_url.as_str(), Favorites::default()),
    &main,
    |messages, favorites| print!("{}", render(&messages, &favorites)),
  );
  drop(main);

  context.run().await;
  Ok(())
}

/// Render the message list, marking favorites with a heart.
fn render(messages: &[Message], favorites: &Favorites) -> String {
  if messages.is_empty() {
    return "No messages.\n".to_string();
  }

  let mut out = String::from("Messages\n");
  for row in mark_favorites(messages, favorites) {
    let marker = if row.favorite { "♥" } else { " " };
    out.push_str(&format!("{marker} {}\n    {}\n", row.message.from, row.message.message));
  }
  out
}
