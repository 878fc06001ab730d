//! Wire records decoded from (and encoded to) the sample endpoints.
//!
//! Every record is a flat value: decoded from one response, handed to the
//! caller, dropped when the caller is done with it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

// ─── Messages ────────────────────────────────────────────────────────────────

/// A single message in the user's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub id:      i64,
  pub from:    String,
  pub message: String,
}

/// The set of message ids the user has marked as favorite.
///
/// Serialised as a plain JSON array; duplicate ids collapse on decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites(HashSet<i64>);

impl Favorites {
  pub fn contains(&self, id: i64) -> bool { self.0.contains(&id) }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl FromIterator<i64> for Favorites {
  fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// A message paired with whether it is one of the user's favorites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow<'a> {
  pub message:  &'a Message,
  pub favorite: bool,
}

/// Pair every message with its favorite flag, preserving message order.
pub fn mark_favorites<'a>(
  messages: &'a [Message],
  favorites: &Favorites,
) -> Vec<MessageRow<'a>> {
  messages
    .iter()
    .map(|message| MessageRow {
      message,
      favorite: favorites.contains(message.id),
    })
    .collect()
}

// ─── Upload payload ──────────────────────────────────────────────────────────

/// A named entity with a list of associated tags: an actor and the films
/// they appeared in.
///
/// Unknown fields in a decoded response (a server-assigned `id`, `createdAt`)
/// are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieStar {
  pub name:   String,
  pub movies: Vec<String>,
}

impl MovieStar {
  pub fn new(name: impl Into<String>, movies: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self {
      name:   name.into(),
      movies: movies.into_iter().map(Into::into).collect(),
    }
  }
}
