//! Local-store-first lookups and the `source` tag on responses.

use std::fmt::Display;

use serde::Serialize;
use tracing::warn;

/// Where a response's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
  Database,
  Openstates,
}

/// The outcome of consulting the local store before the bill source.
#[derive(Debug)]
pub enum Lookup<T> {
  Found(T),
  /// The store answered, but had nothing.
  Missing,
  /// The store failed; treated like a miss.
  Unavailable,
}

impl<T> Lookup<T> {
  /// Classify a single-item store read.
  pub fn from_item<E: Display>(what: &str, result: Result<Option<T>, E>) -> Self {
    match result {
      Ok(Some(item)) => Lookup::Found(item),
      Ok(None) => Lookup::Missing,
      Err(e) => {
        warn!(what, error = %e, "store lookup failed; falling back");
        Lookup::Unavailable
      }
    }
  }

  pub fn found(self) -> Option<T> {
    match self {
      Lookup::Found(item) => Some(item),
      Lookup::Missing | Lookup::Unavailable => None,
    }
  }
}

impl<T> Lookup<Vec<T>> {
  /// Classify a list read; an empty list counts as a miss.
  pub fn from_list<E: Display>(what: &str, result: Result<Vec<T>, E>) -> Self {
    Lookup::from_item(what, result.map(|items| (!items.is_empty()).then_some(items)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn source_serialises_lowercase() {
    assert_eq!(serde_json::to_string(&Source::Database).unwrap(), "\"database\"");
    assert_eq!(serde_json::to_string(&Source::Openstates).unwrap(), "\"openstates\"");
  }

  #[test]
  fn empty_list_is_a_miss() {
    let hit = Lookup::from_list("t", Ok::<_, String>(vec![1]));
    assert!(matches!(hit, Lookup::Found(ref v) if v == &[1]));
    assert!(matches!(Lookup::from_list("t", Ok::<Vec<u8>, String>(vec![])), Lookup::Missing));
    assert!(matches!(
      Lookup::<Vec<u8>>::from_list("t", Err("disk on fire")),
      Lookup::Unavailable
    ));
  }
}
