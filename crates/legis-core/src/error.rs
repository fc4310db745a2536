//! Error types for `legis-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("bill not found: {0}")]
  BillNotFound(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
