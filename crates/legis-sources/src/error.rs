//! Error type for `legis-sources`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The remote answered `429 Too Many Requests`.
  #[error("rate limited by {url}")]
  RateLimited { url: String },

  #[error("{url} returned {status}")]
  Status { url: String, status: StatusCode },

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("missing credential: {0}")]
  MissingCredential(&'static str),

  #[error("model returned no text")]
  EmptyCompletion,
}

impl Error {
  pub fn is_rate_limited(&self) -> bool {
    matches!(self, Error::RateLimited { .. })
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Error::Status { status, .. } if *status == StatusCode::NOT_FOUND)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Map a non-success status to an [`Error`].
pub(crate) fn check_status(url: &str, status: StatusCode) -> Result<()> {
  if status == StatusCode::TOO_MANY_REQUESTS {
    return Err(Error::RateLimited { url: url.to_owned() });
  }
  if !status.is_success() {
    return Err(Error::Status { url: url.to_owned(), status });
  }
  Ok(())
}
