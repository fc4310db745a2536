//! Client for the OpenStates v3 bill API.

use std::time::Duration;

use legis_core::{
  bill::{BillDetails, latest_version},
  transform::{transform, versions},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result, error::check_status};

pub const DEFAULT_BASE_URL: &str = "https://v3.openstates.org";

/// Related collections requested with every bill detail fetch.
const DETAIL_INCLUDES: &[&str] =
  &["sponsorships", "abstracts", "actions", "documents", "versions", "votes"];

/// Connection settings for the OpenStates API.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenStatesConfig {
  pub base_url: String,
  pub api_key:  String,
}

// ─── Request / response shapes ───────────────────────────────────────────────

/// Query parameters for `GET /bills`.
#[derive(Debug, Clone, Serialize)]
pub struct BillSearchParams {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub q:            Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub jurisdiction: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub session:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub subject:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sponsor:      Option<String>,
  pub page:         u32,
  pub per_page:     u32,
}

impl Default for BillSearchParams {
  fn default() -> Self {
    Self {
      q:            None,
      jurisdiction: None,
      session:      None,
      subject:      None,
      sponsor:      None,
      page:         1,
      per_page:     20,
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
  #[serde(default)]
  pub per_page:    u32,
  #[serde(default)]
  pub page:        u32,
  #[serde(default)]
  pub max_page:    u32,
  #[serde(default)]
  pub total_items: u32,
}

/// One page of `GET /bills` results. Bills are left as raw JSON; run them
/// through [`transform`] to get [`BillDetails`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchPage {
  #[serde(default)]
  pub results:    Vec<Value>,
  #[serde(default)]
  pub pagination: Option<Pagination>,
}

impl SearchPage {
  /// Ids of the bills on this page, skipping entries without one.
  pub fn bill_ids(&self) -> impl Iterator<Item = &str> {
    self
      .results
      .iter()
      .filter_map(|b| b.get("id").and_then(Value::as_str))
      .filter(|id| !id.is_empty())
  }
}

/// The full text of a bill, or the fact that none is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillText {
  Available(String),
  Unavailable,
}

impl BillText {
  pub const UNAVAILABLE_MESSAGE: &str = "Bill text not available";

  pub fn is_available(&self) -> bool { matches!(self, Self::Available(_)) }

  /// The text itself, or a human-readable placeholder.
  pub fn as_str(&self) -> &str {
    match self {
      Self::Available(text) => text,
      Self::Unavailable => Self::UNAVAILABLE_MESSAGE,
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async HTTP client for the OpenStates API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OpenStatesClient {
  client: Client,
  config: OpenStatesConfig,
}

impl OpenStatesClient {
  pub fn new(config: OpenStatesConfig) -> Result<Self> {
    if config.api_key.trim().is_empty() {
      return Err(Error::MissingCredential("OpenStates API key"));
    }
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  async fn get_json<T, Q>(&self, url: &str, query: &Q) -> Result<T>
  where
    T: serde::de::DeserializeOwned,
    Q: Serialize + ?Sized,
  {
    debug!(url, "openstates request");
    let resp = self
      .client
      .get(url)
      .header("X-API-KEY", &self.config.api_key)
      .header("Accept", "application/json")
      .query(query)
      .send()
      .await?;

    check_status(url, resp.status())?;
    Ok(resp.json().await?)
  }

  /// `GET /bills` with the given filters.
  pub async fn search_bills(&self, params: &BillSearchParams) -> Result<SearchPage> {
    self.get_json(&self.url("/bills"), params).await
  }

  /// `GET /bills/{id}` as raw JSON, with related collections included.
  pub async fn get_bill(&self, bill_id: &str) -> Result<Value> {
    let includes: Vec<(&str, &str)> =
      DETAIL_INCLUDES.iter().map(|inc| ("include", *inc)).collect();
    self
      .get_json(&self.url(&format!("/bills/{bill_id}")), &includes)
      .await
  }

  /// Fetch a bill and transform it into [`BillDetails`].
  pub async fn fetch_bill(&self, bill_id: &str) -> Result<BillDetails> {
    Ok(transform(&self.get_bill(bill_id).await?))
  }

  /// Resolve the full text of the bill's current version.
  ///
  /// No content request is made when the bill lists no versions, or when the
  /// chosen version has no URL. The body is returned verbatim, whatever its
  /// format.
  pub async fn bill_text(&self, bill_id: &str) -> Result<BillText> {
    let detail = self.get_bill(bill_id).await?;
    let versions = versions(&detail);

    let Some(version) = latest_version(&versions) else {
      return Ok(BillText::Unavailable);
    };
    if version.url.is_empty() {
      return Ok(BillText::Unavailable);
    }

    debug!(bill_id, url = %version.url, "fetching bill text");
    let resp = self.client.get(&version.url).send().await?;
    check_status(&version.url, resp.status())?;
    Ok(BillText::Available(resp.text().await?))
  }
}
