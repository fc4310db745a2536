//! Handlers for `/bills` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/bills` | Optional `jurisdiction`, `session`, `subject`, `page`, `per_page` |
//! | `GET`  | `/bills/search` | `?query` required |
//! | `GET`  | `/bills/{id}` | Ids containing `/` must be percent-encoded |
//! | `GET`  | `/bills/{id}/text` | Always fetched live |
//! | `GET`  | `/bills/{id}/analysis` | Stored if analysed, otherwise computed |
//!
//! Store reads come first; a miss or a store failure falls back to
//! OpenStates. Every response carries the `source` it was served from.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use legis_core::{
  bill::{Analysis, Bill},
  store::{BillQuery, BillStore},
  transform::transform,
};
use legis_sources::{BillSearchParams, BillText, openstates::Pagination};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
  AppState,
  error::ApiError,
  lookup::{Lookup, Source},
};

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;
const SEARCH_LIMIT: u32 = 20;

// ─── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BillList {
  pub results:    Vec<Bill>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pagination: Option<Pagination>,
  pub source:     Source,
}

#[derive(Debug, Serialize)]
pub struct BillResponse {
  pub bill:   Bill,
  pub source: Source,
}

#[derive(Debug, Serialize)]
pub struct TextResponse {
  pub text:      String,
  pub available: bool,
  pub source:    Source,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
  pub summary:  String,
  pub keywords: Vec<String>,
  pub source:   Source,
}

/// Wrap raw OpenStates search results as never-persisted bills.
fn fetched(results: &[serde_json::Value]) -> Vec<Bill> {
  results.iter().map(|raw| Bill::unsaved(transform(raw))).collect()
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub jurisdiction: Option<String>,
  pub session:      Option<String>,
  pub subject:      Option<String>,
  pub page:         Option<u32>,
  pub per_page:     Option<u32>,
}

/// `GET /bills[?jurisdiction=...][&session=...][&subject=...][&page=...][&per_page=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<BillList>, ApiError>
where
  S: BillStore,
{
  let page = params.page.unwrap_or(1).max(1);
  let per_page = params
    .per_page
    .unwrap_or(DEFAULT_PER_PAGE)
    .clamp(1, MAX_PER_PAGE);

  let query = BillQuery {
    jurisdiction: params.jurisdiction.clone(),
    session:      params.session.clone(),
    subject:      params.subject.clone(),
    limit:        Some(per_page as usize),
    offset:       Some((page as usize - 1) * per_page as usize),
  };

  if let Lookup::Found(results) =
    Lookup::from_list("list bills", state.store.list_bills(&query).await)
  {
    return Ok(Json(BillList { results, pagination: None, source: Source::Database }));
  }

  let remote = state
    .bills
    .search_bills(&BillSearchParams {
      jurisdiction: params.jurisdiction,
      session: params.session,
      subject: params.subject,
      page,
      per_page,
      ..Default::default()
    })
    .await?;

  Ok(Json(BillList {
    results:    fetched(&remote.results),
    pagination: remote.pagination,
    source:     Source::Openstates,
  }))
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
  pub query: Option<String>,
}

/// `GET /bills/search?query=...`
pub async fn search<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<SearchParams>,
) -> Result<Json<BillList>, ApiError>
where
  S: BillStore,
{
  let text = params.query.unwrap_or_default();
  let text = text.trim();
  if text.is_empty() {
    return Err(ApiError::BadRequest("query must not be empty".into()));
  }

  if let Lookup::Found(results) = Lookup::from_list(
    "search bills",
    state.store.search_bills(text, SEARCH_LIMIT as usize).await,
  ) {
    return Ok(Json(BillList { results, pagination: None, source: Source::Database }));
  }

  let remote = state
    .bills
    .search_bills(&BillSearchParams {
      q: Some(text.to_owned()),
      per_page: SEARCH_LIMIT,
      ..Default::default()
    })
    .await?;

  Ok(Json(BillList {
    results:    fetched(&remote.results),
    pagination: remote.pagination,
    source:     Source::Openstates,
  }))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /bills/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<BillResponse>, ApiError>
where
  S: BillStore,
{
  if let Lookup::Found(bill) = Lookup::from_item("get bill", state.store.get_bill(&id).await) {
    return Ok(Json(BillResponse { bill, source: Source::Database }));
  }

  let details = state.bills.fetch_bill(&id).await?;
  Ok(Json(BillResponse { bill: Bill::unsaved(details), source: Source::Openstates }))
}

// ─── Text ────────────────────────────────────────────────────────────────────

/// `GET /bills/{id}/text`
pub async fn text<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<TextResponse>, ApiError>
where
  S: BillStore,
{
  let text = state.bills.bill_text(&id).await?;
  Ok(Json(TextResponse {
    available: text.is_available(),
    text:      text.as_str().to_owned(),
    source:    Source::Openstates,
  }))
}

// ─── Analysis ────────────────────────────────────────────────────────────────

/// `GET /bills/{id}/analysis`
///
/// A stored summary is returned as-is. Otherwise the analysis is computed
/// from the bill text and, if the bill is stored locally, persisted.
pub async fn analysis<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
) -> Result<Json<AnalysisResponse>, ApiError>
where
  S: BillStore,
{
  let stored = Lookup::from_item("get bill", state.store.get_bill(&id).await).found();

  if let Some(Bill { summary: Some(summary), keywords, .. }) = &stored {
    return Ok(Json(AnalysisResponse {
      summary:  summary.clone(),
      keywords: keywords.clone(),
      source:   Source::Database,
    }));
  }

  let title = match &stored {
    Some(bill) => bill.title().to_owned(),
    None => state.bills.fetch_bill(&id).await?.title,
  };

  let BillText::Available(text) = state.bills.bill_text(&id).await? else {
    return Err(ApiError::NotFound(BillText::UNAVAILABLE_MESSAGE.into()));
  };

  let Analysis { summary, keywords } = state.analyst.analyze_bill(&title, &text).await?;

  if stored.is_some() {
    let analysis = Analysis { summary: summary.clone(), keywords: keywords.clone() };
    match state.store.record_analysis(&id, &analysis).await {
      Ok(_) => info!(bill_id = %id, "analysis stored"),
      Err(e) => warn!(bill_id = %id, error = %e, "could not store analysis"),
    }
  }

  Ok(Json(AnalysisResponse { summary, keywords, source: Source::Openstates }))
}
