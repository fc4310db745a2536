//! [`Pipeline`]: fetch, transform, upsert and optionally analyse bills.

use std::time::Duration;

use legis_core::{
  bill::{Bill, BillDetails, NO_ABSTRACT},
  store::{BillStore, Upserted},
};
use legis_sources::{AnthropicClient, BillSearchParams, BillText, OpenStatesClient};
use tracing::{debug, error, info, warn};

use crate::{Error, Result, retry::RetryPolicy};

/// Titles at or below this many characters are never promoted to abstract.
const TITLE_AS_ABSTRACT_MIN_CHARS: usize = 10;

// ─── Options and outcomes ────────────────────────────────────────────────────

/// Pacing and retry settings for a pipeline run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
  pub page_size:  u32,
  /// Pause after every bill.
  pub bill_delay: Duration,
  /// Pause between search pages.
  pub page_delay: Duration,
  pub retry:      RetryPolicy,
}

impl Default for IngestOptions {
  fn default() -> Self {
    Self {
      page_size:  20,
      bill_delay: Duration::from_secs(1),
      page_delay: Duration::from_secs(3),
      retry:      RetryPolicy::default(),
    }
  }
}

/// Counters for a finished [`Pipeline::ingest`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
  /// Bills attempted, successful or not.
  pub processed: usize,
  pub failed:    usize,
  pub analyzed:  usize,
}

/// What happened to the optional analysis step of one bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
  /// Analysis was not requested.
  Skipped,
  /// The bill publishes no full text.
  TextUnavailable,
  Analyzed { keywords: Vec<String> },
  /// Text resolution, the model or the store failed. The bill itself is
  /// still persisted.
  Failed(String),
}

/// The result of [`Pipeline::process_one`].
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
  /// The bill as stored after this pass, analysis included.
  pub bill:     Bill,
  pub created:  bool,
  pub analysis: AnalysisOutcome,
}

/// Promote a long-enough title to abstract when the source gave none.
pub fn apply_abstract_fallback(details: &mut BillDetails) {
  if details.abstract_text == NO_ABSTRACT
    && details.title.chars().count() > TITLE_AS_ABSTRACT_MIN_CHARS
  {
    details.abstract_text = details.title.clone();
  }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Sequential ingestion over one store and one pair of API clients.
pub struct Pipeline<S> {
  store:   S,
  bills:   OpenStatesClient,
  analyst: Option<AnthropicClient>,
  options: IngestOptions,
}

impl<S: BillStore> Pipeline<S> {
  pub fn new(
    store: S,
    bills: OpenStatesClient,
    analyst: Option<AnthropicClient>,
    options: IngestOptions,
  ) -> Self {
    Self { store, bills, analyst, options }
  }

  pub fn store(&self) -> &S { &self.store }

  /// Ingest every bill of `jurisdiction` in `session`, up to `limit` bills.
  ///
  /// Failures of individual bills are counted and logged. A search page
  /// that still fails after retries aborts the run; bills already
  /// processed stay persisted.
  pub async fn ingest(
    &self,
    jurisdiction: &str,
    session: &str,
    limit: Option<usize>,
    analyze: bool,
  ) -> Result<IngestSummary> {
    if jurisdiction.trim().is_empty() {
      return Err(legis_core::Error::InvalidInput("jurisdiction must not be empty".into()).into());
    }
    if session.trim().is_empty() {
      return Err(legis_core::Error::InvalidInput("session must not be empty".into()).into());
    }
    if analyze && self.analyst.is_none() {
      return Err(
        legis_core::Error::InvalidInput("analysis requested without an Anthropic client".into())
          .into(),
      );
    }

    let reached = |n: usize| limit.is_some_and(|max| n >= max);
    let mut summary = IngestSummary::default();
    let mut page = 1;

    info!(jurisdiction, session, ?limit, analyze, "starting ingestion");

    while !reached(summary.processed) {
      let params = BillSearchParams {
        jurisdiction: Some(jurisdiction.to_owned()),
        session: Some(session.to_owned()),
        page,
        per_page: self.options.page_size,
        ..Default::default()
      };
      let results = self
        .options
        .retry
        .run("search", || self.bills.search_bills(&params))
        .await?;

      if results.results.is_empty() {
        debug!(page, "empty page; no more bills");
        break;
      }
      info!(page, count = results.results.len(), "fetched search page");

      for bill_id in results.bill_ids() {
        if reached(summary.processed) {
          break;
        }
        summary.processed += 1;

        match self.process_one(bill_id, analyze).await {
          Ok(outcome) => {
            if matches!(outcome.analysis, AnalysisOutcome::Analyzed { .. }) {
              summary.analyzed += 1;
            }
          }
          Err(e) => {
            summary.failed += 1;
            error!(bill_id, error = %e, "failed to process bill");
          }
        }
        tokio::time::sleep(self.options.bill_delay).await;
      }

      page += 1;
      if !reached(summary.processed) {
        tokio::time::sleep(self.options.page_delay).await;
      }
    }

    info!(
      processed = summary.processed,
      failed = summary.failed,
      analyzed = summary.analyzed,
      "ingestion finished"
    );
    Ok(summary)
  }

  /// Fetch one bill, upsert it and, if asked, analyse it.
  ///
  /// The upsert is committed before analysis starts; analysis errors are
  /// reported in [`ProcessOutcome::analysis`] rather than returned.
  pub async fn process_one(&self, bill_id: &str, analyze: bool) -> Result<ProcessOutcome> {
    let mut details = self
      .options
      .retry
      .run("bill", || self.bills.fetch_bill(bill_id))
      .await?;
    apply_abstract_fallback(&mut details);

    let Upserted { bill, created } =
      self.store.upsert_bill(details).await.map_err(Error::store)?;
    info!(bill_id, created, "stored bill");

    if !analyze {
      return Ok(ProcessOutcome { bill, created, analysis: AnalysisOutcome::Skipped });
    }

    let (bill, analysis) = match self.analyze(bill).await {
      Ok(done) => done,
      Err((bill, e)) => {
        warn!(bill_id, error = %e, "analysis failed");
        (bill, AnalysisOutcome::Failed(e.to_string()))
      }
    };
    Ok(ProcessOutcome { bill, created, analysis })
  }

  /// Resolve text, ask the model, persist. The bill is handed back on
  /// failure so the caller can still report it.
  async fn analyze(
    &self,
    bill: Bill,
  ) -> std::result::Result<(Bill, AnalysisOutcome), (Bill, Error)> {
    let Some(analyst) = &self.analyst else {
      return Ok((bill, AnalysisOutcome::Skipped));
    };

    let resolved = self
      .options
      .retry
      .run("text", || self.bills.bill_text(bill.id()))
      .await;
    let text = match resolved {
      Ok(BillText::Available(text)) => text,
      Ok(BillText::Unavailable) => {
        info!(bill_id = bill.id(), "bill text not available; skipping analysis");
        return Ok((bill, AnalysisOutcome::TextUnavailable));
      }
      Err(e) => return Err((bill, e.into())),
    };

    let analysis = match analyst.analyze_bill(bill.title(), &text).await {
      Ok(analysis) => analysis,
      Err(e) => return Err((bill, e.into())),
    };

    match self.store.record_analysis(bill.id(), &analysis).await {
      Ok(updated) => {
        info!(bill_id = bill.id(), keywords = analysis.keywords.len(), "analysis stored");
        Ok((updated, AnalysisOutcome::Analyzed { keywords: analysis.keywords }))
      }
      Err(e) => Err((bill, Error::store(e))),
    }
  }
}

#[cfg(test)]
mod tests {
  use legis_sources::{AnthropicConfig, OpenStatesConfig};
  use legis_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, body_string_contains, method, path, query_param},
  };

  use super::*;

  fn quick_options() -> IngestOptions {
    IngestOptions {
      page_size:  2,
      bill_delay: Duration::ZERO,
      page_delay: Duration::ZERO,
      retry:      RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1) },
    }
  }

  async fn pipeline(server: &MockServer, with_analyst: bool) -> Pipeline<SqliteStore> {
    let bills = OpenStatesClient::new(OpenStatesConfig {
      base_url: server.uri(),
      api_key:  "os-key".into(),
    })
    .unwrap();
    let analyst = with_analyst.then(|| {
      AnthropicClient::new(AnthropicConfig {
        base_url: server.uri(),
        api_key:  "sk-test".into(),
        model:    "test-model".into(),
      })
      .unwrap()
    });
    let store = SqliteStore::open_in_memory().await.unwrap();
    Pipeline::new(store, bills, analyst, quick_options())
  }

  fn bill_json(id: &str, title: &str, versions: Value) -> Value {
    json!({
      "id": id,
      "title": title,
      "identifier": "AB 1",
      "session": "2023-2024",
      "jurisdiction": { "name": "California", "id": "ocd-jurisdiction/country:us/state:ca/government" },
      "versions": versions
    })
  }

  async fn mount_bill(server: &MockServer, id: &str, body: Value) {
    Mock::given(method("GET"))
      .and(path(format!("/bills/{id}")))
      .respond_with(ResponseTemplate::new(200).set_body_json(body))
      .mount(server)
      .await;
  }

  async fn mount_page(server: &MockServer, page: u32, ids: &[&str]) {
    let results: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    Mock::given(method("GET"))
      .and(path("/bills"))
      .and(query_param("page", page.to_string()))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
      .mount(server)
      .await;
  }

  // ─── Abstract fallback ──────────────────────────────────────────────────

  #[test]
  fn long_title_replaces_placeholder_abstract() {
    let mut d = BillDetails {
      title: "Climate Resilience Act".into(),
      abstract_text: NO_ABSTRACT.into(),
      ..Default::default()
    };
    apply_abstract_fallback(&mut d);
    assert_eq!(d.abstract_text, "Climate Resilience Act");
  }

  #[test]
  fn short_title_or_real_abstract_is_left_alone() {
    let mut short = BillDetails {
      title: "Ten chars!".into(),
      abstract_text: NO_ABSTRACT.into(),
      ..Default::default()
    };
    apply_abstract_fallback(&mut short);
    assert_eq!(short.abstract_text, NO_ABSTRACT);

    let mut real = BillDetails {
      title: "A rather long bill title".into(),
      abstract_text: "Real abstract.".into(),
      ..Default::default()
    };
    apply_abstract_fallback(&mut real);
    assert_eq!(real.abstract_text, "Real abstract.");
  }

  // ─── process_one ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn retries_rate_limit_then_persists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/bills/ocd-bill/1"))
      .respond_with(ResponseTemplate::new(429))
      .up_to_n_times(2)
      .expect(2)
      .mount(&server)
      .await;
    mount_bill(&server, "ocd-bill/1", bill_json("ocd-bill/1", "Water Act", json!([]))).await;

    let p = pipeline(&server, false).await;
    let outcome = p.process_one("ocd-bill/1", false).await.unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.analysis, AnalysisOutcome::Skipped);
    assert!(p.store().get_bill("ocd-bill/1").await.unwrap().is_some());
  }

  #[tokio::test]
  async fn exhausted_retries_fail_the_bill() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/bills/ocd-bill/1"))
      .respond_with(ResponseTemplate::new(429))
      .expect(3)
      .mount(&server)
      .await;

    let p = pipeline(&server, false).await;
    let err = p.process_one("ocd-bill/1", false).await.unwrap_err();
    assert!(matches!(err, Error::Source(ref e) if e.is_rate_limited()));
    assert!(p.store().get_bill("ocd-bill/1").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn stored_abstract_uses_title_fallback() {
    let server = MockServer::start().await;
    mount_bill(
      &server,
      "ocd-bill/1",
      bill_json("ocd-bill/1", "Climate Resilience Act", json!([])),
    )
    .await;

    let p = pipeline(&server, false).await;
    let outcome = p.process_one("ocd-bill/1", false).await.unwrap();
    assert_eq!(outcome.bill.details.abstract_text, "Climate Resilience Act");
  }

  #[tokio::test]
  async fn missing_text_skips_analysis() {
    let server = MockServer::start().await;
    mount_bill(&server, "ocd-bill/1", bill_json("ocd-bill/1", "Water Act", json!([]))).await;
    Mock::given(method("POST"))
      .and(path("/v1/messages"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;

    let p = pipeline(&server, true).await;
    let outcome = p.process_one("ocd-bill/1", true).await.unwrap();
    assert_eq!(outcome.analysis, AnalysisOutcome::TextUnavailable);
    assert!(outcome.bill.summary.is_none());
  }

  #[tokio::test]
  async fn analysis_is_stored_with_keywords() {
    let server = MockServer::start().await;
    let versions = json!([{ "url": format!("{}/text/1", server.uri()), "note": "Introduced" }]);
    mount_bill(&server, "ocd-bill/1", bill_json("ocd-bill/1", "Water Act", versions)).await;
    Mock::given(method("GET"))
      .and(path("/text/1"))
      .respond_with(ResponseTemplate::new(200).set_body_string("Section 1. Water."))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(body_partial_json(json!({ "max_tokens": 1000 })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "content": [{ "type": "text", "text": "About water." }]
      })))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(body_partial_json(json!({ "max_tokens": 200 })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "content": [{ "type": "text", "text": "water, , drought" }]
      })))
      .mount(&server)
      .await;

    let p = pipeline(&server, true).await;
    let outcome = p.process_one("ocd-bill/1", true).await.unwrap();

    assert_eq!(
      outcome.analysis,
      AnalysisOutcome::Analyzed { keywords: vec!["water".into(), "drought".into()] }
    );
    assert_eq!(outcome.bill.summary.as_deref(), Some("About water."));
    assert_eq!(outcome.bill.keywords, vec!["water".to_string(), "drought".to_string()]);
  }

  #[tokio::test]
  async fn analysis_failure_keeps_the_bill() {
    let server = MockServer::start().await;
    let versions = json!([{ "url": format!("{}/text/1", server.uri()), "note": "" }]);
    mount_bill(&server, "ocd-bill/1", bill_json("ocd-bill/1", "Water Act", versions)).await;
    Mock::given(method("GET"))
      .and(path("/text/1"))
      .respond_with(ResponseTemplate::new(200).set_body_string("text"))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let p = pipeline(&server, true).await;
    let outcome = p.process_one("ocd-bill/1", true).await.unwrap();

    assert!(matches!(outcome.analysis, AnalysisOutcome::Failed(_)));
    let stored = p.store().get_bill("ocd-bill/1").await.unwrap().unwrap();
    assert!(stored.summary.is_none());
  }

  // ─── ingest ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn ingest_rejects_empty_inputs() {
    let server = MockServer::start().await;
    let p = pipeline(&server, false).await;

    assert!(matches!(
      p.ingest("", "2023", None, false).await,
      Err(Error::Core(legis_core::Error::InvalidInput(_)))
    ));
    assert!(matches!(
      p.ingest("ca", "  ", None, false).await,
      Err(Error::Core(legis_core::Error::InvalidInput(_)))
    ));
    assert!(matches!(
      p.ingest("ca", "2023", None, true).await,
      Err(Error::Core(legis_core::Error::InvalidInput(_)))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn ingest_pages_until_empty_and_counts_failures() {
    let server = MockServer::start().await;
    mount_page(&server, 1, &["ocd-bill/1", "ocd-bill/2"]).await;
    mount_page(&server, 2, &["ocd-bill/3"]).await;
    mount_page(&server, 3, &[]).await;
    mount_bill(&server, "ocd-bill/1", bill_json("ocd-bill/1", "One", json!([]))).await;
    mount_bill(&server, "ocd-bill/3", bill_json("ocd-bill/3", "Three", json!([]))).await;
    Mock::given(method("GET"))
      .and(path("/bills/ocd-bill/2"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let p = pipeline(&server, false).await;
    let summary = p.ingest("ca", "2023-2024", None, false).await.unwrap();

    assert_eq!(summary, IngestSummary { processed: 3, failed: 1, analyzed: 0 });
    let stored = p.store().list_bills(&Default::default()).await.unwrap();
    assert_eq!(stored.len(), 2);
  }

  #[tokio::test]
  async fn ingest_counts_analyses_and_survives_a_model_failure() {
    let server = MockServer::start().await;
    mount_page(&server, 1, &["ocd-bill/1", "ocd-bill/2"]).await;
    mount_page(&server, 2, &[]).await;
    for (id, title, slug, body) in [
      ("ocd-bill/1", "Dam Safety Act", "dams", "Dams clause."),
      ("ocd-bill/2", "Water Act", "water", "Aquifer clause."),
    ] {
      let versions = json!([{ "url": format!("{}/text/{slug}", server.uri()), "note": "" }]);
      mount_bill(&server, id, bill_json(id, title, versions)).await;
      Mock::given(method("GET"))
        .and(path(format!("/text/{slug}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    }
    Mock::given(method("POST"))
      .and(body_string_contains("Dams clause."))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(body_string_contains("Aquifer clause."))
      .and(body_partial_json(json!({ "max_tokens": 1000 })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "content": [{ "type": "text", "text": "About aquifers." }]
      })))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(body_string_contains("Aquifer clause."))
      .and(body_partial_json(json!({ "max_tokens": 200 })))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "content": [{ "type": "text", "text": "water, aquifer" }]
      })))
      .mount(&server)
      .await;

    let p = pipeline(&server, true).await;
    let summary = p.ingest("ca", "2023-2024", None, true).await.unwrap();

    assert_eq!(summary, IngestSummary { processed: 2, failed: 0, analyzed: 1 });

    let first = p.store().get_bill("ocd-bill/1").await.unwrap().unwrap();
    assert!(first.summary.is_none());
    assert!(first.keywords.is_empty());

    let second = p.store().get_bill("ocd-bill/2").await.unwrap().unwrap();
    assert_eq!(second.summary.as_deref(), Some("About aquifers."));
    assert_eq!(second.keywords, vec!["water".to_string(), "aquifer".to_string()]);
  }

  #[tokio::test]
  async fn ingest_stops_at_limit() {
    let server = MockServer::start().await;
    mount_page(&server, 1, &["ocd-bill/1", "ocd-bill/2"]).await;
    Mock::given(method("GET"))
      .and(path("/bills"))
      .and(query_param("page", "2"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
      .expect(0)
      .mount(&server)
      .await;
    mount_bill(&server, "ocd-bill/1", bill_json("ocd-bill/1", "One", json!([]))).await;
    mount_bill(&server, "ocd-bill/2", bill_json("ocd-bill/2", "Two", json!([]))).await;

    let p = pipeline(&server, false).await;
    let summary = p.ingest("ca", "2023-2024", Some(1), false).await.unwrap();

    assert_eq!(summary.processed, 1);
    assert!(p.store().get_bill("ocd-bill/2").await.unwrap().is_none());
  }

  #[tokio::test]
  async fn failing_page_aborts_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/bills"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let p = pipeline(&server, false).await;
    assert!(matches!(
      p.ingest("ca", "2023-2024", None, false).await,
      Err(Error::Source(_))
    ));
  }
}
