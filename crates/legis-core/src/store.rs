//! The `BillStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `legis-store-sqlite`).
//! Higher layers (`legis-ingest`, `legis-api`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::bill::{Analysis, Bill, BillDetails, ChatEntry, Keyword, NewChatEntry};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`BillStore::list_bills`].
#[derive(Debug, Clone, Default)]
pub struct BillQuery {
  /// Jurisdiction code (`ca`), name (`California`) or full OCD id.
  pub jurisdiction: Option<String>,
  pub session:      Option<String>,
  /// Bills must carry this subject tag exactly.
  pub subject:      Option<String>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

/// The result of [`BillStore::upsert_bill`].
#[derive(Debug, Clone)]
pub struct Upserted {
  pub bill:    Bill,
  /// `true` if no bill with this id existed before the call.
  pub created: bool,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a bill store backend.
///
/// Bills are keyed by the source-assigned id. Upserts replace the
/// source-derived fields only; summaries, analysis text and keyword
/// associations survive re-ingestion. Nothing is ever deleted.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait BillStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Bills ─────────────────────────────────────────────────────────────

  /// Insert the bill if its id is unknown, otherwise overwrite its
  /// source-derived fields. `updated_at` is set by the store.
  fn upsert_bill(
    &self,
    details: BillDetails,
  ) -> impl Future<Output = Result<Upserted, Self::Error>> + Send + '_;

  /// Retrieve a bill by id. Returns `None` if not found.
  fn get_bill<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Bill>, Self::Error>> + Send + 'a;

  /// List bills matching `query`, most recently updated first.
  fn list_bills<'a>(
    &'a self,
    query: &'a BillQuery,
  ) -> impl Future<Output = Result<Vec<Bill>, Self::Error>> + Send + 'a;

  /// Case-insensitive partial match of `text` against title, abstract and
  /// identifier.
  fn search_bills<'a>(
    &'a self,
    text: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Bill>, Self::Error>> + Send + 'a;

  // ── Analysis ──────────────────────────────────────────────────────────

  /// Overwrite the bill's summary and add each keyword to its associations.
  ///
  /// Keywords are created on first use. Adding a keyword the bill already
  /// carries is a no-op. Returns an error if the bill does not exist.
  fn record_analysis<'a>(
    &'a self,
    bill_id: &'a str,
    analysis: &'a Analysis,
  ) -> impl Future<Output = Result<Bill, Self::Error>> + Send + 'a;

  /// All keywords known to the store, in creation order.
  fn list_keywords(
    &self,
  ) -> impl Future<Output = Result<Vec<Keyword>, Self::Error>> + Send + '_;

  // ── Chat history ──────────────────────────────────────────────────────

  /// Append a question/answer pair. `created_at` is set by the store.
  fn record_chat(
    &self,
    entry: NewChatEntry,
  ) -> impl Future<Output = Result<ChatEntry, Self::Error>> + Send + '_;

  /// All chat entries for a bill, oldest first.
  fn chat_history<'a>(
    &'a self,
    bill_id: &'a str,
  ) -> impl Future<Output = Result<Vec<ChatEntry>, Self::Error>> + Send + 'a;
}
