//! JSON REST API for the legislative-research backend.
//!
//! Exposes an axum [`Router`] backed by any [`legis_core::store::BillStore`]
//! plus the two external API clients. CORS, tracing and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = legis_api::router(state).layer(TraceLayer::new_for_http());
//! ```

pub mod bills;
pub mod chat;
pub mod error;
pub mod lookup;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, post},
};
use legis_core::store::BillStore;
use legis_sources::{AnthropicClient, OpenStatesClient};
use serde_json::{Value, json};

pub use error::ApiError;
pub use lookup::{Lookup, Source};

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:   Arc<S>,
  pub bills:   OpenStatesClient,
  pub analyst: AnthropicClient,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The `/api` routes alone, for nesting into a larger router.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: BillStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/bills", get(bills::list::<S>))
    .route("/bills/search", get(bills::search::<S>))
    .route("/bills/{id}", get(bills::get_one::<S>))
    .route("/bills/{id}/text", get(bills::text::<S>))
    .route("/bills/{id}/analysis", get(bills::analysis::<S>))
    .route("/chat", post(chat::handler::<S>))
    .with_state(state)
}

/// The complete application: a liveness route at `/` and the API at `/api`.
pub fn router<S>(state: AppState<S>) -> Router<()>
where
  S: BillStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/", get(root))
    .nest("/api", api_router(state))
}

/// `GET /`
async fn root() -> Json<Value> {
  Json(json!({
    "message": "Legislative research API",
    "status": "online"
  }))
}

// ─── Integration tests ───────────────────────────────────────────────────────
