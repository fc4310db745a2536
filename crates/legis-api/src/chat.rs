//! Handler for `POST /chat`.
//!
//! Questions are always answered live: the bill and its text come from
//! OpenStates, the answer from the model. The exchange is then appended to
//! the store's chat history, best effort.

use axum::{Json, extract::State};
use legis_core::{bill::NewChatEntry, store::BillStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
  pub bill_id:  String,
  pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
  pub answer:     String,
  pub bill_title: String,
}

/// `POST /chat`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError>
where
  S: BillStore,
{
  if body.bill_id.trim().is_empty() {
    return Err(ApiError::BadRequest("bill_id must not be empty".into()));
  }
  if body.question.trim().is_empty() {
    return Err(ApiError::BadRequest("question must not be empty".into()));
  }

  let bill = state.bills.fetch_bill(&body.bill_id).await?;
  let text = state.bills.bill_text(&body.bill_id).await?;
  let answer = state
    .analyst
    .answer_question(&bill.title, text.as_str(), &body.question)
    .await?;
  info!(bill_id = %body.bill_id, "answered question");

  match NewChatEntry::new(body.bill_id, body.question, answer.clone()) {
    Ok(entry) => {
      if let Err(e) = state.store.record_chat(entry).await {
        warn!(error = %e, "could not record chat history");
      }
    }
    Err(e) => warn!(error = %e, "skipping chat history"),
  }

  Ok(Json(ChatResponse { answer, bill_title: bill.title }))
}
