//! Client for the Anthropic Messages API, specialised to bill analysis.

use std::time::Duration;

use legis_core::bill::Analysis;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result, error::check_status};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
const API_VERSION: &str = "2023-06-01";

/// Bill text beyond this many characters is cut before prompting.
pub const MAX_TEXT_CHARS: usize = 100_000;

/// Connection settings for the Anthropic API.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicConfig {
  pub base_url: String,
  pub api_key:  String,
  #[serde(default = "default_model")]
  pub model:    String,
}

fn default_model() -> String { DEFAULT_MODEL.to_owned() }

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
  model:       &'a str,
  max_tokens:  u32,
  temperature: f32,
  system:      &'a str,
  messages:    [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
  role:    &'static str,
  content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
  #[serde(default)]
  content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  kind: String,
  #[serde(default)]
  text: String,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// The first `max` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
  match text.char_indices().nth(max) {
    Some((idx, _)) => &text[..idx],
    None => text,
  }
}

/// Split a comma-delimited model reply into trimmed, non-empty keywords.
pub fn parse_keywords(reply: &str) -> Vec<String> {
  reply
    .split(',')
    .map(str::trim)
    .filter(|k| !k.is_empty())
    .map(str::to_owned)
    .collect()
}

fn bill_block(title: &str, text: &str) -> String {
  format!(
    "Bill Title: {title}\n\nBill Text:\n{}",
    truncate_chars(text, MAX_TEXT_CHARS)
  )
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async HTTP client for the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicClient {
  client: Client,
  config: AnthropicConfig,
}

impl AnthropicClient {
  pub fn new(config: AnthropicConfig) -> Result<Self> {
    if config.api_key.trim().is_empty() {
      return Err(Error::MissingCredential("Anthropic API key"));
    }
    let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
    Ok(Self { client, config })
  }

  /// Send a single-turn conversation and return the first text block.
  pub async fn complete(
    &self,
    system: &str,
    prompt: &str,
    max_tokens: u32,
    temperature: f32,
  ) -> Result<String> {
    let url = format!(
      "{}/v1/messages",
      self.config.base_url.trim_end_matches('/')
    );
    let body = MessagesRequest {
      model: &self.config.model,
      max_tokens,
      temperature,
      system,
      messages: [Message { role: "user", content: prompt }],
    };

    debug!(model = %self.config.model, max_tokens, "anthropic request");
    let resp = self
      .client
      .post(&url)
      .header("x-api-key", &self.config.api_key)
      .header("anthropic-version", API_VERSION)
      .json(&body)
      .send()
      .await?;

    check_status(&url, resp.status())?;
    let reply: MessagesResponse = resp.json().await?;
    reply
      .content
      .into_iter()
      .find(|block| block.kind == "text")
      .map(|block| block.text)
      .ok_or(Error::EmptyCompletion)
  }

  /// A few paragraphs explaining the bill to a general reader.
  pub async fn summarize(&self, title: &str, text: &str) -> Result<String> {
    let prompt = format!(
      "Please provide a concise summary of the following bill. Focus on the \
       main provisions, objectives and potential impacts.\n\n{}\n\n\
       Please provide a summary in 3-5 paragraphs that would help a citizen \
       understand what this bill does.",
      bill_block(title, text)
    );
    self
      .complete(
        "You are an expert legislative analyst who provides clear, concise, \
         and accurate summaries of bills.",
        &prompt,
        1000,
        0.2,
      )
      .await
  }

  /// Keywords that categorise the bill.
  pub async fn extract_keywords(&self, title: &str, text: &str) -> Result<Vec<String>> {
    let prompt = format!(
      "Please extract 5-10 relevant keywords or key phrases from the following \
       bill. These keywords should help categorize the bill and make it \
       discoverable in searches.\n\n{}\n\n\
       Please provide ONLY a list of keywords separated by commas, with no \
       additional text or explanation.",
      bill_block(title, text)
    );
    let reply = self
      .complete(
        "You are an expert legislative analyst who extracts relevant keywords \
         from bills.",
        &prompt,
        200,
        0.2,
      )
      .await?;
    Ok(parse_keywords(&reply))
  }

  /// Summary and keywords, as two sequential requests.
  pub async fn analyze_bill(&self, title: &str, text: &str) -> Result<Analysis> {
    let summary = self.summarize(title, text).await?;
    let keywords = self.extract_keywords(title, text).await?;
    Ok(Analysis { summary, keywords })
  }

  /// Answer a free-form question grounded in the bill text.
  pub async fn answer_question(
    &self,
    title: &str,
    text: &str,
    question: &str,
  ) -> Result<String> {
    let prompt = format!(
      "Please answer the following question about this bill.\n\n{}\n\n\
       User Question: {question}\n\n\
       Please provide a clear, accurate, and helpful answer based on the \
       bill's content.",
      bill_block(title, text)
    );
    self
      .complete(
        "You are an expert legislative analyst who helps users understand \
         bills by answering their questions accurately and clearly.",
        &prompt,
        1500,
        0.3,
      )
      .await
  }
}
