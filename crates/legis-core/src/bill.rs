//! Bill types: the unit of data flowing from the bill source into the store.
//!
//! [`BillDetails`] holds everything derived from the source API and is
//! overwritten wholesale on every ingestion pass. [`Bill`] is the persisted
//! record: the details plus the fields the store accumulates over time
//! (summary, analysis text, keywords).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Placeholder abstract used when the source provides none.
pub const NO_ABSTRACT: &str = "No abstract available";

// ─── Source-derived parts ────────────────────────────────────────────────────

/// The governing body a bill belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
  pub name: String,
  pub id:   String,
}

/// A legislator or committee sponsoring a bill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sponsor {
  pub name: String,
  pub id:   String,
}

/// A legislative action taken on a bill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
  pub date:           String,
  pub description:    String,
  #[serde(default)]
  pub classification: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub url:  String,
  pub note: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
  pub yes:     u32,
  pub no:      u32,
  pub abstain: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
  pub date:   String,
  pub result: String,
  #[serde(default)]
  pub counts: VoteCounts,
}

/// One published text of a bill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
  pub url:  String,
  pub note: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date: Option<String>,
}

/// Pick the version whose text should be treated as current.
///
/// When the first version carries a date, the latest date wins and ties keep
/// the earliest-listed version. Otherwise the first listed version is used.
pub fn latest_version(versions: &[Version]) -> Option<&Version> {
  let first = versions.first()?;
  if first.date.is_none() {
    return Some(first);
  }

  let date_of = |v: &Version| v.date.clone().unwrap_or_default();
  Some(versions.iter().skip(1).fold(first, |best, v| {
    if date_of(v) > date_of(best) { v } else { best }
  }))
}

// ─── Bill ────────────────────────────────────────────────────────────────────

/// Every field of a bill that is derived from the bill source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillDetails {
  pub id:              String,
  pub title:           String,
  pub identifier:      String,
  #[serde(default)]
  pub classification:  Vec<String>,
  #[serde(default)]
  pub subject:         Vec<String>,
  #[serde(rename = "abstract")]
  pub abstract_text:   String,
  pub session:         String,
  pub jurisdiction:    Jurisdiction,
  pub primary_sponsor: Option<Sponsor>,
  #[serde(default)]
  pub actions:         Vec<Action>,
  #[serde(default)]
  pub documents:       Vec<Document>,
  #[serde(default)]
  pub votes:           Vec<Vote>,
  #[serde(default)]
  pub versions:        Vec<Version>,
}

/// A bill as stored, with the fields accumulated by analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
  #[serde(flatten)]
  pub details:     BillDetails,
  /// Set by the store on every upsert.
  pub updated_at:  DateTime<Utc>,
  pub summary:     Option<String>,
  pub ai_analysis: Option<String>,
  #[serde(default)]
  pub keywords:    Vec<String>,
}

impl Bill {
  /// Wrap details that were never persisted (e.g. a live source response).
  pub fn unsaved(details: BillDetails) -> Self {
    Self {
      details,
      updated_at: Utc::now(),
      summary: None,
      ai_analysis: None,
      keywords: Vec::new(),
    }
  }

  pub fn id(&self) -> &str { &self.details.id }

  pub fn title(&self) -> &str { &self.details.title }
}

// ─── Analysis ────────────────────────────────────────────────────────────────

/// A generated summary plus extracted keywords for one bill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
  pub summary:  String,
  pub keywords: Vec<String>,
}

/// A keyword label shared between bills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
  pub id:   i64,
  pub name: String,
}

// ─── Chat history ────────────────────────────────────────────────────────────

/// Input for [`BillStore::record_chat`](crate::store::BillStore::record_chat).
#[derive(Debug, Clone)]
pub struct NewChatEntry {
  pub bill_id:  String,
  pub question: String,
  pub answer:   String,
}

impl NewChatEntry {
  pub fn new(
    bill_id: impl Into<String>,
    question: impl Into<String>,
    answer: impl Into<String>,
  ) -> Result<Self> {
    let entry = Self {
      bill_id:  bill_id.into(),
      question: question.into(),
      answer:   answer.into(),
    };
    if entry.bill_id.trim().is_empty() {
      return Err(Error::InvalidInput("chat entry needs a bill id".into()));
    }
    Ok(entry)
  }
}

/// An append-only record of a question asked about a bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
  pub id:         i64,
  pub bill_id:    String,
  pub question:   String,
  pub answer:     String,
  pub created_at: DateTime<Utc>,
}
