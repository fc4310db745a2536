//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 strings so they sort
//! lexically. List-valued bill fields are stored as compact JSON arrays.

use chrono::{DateTime, SecondsFormat, Utc};
use legis_core::bill::{Bill, BillDetails, ChatEntry, Jurisdiction, Sponsor};
use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// The column values written by an upsert, in `bills` column order.
pub struct BillRow {
  pub id:                   String,
  pub title:                String,
  pub identifier:           String,
  pub classification:       String,
  pub subject:              String,
  pub abstract_text:        String,
  pub session:              String,
  pub jurisdiction_name:    String,
  pub jurisdiction_id:      String,
  pub primary_sponsor_name: Option<String>,
  pub primary_sponsor_id:   Option<String>,
  pub actions:              String,
  pub documents:            String,
  pub votes:                String,
  pub versions:             String,
  pub updated_at:           String,
}

impl BillRow {
  pub fn encode(details: BillDetails, updated_at: DateTime<Utc>) -> Result<Self> {
    let (sponsor_name, sponsor_id) = match details.primary_sponsor {
      Some(Sponsor { name, id }) => (Some(name), Some(id)),
      None => (None, None),
    };

    Ok(Self {
      classification:       encode_json(&details.classification)?,
      subject:              encode_json(&details.subject)?,
      actions:              encode_json(&details.actions)?,
      documents:            encode_json(&details.documents)?,
      votes:                encode_json(&details.votes)?,
      versions:             encode_json(&details.versions)?,
      id:                   details.id,
      title:                details.title,
      identifier:           details.identifier,
      abstract_text:        details.abstract_text,
      session:              details.session,
      jurisdiction_name:    details.jurisdiction.name,
      jurisdiction_id:      details.jurisdiction.id,
      primary_sponsor_name: sponsor_name,
      primary_sponsor_id:   sponsor_id,
      updated_at:           encode_dt(updated_at),
    })
  }
}

/// Column list matching [`RawBill::from_row`].
pub const BILL_COLUMNS: &str = "
  b.id, b.title, b.identifier, b.classification, b.subject, b.abstract,
  b.session, b.jurisdiction_name, b.jurisdiction_id,
  b.primary_sponsor_name, b.primary_sponsor_id,
  b.actions, b.documents, b.votes, b.versions,
  b.updated_at, b.summary, b.ai_analysis";

/// Raw strings read directly from a `bills` row.
pub struct RawBill {
  pub id:                   String,
  pub title:                String,
  pub identifier:           String,
  pub classification:       String,
  pub subject:              String,
  pub abstract_text:        String,
  pub session:              String,
  pub jurisdiction_name:    String,
  pub jurisdiction_id:      String,
  pub primary_sponsor_name: Option<String>,
  pub primary_sponsor_id:   Option<String>,
  pub actions:              String,
  pub documents:            String,
  pub votes:                String,
  pub versions:             String,
  pub updated_at:           String,
  pub summary:              Option<String>,
  pub ai_analysis:          Option<String>,
}

impl RawBill {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                   row.get(0)?,
      title:                row.get(1)?,
      identifier:           row.get(2)?,
      classification:       row.get(3)?,
      subject:              row.get(4)?,
      abstract_text:        row.get(5)?,
      session:              row.get(6)?,
      jurisdiction_name:    row.get(7)?,
      jurisdiction_id:      row.get(8)?,
      primary_sponsor_name: row.get(9)?,
      primary_sponsor_id:   row.get(10)?,
      actions:              row.get(11)?,
      documents:            row.get(12)?,
      votes:                row.get(13)?,
      versions:             row.get(14)?,
      updated_at:           row.get(15)?,
      summary:              row.get(16)?,
      ai_analysis:          row.get(17)?,
    })
  }

  pub fn into_bill(self, keywords: Vec<String>) -> Result<Bill> {
    // A sponsor exists only when its name was recorded.
    let primary_sponsor = self.primary_sponsor_name.map(|name| Sponsor {
      name,
      id: self.primary_sponsor_id.unwrap_or_default(),
    });

    let details = BillDetails {
      id: self.id,
      title: self.title,
      identifier: self.identifier,
      classification: decode_json(&self.classification)?,
      subject: decode_json(&self.subject)?,
      abstract_text: self.abstract_text,
      session: self.session,
      jurisdiction: Jurisdiction {
        name: self.jurisdiction_name,
        id:   self.jurisdiction_id,
      },
      primary_sponsor,
      actions: decode_json(&self.actions)?,
      documents: decode_json(&self.documents)?,
      votes: decode_json(&self.votes)?,
      versions: decode_json(&self.versions)?,
    };

    Ok(Bill {
      details,
      updated_at: decode_dt(&self.updated_at)?,
      summary: self.summary,
      ai_analysis: self.ai_analysis,
      keywords,
    })
  }
}

/// Raw strings read directly from a `chat_history` row.
pub struct RawChatEntry {
  pub id:         i64,
  pub bill_id:    String,
  pub question:   String,
  pub answer:     String,
  pub created_at: String,
}

impl RawChatEntry {
  pub fn into_entry(self) -> Result<ChatEntry> {
    Ok(ChatEntry {
      id:         self.id,
      bill_id:    self.bill_id,
      question:   self.question,
      answer:     self.answer,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
