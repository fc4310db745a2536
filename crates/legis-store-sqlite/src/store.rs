//! [`SqliteStore`], the SQLite implementation of [`BillStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use tracing::debug;

use legis_core::{
  bill::{Analysis, Bill, BillDetails, ChatEntry, Keyword, NewChatEntry},
  store::{BillQuery, BillStore, Upserted},
};

use crate::{
  Error, Result,
  encode::{BILL_COLUMNS, BillRow, RawBill, RawChatEntry, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A bill store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    debug!(path = ?path.as_ref(), "opening bill store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a bill `SELECT` and attach each row's keywords.
  async fn load_bills(&self, sql: String, params: Vec<Value>) -> Result<Vec<Bill>> {
    let raws: Vec<(RawBill, Vec<String>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let bills = stmt
          .query_map(rusqlite::params_from_iter(params), RawBill::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut out = Vec::with_capacity(bills.len());
        for bill in bills {
          let keywords = keyword_names(conn, &bill.id)?;
          out.push((bill, keywords));
        }
        Ok(out)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, keywords)| raw.into_bill(keywords))
      .collect()
  }

  async fn require_bill(&self, id: &str) -> Result<Bill> {
    self
      .get_bill(id)
      .await?
      .ok_or_else(|| Error::Core(legis_core::Error::BillNotFound(id.to_owned())))
  }
}

/// Keyword names associated with `bill_id`, in keyword creation order.
fn keyword_names(
  conn: &rusqlite::Connection,
  bill_id: &str,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare_cached(
    "SELECT k.name
     FROM keywords k
     JOIN bill_keyword bk ON bk.keyword_id = k.id
     WHERE bk.bill_id = ?1
     ORDER BY k.id",
  )?;
  let names = stmt
    .query_map(rusqlite::params![bill_id], |row| row.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(names)
}

/// Escape `LIKE` wildcards so `text` matches literally under `ESCAPE '\'`.
fn escape_like(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    if matches!(c, '\\' | '%' | '_') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

// ─── BillStore impl ──────────────────────────────────────────────────────────

impl BillStore for SqliteStore {
  type Error = Error;

  // ── Bills ─────────────────────────────────────────────────────────────────

  async fn upsert_bill(&self, details: BillDetails) -> Result<Upserted> {
    if details.id.trim().is_empty() {
      return Err(Error::Core(legis_core::Error::InvalidInput(
        "bill id must not be empty".into(),
      )));
    }

    let id  = details.id.clone();
    let row = BillRow::encode(details, Utc::now())?;

    let created: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existed = tx
          .query_row(
            "SELECT 1 FROM bills WHERE id = ?1",
            rusqlite::params![row.id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        // summary, ai_analysis and keyword rows are deliberately not touched.
        tx.execute(
          "INSERT INTO bills (
             id, title, identifier, classification, subject, abstract,
             session, jurisdiction_name, jurisdiction_id,
             primary_sponsor_name, primary_sponsor_id,
             actions, documents, votes, versions, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
           ON CONFLICT(id) DO UPDATE SET
             title                = excluded.title,
             identifier           = excluded.identifier,
             classification       = excluded.classification,
             subject              = excluded.subject,
             abstract             = excluded.abstract,
             session              = excluded.session,
             jurisdiction_name    = excluded.jurisdiction_name,
             jurisdiction_id      = excluded.jurisdiction_id,
             primary_sponsor_name = excluded.primary_sponsor_name,
             primary_sponsor_id   = excluded.primary_sponsor_id,
             actions              = excluded.actions,
             documents            = excluded.documents,
             votes                = excluded.votes,
             versions             = excluded.versions,
             updated_at           = excluded.updated_at",
          rusqlite::params![
            row.id,
            row.title,
            row.identifier,
            row.classification,
            row.subject,
            row.abstract_text,
            row.session,
            row.jurisdiction_name,
            row.jurisdiction_id,
            row.primary_sponsor_name,
            row.primary_sponsor_id,
            row.actions,
            row.documents,
            row.votes,
            row.versions,
            row.updated_at,
          ],
        )?;
        tx.commit()?;
        Ok(!existed)
      })
      .await?;

    debug!(bill_id = %id, created, "upserted bill");
    let bill = self.require_bill(&id).await?;
    Ok(Upserted { bill, created })
  }

  async fn get_bill(&self, id: &str) -> Result<Option<Bill>> {
    let sql = format!("SELECT {BILL_COLUMNS} FROM bills b WHERE b.id = ?1");
    let mut bills = self.load_bills(sql, vec![Value::Text(id.to_owned())]).await?;
    Ok(bills.pop())
  }

  async fn list_bills(&self, query: &BillQuery) -> Result<Vec<Bill>> {
    let text = |v: &Option<String>| v.clone().map_or(Value::Null, Value::Text);
    let jurisdiction = text(&query.jurisdiction);
    let session      = text(&query.session);
    let subject      = text(&query.subject);
    let limit_val    = Value::Integer(query.limit.unwrap_or(100) as i64);
    let offset_val   = Value::Integer(query.offset.unwrap_or(0) as i64);

    // Build WHERE clause dynamically.
    let mut conds: Vec<&'static str> = vec![];
    if query.jurisdiction.is_some() {
      // Matches a full OCD id, a display name, or the short code at the end
      // of an OCD id (`ca` in `.../state:ca/government`).
      conds.push(
        "(b.jurisdiction_id = ?1
          OR lower(b.jurisdiction_name) = lower(?1)
          OR b.jurisdiction_id LIKE '%:' || ?1 || '/government')",
      );
    }
    if query.session.is_some() {
      conds.push("b.session = ?2");
    }
    if query.subject.is_some() {
      conds.push("EXISTS (SELECT 1 FROM json_each(b.subject) WHERE json_each.value = ?3)");
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    let sql = format!(
      "SELECT {BILL_COLUMNS}
       FROM bills b
       {where_clause}
       ORDER BY b.updated_at DESC, b.id
       LIMIT ?4 OFFSET ?5"
    );

    self
      .load_bills(sql, vec![jurisdiction, session, subject, limit_val, offset_val])
      .await
  }

  async fn search_bills(&self, text: &str, limit: usize) -> Result<Vec<Bill>> {
    // SQLite LIKE is case-insensitive for ASCII.
    let pattern = format!("%{}%", escape_like(text.trim()));
    let sql = format!(
      "SELECT {BILL_COLUMNS}
       FROM bills b
       WHERE b.title LIKE ?1 ESCAPE '\\'
          OR b.abstract LIKE ?1 ESCAPE '\\'
          OR b.identifier LIKE ?1 ESCAPE '\\'
       ORDER BY b.updated_at DESC, b.id
       LIMIT ?2"
    );
    self
      .load_bills(sql, vec![Value::Text(pattern), Value::Integer(limit as i64)])
      .await
  }

  // ── Analysis ──────────────────────────────────────────────────────────────

  async fn record_analysis(&self, bill_id: &str, analysis: &Analysis) -> Result<Bill> {
    let id       = bill_id.to_owned();
    let summary  = analysis.summary.clone();
    let keywords = analysis.keywords.clone();

    let found: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let updated = tx.execute(
          "UPDATE bills SET summary = ?2 WHERE id = ?1",
          rusqlite::params![id, summary],
        )?;
        if updated == 0 {
          return Ok(false);
        }

        for name in &keywords {
          tx.execute(
            "INSERT OR IGNORE INTO keywords (name) VALUES (?1)",
            rusqlite::params![name],
          )?;
          let keyword_id: i64 = tx.query_row(
            "SELECT id FROM keywords WHERE name = ?1",
            rusqlite::params![name],
            |r| r.get(0),
          )?;
          tx.execute(
            "INSERT OR IGNORE INTO bill_keyword (bill_id, keyword_id) VALUES (?1, ?2)",
            rusqlite::params![id, keyword_id],
          )?;
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Err(Error::Core(legis_core::Error::BillNotFound(bill_id.to_owned())));
    }
    debug!(bill_id, keywords = analysis.keywords.len(), "recorded analysis");
    self.require_bill(bill_id).await
  }

  async fn list_keywords(&self) -> Result<Vec<Keyword>> {
    let keywords = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, name FROM keywords ORDER BY id")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Keyword {
              id:   row.get(0)?,
              name: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(keywords)
  }

  // ── Chat history ──────────────────────────────────────────────────────────

  async fn record_chat(&self, entry: NewChatEntry) -> Result<ChatEntry> {
    let created_at = Utc::now();
    let at_str     = encode_dt(created_at);
    let NewChatEntry { bill_id, question, answer } = entry;
    let (b, q, a) = (bill_id.clone(), question.clone(), answer.clone());

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO chat_history (bill_id, question, answer, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![b, q, a, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(ChatEntry { id, bill_id, question, answer, created_at })
  }

  async fn chat_history(&self, bill_id: &str) -> Result<Vec<ChatEntry>> {
    let id = bill_id.to_owned();

    let raws: Vec<RawChatEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, bill_id, question, answer, created_at
           FROM chat_history
           WHERE bill_id = ?1
           ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id], |row| {
            Ok(RawChatEntry {
              id:         row.get(0)?,
              bill_id:    row.get(1)?,
              question:   row.get(2)?,
              answer:     row.get(3)?,
              created_at: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChatEntry::into_entry).collect()
  }
}
