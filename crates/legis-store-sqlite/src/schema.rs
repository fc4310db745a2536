//! SQL schema for the bill store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per source bill id. List-valued fields are JSON arrays.
CREATE TABLE IF NOT EXISTS bills (
    id                   TEXT PRIMARY KEY,
    title                TEXT NOT NULL,
    identifier           TEXT NOT NULL,
    classification       TEXT NOT NULL DEFAULT '[]',
    subject              TEXT NOT NULL DEFAULT '[]',
    abstract             TEXT NOT NULL DEFAULT 'No abstract available',
    session              TEXT NOT NULL,
    jurisdiction_name    TEXT NOT NULL,
    jurisdiction_id      TEXT NOT NULL,
    primary_sponsor_name TEXT,
    primary_sponsor_id   TEXT,
    actions              TEXT NOT NULL DEFAULT '[]',
    documents            TEXT NOT NULL DEFAULT '[]',
    votes                TEXT NOT NULL DEFAULT '[]',
    versions             TEXT NOT NULL DEFAULT '[]',
    updated_at           TEXT NOT NULL,   -- RFC 3339 UTC; store-assigned
    summary              TEXT,            -- never touched by upserts
    ai_analysis          TEXT
);

-- Names compare with BINARY collation: 'Tax' and 'tax' are distinct.
CREATE TABLE IF NOT EXISTS keywords (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS bill_keyword (
    bill_id    TEXT    NOT NULL REFERENCES bills(id),
    keyword_id INTEGER NOT NULL REFERENCES keywords(id),
    PRIMARY KEY (bill_id, keyword_id)
);

-- Append-only. No foreign key: questions may concern bills never ingested.
CREATE TABLE IF NOT EXISTS chat_history (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    bill_id    TEXT NOT NULL,
    question   TEXT NOT NULL,
    answer     TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS bills_title_idx        ON bills(title);
CREATE INDEX IF NOT EXISTS bills_identifier_idx   ON bills(identifier);
CREATE INDEX IF NOT EXISTS bills_session_idx      ON bills(session);
CREATE INDEX IF NOT EXISTS bills_jurisdiction_idx ON bills(jurisdiction_id);
CREATE INDEX IF NOT EXISTS bills_sponsor_idx      ON bills(primary_sponsor_id);
CREATE INDEX IF NOT EXISTS chat_history_bill_idx  ON chat_history(bill_id);

PRAGMA user_version = 1;
";
