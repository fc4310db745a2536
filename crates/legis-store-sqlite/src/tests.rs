//! Integration tests for `SqliteStore` against an in-memory database.

use legis_core::{
  bill::{
    Action, Analysis, BillDetails, Jurisdiction, NO_ABSTRACT, NewChatEntry, Sponsor,
    Version, Vote, VoteCounts,
  },
  store::{BillQuery, BillStore},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn details(id: &str, title: &str) -> BillDetails {
  BillDetails {
    id:              id.into(),
    title:           title.into(),
    identifier:      "AB 1".into(),
    classification:  vec!["bill".into()],
    subject:         vec!["Environment".into()],
    abstract_text:   NO_ABSTRACT.into(),
    session:         "2023-2024".into(),
    jurisdiction:    Jurisdiction {
      name: "California".into(),
      id:   "ocd-jurisdiction/country:us/state:ca/government".into(),
    },
    primary_sponsor: Some(Sponsor { name: "Smith".into(), id: "ocd-person/1".into() }),
    actions:         vec![Action {
      date:           "2023-01-01".into(),
      description:    "Introduced".into(),
      classification: vec!["introduction".into()],
    }],
    documents:       vec![],
    votes:           vec![Vote {
      date:   "2023-02-01".into(),
      result: "pass".into(),
      counts: VoteCounts { yes: 40, no: 30, abstain: 0 },
    }],
    versions:        vec![Version {
      url:  "https://example.com/ab1.html".into(),
      note: "Introduced".into(),
      date: Some("2023-01-01".into()),
    }],
  }
}

fn analysis(summary: &str, keywords: &[&str]) -> Analysis {
  Analysis {
    summary:  summary.into(),
    keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
  }
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_inserts_then_reads_back() {
  let s = store().await;

  let up = s.upsert_bill(details("ocd-bill/1", "Water Act")).await.unwrap();
  assert!(up.created);
  assert_eq!(up.bill.details, details("ocd-bill/1", "Water Act"));
  assert!(up.bill.summary.is_none());
  assert!(up.bill.keywords.is_empty());

  let fetched = s.get_bill("ocd-bill/1").await.unwrap().unwrap();
  assert_eq!(fetched, up.bill);
}

#[tokio::test]
async fn get_bill_missing_returns_none() {
  let s = store().await;
  assert!(s.get_bill("ocd-bill/nope").await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_rejects_empty_id() {
  let s = store().await;
  let err = s.upsert_bill(details("", "Nameless")).await.unwrap_err();
  assert!(matches!(err, Error::Core(legis_core::Error::InvalidInput(_))));
}

#[tokio::test]
async fn reingest_is_idempotent_apart_from_timestamp() {
  let s = store().await;

  let first = s.upsert_bill(details("ocd-bill/1", "Water Act")).await.unwrap();
  let second = s.upsert_bill(details("ocd-bill/1", "Water Act")).await.unwrap();

  assert!(!second.created);
  assert_eq!(first.bill.details, second.bill.details);
  assert_eq!(first.bill.summary, second.bill.summary);
  assert_eq!(first.bill.keywords, second.bill.keywords);
  assert!(second.bill.updated_at >= first.bill.updated_at);

  let all = s.list_bills(&BillQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn upsert_overwrites_source_fields_but_keeps_analysis() {
  let s = store().await;
  s.upsert_bill(details("ocd-bill/1", "Water Act")).await.unwrap();
  s.record_analysis("ocd-bill/1", &analysis("About water.", &["water", "drought"]))
    .await
    .unwrap();

  let mut changed = details("ocd-bill/1", "Water Act (amended)");
  changed.primary_sponsor = None;
  changed.votes.clear();
  let up = s.upsert_bill(changed.clone()).await.unwrap();

  assert_eq!(up.bill.details, changed);
  assert_eq!(up.bill.summary.as_deref(), Some("About water."));
  assert_eq!(up.bill.keywords, vec!["water".to_string(), "drought".to_string()]);
}

// ─── Analysis ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_keyword_yields_single_association() {
  let s = store().await;
  s.upsert_bill(details("ocd-bill/1", "Water Act")).await.unwrap();

  s.record_analysis("ocd-bill/1", &analysis("v1", &["water"]))
    .await
    .unwrap();
  let bill = s
    .record_analysis("ocd-bill/1", &analysis("v2", &["water", "water"]))
    .await
    .unwrap();

  assert_eq!(bill.summary.as_deref(), Some("v2"));
  assert_eq!(bill.keywords, vec!["water".to_string()]);
  assert_eq!(s.list_keywords().await.unwrap().len(), 1);
}

#[tokio::test]
async fn keywords_are_shared_between_bills() {
  let s = store().await;
  s.upsert_bill(details("ocd-bill/1", "Water Act")).await.unwrap();
  s.upsert_bill(details("ocd-bill/2", "Drought Act")).await.unwrap();

  s.record_analysis("ocd-bill/1", &analysis("a", &["water"])).await.unwrap();
  s.record_analysis("ocd-bill/2", &analysis("b", &["water", "drought"]))
    .await
    .unwrap();

  let names: Vec<_> = s
    .list_keywords()
    .await
    .unwrap()
    .into_iter()
    .map(|k| k.name)
    .collect();
  assert_eq!(names, vec!["water".to_string(), "drought".to_string()]);
}

#[tokio::test]
async fn keyword_names_are_case_sensitive() {
  let s = store().await;
  s.upsert_bill(details("ocd-bill/1", "Tax Act")).await.unwrap();

  let bill = s
    .record_analysis("ocd-bill/1", &analysis("x", &["Tax", "tax"]))
    .await
    .unwrap();
  assert_eq!(bill.keywords.len(), 2);
}

#[tokio::test]
async fn record_analysis_for_unknown_bill_fails() {
  let s = store().await;
  let err = s
    .record_analysis("ocd-bill/ghost", &analysis("x", &["ghost"]))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(legis_core::Error::BillNotFound(_))));
  // The failed analysis must not leave keywords behind.
  assert!(s.list_keywords().await.unwrap().is_empty());
}

// ─── Listing and search ──────────────────────────────────────────────────────

#[tokio::test]
async fn list_filters_by_jurisdiction_session_and_subject() {
  let s = store().await;
  s.upsert_bill(details("ocd-bill/ca", "California Bill")).await.unwrap();

  let mut tx = details("ocd-bill/tx", "Texas Bill");
  tx.jurisdiction = Jurisdiction {
    name: "Texas".into(),
    id:   "ocd-jurisdiction/country:us/state:tx/government".into(),
  };
  tx.session = "88".into();
  tx.subject = vec!["Taxation".into()];
  s.upsert_bill(tx).await.unwrap();

  let by_code = BillQuery { jurisdiction: Some("ca".into()), ..Default::default() };
  let got = s.list_bills(&by_code).await.unwrap();
  assert_eq!(got.len(), 1);
  assert_eq!(got[0].id(), "ocd-bill/ca");

  let by_name = BillQuery { jurisdiction: Some("texas".into()), ..Default::default() };
  assert_eq!(s.list_bills(&by_name).await.unwrap()[0].id(), "ocd-bill/tx");

  let by_session = BillQuery { session: Some("88".into()), ..Default::default() };
  assert_eq!(s.list_bills(&by_session).await.unwrap().len(), 1);

  let by_subject = BillQuery { subject: Some("Environment".into()), ..Default::default() };
  let got = s.list_bills(&by_subject).await.unwrap();
  assert_eq!(got.len(), 1);
  assert_eq!(got[0].id(), "ocd-bill/ca");

  let federal = BillQuery { jurisdiction: Some("us".into()), ..Default::default() };
  assert!(s.list_bills(&federal).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_paginates() {
  let s = store().await;
  for i in 0..5 {
    s.upsert_bill(details(&format!("ocd-bill/{i}"), "Bill")).await.unwrap();
  }

  let page = BillQuery { limit: Some(2), offset: Some(4), ..Default::default() };
  assert_eq!(s.list_bills(&page).await.unwrap().len(), 1);
}

#[tokio::test]
async fn search_matches_title_case_insensitively() {
  let s = store().await;
  s.upsert_bill(details("ocd-bill/1", "Climate Resilience Act")).await.unwrap();
  s.upsert_bill(details("ocd-bill/2", "Budget Act")).await.unwrap();

  let hits = s.search_bills("climate", 10).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].title(), "Climate Resilience Act");

  // Identifier match.
  assert_eq!(s.search_bills("ab 1", 10).await.unwrap().len(), 2);
  assert!(s.search_bills("zoning", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
  let s = store().await;
  s.upsert_bill(details("ocd-bill/1", "Water Act")).await.unwrap();
  s.upsert_bill(details("ocd-bill/2", "100% Clean Energy Act")).await.unwrap();

  let hits = s.search_bills("%", 10).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].title(), "100% Clean Energy Act");

  assert!(s.search_bills("_", 10).await.unwrap().is_empty());
  assert!(s.search_bills("\\", 10).await.unwrap().is_empty());
}

// ─── Chat history ────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_history_is_appended_in_order() {
  let s = store().await;

  s.record_chat(NewChatEntry::new("ocd-bill/1", "What?", "This.").unwrap())
    .await
    .unwrap();
  s.record_chat(NewChatEntry::new("ocd-bill/1", "Why?", "Because.").unwrap())
    .await
    .unwrap();
  s.record_chat(NewChatEntry::new("ocd-bill/2", "Who?", "Them.").unwrap())
    .await
    .unwrap();

  let history = s.chat_history("ocd-bill/1").await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].question, "What?");
  assert_eq!(history[1].answer, "Because.");
}
