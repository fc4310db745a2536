//! Conversion of raw bill-source JSON into [`BillDetails`].
//!
//! The transform is total: any JSON value produces a `BillDetails`, with
//! missing or wrongly-typed fields replaced by defaults. Both the flat shape
//! (`sponsors`, `abstract`, `url`) and the OpenStates v3 shape
//! (`sponsorships`, `abstracts`, `links`) are understood.

use serde_json::Value;

use crate::bill::{
  Action, BillDetails, Document, Jurisdiction, NO_ABSTRACT, Sponsor, Version, Vote,
  VoteCounts,
};

static NULL: Value = Value::Null;

/// Transform a bill object from the source API into [`BillDetails`].
pub fn transform(data: &Value) -> BillDetails {
  let jurisdiction = data.get("jurisdiction").unwrap_or(&NULL);

  BillDetails {
    id:              string(data, "id"),
    title:           string(data, "title"),
    identifier:      string(data, "identifier"),
    classification:  strings(data, "classification"),
    subject:         strings(data, "subject"),
    abstract_text:   abstract_text(data),
    session:         string(data, "session"),
    jurisdiction:    Jurisdiction {
      name: string(jurisdiction, "name"),
      id:   string(jurisdiction, "id"),
    },
    primary_sponsor: primary_sponsor(data),
    actions:         objects(data, "actions").map(action).collect(),
    documents:       objects(data, "documents").map(document).collect(),
    votes:           objects(data, "votes").map(vote).collect(),
    versions:        objects(data, "versions").map(version).collect(),
  }
}

/// Transform only the `versions` list of a bill object.
pub fn versions(data: &Value) -> Vec<Version> {
  objects(data, "versions").map(version).collect()
}

// ─── Field helpers ───────────────────────────────────────────────────────────

fn optional_string(v: &Value, key: &str) -> Option<String> {
  v.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn string(v: &Value, key: &str) -> String {
  optional_string(v, key).unwrap_or_default()
}

fn strings(v: &Value, key: &str) -> Vec<String> {
  objects(v, key)
    .filter_map(Value::as_str)
    .map(str::to_owned)
    .collect()
}

fn objects<'a>(v: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
  v.get(key).and_then(Value::as_array).into_iter().flatten()
}

fn count(v: &Value) -> u32 {
  v.as_u64().map(|n| u32::try_from(n).unwrap_or(u32::MAX)).unwrap_or(0)
}

/// `url`, or the first entry of a v3 `links` list.
fn link_url(v: &Value) -> String {
  optional_string(v, "url")
    .or_else(|| {
      objects(v, "links")
        .next()
        .and_then(|link| optional_string(link, "url"))
    })
    .unwrap_or_default()
}

// ─── Parts ───────────────────────────────────────────────────────────────────

fn abstract_text(data: &Value) -> String {
  optional_string(data, "abstract")
    .or_else(|| {
      objects(data, "abstracts")
        .next()
        .and_then(|a| optional_string(a, "abstract"))
    })
    .unwrap_or_else(|| NO_ABSTRACT.to_owned())
}

fn primary_sponsor(data: &Value) -> Option<Sponsor> {
  let sponsor = objects(data, "sponsors")
    .next()
    .or_else(|| objects(data, "sponsorships").next())?;

  let person = sponsor.get("person").unwrap_or(&NULL);
  Some(Sponsor {
    name: optional_string(sponsor, "name").unwrap_or_else(|| string(person, "name")),
    id:   optional_string(person, "id").unwrap_or_else(|| string(sponsor, "id")),
  })
}

fn action(v: &Value) -> Action {
  Action {
    date:           string(v, "date"),
    description:    string(v, "description"),
    classification: strings(v, "classification"),
  }
}

fn document(v: &Value) -> Document {
  Document { url: link_url(v), note: string(v, "note") }
}

fn vote(v: &Value) -> Vote {
  Vote {
    date:   optional_string(v, "date")
      .or_else(|| optional_string(v, "start_date"))
      .unwrap_or_default(),
    result: string(v, "result"),
    counts: vote_counts(v.get("counts").unwrap_or(&NULL)),
  }
}

fn vote_counts(v: &Value) -> VoteCounts {
  match v {
    Value::Object(_) => VoteCounts {
      yes:     v.get("yes").map(count).unwrap_or(0),
      no:      v.get("no").map(count).unwrap_or(0),
      abstain: v.get("abstain").map(count).unwrap_or(0),
    },
    // v3 shape: [{ "option": "yes", "value": 12 }, ...]
    Value::Array(items) => items.iter().fold(VoteCounts::default(), |mut acc, item| {
      let value = item.get("value").map(count).unwrap_or(0);
      match item.get("option").and_then(Value::as_str) {
        Some("yes") => acc.yes = acc.yes.saturating_add(value),
        Some("no") => acc.no = acc.no.saturating_add(value),
        Some("abstain") => acc.abstain = acc.abstain.saturating_add(value),
        _ => {}
      }
      acc
    }),
    _ => VoteCounts::default(),
  }
}

fn version(v: &Value) -> Version {
  Version {
    url:  link_url(v),
    note: string(v, "note"),
    date: optional_string(v, "date"),
  }
}
