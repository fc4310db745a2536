//! The bill ingestion pipeline.
//!
//! [`Pipeline::ingest`] pages through an OpenStates search, persists every
//! bill it finds and optionally enriches each one with a model-written
//! summary and keywords. [`Pipeline::process_one`] does the per-bill work.

pub mod error;
pub mod pipeline;
pub mod retry;

pub use error::{Error, Result};
pub use pipeline::{
  AnalysisOutcome, IngestOptions, IngestSummary, Pipeline, ProcessOutcome,
  apply_abstract_fallback,
};
pub use retry::RetryPolicy;
