//! HTTP clients for the two external services the backend consumes.
//!
//! - [`OpenStatesClient`]: the bill source (search, detail, version text).
//! - [`AnthropicClient`]: the analysis source (summaries, keywords, Q&A).
//!
//! Both are constructed explicitly from a config carrying the base URL and
//! credentials, and are cheap to clone.

pub mod anthropic;
pub mod error;
pub mod openstates;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use error::{Error, Result};
pub use openstates::{BillSearchParams, BillText, OpenStatesClient, OpenStatesConfig, SearchPage};
