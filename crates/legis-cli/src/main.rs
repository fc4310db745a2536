//! `legis`: legislative research backend.
//!
//! # Usage
//!
//! ```
//! legis serve
//! legis ingest --jurisdiction ca --session 2023-2024 --limit 50 --analyze
//! legis init-db
//! ```
//!
//! Settings come from `config.toml` (or `--config`) and the environment;
//! see [`settings`].

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::http::HeaderValue;
use clap::{Parser, Subcommand};
use legis_api::AppState;
use legis_ingest::Pipeline;
use legis_sources::{AnthropicClient, OpenStatesClient};
use legis_store_sqlite::SqliteStore;
use settings::{Settings, expand_tilde};
use tokio::net::TcpListener;
use tower_http::{
  cors::{AllowOrigin, Any, CorsLayer},
  trace::TraceLayer,
};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "legis", author, version, about = "Legislative research backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API.
  Serve,

  /// Fetch bills from OpenStates into the local store.
  Ingest {
    /// Jurisdiction code, e.g. `ca`.
    #[arg(short, long)]
    jurisdiction: String,

    /// Legislative session label, e.g. `2023-2024`.
    #[arg(short, long)]
    session: String,

    /// Stop after this many bills; 0 ingests everything.
    #[arg(short, long, default_value_t = 0)]
    limit: usize,

    /// Summarise each bill and extract keywords.
    #[arg(long)]
    analyze: bool,
  },

  /// Create the database schema and exit.
  InitDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = settings::load(&cli.config).context("failed to load settings")?;

  match cli.command {
    Command::Serve => serve(settings).await,
    Command::Ingest { jurisdiction, session, limit, analyze } => {
      ingest(settings, &jurisdiction, &session, (limit > 0).then_some(limit), analyze).await
    }
    Command::InitDb => {
      open_store(&settings).await?;
      info!(path = ?expand_tilde(&settings.database_path), "database ready");
      Ok(())
    }
  }
}

async fn open_store(settings: &Settings) -> anyhow::Result<SqliteStore> {
  let path = expand_tilde(&settings.database_path);
  SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

fn openstates(settings: &Settings) -> anyhow::Result<OpenStatesClient> {
  OpenStatesClient::new(settings.openstates.clone())
    .context("set OPENSTATES_API_KEY or openstates.api_key")
}

fn anthropic(settings: &Settings) -> anyhow::Result<AnthropicClient> {
  AnthropicClient::new(settings.anthropic.clone())
    .context("set ANTHROPIC_API_KEY or anthropic.api_key")
}

fn cors(origins: &[String]) -> anyhow::Result<CorsLayer> {
  let origins = origins
    .iter()
    .map(|o| o.parse::<HeaderValue>())
    .collect::<Result<Vec<_>, _>>()
    .context("invalid CORS origin")?;
  Ok(
    CorsLayer::new()
      .allow_origin(AllowOrigin::list(origins))
      .allow_methods(Any)
      .allow_headers(Any),
  )
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
  let state = AppState {
    bills:   openstates(&settings)?,
    analyst: anthropic(&settings)?,
    store:   Arc::new(open_store(&settings).await?),
  };

  let app = legis_api::router(state)
    .layer(cors(&settings.cors_origins)?)
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", settings.host, settings.port);
  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

async fn ingest(
  settings: Settings,
  jurisdiction: &str,
  session: &str,
  limit: Option<usize>,
  analyze: bool,
) -> anyhow::Result<()> {
  let bills = openstates(&settings)?;
  let analyst = if analyze { Some(anthropic(&settings)?) } else { None };
  let store = open_store(&settings).await?;

  let pipeline = Pipeline::new(store, bills, analyst, settings.ingest.options());
  let summary = pipeline
    .ingest(jurisdiction, session, limit, analyze)
    .await
    .context("ingestion aborted")?;

  println!(
    "processed {} bills ({} failed, {} analyzed)",
    summary.processed, summary.failed, summary.analyzed
  );
  Ok(())
}
