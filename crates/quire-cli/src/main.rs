//! `quire`: command-line client for a running Quire server.
//!
//! # Usage
//!
//! ```
//! quire roster
//! quire history Biology
//! quire diff Biology --index 1
//! quire --url http://quire.local:8080 status
//! ```

mod client;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, RerunOutcome};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "quire", about = "Browse captured catalog versions and their diffs")]
struct Args {
  /// Path to a TOML config file (`url = "..."`).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the quire server (default: http://localhost:8080).
  #[arg(long, env = "QUIRE_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// When each subject on the current roster was added and last updated.
  Roster,
  /// Index → date list for a subject, or for the roster when omitted.
  History { subject: Option<String> },
  /// Diff a version against its predecessor.
  Diff {
    subject: Option<String>,
    /// 0 is the newest version.
    #[arg(short, long, default_value_t = 0)]
    index:   usize,
  },
  /// Poll-cycle status.
  Status,
  /// Ask the server to run a poll cycle now.
  Rerun,
}

// ─── Config file ──────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // Flag or env beats the config file, which beats the default.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| DEFAULT_URL.to_string());
  let client = ApiClient::new(ApiConfig { base_url })?;

  let output = match args.command {
    Command::Roster => render::roster(&client.roster().await?),
    Command::History { subject } => render::history(&client.history(subject.as_deref()).await?),
    Command::Diff { subject, index } => {
      render::diff(&client.diff(subject.as_deref(), index).await?)
    }
    Command::Status => render::status(&client.status().await?),
    Command::Rerun => match client.rerun().await? {
      RerunOutcome::Accepted => "rerun started\n".to_owned(),
      RerunOutcome::Throttled { message, .. } => bail!("rerun rejected: {message}"),
      RerunOutcome::AlreadyRunning(message) => bail!("rerun rejected: {message}"),
    },
  };

  print!("{output}");
  Ok(())
}
