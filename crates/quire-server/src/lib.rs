//! Server wiring for Quire: configuration, the poll scheduler, and the HTTP
//! application that mounts the JSON API.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use axum::Router;
use quire_catalog::CatalogConfig;
use quire_core::{
  cycle::{CycleConfig, CycleError, Monitor},
  fetch::Fetcher,
  store::SnapshotStore,
};
use serde::Deserialize;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `QUIRE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  #[serde(default = "default_poll_interval")]
  pub poll_interval_secs:   u64,
  #[serde(default = "default_rerun_threshold")]
  pub rerun_threshold_secs: u64,
  #[serde(default = "default_fetch_timeout")]
  pub fetch_timeout_secs:   u64,
  #[serde(default)]
  pub catalog:              CatalogConfig,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/quire/quire.db") }
fn default_poll_interval() -> u64 { 3600 }
fn default_rerun_threshold() -> u64 { 900 }
fn default_fetch_timeout() -> u64 { 30 }

impl ServerConfig {
  pub fn poll_interval(&self) -> Duration { Duration::from_secs(self.poll_interval_secs) }

  pub fn fetch_timeout(&self) -> Duration { Duration::from_secs(self.fetch_timeout_secs) }

  pub fn cycle_config(&self) -> CycleConfig {
    CycleConfig {
      fetch_timeout:   self.fetch_timeout(),
      rerun_threshold: Duration::from_secs(self.rerun_threshold_secs),
    }
  }
}

/// Layer `path` (optional) under `QUIRE_*` environment variables.
///
/// Nested keys use a double underscore: `QUIRE_CATALOG__BASE_URL`.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("QUIRE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()?;
  let cfg: ServerConfig = settings.try_deserialize()?;

  if cfg.poll_interval_secs == 0 {
    return Err(config::ConfigError::Message(
      "poll_interval_secs must be greater than zero".into(),
    ));
  }
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The HTTP application: the JSON API under `/api`, with request tracing.
pub fn app<S, F>(monitor: Monitor<S, F>) -> Router
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  Router::new()
    .nest("/api", quire_api::api_router(monitor))
    .layer(TraceLayer::new_for_http())
}

// ─── Scheduler ────────────────────────────────────────────────────────────────

/// Run a poll cycle every `every`, starting immediately.
///
/// Ticks that land while a cycle (scheduled or manual) is still running are
/// skipped rather than queued.
pub fn spawn_scheduler<S, F>(monitor: Monitor<S, F>, every: Duration) -> JoinHandle<()>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      ticker.tick().await;
      match monitor.run_cycle().await {
        Ok(report) => info!(
          "scheduled cycle finished, {} subjects written",
          report.written().count()
        ),
        Err(CycleError::AlreadyRunning) => {
          info!("a cycle is already running, skipping this tick");
        }
        Err(e) => error!("scheduled cycle failed: {e}"),
      }
    }
  })
}

#[cfg(test)]
mod tests;
