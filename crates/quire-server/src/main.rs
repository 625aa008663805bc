//! quire-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! snapshot store, polls the catalog on a schedule, and serves the JSON API.
//!
//! ```
//! quire-server --config /etc/quire/config.toml
//! quire-server --once    # one poll cycle, then exit
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use quire_catalog::HttpCatalog;
use quire_core::cycle::Monitor;
use quire_server::{app, expand_tilde, load_config, spawn_scheduler};
use quire_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Quire catalog monitor")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run a single poll cycle, print its summary, and exit.
  #[arg(long)]
  once: bool,
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

  let server_cfg = load_config(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let catalog = HttpCatalog::new(&server_cfg.catalog, server_cfg.fetch_timeout())
    .context("failed to set up catalog client")?;
  tracing::info!("watching {}", catalog.directory_url());

  let monitor = Monitor::new(
    Arc::new(store),
    Arc::new(catalog),
    server_cfg.cycle_config(),
  );

  if cli.once {
    let report = monitor.run_cycle().await.context("poll cycle failed")?;
    println!(
      "{}: {} written, {} unchanged, {} failed; roster {:?}",
      report.capture_date,
      report.written().count(),
      report.unchanged_count(),
      report.failures().count(),
      report.roster,
    );
    for failed in report.failures() {
      if let Err(e) = &failed.result {
        println!("  {}: {e}", failed.name);
      }
    }
    return Ok(());
  }

  let scheduler = spawn_scheduler(monitor.clone(), server_cfg.poll_interval());

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let served = axum::serve(listener, app(monitor)).await;
  scheduler.abort();
  served.context("server error")?;

  Ok(())
}
