use std::{
  path::PathBuf,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use axum::{
  body::Body,
  http::{Request, StatusCode},
};
use quire_core::{
  cycle::{CycleConfig, Monitor},
  entity::Entity,
  fetch::{FetchError, Fetcher, RosterListing},
  store::SnapshotStore,
};
use quire_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use super::*;

fn write_config(name: &str, contents: &str) -> PathBuf {
  let path = std::env::temp_dir().join(format!("quire-{}-{name}.toml", std::process::id()));
  std::fs::write(&path, contents).unwrap();
  path
}

// ─── Configuration ────────────────────────────────────────────────────────────

#[test]
fn missing_config_file_falls_back_to_defaults() {
  let cfg = load_config(std::path::Path::new("/nonexistent/quire.toml")).unwrap();
  assert_eq!(cfg.poll_interval(), Duration::from_secs(3600));
  assert_eq!(cfg.cycle_config().rerun_threshold, Duration::from_secs(900));
  assert_eq!(cfg.fetch_timeout(), Duration::from_secs(30));
  assert_eq!(cfg.catalog.name_suffix, " 2021 HSC exam pack");
}

#[test]
fn config_file_overrides_defaults() {
  let path = write_config(
    "overrides",
    r#"
port = 9000
store_path = "/var/lib/quire/quire.db"
poll_interval_secs = 600
rerun_threshold_secs = 60

[catalog]
base_url = "http://catalog.test"
directory_path = "/2022/"
name_suffix = " 2022 HSC exam pack"
"#,
  );
  let cfg = load_config(&path).unwrap();
  std::fs::remove_file(&path).ok();

  assert_eq!(cfg.port, 9000);
  assert_eq!(cfg.store_path, PathBuf::from("/var/lib/quire/quire.db"));
  assert_eq!(cfg.poll_interval(), Duration::from_secs(600));
  assert_eq!(cfg.cycle_config().rerun_threshold, Duration::from_secs(60));
  assert_eq!(cfg.catalog.base_url, "http://catalog.test");
  assert_eq!(cfg.catalog.directory_path, "/2022/");
}

#[test]
fn zero_poll_interval_is_rejected() {
  let path = write_config("zero", "poll_interval_secs = 0\n");
  let result = load_config(&path);
  std::fs::remove_file(&path).ok();
  assert!(result.is_err());
}

#[test]
fn tilde_expands_to_home() {
  let Ok(home) = std::env::var("HOME") else { return };
  assert_eq!(
    expand_tilde(std::path::Path::new("~/quire.db")),
    PathBuf::from(home).join("quire.db")
  );
  assert_eq!(
    expand_tilde(std::path::Path::new("/abs/quire.db")),
    PathBuf::from("/abs/quire.db")
  );
}

// ─── Application and scheduler ────────────────────────────────────────────────

/// A one-subject catalog that counts roster fetches.
#[derive(Default)]
struct CountingCatalog {
  rosters: AtomicUsize,
}

impl Fetcher for CountingCatalog {
  async fn fetch_roster(&self) -> Result<RosterListing, FetchError> {
    self.rosters.fetch_add(1, Ordering::SeqCst);
    Ok(RosterListing::from([("Biology".to_owned(), "/biology".to_owned())]))
  }

  async fn fetch_content<'a>(&'a self, _locator: &'a str) -> Result<String, FetchError> {
    Ok("Q1\n".into())
  }
}

async fn monitor() -> (Monitor<SqliteStore, CountingCatalog>, Arc<CountingCatalog>) {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let catalog = Arc::new(CountingCatalog::default());
  let monitor = Monitor::new(store, Arc::clone(&catalog), CycleConfig::default());
  (monitor, catalog)
}

#[tokio::test]
async fn api_is_mounted_under_api() {
  let (monitor, _) = monitor().await;
  let app = app(monitor);

  let res = app
    .clone()
    .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(res.status(), StatusCode::OK);
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(body["last_success"], serde_json::Value::Null);

  let res = app
    .oneshot(Request::get("/status").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn scheduler_runs_immediately_and_repeats() {
  let (monitor, catalog) = monitor().await;
  let handle = spawn_scheduler(monitor.clone(), Duration::from_millis(50));

  for _ in 0..100 {
    if catalog.rosters.load(Ordering::SeqCst) >= 2 {
      break;
    }
    tokio::time::sleep(Duration::from_millis(10)).await;
  }
  handle.abort();

  assert!(catalog.rosters.load(Ordering::SeqCst) >= 2);
  let store = monitor.store();
  assert!(store.last_cycle().await.unwrap().is_some());
  assert_eq!(store.all_versions(Entity::Roster).await.unwrap().len(), 1);
}
