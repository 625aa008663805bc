//! The poll cycle and the [`Monitor`] handle that owns it.
//!
//! One cycle fetches the roster, refreshes the locator table, captures every
//! subject through write-if-changed, versions the roster text itself, and
//! finally stamps the last-success marker with the instant the cycle finished.
//! Only one cycle runs at a time; the monitor's run flag rejects overlapping
//! starts.

use std::{
  collections::BTreeMap,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  Error,
  entity::{Entity, Slug, normalize_name},
  fetch::{FetchError, Fetcher},
  gate::RerunGate,
  roster,
  store::{Locator, SnapshotStore},
  version::WriteOutcome,
};

/// Default bound on a single subject fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct CycleConfig {
  pub fetch_timeout:   Duration,
  pub rerun_threshold: Duration,
}

impl Default for CycleConfig {
  fn default() -> Self {
    Self {
      fetch_timeout:   DEFAULT_FETCH_TIMEOUT,
      rerun_threshold: crate::gate::DEFAULT_THRESHOLD,
    }
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Why a whole cycle did not complete.
#[derive(Debug, Error)]
pub enum CycleError {
  #[error("roster fetch failed: {0}")]
  RosterFetch(#[source] FetchError),

  #[error("a poll cycle is already running")]
  AlreadyRunning,

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Why a single subject produced no version this cycle.
#[derive(Debug, Clone, Error)]
pub enum SubjectError {
  #[error("fetch failed: {0}")]
  Fetch(#[from] FetchError),

  #[error("storage failed: {0}")]
  Storage(String),
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SubjectOutcome {
  pub name:   String,
  pub slug:   Slug,
  pub result: Result<WriteOutcome, SubjectError>,
}

/// What one completed cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
  pub completed_at:       DateTime<Utc>,
  pub capture_date:       NaiveDate,
  pub subjects:           Vec<SubjectOutcome>,
  pub roster:             WriteOutcome,
  /// `false` when the locator table could not be replaced.
  pub locators_persisted: bool,
}

impl CycleReport {
  /// Subjects that gained a version this cycle.
  pub fn written(&self) -> impl Iterator<Item = &SubjectOutcome> {
    self
      .subjects
      .iter()
      .filter(|s| matches!(&s.result, Ok(outcome) if outcome.is_write()))
  }

  pub fn failures(&self) -> impl Iterator<Item = &SubjectOutcome> {
    self.subjects.iter().filter(|s| s.result.is_err())
  }

  pub fn unchanged_count(&self) -> usize {
    self
      .subjects
      .iter()
      .filter(|s| matches!(&s.result, Ok(WriteOutcome::Unchanged)))
      .count()
  }
}

// ─── Trigger / status ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
  ThresholdNotElapsed { remaining_secs: u64 },
  AlreadyRunning,
}

impl std::fmt::Display for RejectReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::ThresholdNotElapsed { remaining_secs } => write!(
        f,
        "threshold not elapsed; next rerun possible in {remaining_secs}s"
      ),
      Self::AlreadyRunning => f.write_str("a poll cycle is already running"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
  Accepted,
  Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStatus {
  pub last_success:    Option<DateTime<Utc>>,
  pub seconds_elapsed: Option<u64>,
  pub running:         bool,
  pub rerun_allowed:   bool,
}

// ─── Monitor ─────────────────────────────────────────────────────────────────

/// Source of the current instant.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Shared handle over the store, the fetcher, and the cycle run flag.
///
/// Cloning is cheap; every clone guards the same run flag.
pub struct Monitor<S, F> {
  store:         Arc<S>,
  fetcher:       Arc<F>,
  gate:          RerunGate,
  fetch_timeout: Duration,
  running:       Arc<AtomicBool>,
  clock:         Clock,
}

impl<S, F> Clone for Monitor<S, F> {
  fn clone(&self) -> Self {
    Self {
      store:         Arc::clone(&self.store),
      fetcher:       Arc::clone(&self.fetcher),
      gate:          self.gate,
      fetch_timeout: self.fetch_timeout,
      running:       Arc::clone(&self.running),
      clock:         Arc::clone(&self.clock),
    }
  }
}

/// Clears the run flag when dropped.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
  fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

impl<S, F> Monitor<S, F>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  pub fn new(store: Arc<S>, fetcher: Arc<F>, config: CycleConfig) -> Self {
    Self {
      store,
      fetcher,
      gate: RerunGate::new(config.rerun_threshold),
      fetch_timeout: config.fetch_timeout,
      running: Arc::new(AtomicBool::new(false)),
      clock: Arc::new(Utc::now),
    }
  }

  /// Replace the wall clock, e.g. with a fixed one in tests.
  pub fn with_clock(
    mut self,
    clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
  ) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  fn now(&self) -> DateTime<Utc> { (self.clock)() }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn gate(&self) -> RerunGate { self.gate }

  pub fn is_running(&self) -> bool { self.running.load(Ordering::Acquire) }

  fn try_begin(&self) -> Option<RunGuard> {
    self
      .running
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| RunGuard(Arc::clone(&self.running)))
  }

  /// Run one cycle now.
  pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
    self.run_cycle_at(self.now()).await
  }

  /// Run one cycle with `started` as the capture instant.
  ///
  /// The marker is still stamped from the monitor's clock once the cycle
  /// finishes.
  pub async fn run_cycle_at(
    &self,
    started: DateTime<Utc>,
  ) -> Result<CycleReport, CycleError> {
    let _guard = self.try_begin().ok_or(CycleError::AlreadyRunning)?;
    self.run_locked(started).await
  }

  /// Start a cycle in the background if the rerun gate is open and no cycle
  /// is running.
  pub async fn trigger_if_allowed(&self) -> Result<TriggerDecision, Error> {
    self.trigger_if_allowed_at(self.now()).await
  }

  pub async fn trigger_if_allowed_at(
    &self,
    now: DateTime<Utc>,
  ) -> Result<TriggerDecision, Error> {
    let last = self.store.last_cycle().await.map_err(Error::store)?;
    if !self.gate.is_open(last, now) {
      let remaining = self.gate.remaining(last, now);
      return Ok(TriggerDecision::Rejected(RejectReason::ThresholdNotElapsed {
        remaining_secs: remaining.as_secs(),
      }));
    }

    let Some(guard) = self.try_begin() else {
      return Ok(TriggerDecision::Rejected(RejectReason::AlreadyRunning));
    };

    info!("manual rerun accepted");
    let this = self.clone();
    tokio::spawn(async move {
      let _guard = guard;
      if let Err(e) = this.run_locked(now).await {
        error!("manual rerun failed: {e}");
      }
    });
    Ok(TriggerDecision::Accepted)
  }

  pub async fn status(&self) -> Result<CycleStatus, Error> {
    self.status_at(self.now()).await
  }

  pub async fn status_at(&self, now: DateTime<Utc>) -> Result<CycleStatus, Error> {
    let last = self.store.last_cycle().await.map_err(Error::store)?;
    let running = self.is_running();
    Ok(CycleStatus {
      last_success: last,
      seconds_elapsed: RerunGate::elapsed(last, now).map(|d| d.as_secs()),
      running,
      rerun_allowed: !running && self.gate.is_open(last, now),
    })
  }

  // ── Cycle body ────────────────────────────────────────────────────────

  async fn run_locked(&self, started: DateTime<Utc>) -> Result<CycleReport, CycleError> {
    let capture_date = started.date_naive();

    info!("downloading roster");
    let listing = self.fetcher.fetch_roster().await.map_err(|e| {
      error!("roster fetch failed, aborting cycle: {e}");
      CycleError::RosterFetch(e)
    })?;
    let locators = normalize_listing(listing);
    info!("roster lists {} subjects", locators.len());

    let locators_persisted = match self
      .store
      .replace_locators(locators.values().cloned().collect())
      .await
    {
      Ok(()) => true,
      Err(e) => {
        error!("could not save locator table: {e}");
        false
      }
    };

    let mut subjects = Vec::with_capacity(locators.len());
    for locator in locators.values() {
      let result = self.capture(locator, capture_date).await;
      match &result {
        Ok(WriteOutcome::CreatedNew) => info!("new subject {}, writing first version", locator.name),
        Ok(WriteOutcome::Created) => info!("writing update for {}", locator.name),
        Ok(WriteOutcome::Unchanged) => debug!("no update for {}", locator.name),
        Err(SubjectError::Fetch(e)) => warn!("skipping {}: {e}", locator.name),
        Err(SubjectError::Storage(e)) => error!("could not store {}: {e}", locator.name),
      }
      subjects.push(SubjectOutcome {
        name: locator.name.clone(),
        slug: locator.slug.clone(),
        result,
      });
    }

    let roster_text = roster::render(locators.values().map(|l| l.name.as_str()));
    let roster_outcome = self
      .store
      .write_if_changed(Entity::Roster, capture_date, roster_text)
      .await
      .map_err(|e| {
        error!("could not store roster, cycle not marked complete: {e}");
        CycleError::Storage(Box::new(e))
      })?;
    if roster_outcome.is_write() {
      info!("roster changed");
    }

    let completed_at = self.now().max(started);
    self
      .store
      .record_cycle(completed_at)
      .await
      .map_err(|e| CycleError::Storage(Box::new(e)))?;

    let report = CycleReport {
      completed_at,
      capture_date,
      subjects,
      roster: roster_outcome,
      locators_persisted,
    };

    let failed: Vec<&str> = report.failures().map(|s| s.name.as_str()).collect();
    info!(
      "cycle complete: {} written, {} unchanged, {} failed",
      report.written().count(),
      report.unchanged_count(),
      failed.len(),
    );
    if !failed.is_empty() {
      warn!("subjects not captured this cycle: {}", failed.join(", "));
    }

    Ok(report)
  }

  async fn capture(
    &self,
    locator: &Locator,
    date: NaiveDate,
  ) -> Result<WriteOutcome, SubjectError> {
    let fetch = self.fetcher.fetch_content(&locator.locator);
    let content = match tokio::time::timeout(self.fetch_timeout, fetch).await {
      Ok(fetched) => fetched?,
      Err(_) => return Err(FetchError::Timeout(self.fetch_timeout).into()),
    };

    self
      .store
      .write_if_changed(Entity::Subject(locator.slug.clone()), date, content)
      .await
      .map_err(|e| SubjectError::Storage(e.to_string()))
  }
}

/// Normalise listed names and key them by slug. Later duplicates win.
fn normalize_listing(
  listing: crate::fetch::RosterListing,
) -> BTreeMap<Slug, Locator> {
  let mut locators = BTreeMap::new();
  for (raw, locator) in listing {
    let name = normalize_name(&raw);
    let slug = match Slug::from_name(&name) {
      Ok(slug) => slug,
      Err(e) => {
        warn!("ignoring roster entry {raw:?}: {e}");
        continue;
      }
    };
    let entry = Locator { slug: slug.clone(), name, locator };
    if let Some(previous) = locators.insert(slug, entry) {
      warn!("roster entry {:?} shadows an earlier entry with the same slug", previous.name);
    }
  }
  locators
}
