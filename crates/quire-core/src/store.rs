//! The `SnapshotStore` trait and the current-state records stored beside the
//! version histories.
//!
//! The trait is implemented by storage backends (e.g. `quire-store-sqlite`).
//! The poll cycle and the read surface depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{Entity, Slug},
  version::{Version, WriteOutcome},
};

/// Where a subject's page lives in the remote catalog.
///
/// The locator table is current state only: it is replaced wholesale on every
/// poll cycle and carries no history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
  pub slug:    Slug,
  /// Normalised display name.
  pub name:    String,
  /// Source locator as handed to [`crate::fetch::Fetcher::fetch_content`].
  pub locator: String,
}

/// Abstraction over a Quire snapshot store backend.
///
/// Versions are append-only, except that a second write on the same capture
/// date replaces that day's content. Every write becomes visible atomically:
/// readers observe either the previous state or the complete new version.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SnapshotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Versions ──────────────────────────────────────────────────────────

  /// The newest version of `entity`, or `None` if it has no history.
  fn latest(
    &self,
    entity: Entity,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + '_;

  /// Every version of `entity`, newest first. Read fresh on every call.
  fn all_versions(
    &self,
    entity: Entity,
  ) -> impl Future<Output = Result<Vec<Version>, Self::Error>> + Send + '_;

  /// The capture dates of `entity`, newest first, without loading content.
  fn version_dates(
    &self,
    entity: Entity,
  ) -> impl Future<Output = Result<Vec<NaiveDate>, Self::Error>> + Send + '_;

  /// The version of `entity` captured on `date`, if any.
  fn get_version(
    &self,
    entity: Entity,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<Version>, Self::Error>> + Send + '_;

  /// Write `content` as the version of `entity` dated `date` unless it is
  /// byte-for-byte equal to the current latest version.
  ///
  /// Provisioning a brand-new entity happens in the same atomic step as its
  /// first version.
  fn write_if_changed(
    &self,
    entity: Entity,
    date: NaiveDate,
    content: String,
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + '_;

  // ── Locators ──────────────────────────────────────────────────────────

  /// Replace the whole locator table with `locators`.
  fn replace_locators(
    &self,
    locators: Vec<Locator>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_locator(
    &self,
    slug: Slug,
  ) -> impl Future<Output = Result<Option<Locator>, Self::Error>> + Send + '_;

  /// All locators, ordered by name.
  fn list_locators(
    &self,
  ) -> impl Future<Output = Result<Vec<Locator>, Self::Error>> + Send + '_;

  // ── Cycle marker ──────────────────────────────────────────────────────

  /// When the last poll cycle completed, if one ever has.
  fn last_cycle(
    &self,
  ) -> impl Future<Output = Result<Option<DateTime<Utc>>, Self::Error>> + Send + '_;

  /// Overwrite the last-completed-cycle marker.
  fn record_cycle(
    &self,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
