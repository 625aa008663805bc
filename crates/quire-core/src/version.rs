//! Versions: immutable, dated captures of an entity's text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// One capture of an entity's content.
///
/// Captures are dated at day granularity; within one entity's history there
/// is at most one version per date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
  pub entity:      Entity,
  pub captured_on: NaiveDate,
  pub content:     String,
}

/// The result of [`crate::store::SnapshotStore::write_if_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
  /// The entity had no history; its first version was written.
  CreatedNew,
  /// The content differed from the latest version and was written.
  Created,
  /// The content matched the latest version; nothing was written.
  Unchanged,
}

impl WriteOutcome {
  pub fn is_write(&self) -> bool { !matches!(self, Self::Unchanged) }
}
