//! The index resolver.
//!
//! A [`History`] is a snapshot of one entity's capture dates ranked
//! reverse-chronologically: index 0 is the newest version and index `N - 1`
//! the oldest. It is built from the store on every query and never cached,
//! since a poll cycle may append versions between two reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, entity::Entity, store::SnapshotStore};

/// An index mapped onto a concrete version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolved {
  pub index:     usize,
  pub date:      NaiveDate,
  pub is_oldest: bool,
}

/// One row of [`History::entries`].
pub type HistoryEntry = Resolved;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
  entity: Entity,
  /// Newest first, no duplicates.
  dates:  Vec<NaiveDate>,
}

impl History {
  /// Build a history from capture dates in any order.
  pub fn new(entity: Entity, mut dates: Vec<NaiveDate>) -> Self {
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates.dedup();
    Self { entity, dates }
  }

  /// Read the current history of `entity` from `store`.
  pub async fn load<S>(store: &S, entity: Entity) -> Result<Self>
  where
    S: SnapshotStore,
  {
    let dates = store
      .version_dates(entity.clone())
      .await
      .map_err(Error::store)?;
    Ok(Self::new(entity, dates))
  }

  pub fn entity(&self) -> &Entity { &self.entity }

  pub fn len(&self) -> usize { self.dates.len() }

  pub fn is_empty(&self) -> bool { self.dates.is_empty() }

  pub fn newest(&self) -> Option<NaiveDate> { self.dates.first().copied() }

  pub fn oldest(&self) -> Option<NaiveDate> { self.dates.last().copied() }

  /// Map `index` onto a version. Never clamps.
  pub fn resolve(&self, index: usize) -> Result<Resolved> {
    let date = self
      .dates
      .get(index)
      .copied()
      .ok_or_else(|| self.out_of_range(index))?;

    Ok(Resolved {
      index,
      date,
      is_oldest: index + 1 == self.dates.len(),
    })
  }

  /// The date of the next-older version, or `None` when `index` is the
  /// oldest and the diff baseline is empty.
  pub fn predecessor(&self, index: usize) -> Result<Option<NaiveDate>> {
    if index >= self.dates.len() {
      return Err(self.out_of_range(index));
    }
    Ok(self.dates.get(index + 1).copied())
  }

  /// Every index with its date, newest first.
  pub fn entries(&self) -> Vec<HistoryEntry> {
    let last = self.dates.len().saturating_sub(1);
    self
      .dates
      .iter()
      .enumerate()
      .map(|(index, &date)| Resolved { index, date, is_oldest: index == last })
      .collect()
  }

  fn out_of_range(&self, index: usize) -> Error {
    Error::OutOfRange {
      entity: self.entity.clone(),
      index,
      len: self.dates.len(),
    }
  }
}
