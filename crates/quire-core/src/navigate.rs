//! The read surface consumed by presentation layers.
//!
//! Every function here is side-effect free and reads the store afresh, so it
//! may run concurrently with a poll cycle.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  diff::{self, Side},
  entity::{Entity, Slug},
  history::{History, HistoryEntry},
  roster,
  store::SnapshotStore,
  version::Version,
};

/// When a subject first appeared and when it last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
  /// Oldest version of the subject's content.
  pub added:  NaiveDate,
  /// Newest version of the subject's content.
  pub latest: NaiveDate,
}

/// Subject name → [`UpdateSummary`], for every name on the current roster.
pub type RosterSummary = BTreeMap<String, UpdateSummary>;

/// A diff addressed by history index, with the context needed to label it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDiff {
  pub entity:             Entity,
  pub index:              usize,
  pub date:               NaiveDate,
  /// The baseline version, or `None` when `date` is the oldest.
  pub previous:           Option<NaiveDate>,
  pub is_oldest:          bool,
  /// The baseline is itself the oldest version.
  pub previous_is_oldest: bool,
  pub diff:               String,
}

/// Summarise every subject named in the newest roster version.
///
/// Subjects that have no stored content yet (e.g. their first fetch failed)
/// are omitted.
pub async fn roster_summary<S>(store: &S) -> Result<RosterSummary>
where
  S: SnapshotStore,
{
  let Some(current) = store.latest(Entity::Roster).await.map_err(Error::store)?
  else {
    return Ok(RosterSummary::new());
  };

  let mut summary = RosterSummary::new();
  for name in roster::parse(&current.content) {
    let slug = match Slug::from_name(&name) {
      Ok(slug) => slug,
      Err(e) => {
        tracing::warn!("skipping roster entry {name:?}: {e}");
        continue;
      }
    };
    let history = History::load(store, Entity::Subject(slug)).await?;
    if let (Some(added), Some(latest)) = (history.oldest(), history.newest()) {
      summary.insert(name, UpdateSummary { added, latest });
    }
  }
  Ok(summary)
}

/// The index → date mapping of `entity`, newest first.
///
/// A subject without history is unknown; an empty roster history is simply
/// empty.
pub async fn history_indices<S>(
  store: &S,
  entity: Entity,
) -> Result<Vec<HistoryEntry>>
where
  S: SnapshotStore,
{
  let history = History::load(store, entity).await?;
  if history.is_empty() && matches!(history.entity(), Entity::Subject(_)) {
    return Err(Error::UnknownEntity(history.entity().clone()));
  }
  Ok(history.entries())
}

/// Diff the version at `index` against its predecessor, or against an empty
/// baseline when `index` is the oldest.
pub async fn diff_for_index<S>(
  store: &S,
  entity: Entity,
  index: usize,
) -> Result<IndexedDiff>
where
  S: SnapshotStore,
{
  let history = History::load(store, entity.clone()).await?;
  let resolved = history.resolve(index)?;
  let previous = history.predecessor(index)?;

  let next = version_on(store, &entity, resolved.date).await?;
  let next_label = resolved.date.to_string();

  let diff = match previous {
    Some(prev_date) => {
      let prev = version_on(store, &entity, prev_date).await?;
      let prev_label = prev_date.to_string();
      diff::unified(
        Some(Side::new(&prev_label, &prev.content)),
        Side::new(&next_label, &next.content),
      )
    }
    None => diff::unified(None, Side::new(&next_label, &next.content)),
  };

  Ok(IndexedDiff {
    entity,
    index,
    date: resolved.date,
    previous,
    is_oldest: resolved.is_oldest,
    previous_is_oldest: previous.is_some() && index + 2 == history.len(),
    diff,
  })
}

/// [`diff_for_index`] on the roster entity.
pub async fn roster_diff_for_index<S>(store: &S, index: usize) -> Result<IndexedDiff>
where
  S: SnapshotStore,
{
  diff_for_index(store, Entity::Roster, index).await
}

/// The newest version of `entity`.
pub async fn latest<S>(store: &S, entity: Entity) -> Result<Version>
where
  S: SnapshotStore,
{
  store
    .latest(entity.clone())
    .await
    .map_err(Error::store)?
    .ok_or(Error::UnknownEntity(entity))
}

async fn version_on<S>(store: &S, entity: &Entity, date: NaiveDate) -> Result<Version>
where
  S: SnapshotStore,
{
  store
    .get_version(entity.clone(), date)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::MissingVersion { entity: entity.clone(), date })
}
