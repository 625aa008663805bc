//! Handlers for `/roster` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/roster` | Added/latest dates per subject on the current roster |
//! | `GET`  | `/roster/history` | Index → capture date, newest first |
//! | `GET`  | `/roster/diff` | `?index=N` (default 0); ETag-aware |

use axum::{
  Json,
  extract::{Query, State},
  http::HeaderMap,
  response::Response,
};
use quire_core::{
  cycle::Monitor,
  entity::Entity,
  fetch::Fetcher,
  history::HistoryEntry,
  navigate::{self, RosterSummary},
  store::SnapshotStore,
};

use crate::{DiffParams, error::ApiError, etag};

/// `GET /roster`
pub async fn summary<S, F>(
  State(monitor): State<Monitor<S, F>>,
) -> Result<Json<RosterSummary>, ApiError>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  let summary = navigate::roster_summary(monitor.store().as_ref()).await?;
  Ok(Json(summary))
}

/// `GET /roster/history`
pub async fn history<S, F>(
  State(monitor): State<Monitor<S, F>>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  let entries =
    navigate::history_indices(monitor.store().as_ref(), Entity::Roster).await?;
  Ok(Json(entries))
}

/// `GET /roster/diff[?index=N]`
pub async fn diff<S, F>(
  State(monitor): State<Monitor<S, F>>,
  Query(params): Query<DiffParams>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  let diff =
    navigate::roster_diff_for_index(monitor.store().as_ref(), params.index).await?;
  Ok(etag::respond(&headers, diff))
}
