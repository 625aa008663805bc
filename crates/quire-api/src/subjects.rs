//! Handlers for `/subjects/{slug}` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects/{slug}` | Latest content plus catalog locator |
//! | `GET`  | `/subjects/{slug}/history` | 404 for a subject never captured |
//! | `GET`  | `/subjects/{slug}/diff` | `?index=N` (default 0); ETag-aware |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::HeaderMap,
  response::Response,
};
use chrono::NaiveDate;
use quire_core::{
  cycle::Monitor,
  entity::{Entity, Slug},
  fetch::Fetcher,
  history::HistoryEntry,
  navigate,
  store::SnapshotStore,
};
use serde::{Deserialize, Serialize};

use crate::{DiffParams, error::ApiError, etag};

/// The newest capture of a subject.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubjectView {
  pub slug:        Slug,
  /// Display name and catalog locator, when the subject is still listed.
  pub name:        Option<String>,
  pub locator:     Option<String>,
  pub captured_on: NaiveDate,
  pub content:     String,
}

fn subject(raw: &str) -> Result<Slug, ApiError> { Ok(Slug::parse(raw)?) }

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /subjects/{slug}`
pub async fn get_one<S, F>(
  State(monitor): State<Monitor<S, F>>,
  Path(raw): Path<String>,
) -> Result<Json<SubjectView>, ApiError>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  let slug = subject(&raw)?;
  let store = monitor.store().as_ref();

  let latest = navigate::latest(store, Entity::Subject(slug.clone())).await?;
  let locator = store
    .get_locator(slug.clone())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let (name, locator) = match locator {
    Some(l) => (Some(l.name), Some(l.locator)),
    None => (None, None),
  };
  Ok(Json(SubjectView {
    slug,
    name,
    locator,
    captured_on: latest.captured_on,
    content: latest.content,
  }))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /subjects/{slug}/history`
pub async fn history<S, F>(
  State(monitor): State<Monitor<S, F>>,
  Path(raw): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  let entity = Entity::Subject(subject(&raw)?);
  let entries = navigate::history_indices(monitor.store().as_ref(), entity).await?;
  Ok(Json(entries))
}

// ─── Diff ─────────────────────────────────────────────────────────────────────

/// `GET /subjects/{slug}/diff[?index=N]`
pub async fn diff<S, F>(
  State(monitor): State<Monitor<S, F>>,
  Path(raw): Path<String>,
  Query(params): Query<DiffParams>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  let entity = Entity::Subject(subject(&raw)?);
  let diff =
    navigate::diff_for_index(monitor.store().as_ref(), entity, params.index).await?;
  Ok(etag::respond(&headers, diff))
}
