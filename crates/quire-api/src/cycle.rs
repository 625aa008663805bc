//! Handlers for poll-cycle status and manual reruns.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/status` | Last success, seconds elapsed, running, rerun allowed |
//! | `POST` | `/rerun` | `202` accepted, `429` too soon, `409` already running |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use quire_core::{
  cycle::{CycleStatus, Monitor, RejectReason, TriggerDecision},
  fetch::Fetcher,
  store::SnapshotStore,
};
use serde_json::json;

use crate::error::ApiError;

/// `GET /status`
pub async fn status<S, F>(
  State(monitor): State<Monitor<S, F>>,
) -> Result<Json<CycleStatus>, ApiError>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  Ok(Json(monitor.status().await?))
}

/// `POST /rerun`
pub async fn rerun<S, F>(
  State(monitor): State<Monitor<S, F>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  match monitor.trigger_if_allowed().await? {
    TriggerDecision::Accepted => {
      Ok((StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))))
    }
    TriggerDecision::Rejected(reason @ RejectReason::ThresholdNotElapsed { remaining_secs }) => {
      Err(ApiError::TooManyRequests {
        message:          reason.to_string(),
        retry_after_secs: remaining_secs,
      })
    }
    TriggerDecision::Rejected(reason @ RejectReason::AlreadyRunning) => {
      Err(ApiError::Conflict(reason.to_string()))
    }
  }
}
