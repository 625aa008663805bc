//! JSON REST API for Quire.
//!
//! Exposes an axum [`Router`] over the read surface and the rerun trigger of
//! a [`Monitor`]. TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", quire_api::api_router(monitor.clone()))
//! ```

pub mod cycle;
pub mod error;
pub mod etag;
pub mod roster;
pub mod subjects;


use axum::{
  Router,
  routing::{get, post},
};
use quire_core::{cycle::Monitor, fetch::Fetcher, store::SnapshotStore};
use serde::Deserialize;

pub use error::ApiError;

/// Query string of the diff endpoints.
///
/// Negative or non-numeric indices fail extraction with `400`.
#[derive(Debug, Default, Deserialize)]
pub struct DiffParams {
  #[serde(default)]
  pub index: usize,
}

/// Build a fully-materialised API router for `monitor`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, F>(monitor: Monitor<S, F>) -> Router<()>
where
  S: SnapshotStore + 'static,
  F: Fetcher + 'static,
{
  Router::new()
    // Roster
    .route("/roster", get(roster::summary::<S, F>))
    .route("/roster/history", get(roster::history::<S, F>))
    .route("/roster/diff", get(roster::diff::<S, F>))
    // Subjects
    .route("/subjects/{slug}", get(subjects::get_one::<S, F>))
    .route("/subjects/{slug}/history", get(subjects::history::<S, F>))
    .route("/subjects/{slug}/diff", get(subjects::diff::<S, F>))
    // Poll cycle
    .route("/status", get(cycle::status::<S, F>))
    .route("/rerun", post(cycle::rerun::<S, F>))
    .with_state(monitor)
}
