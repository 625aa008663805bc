//! Errors raised while setting up the catalog client.
//!
//! Failures during a fetch are reported as [`quire_core::fetch::FetchError`]
//! instead, so the poll cycle can handle them per subject.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid catalog url {url:?}: {reason}")]
  InvalidUrl { url: String, reason: String },

  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
