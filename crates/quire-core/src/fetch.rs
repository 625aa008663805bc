//! The `Fetcher` trait: how the poll cycle reaches the remote catalog.

use std::{collections::BTreeMap, future::Future, time::Duration};

use thiserror::Error;

/// A failure to obtain content from the remote catalog.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
  #[error("request to {url} failed: {reason}")]
  Request { url: String, reason: String },

  #[error("{url} returned HTTP {status}")]
  Status { url: String, status: u16 },

  #[error("could not extract {what}: {reason}")]
  Parse { what: String, reason: String },

  #[error("timed out after {0:?}")]
  Timeout(Duration),
}

/// Subject name → source locator, as listed by the catalog directory.
pub type RosterListing = BTreeMap<String, String>;

/// A source of roster listings and subject text.
///
/// Implementations return names as the catalog spells them; the poll cycle
/// normalises them.
pub trait Fetcher: Send + Sync {
  fn fetch_roster(
    &self,
  ) -> impl Future<Output = Result<RosterListing, FetchError>> + Send + '_;

  /// Fetch a subject page and reduce it to plain text.
  fn fetch_content<'a>(
    &'a self,
    locator: &'a str,
  ) -> impl Future<Output = Result<String, FetchError>> + Send + 'a;
}
