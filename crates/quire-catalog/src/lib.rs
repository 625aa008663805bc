//! The remote exam catalog, reached over HTTP.
//!
//! [`HttpCatalog`] implements [`Fetcher`]: the directory page becomes the
//! roster listing and each subject page is reduced to plain text by
//! [`html::extract_text`].

pub mod error;
pub mod html;

#[cfg(test)]
mod tests;

use std::time::Duration;

use quire_core::fetch::{FetchError, Fetcher, RosterListing};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

pub use error::{Error, Result};

const USER_AGENT: &str = concat!("quire/", env!("CARGO_PKG_VERSION"));

// ─── Configuration ───────────────────────────────────────────────────────────

/// Where the catalog lives, deserialised from the `[catalog]` config table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
  /// Origin that relative links are resolved against.
  pub base_url:       String,
  /// Path of the directory page, relative to `base_url`.
  pub directory_path: String,
  /// Text trailing every subject name on the directory page.
  pub name_suffix:    String,
}

impl Default for CatalogConfig {
  fn default() -> Self {
    Self {
      base_url:       "https://educationstandards.nsw.edu.au".into(),
      directory_path: "/wps/portal/nesa/resource-finder/hsc-exam-papers/2021/".into(),
      name_suffix:    " 2021 HSC exam pack".into(),
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// HTTP client for the catalog.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpCatalog {
  client:      Client,
  base:        Url,
  directory:   Url,
  name_suffix: String,
  timeout:     Duration,
}

impl HttpCatalog {
  /// Build a client whose every request is bounded by `timeout`.
  pub fn new(config: &CatalogConfig, timeout: Duration) -> Result<Self> {
    let base = Url::parse(&config.base_url).map_err(|e| Error::InvalidUrl {
      url:    config.base_url.clone(),
      reason: e.to_string(),
    })?;
    let directory =
      base.join(&config.directory_path).map_err(|e| Error::InvalidUrl {
        url:    config.directory_path.clone(),
        reason: e.to_string(),
      })?;

    let client = Client::builder()
      .timeout(timeout)
      .user_agent(USER_AGENT)
      .build()?;

    Ok(Self {
      client,
      base,
      directory,
      name_suffix: config.name_suffix.clone(),
      timeout,
    })
  }

  pub fn directory_url(&self) -> &Url { &self.directory }

  async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
    let resp = self
      .client
      .get(url.clone())
      .send()
      .await
      .map_err(|e| self.request_error(url, e))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(FetchError::Status {
        url:    url.to_string(),
        status: status.as_u16(),
      });
    }
    resp.text().await.map_err(|e| self.request_error(url, e))
  }

  fn request_error(&self, url: &Url, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
      FetchError::Timeout(self.timeout)
    } else {
      FetchError::Request { url: url.to_string(), reason: e.to_string() }
    }
  }
}

impl Fetcher for HttpCatalog {
  async fn fetch_roster(&self) -> Result<RosterListing, FetchError> {
    let page = self.get_text(&self.directory).await?;
    let listing = html::parse_directory(&page, &self.base, &self.name_suffix);
    // An empty listing means the page layout changed, not that every
    // subject was withdrawn.
    if listing.is_empty() {
      return Err(FetchError::Parse {
        what:   "directory page".into(),
        reason: "no subjects listed".into(),
      });
    }
    debug!("directory lists {} subjects", listing.len());
    Ok(listing)
  }

  async fn fetch_content<'a>(&'a self, locator: &'a str) -> Result<String, FetchError> {
    let url = self.base.join(locator).map_err(|e| FetchError::Request {
      url:    locator.to_owned(),
      reason: e.to_string(),
    })?;
    let page = self.get_text(&url).await?;
    html::extract_text(&page)
  }
}
