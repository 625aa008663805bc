//! Async HTTP client wrapping the Quire JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use quire_core::{
  cycle::CycleStatus,
  entity::Slug,
  history::HistoryEntry,
  navigate::{IndexedDiff, RosterSummary},
};
use reqwest::{Client, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Connection settings for the Quire API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// What the server did with a rerun request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RerunOutcome {
  Accepted,
  Throttled { message: String, retry_after_secs: Option<u64> },
  AlreadyRunning(String),
}

/// Async HTTP client for the Quire JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T> {
    debug!("GET {path}");
    let resp = self
      .client
      .get(self.url(path))
      .query(query)
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;

    if !resp.status().is_success() {
      let status = resp.status();
      return Err(anyhow!("GET {path} → {status}: {}", error_message(resp).await));
    }
    resp
      .json()
      .await
      .with_context(|| format!("deserialising GET {path}"))
  }

  // ── Roster ────────────────────────────────────────────────────────────────

  /// `GET /api/roster`
  pub async fn roster(&self) -> Result<RosterSummary> {
    self.get_json("/roster", &[]).await
  }

  // ── History and diffs ─────────────────────────────────────────────────────

  /// `GET /api/roster/history` or `GET /api/subjects/{slug}/history`
  pub async fn history(&self, subject: Option<&str>) -> Result<Vec<HistoryEntry>> {
    let path = format!("{}/history", entity_path(subject)?);
    self.get_json(&path, &[]).await
  }

  /// `GET /api/roster/diff?index=N` or `GET /api/subjects/{slug}/diff?index=N`
  pub async fn diff(&self, subject: Option<&str>, index: usize) -> Result<IndexedDiff> {
    let path = format!("{}/diff", entity_path(subject)?);
    self.get_json(&path, &[("index", index.to_string())]).await
  }

  // ── Poll cycle ────────────────────────────────────────────────────────────

  /// `GET /api/status`
  pub async fn status(&self) -> Result<CycleStatus> {
    self.get_json("/status", &[]).await
  }

  /// `POST /api/rerun`
  pub async fn rerun(&self) -> Result<RerunOutcome> {
    let resp = self
      .client
      .post(self.url("/rerun"))
      .send()
      .await
      .context("POST /rerun failed")?;

    match resp.status() {
      StatusCode::ACCEPTED => Ok(RerunOutcome::Accepted),
      StatusCode::TOO_MANY_REQUESTS => {
        let retry_after_secs = resp
          .headers()
          .get(header::RETRY_AFTER)
          .and_then(|v| v.to_str().ok())
          .and_then(|v| v.parse().ok());
        Ok(RerunOutcome::Throttled {
          message: error_message(resp).await,
          retry_after_secs,
        })
      }
      StatusCode::CONFLICT => Ok(RerunOutcome::AlreadyRunning(error_message(resp).await)),
      status => Err(anyhow!("POST /rerun → {status}: {}", error_message(resp).await)),
    }
  }
}

/// `/roster` when no subject is given, else `/subjects/{slug}`.
///
/// Accepts either a display name ("Modern History") or a slug.
fn entity_path(subject: Option<&str>) -> Result<String> {
  match subject {
    None => Ok("/roster".into()),
    Some(name) => {
      let slug = Slug::from_name(name).with_context(|| format!("{name:?} is not a subject"))?;
      Ok(format!("/subjects/{slug}"))
    }
  }
}

/// The `error` field of a JSON error body, or the raw body.
async fn error_message(resp: Response) -> String {
  let text = resp.text().await.unwrap_or_default();
  serde_json::from_str::<serde_json::Value>(&text)
    .ok()
    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
    .unwrap_or(text)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn subjects_are_addressed_by_slug() {
    assert_eq!(entity_path(None).unwrap(), "/roster");
    assert_eq!(entity_path(Some("Modern History")).unwrap(), "/subjects/modern-history");
    assert_eq!(entity_path(Some("modern-history")).unwrap(), "/subjects/modern-history");
    assert!(entity_path(Some("///")).is_err());
  }

  #[test]
  fn urls_are_rooted_at_api() {
    let client = ApiClient::new(ApiConfig { base_url: "http://localhost:8080/".into() }).unwrap();
    assert_eq!(client.url("/status"), "http://localhost:8080/api/status");
  }
}
