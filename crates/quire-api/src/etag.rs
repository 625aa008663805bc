//! Strong ETags for diff responses.
//!
//! A diff addressed by index is stable until a new version is captured, so
//! clients re-polling the same index can be answered with `304 Not Modified`.

use axum::{
  Json,
  http::{HeaderMap, HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use quire_core::navigate::IndexedDiff;
use sha2::{Digest, Sha256};

/// Compute the ETag of an [`IndexedDiff`] response body.
///
/// Covers everything serialised alongside the diff text, so a shifted index
/// or a new baseline changes the tag.
pub fn compute_etag(diff: &IndexedDiff) -> String {
  let mut hasher = Sha256::new();
  hasher.update(diff.entity.storage_key().as_bytes());
  hasher.update(diff.index.to_le_bytes());
  hasher.update(diff.date.to_string().as_bytes());
  if let Some(prev) = diff.previous {
    hasher.update(prev.to_string().as_bytes());
  }
  hasher.update([u8::from(diff.is_oldest), u8::from(diff.previous_is_oldest)]);
  hasher.update(diff.diff.as_bytes());
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// Whether `If-None-Match` in `headers` matches `etag`.
pub fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
  headers
    .get_all(header::IF_NONE_MATCH)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(','))
    .map(str::trim)
    .any(|candidate| {
      candidate == "*" || candidate.trim_start_matches("W/") == etag
    })
}

/// `200` with the diff as JSON, or `304` when the client already has it.
pub fn respond(headers: &HeaderMap, diff: IndexedDiff) -> Response {
  let etag = compute_etag(&diff);
  let mut res = if if_none_match(headers, &etag) {
    StatusCode::NOT_MODIFIED.into_response()
  } else {
    Json(diff).into_response()
  };
  if let Ok(value) = HeaderValue::from_str(&etag) {
    res.headers_mut().insert(header::ETAG, value);
  }
  res
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use quire_core::entity::Entity;

  use super::*;

  fn diff(text: &str) -> IndexedDiff {
    IndexedDiff {
      entity:             Entity::Roster,
      index:              0,
      date:               NaiveDate::from_ymd_opt(2021, 11, 2).unwrap(),
      previous:           NaiveDate::from_ymd_opt(2021, 11, 1),
      is_oldest:          false,
      previous_is_oldest: true,
      diff:               text.into(),
    }
  }

  #[test]
  fn etag_is_stable_and_quoted() {
    let a = compute_etag(&diff("+Q3\n"));
    assert_eq!(a, compute_etag(&diff("+Q3\n")));
    assert!(a.starts_with('"') && a.ends_with('"'));
    assert_eq!(a.len(), 64 + 2);
  }

  #[test]
  fn etag_tracks_text_and_index() {
    let base = diff("+Q3\n");
    let mut shifted = base.clone();
    shifted.index = 1;
    assert_ne!(compute_etag(&base), compute_etag(&diff("-Q3\n")));
    assert_ne!(compute_etag(&base), compute_etag(&shifted));
  }

  #[test]
  fn if_none_match_accepts_lists_weak_tags_and_wildcard() {
    let etag = compute_etag(&diff("x"));
    let mut headers = HeaderMap::new();
    assert!(!if_none_match(&headers, &etag));

    headers.insert(
      header::IF_NONE_MATCH,
      HeaderValue::from_str(&format!("\"other\", W/{etag}")).unwrap(),
    );
    assert!(if_none_match(&headers, &etag));

    headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
    assert!(if_none_match(&headers, &etag));
  }
}
