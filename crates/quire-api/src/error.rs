//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("too many requests: {message}")]
  TooManyRequests { message: String, retry_after_secs: u64 },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<quire_core::Error> for ApiError {
  fn from(e: quire_core::Error) -> Self {
    use quire_core::Error as E;
    match e {
      E::OutOfRange { .. } | E::UnknownEntity(_) => Self::NotFound(e.to_string()),
      E::InvalidName(_) | E::InvalidSlug(_) => Self::BadRequest(e.to_string()),
      E::MissingVersion { .. } | E::Store(_) => Self::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::TooManyRequests { message, .. } => {
        (StatusCode::TOO_MANY_REQUESTS, message.clone())
      }
      ApiError::Store(e) => {
        tracing::error!("request failed: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if let ApiError::TooManyRequests { retry_after_secs, .. } = self {
      res.headers_mut().insert(
        header::RETRY_AFTER,
        HeaderValue::from(retry_after_secs),
      );
    }
    res
  }
}
