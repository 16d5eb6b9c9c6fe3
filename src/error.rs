//! Gateway error taxonomy and its HTTP mapping.
//!
//! Remote failures are normally recovered by falling back to the local tier
//! and never reach this type; the `Upstream` variant only surfaces for
//! operations with no local fallback (e.g. registration).

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

use crate::remote::RemoteError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
  /// Missing/invalid fields; the operation was aborted with no side effect.
  #[error("validation failed: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Auth(String),

  #[error("not found: {0}")]
  NotFound(String),

  /// Duplicate username and similar uniqueness clashes.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("upstream failure: {0}")]
  Upstream(#[from] RemoteError),

  #[error("local store failure: {0}")]
  Store(#[from] StoreError),
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
      AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
      AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
      AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
      AppError::Upstream(e) => {
        tracing::error!(target: "quizdesk", error = %e, "Upstream failure surfaced to client");
        (StatusCode::BAD_GATEWAY, "upstream unavailable".to_string())
      }
      AppError::Store(e) => {
        tracing::error!(target: "quizdesk", error = %e, "Local store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "local store failure".to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
