//! Error taxonomy for the challenge engine and its HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("invalid range: {0}")]
  InvalidRange(String),

  #[error("validation rejected: {0}")]
  ValidationRejected(String),

  #[error("already completed: {0}")]
  AlreadyCompleted(String),

  #[error("unauthenticated: {0}")]
  Unauthenticated(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<rusqlite::Error> for EngineError {
  fn from(e: rusqlite::Error) -> Self {
    EngineError::Internal(format!("sqlite: {e}"))
  }
}

impl From<serde_json::Error> for EngineError {
  fn from(e: serde_json::Error) -> Self {
    EngineError::Internal(format!("json: {e}"))
  }
}

impl From<std::io::Error> for EngineError {
  fn from(e: std::io::Error) -> Self {
    EngineError::Internal(format!("io: {e}"))
  }
}

impl EngineError {
  pub fn status(&self) -> StatusCode {
    match self {
      EngineError::NotFound(_) => StatusCode::NOT_FOUND,
      EngineError::InvalidRange(_) => StatusCode::BAD_REQUEST,
      EngineError::ValidationRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
      EngineError::AlreadyCompleted(_) => StatusCode::CONFLICT,
      EngineError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
      EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      EngineError::NotFound(_) => "not_found",
      EngineError::InvalidRange(_) => "invalid_range",
      EngineError::ValidationRejected(_) => "validation_rejected",
      EngineError::AlreadyCompleted(_) => "already_completed",
      EngineError::Unauthenticated(_) => "unauthenticated",
      EngineError::Internal(_) => "internal",
    }
  }
}

/// JSON body returned on error.
#[derive(Serialize)]
struct ErrorBody {
  error: &'static str,
  message: String,
}

impl IntoResponse for EngineError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(target: "challenge", error = %self, "request failed");
    }
    let body = ErrorBody {
      error: self.kind(),
      message: self.to_string(),
    };
    (status, axum::Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn statuses_follow_the_taxonomy() {
    assert_eq!(EngineError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    assert_eq!(
      EngineError::InvalidRange("x".into()).status(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      EngineError::ValidationRejected("x".into()).status(),
      StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
      EngineError::AlreadyCompleted("x".into()).status(),
      StatusCode::CONFLICT
    );
    assert_eq!(
      EngineError::Unauthenticated("x".into()).status(),
      StatusCode::UNAUTHORIZED
    );
    assert_eq!(
      EngineError::Internal("x".into()).status(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }
}
