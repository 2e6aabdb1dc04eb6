//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use shelfmark_core::{DomainError, Error as CoreError};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Missing or malformed identity headers.
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error(transparent)]
  Domain(#[from] CoreError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Split a backend error into the domain failure it carries, if any, or an
  /// opaque internal error.
  pub fn store<E: DomainError>(e: E) -> Self {
    match e.domain() {
      Some(domain) => Self::Domain(domain.clone()),
      None => Self::Store(Box::new(e)),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      ApiError::Domain(e) => match e {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn domain_errors_map_to_client_statuses() {
    let cases = [
      (CoreError::Validation("x".into()), StatusCode::BAD_REQUEST),
      (CoreError::Forbidden("x".into()), StatusCode::FORBIDDEN),
      (CoreError::not_found("book", "1"), StatusCode::NOT_FOUND),
      (CoreError::Conflict("x".into()), StatusCode::CONFLICT),
      (CoreError::Integrity("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).status(), status);
    }
  }

  #[test]
  fn opaque_store_failures_are_internal() {
    let err = ApiError::Store("disk on fire".into());
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
