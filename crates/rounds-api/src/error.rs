//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rounds_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// A business-rule rejection from the engine.
  #[error("{message}")]
  Rejected {
    status:  StatusCode,
    code:    &'static str,
    message: String,
  },

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store error: business rejections keep their code, anything
  /// else is an internal fault.
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.as_core() {
      Some(core) => Self::core(core),
      None => {
        tracing::error!(error = %e, "store fault");
        ApiError::Store(Box::new(e))
      }
    }
  }

  pub fn core(e: &rounds_core::Error) -> Self {
    ApiError::Rejected {
      status:  status_for(e),
      code:    e.code(),
      message: e.to_string(),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Rejected { status, .. } => *status,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn code(&self) -> &'static str {
    match self {
      ApiError::Rejected { code, .. } => code,
      ApiError::NotFound(_) => "not_found",
      ApiError::BadRequest(_) => "bad_request",
      ApiError::Store(_) => "internal",
    }
  }
}

impl From<rounds_core::Error> for ApiError {
  fn from(e: rounds_core::Error) -> Self { ApiError::core(&e) }
}

fn status_for(e: &rounds_core::Error) -> StatusCode {
  use rounds_core::Error as E;
  match e {
    E::NotFound { .. } | E::InvalidArea(_) => StatusCode::NOT_FOUND,
    E::Unauthorized { .. } => StatusCode::FORBIDDEN,
    E::InvalidTransition { .. } | E::AlreadyTerminal(..) | E::SubscriptionCancelled(_) => {
      StatusCode::CONFLICT
    }
    E::MissingProof
    | E::MissingReason
    | E::InvalidReasonCode(_)
    | E::EmptyArea
    | E::InvalidPauseWindow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    E::InvalidDateRange { .. } => StatusCode::BAD_REQUEST,
    // Only produced when decoding stored rows.
    E::UnknownDiscriminant { .. } => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = json!({ "code": self.code(), "message": self.to_string() });
    (self.status(), Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn guards_map_to_distinct_statuses() {
    let id = Uuid::new_v4();
    let cases = [
      (rounds_core::Error::InvalidArea(id), StatusCode::NOT_FOUND),
      (
        rounds_core::Error::Unauthorized { obligation: id, acting: id },
        StatusCode::FORBIDDEN,
      ),
      (rounds_core::Error::AlreadyTerminal(id, "delivered"), StatusCode::CONFLICT),
      (rounds_core::Error::MissingProof, StatusCode::UNPROCESSABLE_ENTITY),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).status(), status);
    }
  }
}
