//! Request extractors whose rejections use the API's `{code, message}` body.

use axum::extract::{FromRequest, rejection::JsonRejection};

use crate::error::ApiError;

/// `axum::Json`, but a malformed or mistyped body becomes
/// [`ApiError::BadRequest`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}
