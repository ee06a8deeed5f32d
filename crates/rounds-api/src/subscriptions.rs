//! Handlers for `/addresses` and `/subscriptions`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/addresses` | Body: [`NewAddress`]; returns 201 |
//! | `GET`  | `/addresses/{id}` | Single address |
//! | `POST` | `/subscriptions` | Body: [`NewSubscription`]; returns 201 |
//! | `GET`  | `/subscriptions/{id}` | Single subscription |
//! | `POST` | `/subscriptions/{id}/pause` | Body: `{"start":..,"end":..}` |
//! | `POST` | `/subscriptions/{id}/resume` | |
//! | `POST` | `/subscriptions/{id}/cancel` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use rounds_core::{
  Engine,
  notify::NotificationSink,
  store::DeliveryStore,
  subscription::{Address, NewAddress, NewSubscription, PauseWindow, Subscription},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, extract::ApiJson};

/// `POST /addresses`
pub async fn create_address<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  ApiJson(body): ApiJson<NewAddress>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  if body.postal_code.trim().is_empty() {
    return Err(ApiError::BadRequest("postal_code must not be empty".into()));
  }
  if body.location.is_some_and(|p| !p.is_valid()) {
    return Err(ApiError::BadRequest("location is out of range".into()));
  }
  let address = engine.store().create_address(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(address)))
}

/// `GET /addresses/{id}`
pub async fn get_address<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Address>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let address = engine
    .store()
    .get_address(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("address {id} not found")))?;
  Ok(Json(address))
}

/// `POST /subscriptions`: the address must exist.
pub async fn create<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  ApiJson(body): ApiJson<NewSubscription>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let subscription = engine
    .store()
    .create_subscription(body)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(
    subscription_id = %subscription.subscription_id,
    recurrence = %subscription.recurrence,
    "subscription created"
  );
  Ok((StatusCode::CREATED, Json(subscription)))
}

/// `GET /subscriptions/{id}`
pub async fn get_one<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let subscription = engine
    .store()
    .get_subscription(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subscription {id} not found")))?;
  Ok(Json(subscription))
}

#[derive(Debug, Deserialize)]
pub struct PauseBody {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

/// `POST /subscriptions/{id}/pause`: both bounds inclusive.
pub async fn pause<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
  ApiJson(body): ApiJson<PauseBody>,
) -> Result<Json<Subscription>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let window = PauseWindow::new(body.start, body.end)?;
  let subscription = engine
    .store()
    .pause_subscription(id, window)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subscription))
}

/// `POST /subscriptions/{id}/resume`
pub async fn resume<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let subscription = engine
    .store()
    .resume_subscription(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subscription))
}

/// `POST /subscriptions/{id}/cancel`: permanent.
pub async fn cancel<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let subscription = engine
    .store()
    .cancel_subscription(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subscription))
}
