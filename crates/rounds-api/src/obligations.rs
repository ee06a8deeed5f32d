//! Handlers for `/obligations` and the failure reason catalog.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/obligations/{id}` | Single obligation |
//! | `POST` | `/obligations/{id}/start` | Body: `{"agent_id":..}` |
//! | `POST` | `/obligations/{id}/complete` | Body: `{"agent_id":..,"proof":{..}}` |
//! | `POST` | `/obligations/{id}/fail` | Body: `{"agent_id":..,"code":..,"note":..}` |
//! | `GET`  | `/failure-reasons` | The fixed catalog |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use rounds_core::{
  Engine,
  lifecycle::{Obligation, ProofInput, ReasonCatalogEntry, ReasonInput},
  notify::NotificationSink,
  store::DeliveryStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, extract::ApiJson};

/// `GET /obligations/{id}`
pub async fn get_one<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Obligation>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let obligation = engine
    .store()
    .get_obligation(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("obligation {id} not found")))?;
  Ok(Json(obligation))
}

#[derive(Debug, Deserialize)]
pub struct StartBody {
  pub agent_id: Uuid,
}

/// `POST /obligations/{id}/start`
pub async fn start<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
  ApiJson(body): ApiJson<StartBody>,
) -> Result<Json<Obligation>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let obligation = engine
    .start_obligation(id, body.agent_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(obligation))
}

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
  pub agent_id: Uuid,
  /// Missing proof is rejected by the lifecycle, not by deserialisation.
  pub proof:    Option<ProofInput>,
}

/// `POST /obligations/{id}/complete`
pub async fn complete<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
  ApiJson(body): ApiJson<CompleteBody>,
) -> Result<Json<Obligation>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let obligation = engine
    .complete_obligation(id, body.agent_id, body.proof)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(obligation))
}

#[derive(Debug, Deserialize)]
pub struct FailBody {
  pub agent_id: Uuid,
  #[serde(flatten)]
  pub reason:   ReasonInput,
}

/// `POST /obligations/{id}/fail`
pub async fn fail<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
  ApiJson(body): ApiJson<FailBody>,
) -> Result<Json<Obligation>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let obligation = engine
    .fail_obligation(id, body.agent_id, body.reason)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(obligation))
}

/// `GET /failure-reasons`
pub async fn failure_reasons<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
) -> Json<Vec<ReasonCatalogEntry>>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  Json(engine.list_failure_reason_codes())
}
