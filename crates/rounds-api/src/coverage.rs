//! Handlers for coverage areas, agents and postal-code resolution.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/coverage/resolve` | `?postal_code` required |
//! | `GET`  | `/areas` | All areas, by name |
//! | `POST` | `/areas` | Body: [`NewArea`]; returns 201 |
//! | `GET`  | `/areas/{id}` | Single area |
//! | `GET`  | `/agents` | All agents |
//! | `POST` | `/agents` | Body: [`NewAgent`]; returns 201 |
//! | `GET`  | `/agents/{id}` | Single agent |
//! | `POST` | `/agents/{id}/area` | Body: `{"area_id":..}`; runs the cascade |
//! | `POST` | `/agents/{id}/active` | Body: `{"active":bool}` |
//! | `GET`  | `/agents/{id}/obligations` | `?date`, defaults to today |
//! | `GET`  | `/agents/{id}/route` | `?date`, defaults to today |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{NaiveDate, Utc};
use rounds_core::{
  Engine,
  cascade::Reassignment,
  coverage::{Agent, CoverageArea, NewAgent, NewArea},
  lifecycle::Obligation,
  notify::NotificationSink,
  route::RoutePlan,
  store::DeliveryStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, extract::ApiJson};

// ─── Resolve ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
  pub postal_code: String,
}

#[derive(Debug, Serialize)]
pub struct Resolution {
  pub postal_code: String,
  /// `null` when no active agent covers the code.
  pub agent:       Option<Agent>,
}

/// `GET /coverage/resolve?postal_code=<code>`
pub async fn resolve<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Query(params): Query<ResolveParams>,
) -> Result<Json<Resolution>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let postal_code = params.postal_code.trim().to_owned();
  if postal_code.is_empty() {
    return Err(ApiError::BadRequest("postal_code must not be empty".into()));
  }
  let agent = engine
    .find_agent_for_postal_code(&postal_code)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Resolution { postal_code, agent }))
}

// ─── Areas ────────────────────────────────────────────────────────────────────

/// `GET /areas`
pub async fn list_areas<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
) -> Result<Json<Vec<CoverageArea>>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let areas = engine.store().list_areas().await.map_err(ApiError::store)?;
  Ok(Json(areas))
}

/// `POST /areas`
pub async fn create_area<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  ApiJson(body): ApiJson<NewArea>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let area = engine.store().create_area(body).await.map_err(ApiError::store)?;
  tracing::info!(area_id = %area.area_id, codes = area.postal_codes.len(), "area created");
  Ok((StatusCode::CREATED, Json(area)))
}

/// `GET /areas/{id}`
pub async fn get_area<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CoverageArea>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let area = engine
    .store()
    .get_area(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("area {id} not found")))?;
  Ok(Json(area))
}

// ─── Agents ───────────────────────────────────────────────────────────────────

/// `GET /agents`
pub async fn list_agents<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
) -> Result<Json<Vec<Agent>>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let agents = engine.store().list_agents().await.map_err(ApiError::store)?;
  Ok(Json(agents))
}

/// `POST /agents`: the area must exist.
pub async fn create_agent<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  ApiJson(body): ApiJson<NewAgent>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let agent = engine.store().create_agent(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(agent)))
}

/// `GET /agents/{id}`
pub async fn get_agent<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Agent>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let agent = engine
    .store()
    .get_agent(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("agent {id} not found")))?;
  Ok(Json(agent))
}

#[derive(Debug, Deserialize)]
pub struct AreaBody {
  pub area_id: Uuid,
}

/// `POST /agents/{id}/area`: moves the agent and cascades its pending work.
pub async fn reassign_area<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
  ApiJson(body): ApiJson<AreaBody>,
) -> Result<Json<Reassignment>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let result = engine
    .reassign_agent_area(id, body.area_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub active: bool,
}

/// `POST /agents/{id}/active`
pub async fn set_active<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
  ApiJson(body): ApiJson<ActiveBody>,
) -> Result<Json<Reassignment>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let result = engine
    .set_agent_active(id, body.active)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(result))
}

#[derive(Debug, Deserialize, Default)]
pub struct DateParams {
  pub date: Option<NaiveDate>,
}

impl DateParams {
  fn or_today(&self) -> NaiveDate { self.date.unwrap_or_else(|| Utc::now().date_naive()) }
}

/// `GET /agents/{id}/obligations[?date=YYYY-MM-DD]`
pub async fn daily_obligations<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
  Query(params): Query<DateParams>,
) -> Result<Json<Vec<Obligation>>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let obligations = engine
    .daily_obligations(id, params.or_today())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(obligations))
}

/// `GET /agents/{id}/route[?date=YYYY-MM-DD]`
pub async fn route<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  Path(id): Path<Uuid>,
  Query(params): Query<DateParams>,
) -> Result<Json<RoutePlan>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let plan = engine
    .optimize_route(id, params.or_today())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(plan))
}
