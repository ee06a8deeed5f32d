//! Handlers for obligation generation and gap filling.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/generate` | Body: `{"date":..}` or `{"from":..,"to":..}` |
//! | `POST` | `/obligations/assign` | Body: `{"date":..}`; assigns unassigned obligations |

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::NaiveDate;
use rounds_core::{Engine, notify::NotificationSink, store::DeliveryStore};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, extract::ApiJson};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GenerateBody {
  Range { from: NaiveDate, to: NaiveDate },
  Day { date: NaiveDate },
}

#[derive(Debug, Serialize)]
pub struct GenerateSummary {
  pub from:    NaiveDate,
  pub to:      NaiveDate,
  pub created: usize,
}

/// `POST /generate`
pub async fn generate<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  ApiJson(body): ApiJson<GenerateBody>,
) -> Result<Json<GenerateSummary>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let (from, to) = match body {
    GenerateBody::Range { from, to } => (from, to),
    GenerateBody::Day { date } => (date, date),
  };
  let created = engine
    .generate_for_range(from, to)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(GenerateSummary { from, to, created }))
}

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct AssignSummary {
  pub date:     NaiveDate,
  pub assigned: usize,
}

/// `POST /obligations/assign`
pub async fn assign<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  ApiJson(body): ApiJson<AssignBody>,
) -> Result<Json<AssignSummary>, ApiError>
where
  S: DeliveryStore + 'static,
  N: NotificationSink + 'static,
{
  let assigned = engine
    .assign_unassigned(body.date)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(AssignSummary { date: body.date, assigned }))
}
