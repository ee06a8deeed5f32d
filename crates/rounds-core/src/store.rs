//! The `DeliveryStore` trait.
//!
//! Implemented by storage backends (e.g. `rounds-store-sqlite`). The
//! [`Engine`](crate::engine::Engine) and the HTTP adapter depend on this
//! abstraction, not on any concrete backend.
//!
//! Every method that writes more than one record must commit all of its
//! writes or none of them.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  cascade::Reassignment,
  coverage::{Agent, CoverageArea, CoverageSnapshot, NewAgent, NewArea},
  lifecycle::{Obligation, ProofInput, ReasonInput},
  route::RouteStop,
  subscription::{Address, NewAddress, NewSubscription, PauseWindow, Subscription},
};

/// Error type of a store. Business-rule rejections travel as
/// [`crate::Error`] inside it so adapters can classify them.
pub trait StoreError: std::error::Error + Send + Sync + 'static + From<crate::Error> {
  /// The business-rule rejection behind this error, if it is one.
  fn as_core(&self) -> Option<&crate::Error>;
}

/// Abstraction over a delivery store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait DeliveryStore: Send + Sync {
  type Error: StoreError;

  // ── Coverage ──────────────────────────────────────────────────────────

  fn create_area(
    &self,
    input: NewArea,
  ) -> impl Future<Output = Result<CoverageArea, Self::Error>> + Send + '_;

  fn get_area(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CoverageArea>, Self::Error>> + Send + '_;

  fn list_areas(&self) -> impl Future<Output = Result<Vec<CoverageArea>, Self::Error>> + Send + '_;

  /// Create an active agent. Fails with `InvalidArea` if the area is absent.
  fn create_agent(
    &self,
    input: NewAgent,
  ) -> impl Future<Output = Result<Agent, Self::Error>> + Send + '_;

  fn get_agent(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Agent>, Self::Error>> + Send + '_;

  fn list_agents(&self) -> impl Future<Output = Result<Vec<Agent>, Self::Error>> + Send + '_;

  /// Every area and agent, read in one go.
  fn coverage_snapshot(
    &self,
  ) -> impl Future<Output = Result<CoverageSnapshot, Self::Error>> + Send + '_;

  /// Move an agent to another area and re-resolve its pending obligations
  /// that the new area no longer covers.
  fn reassign_agent_area(
    &self,
    agent_id: Uuid,
    new_area_id: Uuid,
  ) -> impl Future<Output = Result<Reassignment, Self::Error>> + Send + '_;

  /// Flip an agent's active flag. Deactivation unassigns every pending
  /// obligation of the agent; the returned count is how many.
  fn set_agent_active(
    &self,
    agent_id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<Reassignment, Self::Error>> + Send + '_;

  // ── Addresses & subscriptions ─────────────────────────────────────────

  fn create_address(
    &self,
    input: NewAddress,
  ) -> impl Future<Output = Result<Address, Self::Error>> + Send + '_;

  fn get_address(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Address>, Self::Error>> + Send + '_;

  /// Create an active subscription. The address must exist.
  fn create_subscription(
    &self,
    input: NewSubscription,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;

  fn get_subscription(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;

  fn pause_subscription(
    &self,
    id: Uuid,
    window: PauseWindow,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;

  fn resume_subscription(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;

  fn cancel_subscription(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;

  // ── Obligations ───────────────────────────────────────────────────────

  /// Create the obligations owed on `date` that do not exist yet, resolving
  /// each one's agent. Returns how many were created.
  fn generate_for_date(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Assign unassigned pending obligations on `date` that some active agent
  /// now covers. Returns how many were assigned.
  fn assign_unassigned(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn get_obligation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Obligation>, Self::Error>> + Send + '_;

  /// Every obligation assigned to `agent_id` on `date`, in creation order.
  fn daily_obligations(
    &self,
    agent_id: Uuid,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Obligation>, Self::Error>> + Send + '_;

  /// The agent's non-terminal obligations on `date` with their delivery
  /// locations, in creation order.
  fn route_stops(
    &self,
    agent_id: Uuid,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<RouteStop>, Self::Error>> + Send + '_;

  fn start_obligation(
    &self,
    id: Uuid,
    agent_id: Uuid,
  ) -> impl Future<Output = Result<Obligation, Self::Error>> + Send + '_;

  fn complete_obligation(
    &self,
    id: Uuid,
    agent_id: Uuid,
    proof: Option<ProofInput>,
  ) -> impl Future<Output = Result<Obligation, Self::Error>> + Send + '_;

  fn fail_obligation(
    &self,
    id: Uuid,
    agent_id: Uuid,
    reason: ReasonInput,
  ) -> impl Future<Output = Result<Obligation, Self::Error>> + Send + '_;
}
