//! [`Engine`]: the operation set exposed to collaborators.
//!
//! Couples a [`DeliveryStore`] with a [`NotificationSink`]. Transport
//! adapters (HTTP, cron) call the engine and nothing else.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  Error,
  cascade::Reassignment,
  coverage::Agent,
  error::Entity,
  lifecycle::{
    Obligation, ObligationState, ProofInput, ReasonCatalogEntry, ReasonInput,
    failure_reason_catalog,
  },
  notify::NotificationSink,
  route::{RoutePlan, optimize_route},
  schedule::dates_between,
  store::DeliveryStore,
};

#[derive(Debug, Clone)]
pub struct Engine<S, N> {
  store:    S,
  notifier: N,
}

impl<S, N> Engine<S, N>
where
  S: DeliveryStore,
  N: NotificationSink,
{
  pub fn new(store: S, notifier: N) -> Self { Self { store, notifier } }

  /// Direct access to the store, for the record-keeping operations that
  /// carry no engine logic (areas, addresses, subscriptions).
  pub fn store(&self) -> &S { &self.store }

  // ── Generation ────────────────────────────────────────────────────────

  /// Create the obligations owed on `date`. Safe to re-run.
  pub async fn generate_for_date(&self, date: NaiveDate) -> Result<usize, S::Error> {
    let created = self.store.generate_for_date(date).await?;
    tracing::info!(%date, created, "generated obligations");
    Ok(created)
  }

  /// Backfill every date in `[from, to]`. Returns the total created.
  pub async fn generate_for_range(
    &self,
    from: NaiveDate,
    to: NaiveDate,
  ) -> Result<usize, S::Error> {
    if from > to {
      return Err(Error::InvalidDateRange { from, to }.into());
    }
    let mut total = 0;
    for date in dates_between(from, to) {
      total += self.generate_for_date(date).await?;
    }
    Ok(total)
  }

  // ── Assignment ────────────────────────────────────────────────────────

  /// The active agent with the lowest id covering `postal_code`.
  pub async fn find_agent_for_postal_code(
    &self,
    postal_code: &str,
  ) -> Result<Option<Agent>, S::Error> {
    let snapshot = self.store.coverage_snapshot().await?;
    Ok(snapshot.resolve(postal_code.trim(), None).cloned())
  }

  pub async fn reassign_agent_area(
    &self,
    agent_id: Uuid,
    new_area_id: Uuid,
  ) -> Result<Reassignment, S::Error> {
    let result = self.store.reassign_agent_area(agent_id, new_area_id).await?;
    tracing::info!(
      %agent_id,
      %new_area_id,
      reassigned = result.reassigned_count,
      "agent area changed"
    );
    Ok(result)
  }

  pub async fn set_agent_active(
    &self,
    agent_id: Uuid,
    active: bool,
  ) -> Result<Reassignment, S::Error> {
    let result = self.store.set_agent_active(agent_id, active).await?;
    tracing::info!(
      %agent_id,
      active,
      unassigned = result.reassigned_count,
      "agent activity changed"
    );
    Ok(result)
  }

  pub async fn assign_unassigned(&self, date: NaiveDate) -> Result<usize, S::Error> {
    let assigned = self.store.assign_unassigned(date).await?;
    tracing::info!(%date, assigned, "filled coverage gaps");
    Ok(assigned)
  }

  // ── Daily work ────────────────────────────────────────────────────────

  pub async fn daily_obligations(
    &self,
    agent_id: Uuid,
    date: NaiveDate,
  ) -> Result<Vec<Obligation>, S::Error> {
    self.require_agent(agent_id).await?;
    self.store.daily_obligations(agent_id, date).await
  }

  /// Visiting order for the agent's open obligations on `date`.
  pub async fn optimize_route(
    &self,
    agent_id: Uuid,
    date: NaiveDate,
  ) -> Result<RoutePlan, S::Error> {
    self.require_agent(agent_id).await?;
    let stops = self.store.route_stops(agent_id, date).await?;
    let plan = optimize_route(stops);
    tracing::debug!(
      %agent_id,
      %date,
      stops = plan.stops.len(),
      km = plan.total_distance_km,
      "route optimised"
    );
    Ok(plan)
  }

  async fn require_agent(&self, agent_id: Uuid) -> Result<Agent, S::Error> {
    self
      .store
      .get_agent(agent_id)
      .await?
      .ok_or_else(|| Error::not_found(Entity::Agent, agent_id).into())
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────

  pub async fn start_obligation(&self, id: Uuid, agent_id: Uuid) -> Result<Obligation, S::Error> {
    self.store.start_obligation(id, agent_id).await
  }

  /// Mark delivered and notify the customer.
  pub async fn complete_obligation(
    &self,
    id: Uuid,
    agent_id: Uuid,
    proof: Option<ProofInput>,
  ) -> Result<Obligation, S::Error> {
    let obligation = self.store.complete_obligation(id, agent_id, proof).await?;
    self.announce(&obligation).await;
    Ok(obligation)
  }

  /// Mark failed and notify the customer.
  pub async fn fail_obligation(
    &self,
    id: Uuid,
    agent_id: Uuid,
    reason: ReasonInput,
  ) -> Result<Obligation, S::Error> {
    let obligation = self.store.fail_obligation(id, agent_id, reason).await?;
    self.announce(&obligation).await;
    Ok(obligation)
  }

  pub fn list_failure_reason_codes(&self) -> Vec<ReasonCatalogEntry> { failure_reason_catalog() }

  /// Hand a terminal transition to the notifier. Never fails: the
  /// transition has already committed.
  async fn announce(&self, obligation: &Obligation) {
    let subscription = match self.store.get_subscription(obligation.subscription_id).await {
      Ok(Some(s)) => s,
      Ok(None) => {
        tracing::warn!(
          obligation_id = %obligation.obligation_id,
          subscription_id = %obligation.subscription_id,
          "subscription missing; notification skipped"
        );
        return;
      }
      Err(e) => {
        tracing::warn!(
          obligation_id = %obligation.obligation_id,
          error = %e,
          "could not load subscription; notification skipped"
        );
        return;
      }
    };

    match &obligation.state {
      ObligationState::Delivered { .. } => self.notifier.notify_delivery_completed(
        subscription.customer_id,
        obligation.obligation_id,
        subscription.products,
      ),
      ObligationState::Failed { reason, .. } => self.notifier.notify_delivery_failed(
        subscription.customer_id,
        obligation.obligation_id,
        reason.text(),
      ),
      _ => {}
    }
  }
}
