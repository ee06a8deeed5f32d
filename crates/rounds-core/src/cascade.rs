//! Planning for the reassignment cascade.
//!
//! Planning is pure: given a [`CoverageSnapshot`] and the pending obligations
//! affected by a coverage change, it returns the assignment changes to apply.
//! The store applies them, together with the agent update, in one
//! transaction.
//!
//! After a plan is applied no pending obligation points at an agent whose
//! area excludes its delivery address.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coverage::{Agent, CoverageSnapshot};

/// A pending obligation together with the postal code it is delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStop {
  pub obligation_id: Uuid,
  pub postal_code:   String,
}

/// One assignment change: `obligation_id` moves to `to` (or to nobody).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentChange {
  pub obligation_id: Uuid,
  pub from:          Option<Uuid>,
  pub to:            Option<Uuid>,
}

/// Result of a coverage-area change for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reassignment {
  pub agent:            Agent,
  pub reassigned_count: usize,
}

/// Plan the cascade for `agent_id` moving to `new_area_id`.
///
/// `pending` must be the agent's pending obligations. Stops the new area
/// still covers are left alone; every other stop is re-resolved against the
/// snapshot with the moving agent excluded, and becomes unassigned when no
/// one else covers it.
pub fn plan_reassignment(
  snapshot: &CoverageSnapshot,
  agent_id: Uuid,
  new_area_id: Uuid,
  pending: &[PendingStop],
) -> Vec<AssignmentChange> {
  pending
    .iter()
    .filter(|stop| !snapshot.area_covers(new_area_id, &stop.postal_code))
    .map(|stop| AssignmentChange {
      obligation_id: stop.obligation_id,
      from:          Some(agent_id),
      to:            snapshot
        .resolve(&stop.postal_code, Some(agent_id))
        .map(|a| a.agent_id),
    })
    .collect()
}

/// Plan for an agent going inactive: every pending stop is unassigned.
pub fn plan_deactivation(agent_id: Uuid, pending: &[PendingStop]) -> Vec<AssignmentChange> {
  pending
    .iter()
    .map(|stop| AssignmentChange {
      obligation_id: stop.obligation_id,
      from:          Some(agent_id),
      to:            None,
    })
    .collect()
}

/// Plan for closing coverage gaps: each unassigned stop that some active
/// agent now covers is handed to that agent.
pub fn plan_gap_fill(snapshot: &CoverageSnapshot, unassigned: &[PendingStop]) -> Vec<AssignmentChange> {
  unassigned
    .iter()
    .filter_map(|stop| {
      let agent = snapshot.resolve(&stop.postal_code, None)?;
      Some(AssignmentChange {
        obligation_id: stop.obligation_id,
        from:          None,
        to:            Some(agent.agent_id),
      })
    })
    .collect()
}
