//! Coverage registry types and the assignment resolver.
//!
//! An agent covers exactly one area; an area is a named set of postal codes.
//! Areas may overlap, in which case the active agent with the lowest id wins.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageArea {
  pub area_id:      Uuid,
  pub name:         String,
  pub postal_codes: BTreeSet<String>,
  pub created_at:   DateTime<Utc>,
}

impl CoverageArea {
  pub fn covers(&self, postal_code: &str) -> bool {
    self.postal_codes.contains(postal_code)
  }
}

/// Input for creating a coverage area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArea {
  pub name:         String,
  pub postal_codes: BTreeSet<String>,
}

impl NewArea {
  /// Trim codes, drop blanks, and reject an area that ends up empty.
  pub fn normalized(mut self) -> Result<Self> {
    self.postal_codes = self
      .postal_codes
      .into_iter()
      .map(|c| c.trim().to_owned())
      .filter(|c| !c.is_empty())
      .collect();
    if self.postal_codes.is_empty() {
      return Err(Error::EmptyArea);
    }
    Ok(self)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
  pub agent_id:   Uuid,
  pub name:       String,
  pub area_id:    Uuid,
  pub active:     bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
  pub name:    String,
  pub area_id: Uuid,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// A read-only view of every agent and area, taken at a single instant.
///
/// The cascade resolves against one snapshot for its whole run, so area
/// edits made by concurrent requests are not observed halfway through.
#[derive(Debug, Clone, Default)]
pub struct CoverageSnapshot {
  areas:  BTreeMap<Uuid, CoverageArea>,
  /// Keyed by id so iteration order is the tie-break order.
  agents: BTreeMap<Uuid, Agent>,
}

impl CoverageSnapshot {
  pub fn new(
    areas: impl IntoIterator<Item = CoverageArea>,
    agents: impl IntoIterator<Item = Agent>,
  ) -> Self {
    Self {
      areas:  areas.into_iter().map(|a| (a.area_id, a)).collect(),
      agents: agents.into_iter().map(|a| (a.agent_id, a)).collect(),
    }
  }

  pub fn area(&self, area_id: Uuid) -> Option<&CoverageArea> {
    self.areas.get(&area_id)
  }

  pub fn agent(&self, agent_id: Uuid) -> Option<&Agent> {
    self.agents.get(&agent_id)
  }

  /// Whether `area_id` exists and contains `postal_code`.
  pub fn area_covers(&self, area_id: Uuid, postal_code: &str) -> bool {
    self.area(area_id).is_some_and(|a| a.covers(postal_code))
  }

  /// The active agent with the lowest id whose area contains `postal_code`,
  /// skipping `exclude` if given.
  pub fn resolve(&self, postal_code: &str, exclude: Option<Uuid>) -> Option<&Agent> {
    self.agents.values().find(|agent| {
      agent.active
        && Some(agent.agent_id) != exclude
        && self.area_covers(agent.area_id, postal_code)
    })
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;

  pub fn area(codes: &[&str]) -> CoverageArea {
    CoverageArea {
      area_id:      Uuid::new_v4(),
      name:         format!("area {}", codes.join("/")),
      postal_codes: codes.iter().map(|c| c.to_string()).collect(),
      created_at:   Utc::now(),
    }
  }

  pub fn agent(area: &CoverageArea) -> Agent {
    Agent {
      agent_id:   Uuid::new_v4(),
      name:       "agent".into(),
      area_id:    area.area_id,
      active:     true,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn resolves_covering_agent() {
    let north = area(&["110001", "110002"]);
    let south = area(&["110003"]);
    let a = agent(&north);
    let b = agent(&south);
    let snap = CoverageSnapshot::new([north, south], [a.clone(), b.clone()]);

    assert_eq!(snap.resolve("110002", None).map(|x| x.agent_id), Some(a.agent_id));
    assert_eq!(snap.resolve("110003", None).map(|x| x.agent_id), Some(b.agent_id));
    assert!(snap.resolve("999999", None).is_none());
  }

  #[test]
  fn inactive_agents_are_never_resolved() {
    let zone = area(&["110001"]);
    let mut a = agent(&zone);
    a.active = false;
    let snap = CoverageSnapshot::new([zone], [a]);
    assert!(snap.resolve("110001", None).is_none());
  }

  #[test]
  fn overlapping_areas_pick_lowest_agent_id() {
    let left = area(&["110001"]);
    let right = area(&["110001"]);
    let a = agent(&left);
    let b = agent(&right);
    let lowest = a.agent_id.min(b.agent_id);
    let snap = CoverageSnapshot::new([left, right], [a, b]);

    for _ in 0..3 {
      assert_eq!(snap.resolve("110001", None).map(|x| x.agent_id), Some(lowest));
    }
  }

  #[test]
  fn exclusion_skips_agent() {
    let zone = area(&["110001"]);
    let a = agent(&zone);
    let b = agent(&zone);
    let snap = CoverageSnapshot::new([zone], [a.clone(), b.clone()]);
    let first = snap.resolve("110001", None).unwrap().agent_id;
    let second = snap.resolve("110001", Some(first)).unwrap().agent_id;
    assert_ne!(first, second);
    assert!(second == a.agent_id || second == b.agent_id);
  }

  #[test]
  fn new_area_normalizes_codes() {
    let input = NewArea {
      name:         "central".into(),
      postal_codes: [" 110001 ", "", "110002"].iter().map(|s| s.to_string()).collect(),
    };
    let area = input.normalized().unwrap();
    assert_eq!(area.postal_codes.len(), 2);
    assert!(area.postal_codes.contains("110001"));

    let empty = NewArea { name: "void".into(), postal_codes: ["  ".to_string()].into() };
    assert!(matches!(empty.normalized(), Err(Error::EmptyArea)));
  }
}
