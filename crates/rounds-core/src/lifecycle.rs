//! Obligations and their lifecycle state machine.
//!
//! ```text
//! pending ──start──▶ in_progress ──complete──▶ delivered
//!    │                    │
//!    └──────complete──────┤
//!    └────────fail────────┴──────fail────────▶ failed
//! ```
//!
//! Proof exists only on `Delivered`, a failure reason only on `Failed`, and a
//! completion timestamp only on those two. The state enum carries them, so no
//! other combination can be built.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumMessage as _, IntoEnumIterator as _};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Proof ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofKind {
  Photo,
  Signature,
}

/// Evidence that a delivery happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
  pub kind:        ProofKind,
  pub url:         String,
  pub captured_at: DateTime<Utc>,
}

/// Proof as submitted by an agent, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofInput {
  pub kind:        ProofKind,
  #[serde(default)]
  pub url:         String,
  /// Defaults to the completion time when absent.
  pub captured_at: Option<DateTime<Utc>>,
}

// ─── Failure reasons ─────────────────────────────────────────────────────────

/// The fixed catalog of reasons an agent may give for a failed delivery.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
  strum::EnumMessage,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureCode {
  #[strum(message = "Customer not available")]
  CustomerUnavailable,
  #[strum(message = "Wrong or incomplete address")]
  WrongAddress,
  #[strum(message = "Customer refused delivery")]
  CustomerRefused,
  #[strum(message = "Could not access the premises")]
  AccessDenied,
  #[strum(message = "Bad weather conditions")]
  Weather,
  #[strum(message = "Vehicle breakdown")]
  VehicleBreakdown,
  #[strum(message = "Other")]
  Other,
}

impl FailureCode {
  pub fn description(self) -> &'static str { self.get_message().unwrap_or("") }
}

/// One entry of [`failure_reason_catalog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCatalogEntry {
  pub code:        FailureCode,
  pub description: String,
}

/// Every accepted failure code with its human-readable description.
pub fn failure_reason_catalog() -> Vec<ReasonCatalogEntry> {
  FailureCode::iter()
    .map(|code| ReasonCatalogEntry {
      code,
      description: code.description().to_owned(),
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
  pub code: FailureCode,
  pub note: Option<String>,
}

impl FailureReason {
  /// Human-readable text for notifications: the description, plus the note
  /// when there is one.
  pub fn text(&self) -> String {
    match self.note.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
      Some(note) => format!("{}: {note}", self.code.description()),
      None => self.code.description().to_owned(),
    }
  }
}

/// A failure reason as submitted by an agent. The code is kept as a raw
/// string so an unknown code is reported as such rather than as a
/// malformed request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReasonInput {
  pub code: Option<String>,
  pub note: Option<String>,
}

impl ReasonInput {
  pub fn validate(self) -> Result<FailureReason> {
    let raw = self
      .code
      .as_deref()
      .map(str::trim)
      .filter(|c| !c.is_empty())
      .ok_or(Error::MissingReason)?;
    let code = raw
      .parse::<FailureCode>()
      .map_err(|_| Error::InvalidReasonCode(raw.to_owned()))?;
    Ok(FailureReason { code, note: self.note })
  }
}

// ─── State ───────────────────────────────────────────────────────────────────

/// The flat status discriminant, used for filtering and storage.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObligationStatus {
  Pending,
  InProgress,
  Delivered,
  Failed,
}

impl ObligationStatus {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Delivered | Self::Failed)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ObligationState {
  Pending,
  InProgress {
    started_at: DateTime<Utc>,
  },
  Delivered {
    proof:        Proof,
    completed_at: DateTime<Utc>,
  },
  Failed {
    reason:       FailureReason,
    completed_at: DateTime<Utc>,
  },
}

impl ObligationState {
  pub fn status(&self) -> ObligationStatus {
    match self {
      Self::Pending => ObligationStatus::Pending,
      Self::InProgress { .. } => ObligationStatus::InProgress,
      Self::Delivered { .. } => ObligationStatus::Delivered,
      Self::Failed { .. } => ObligationStatus::Failed,
    }
  }

  pub fn is_terminal(&self) -> bool { self.status().is_terminal() }

  pub fn completed_at(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::Delivered { completed_at, .. } | Self::Failed { completed_at, .. } => {
        Some(*completed_at)
      }
      _ => None,
    }
  }
}

// ─── Obligation ──────────────────────────────────────────────────────────────

/// One concrete delivery owed on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
  pub obligation_id:   Uuid,
  pub subscription_id: Uuid,
  pub delivery_date:   NaiveDate,
  /// `None` means nobody covers the address yet.
  pub agent_id:        Option<Uuid>,
  #[serde(flatten)]
  pub state:           ObligationState,
  pub created_at:      DateTime<Utc>,
}

impl Obligation {
  pub fn new(subscription_id: Uuid, delivery_date: NaiveDate, agent_id: Option<Uuid>) -> Self {
    Self {
      obligation_id: Uuid::new_v4(),
      subscription_id,
      delivery_date,
      agent_id,
      state: ObligationState::Pending,
      created_at: Utc::now(),
    }
  }

  pub fn status(&self) -> ObligationStatus { self.state.status() }

  fn authorize(&self, acting: Uuid) -> Result<()> {
    if self.agent_id != Some(acting) {
      return Err(Error::Unauthorized {
        obligation: self.obligation_id,
        acting,
      });
    }
    Ok(())
  }

  fn ensure_open(&self) -> Result<()> {
    let status = self.status();
    if status.is_terminal() {
      return Err(Error::AlreadyTerminal(self.obligation_id, status.into()));
    }
    Ok(())
  }

  /// `pending → in_progress`.
  pub fn start(&mut self, acting: Uuid, now: DateTime<Utc>) -> Result<()> {
    self.authorize(acting)?;
    if self.status() != ObligationStatus::Pending {
      return Err(Error::InvalidTransition {
        obligation: self.obligation_id,
        from:       self.status().into(),
        to:         ObligationStatus::InProgress.into(),
      });
    }
    self.state = ObligationState::InProgress { started_at: now };
    Ok(())
  }

  /// `pending | in_progress → delivered`.
  pub fn complete(
    &mut self,
    acting: Uuid,
    proof: Option<ProofInput>,
    now: DateTime<Utc>,
  ) -> Result<()> {
    self.authorize(acting)?;
    self.ensure_open()?;
    let proof = proof
      .filter(|p| !p.url.trim().is_empty())
      .ok_or(Error::MissingProof)?;

    self.state = ObligationState::Delivered {
      proof:        Proof {
        kind:        proof.kind,
        url:         proof.url.trim().to_owned(),
        captured_at: proof.captured_at.unwrap_or(now),
      },
      completed_at: now,
    };
    Ok(())
  }

  /// `pending | in_progress → failed`.
  pub fn fail(
    &mut self,
    acting: Uuid,
    reason: ReasonInput,
    now: DateTime<Utc>,
  ) -> Result<()> {
    self.authorize(acting)?;
    self.ensure_open()?;
    let reason = reason.validate()?;

    self.state = ObligationState::Failed { reason, completed_at: now };
    Ok(())
  }
}
