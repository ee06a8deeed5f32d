//! Error types for `rounds-core`.
//!
//! Every variant is a business-rule rejection. None of them is transient, so
//! callers surface them as-is and never retry.

use thiserror::Error;
use uuid::Uuid;

/// The kind of record a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  Obligation,
  Agent,
  Area,
  Address,
  Subscription,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} not found: {id}")]
  NotFound { entity: Entity, id: Uuid },

  #[error("agent {acting} is not assigned to obligation {obligation}")]
  Unauthorized { obligation: Uuid, acting: Uuid },

  #[error("obligation {obligation} cannot move from {from} to {to}")]
  InvalidTransition {
    obligation: Uuid,
    from:       &'static str,
    to:         &'static str,
  },

  #[error("obligation {0} is already {1}")]
  AlreadyTerminal(Uuid, &'static str),

  #[error("completion proof with a non-empty url is required")]
  MissingProof,

  #[error("a failure reason code is required")]
  MissingReason,

  #[error("unknown failure reason code: {0:?}")]
  InvalidReasonCode(String),

  #[error("coverage area does not exist: {0}")]
  InvalidArea(Uuid),

  #[error("coverage area must contain at least one postal code")]
  EmptyArea,

  #[error("date range is inverted: {from} > {to}")]
  InvalidDateRange {
    from: chrono::NaiveDate,
    to:   chrono::NaiveDate,
  },

  #[error("pause window is inverted: {start} > {end}")]
  InvalidPauseWindow {
    start: chrono::NaiveDate,
    end:   chrono::NaiveDate,
  },

  #[error("subscription {0} is cancelled")]
  SubscriptionCancelled(Uuid),

  #[error("unknown {kind} discriminant: {value:?}")]
  UnknownDiscriminant { kind: &'static str, value: String },
}

impl Error {
  /// Stable machine-readable code surfaced to callers next to the message.
  pub fn code(&self) -> &'static str {
    match self {
      Error::NotFound { .. } => "not_found",
      Error::Unauthorized { .. } => "unauthorized",
      Error::InvalidTransition { .. } => "invalid_transition",
      Error::AlreadyTerminal(..) => "already_terminal",
      Error::MissingProof => "missing_proof",
      Error::MissingReason => "missing_reason",
      Error::InvalidReasonCode(_) => "invalid_reason_code",
      Error::InvalidArea(_) => "invalid_area",
      Error::EmptyArea => "empty_area",
      Error::InvalidDateRange { .. } => "invalid_date_range",
      Error::InvalidPauseWindow { .. } => "invalid_pause_window",
      Error::SubscriptionCancelled(_) => "subscription_cancelled",
      Error::UnknownDiscriminant { .. } => "unknown_discriminant",
    }
  }

  pub fn not_found(entity: Entity, id: Uuid) -> Self {
    Error::NotFound { entity, id }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
