//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as UTC RFC 3339 strings, calendar dates as `YYYY-MM-DD`
//! (so they sort correctly as text), UUIDs as hyphenated lowercase strings
//! and product lines as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rounds_core::{
  coverage::{Agent, CoverageArea},
  lifecycle::{
    FailureCode, FailureReason, Obligation, ObligationState, ObligationStatus, Proof,
    ProofKind,
  },
  subscription::{
    Address, GeoPoint, PauseWindow, ProductLine, Recurrence, Subscription,
    SubscriptionStatus,
  },
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> / NaiveDate ────────────────────────────────────────────────

/// Fixed-width nanosecond precision keeps text ordering chronological.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Discriminants ───────────────────────────────────────────────────────────

/// Parse a strum-backed discriminant, reporting the column kind on failure.
fn decode_discriminant<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| {
    Error::Core(rounds_core::Error::UnknownDiscriminant {
      kind,
      value: s.to_owned(),
    })
  })
}

pub fn encode_proof_kind(k: ProofKind) -> &'static str {
  match k {
    ProofKind::Photo => "photo",
    ProofKind::Signature => "signature",
  }
}

pub fn decode_proof_kind(s: &str) -> Result<ProofKind> {
  match s {
    "photo" => Ok(ProofKind::Photo),
    "signature" => Ok(ProofKind::Signature),
    other => Err(Error::Core(rounds_core::Error::UnknownDiscriminant {
      kind:  "proof kind",
      value: other.to_owned(),
    })),
  }
}

// ─── Products ────────────────────────────────────────────────────────────────

pub fn encode_products(products: &[ProductLine]) -> Result<String> {
  Ok(serde_json::to_string(products)?)
}

pub fn decode_products(s: &str) -> Result<Vec<ProductLine>> { Ok(serde_json::from_str(s)?) }

// ─── Obligation state ────────────────────────────────────────────────────────

/// The lifecycle columns of an `obligations` row.
pub struct StateColumns {
  pub status:            &'static str,
  pub started_at:        Option<String>,
  pub proof_kind:        Option<&'static str>,
  pub proof_url:         Option<String>,
  pub proof_captured_at: Option<String>,
  pub failure_code:      Option<&'static str>,
  pub failure_note:      Option<String>,
  pub completed_at:      Option<String>,
}

pub fn encode_state(state: &ObligationState) -> StateColumns {
  let mut cols = StateColumns {
    status:            state.status().into(),
    started_at:        None,
    proof_kind:        None,
    proof_url:         None,
    proof_captured_at: None,
    failure_code:      None,
    failure_note:      None,
    completed_at:      state.completed_at().map(encode_dt),
  };
  match state {
    ObligationState::Pending => {}
    ObligationState::InProgress { started_at } => {
      cols.started_at = Some(encode_dt(*started_at));
    }
    ObligationState::Delivered { proof, .. } => {
      cols.proof_kind = Some(encode_proof_kind(proof.kind));
      cols.proof_url = Some(proof.url.clone());
      cols.proof_captured_at = Some(encode_dt(proof.captured_at));
    }
    ObligationState::Failed { reason, .. } => {
      cols.failure_code = Some(reason.code.into());
      cols.failure_note = reason.note.clone();
    }
  }
  cols
}

fn required(value: Option<String>, column: &str, id: &str) -> Result<String> {
  value.ok_or_else(|| Error::Decode(format!("obligation {id}: {column} is NULL")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawObligation::from_row`].
pub const OBLIGATION_COLUMNS: &str = "o.obligation_id, o.subscription_id, o.delivery_date, \
  o.agent_id, o.status, o.started_at, o.proof_kind, o.proof_url, o.proof_captured_at, \
  o.failure_code, o.failure_note, o.completed_at, o.created_at";

/// Raw strings read directly from an `obligations` row.
pub struct RawObligation {
  pub obligation_id:     String,
  pub subscription_id:   String,
  pub delivery_date:     String,
  pub agent_id:          Option<String>,
  pub status:            String,
  pub started_at:        Option<String>,
  pub proof_kind:        Option<String>,
  pub proof_url:         Option<String>,
  pub proof_captured_at: Option<String>,
  pub failure_code:      Option<String>,
  pub failure_note:      Option<String>,
  pub completed_at:      Option<String>,
  pub created_at:        String,
}

impl RawObligation {
  /// Read the first 13 columns of `row`, laid out as [`OBLIGATION_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      obligation_id:     row.get(0)?,
      subscription_id:   row.get(1)?,
      delivery_date:     row.get(2)?,
      agent_id:          row.get(3)?,
      status:            row.get(4)?,
      started_at:        row.get(5)?,
      proof_kind:        row.get(6)?,
      proof_url:         row.get(7)?,
      proof_captured_at: row.get(8)?,
      failure_code:      row.get(9)?,
      failure_note:      row.get(10)?,
      completed_at:      row.get(11)?,
      created_at:        row.get(12)?,
    })
  }

  pub fn into_obligation(self) -> Result<Obligation> {
    let id = self.obligation_id.as_str();
    let status: ObligationStatus = decode_discriminant("obligation status", &self.status)?;

    let state = match status {
      ObligationStatus::Pending => ObligationState::Pending,
      ObligationStatus::InProgress => ObligationState::InProgress {
        started_at: decode_dt(&required(self.started_at, "started_at", id)?)?,
      },
      ObligationStatus::Delivered => ObligationState::Delivered {
        proof:        Proof {
          kind:        decode_proof_kind(&required(self.proof_kind, "proof_kind", id)?)?,
          url:         required(self.proof_url, "proof_url", id)?,
          captured_at: decode_dt(&required(self.proof_captured_at, "proof_captured_at", id)?)?,
        },
        completed_at: decode_dt(&required(self.completed_at, "completed_at", id)?)?,
      },
      ObligationStatus::Failed => ObligationState::Failed {
        reason:       FailureReason {
          code: decode_discriminant::<FailureCode>(
            "failure code",
            &required(self.failure_code, "failure_code", id)?,
          )?,
          note: self.failure_note,
        },
        completed_at: decode_dt(&required(self.completed_at, "completed_at", id)?)?,
      },
    };

    Ok(Obligation {
      obligation_id: decode_uuid(&self.obligation_id)?,
      subscription_id: decode_uuid(&self.subscription_id)?,
      delivery_date: decode_date(&self.delivery_date)?,
      agent_id: self.agent_id.as_deref().map(decode_uuid).transpose()?,
      state,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawSubscription::from_row`].
pub const SUBSCRIPTION_COLUMNS: &str = "s.subscription_id, s.customer_id, s.address_id, \
  s.products, s.recurrence, s.start_date, s.pause_start, s.pause_end, s.status, s.created_at";

/// Raw strings read directly from a `subscriptions` row.
pub struct RawSubscription {
  pub subscription_id: String,
  pub customer_id:     String,
  pub address_id:      String,
  pub products:        String,
  pub recurrence:      String,
  pub start_date:      String,
  pub pause_start:     Option<String>,
  pub pause_end:       Option<String>,
  pub status:          String,
  pub created_at:      String,
}

impl RawSubscription {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subscription_id: row.get(0)?,
      customer_id:     row.get(1)?,
      address_id:      row.get(2)?,
      products:        row.get(3)?,
      recurrence:      row.get(4)?,
      start_date:      row.get(5)?,
      pause_start:     row.get(6)?,
      pause_end:       row.get(7)?,
      status:          row.get(8)?,
      created_at:      row.get(9)?,
    })
  }

  pub fn into_subscription(self) -> Result<Subscription> {
    let pause = match (self.pause_start, self.pause_end) {
      (Some(start), Some(end)) => Some(PauseWindow {
        start: decode_date(&start)?,
        end:   decode_date(&end)?,
      }),
      _ => None,
    };

    Ok(Subscription {
      subscription_id: decode_uuid(&self.subscription_id)?,
      customer_id: decode_uuid(&self.customer_id)?,
      address_id: decode_uuid(&self.address_id)?,
      products: decode_products(&self.products)?,
      recurrence: decode_discriminant::<Recurrence>("recurrence", &self.recurrence)?,
      start_date: decode_date(&self.start_date)?,
      pause,
      status: decode_discriminant::<SubscriptionStatus>("subscription status", &self.status)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `addresses` row.
pub struct RawAddress {
  pub address_id:  String,
  pub line:        String,
  pub postal_code: String,
  pub lat:         Option<f64>,
  pub lng:         Option<f64>,
}

impl RawAddress {
  pub fn into_address(self) -> Result<Address> {
    Ok(Address {
      address_id:  decode_uuid(&self.address_id)?,
      line:        self.line,
      postal_code: self.postal_code,
      location:    decode_location(self.lat, self.lng),
    })
  }
}

pub fn decode_location(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
  match (lat, lng) {
    (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
    _ => None,
  }
}

/// Raw values read directly from an `agents` row.
pub struct RawAgent {
  pub agent_id:   String,
  pub name:       String,
  pub area_id:    String,
  pub active:     bool,
  pub created_at: String,
}

impl RawAgent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      agent_id:   row.get(0)?,
      name:       row.get(1)?,
      area_id:    row.get(2)?,
      active:     row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_agent(self) -> Result<Agent> {
    Ok(Agent {
      agent_id:   decode_uuid(&self.agent_id)?,
      name:       self.name,
      area_id:    decode_uuid(&self.area_id)?,
      active:     self.active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from an `areas` row; codes are attached afterwards.
pub struct RawArea {
  pub area_id:    String,
  pub name:       String,
  pub created_at: String,
}

impl RawArea {
  pub fn into_area(self, postal_codes: impl IntoIterator<Item = String>) -> Result<CoverageArea> {
    Ok(CoverageArea {
      area_id:      decode_uuid(&self.area_id)?,
      name:         self.name,
      postal_codes: postal_codes.into_iter().collect(),
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dates_are_stored_sortably() {
    let d: NaiveDate = "2024-03-07".parse().unwrap();
    assert_eq!(encode_date(d), "2024-03-07");
    assert_eq!(decode_date("2024-03-07").unwrap(), d);
    assert!(decode_date("07/03/2024").is_err());
  }

  #[test]
  fn unknown_status_is_reported() {
    let err = decode_discriminant::<ObligationStatus>("obligation status", "lost").unwrap_err();
    assert!(matches!(
      err,
      Error::Core(rounds_core::Error::UnknownDiscriminant { value, .. }) if value == "lost"
    ));
  }

  #[test]
  fn delivered_state_fills_proof_columns_only() {
    let now = Utc::now();
    let cols = encode_state(&ObligationState::Delivered {
      proof:        Proof {
        kind:        ProofKind::Signature,
        url:         "https://cdn/s.png".into(),
        captured_at: now,
      },
      completed_at: now,
    });
    assert_eq!(cols.status, "delivered");
    assert_eq!(cols.proof_kind, Some("signature"));
    assert!(cols.failure_code.is_none());
    assert!(cols.completed_at.is_some());
  }
}
