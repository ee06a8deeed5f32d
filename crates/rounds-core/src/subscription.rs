//! Subscriptions: the recurring promise that obligations are derived from.
//!
//! A subscription is owned by the customer-facing side of the business; this
//! crate only reads it to decide which dates owe a delivery.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// How often a subscription owes a delivery, counted from its start date.
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
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Recurrence {
  Daily,
  EveryOtherDay,
  Weekly,
}

impl Recurrence {
  /// Number of days between two consecutive deliveries.
  pub fn period_days(self) -> i64 {
    match self {
      Recurrence::Daily => 1,
      Recurrence::EveryOtherDay => 2,
      Recurrence::Weekly => 7,
    }
  }
}

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
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
  Active,
  Paused,
  Cancelled,
}

/// An inclusive range of dates on which no delivery is owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseWindow {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl PauseWindow {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    if start > end {
      return Err(Error::InvalidPauseWindow { start, end });
    }
    Ok(Self { start, end })
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start <= date && date <= self.end
  }
}

/// One product on a subscription. The unit price is captured when the
/// subscription is created and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
  pub product_id:       Uuid,
  pub name:             String,
  pub quantity:         u32,
  /// Price per unit in minor currency units (e.g. paise, cents).
  pub unit_price_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
  pub subscription_id: Uuid,
  pub customer_id:     Uuid,
  pub address_id:      Uuid,
  pub products:        Vec<ProductLine>,
  pub recurrence:      Recurrence,
  pub start_date:      NaiveDate,
  pub pause:           Option<PauseWindow>,
  pub status:          SubscriptionStatus,
  pub created_at:      DateTime<Utc>,
}

impl Subscription {
  /// Whether the generator should consider this subscription at all on
  /// `date`. A paused subscription stays eligible: its window is applied by
  /// [`is_delivery_day`](crate::schedule::is_delivery_day) together with the
  /// recurrence, so dates outside the window are unaffected.
  pub fn is_eligible_on(&self, date: NaiveDate) -> bool {
    self.status != SubscriptionStatus::Cancelled && self.start_date <= date
  }

  /// Move to `Paused` with the given window.
  pub fn pause(&mut self, window: PauseWindow) -> Result<()> {
    if self.status == SubscriptionStatus::Cancelled {
      return Err(Error::SubscriptionCancelled(self.subscription_id));
    }
    self.status = SubscriptionStatus::Paused;
    self.pause = Some(window);
    Ok(())
  }

  /// Back to `Active`; the pause window is dropped with the pause.
  pub fn resume(&mut self) -> Result<()> {
    if self.status == SubscriptionStatus::Cancelled {
      return Err(Error::SubscriptionCancelled(self.subscription_id));
    }
    self.status = SubscriptionStatus::Active;
    self.pause = None;
    Ok(())
  }

  pub fn cancel(&mut self) {
    self.status = SubscriptionStatus::Cancelled;
    self.pause = None;
  }
}

/// Input for creating a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
  pub customer_id: Uuid,
  pub address_id:  Uuid,
  pub products:    Vec<ProductLine>,
  pub recurrence:  Recurrence,
  pub start_date:  NaiveDate,
}

// ─── Addresses ───────────────────────────────────────────────────────────────

/// Latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub lat: f64,
  pub lng: f64,
}

impl GeoPoint {
  /// Both components finite and within the WGS84 ranges.
  pub fn is_valid(&self) -> bool {
    self.lat.is_finite()
      && self.lng.is_finite()
      && (-90.0..=90.0).contains(&self.lat)
      && (-180.0..=180.0).contains(&self.lng)
  }
}

/// A delivery address. Only the postal code and optional coordinates matter
/// to assignment and routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
  pub address_id:  Uuid,
  pub line:        String,
  pub postal_code: String,
  pub location:    Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAddress {
  pub line:        String,
  pub postal_code: String,
  pub location:    Option<GeoPoint>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(s: &str) -> NaiveDate { s.parse().unwrap() }

  fn subscription() -> Subscription {
    Subscription {
      subscription_id: Uuid::new_v4(),
      customer_id:     Uuid::new_v4(),
      address_id:      Uuid::new_v4(),
      products:        vec![],
      recurrence:      Recurrence::Daily,
      start_date:      d("2024-01-01"),
      pause:           None,
      status:          SubscriptionStatus::Active,
      created_at:      Utc::now(),
    }
  }

  #[test]
  fn inverted_pause_window_is_rejected() {
    let err = PauseWindow::new(d("2024-02-10"), d("2024-02-01")).unwrap_err();
    assert_eq!(err.code(), "invalid_pause_window");
  }

  #[test]
  fn resume_clears_pause_window() {
    let mut s = subscription();
    s.pause(PauseWindow::new(d("2024-02-01"), d("2024-02-10")).unwrap())
      .unwrap();
    assert_eq!(s.status, SubscriptionStatus::Paused);

    s.resume().unwrap();
    assert_eq!(s.status, SubscriptionStatus::Active);
    assert!(s.pause.is_none());
  }

  #[test]
  fn only_cancellation_ends_eligibility() {
    let mut s = subscription();
    s.pause(PauseWindow::new(d("2024-01-03"), d("2024-01-05")).unwrap())
      .unwrap();
    assert!(s.is_eligible_on(d("2024-01-02")));
    assert!(s.is_eligible_on(d("2024-01-06")));
    assert!(!s.is_eligible_on(d("2023-12-31")));

    s.cancel();
    assert!(!s.is_eligible_on(d("2024-01-06")));
  }

  #[test]
  fn cancelled_subscription_cannot_resume() {
    let mut s = subscription();
    s.cancel();
    assert!(matches!(s.resume(), Err(Error::SubscriptionCancelled(_))));
  }

  #[test]
  fn recurrence_round_trips_through_strum() {
    let r: Recurrence = "every_other_day".parse().unwrap();
    assert_eq!(r, Recurrence::EveryOtherDay);
    assert_eq!(r.to_string(), "every_other_day");
  }

  #[test]
  fn geopoint_validity() {
    assert!(GeoPoint { lat: 28.6, lng: 77.2 }.is_valid());
    assert!(!GeoPoint { lat: 91.0, lng: 0.0 }.is_valid());
    assert!(!GeoPoint { lat: f64::NAN, lng: 0.0 }.is_valid());
  }
}
