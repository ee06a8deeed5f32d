//! The recurrence predicate: does a subscription owe a delivery on a date?
//!
//! Kept free of storage so it can be tested on its own. Dates are
//! [`NaiveDate`]s, so offsets are whole days with no time-of-day drift.

use chrono::NaiveDate;

use crate::subscription::{PauseWindow, Recurrence};

/// `true` iff `date` is a delivery day for a subscription that started on
/// `start` with the given recurrence and optional inclusive pause window.
///
/// Dates before `start` are never delivery days.
pub fn is_delivery_day(
  start: NaiveDate,
  date: NaiveDate,
  recurrence: Recurrence,
  pause: Option<&PauseWindow>,
) -> bool {
  if date < start {
    return false;
  }
  if pause.is_some_and(|w| w.contains(date)) {
    return false;
  }
  let offset = (date - start).num_days();
  offset % recurrence.period_days() == 0
}

/// Every date in `[from, to]`, inclusive. Empty when `from > to`.
pub fn dates_between(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
  from.iter_days().take_while(move |d| *d <= to)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(s: &str) -> NaiveDate { s.parse().unwrap() }

  fn days(from: &str, to: &str, rule: Recurrence, pause: Option<PauseWindow>) -> Vec<i64> {
    let start = d(from);
    dates_between(start, d(to))
      .filter(|date| is_delivery_day(start, *date, rule, pause.as_ref()))
      .map(|date| (date - start).num_days())
      .collect()
  }

  #[test]
  fn daily_delivers_every_day() {
    assert_eq!(
      days("2024-01-01", "2024-01-05", Recurrence::Daily, None),
      vec![0, 1, 2, 3, 4]
    );
  }

  #[test]
  fn every_other_day_delivers_on_even_offsets() {
    assert_eq!(
      days("2024-01-01", "2024-01-09", Recurrence::EveryOtherDay, None),
      vec![0, 2, 4, 6, 8]
    );
  }

  #[test]
  fn weekly_delivers_every_seventh_day() {
    assert_eq!(
      days("2024-01-01", "2024-01-31", Recurrence::Weekly, None),
      vec![0, 7, 14, 21, 28]
    );
  }

  #[test]
  fn nothing_before_start() {
    assert!(!is_delivery_day(
      d("2024-01-10"),
      d("2024-01-09"),
      Recurrence::Daily,
      None
    ));
  }

  #[test]
  fn pause_bounds_are_inclusive() {
    let pause = PauseWindow::new(d("2024-01-03"), d("2024-01-05")).unwrap();
    assert_eq!(
      days("2024-01-01", "2024-01-07", Recurrence::Daily, Some(pause)),
      vec![0, 1, 5, 6]
    );
  }

  #[test]
  fn pause_does_not_shift_the_cadence() {
    // Offsets stay anchored to the start date, not to the end of the pause.
    let pause = PauseWindow::new(d("2024-01-03"), d("2024-01-04")).unwrap();
    assert_eq!(
      days("2024-01-01", "2024-01-09", Recurrence::EveryOtherDay, Some(pause)),
      vec![0, 4, 6, 8]
    );
  }

  #[test]
  fn offsets_cross_month_and_leap_day() {
    let start = d("2024-02-27");
    assert!(is_delivery_day(start, d("2024-02-29"), Recurrence::EveryOtherDay, None));
    assert!(!is_delivery_day(start, d("2024-03-01"), Recurrence::EveryOtherDay, None));
    assert!(is_delivery_day(start, d("2024-03-05"), Recurrence::Weekly, None));
  }
}
