//! Visiting order for one agent's obligations on one day.
//!
//! A greedy nearest-neighbour tour over the geocoded stops, followed by the
//! stops that have no usable coordinates. This is a heuristic: it is cheap and
//! deterministic, and usually far better than the input order, but it is not
//! optimal.

use serde::{Deserialize, Serialize};

use crate::{lifecycle::Obligation, subscription::GeoPoint};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Fixed time spent at every stop.
pub const HANDLING_MINUTES_PER_STOP: f64 = 5.0;
/// Assumed average travel speed between stops.
pub const AVERAGE_SPEED_KMH: f64 = 30.0;
/// Distance charged to a leg of the input order when either end lacks
/// coordinates.
pub const UNKNOWN_LEG_KM: f64 = 1.0;

/// An obligation plus where it has to be delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
  pub obligation:  Obligation,
  pub postal_code: String,
  pub location:    Option<GeoPoint>,
}

impl RouteStop {
  fn point(&self) -> Option<GeoPoint> { self.location.filter(GeoPoint::is_valid) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
  /// The input stops, reordered.
  pub stops:             Vec<RouteStop>,
  /// Length of the geocoded part of the tour, rounded to two decimals.
  pub total_distance_km: f64,
  /// Length of the input order, for comparison. Legs touching a stop without
  /// coordinates count as [`UNKNOWN_LEG_KM`].
  pub naive_distance_km: f64,
  pub estimated_minutes: u32,
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
  let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
  let dlat = (b.lat - a.lat).to_radians();
  let dlng = (b.lng - a.lng).to_radians();

  let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
  2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Order `stops` into a low-travel visiting sequence.
///
/// The tour starts at the first geocoded stop in input order and repeatedly
/// moves to the nearest unvisited geocoded stop; on equal distances the
/// earlier input stop wins. Stops without valid coordinates are appended in
/// their original relative order.
///
/// There is no depot: the origin is always the first geocoded stop, even when
/// an ungeocoded stop precedes it, since that stop has no position to measure
/// from. Callers that want a particular origin should put it first.
pub fn optimize_route(stops: Vec<RouteStop>) -> RoutePlan {
  if stops.len() <= 1 {
    return RoutePlan {
      estimated_minutes: estimate_minutes(stops.len(), 0.0),
      stops,
      total_distance_km: 0.0,
      naive_distance_km: 0.0,
    };
  }

  let naive = naive_distance_km(&stops);
  let (geocoded, ungeocoded): (Vec<_>, Vec<_>) =
    stops.into_iter().partition(|s| s.point().is_some());

  let points: Vec<GeoPoint> = geocoded.iter().filter_map(RouteStop::point).collect();
  let order = nearest_neighbour_order(&points);
  let total: f64 = order
    .windows(2)
    .map(|w| haversine_km(points[w[0]], points[w[1]]))
    .sum();

  let mut slots: Vec<Option<RouteStop>> = geocoded.into_iter().map(Some).collect();
  let mut ordered: Vec<RouteStop> = order.iter().filter_map(|&i| slots[i].take()).collect();
  ordered.extend(ungeocoded);

  RoutePlan {
    estimated_minutes: estimate_minutes(ordered.len(), total),
    stops:             ordered,
    total_distance_km: round2(total),
    naive_distance_km: round2(naive),
  }
}

/// Indices of `points` in greedy nearest-neighbour order, starting at 0.
fn nearest_neighbour_order(points: &[GeoPoint]) -> Vec<usize> {
  if points.is_empty() {
    return Vec::new();
  }
  let mut visited = vec![false; points.len()];
  let mut order = Vec::with_capacity(points.len());
  let mut current = 0;
  visited[0] = true;
  order.push(0);

  while order.len() < points.len() {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in points.iter().enumerate() {
      if visited[i] {
        continue;
      }
      let d = haversine_km(points[current], *p);
      if best.is_none_or(|(_, best_d)| d < best_d) {
        best = Some((i, d));
      }
    }
    let Some((next, _)) = best else { break };
    visited[next] = true;
    order.push(next);
    current = next;
  }
  order
}

fn naive_distance_km(stops: &[RouteStop]) -> f64 {
  stops
    .windows(2)
    .map(|w| match (w[0].point(), w[1].point()) {
      (Some(a), Some(b)) => haversine_km(a, b),
      _ => UNKNOWN_LEG_KM,
    })
    .sum()
}

fn estimate_minutes(stop_count: usize, distance_km: f64) -> u32 {
  let handling = stop_count as f64 * HANDLING_MINUTES_PER_STOP;
  let travel = distance_km / AVERAGE_SPEED_KMH * 60.0;
  (handling + travel).round() as u32
}

fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  fn stop(location: Option<(f64, f64)>) -> RouteStop {
    RouteStop {
      obligation:  Obligation::new(Uuid::new_v4(), "2024-01-01".parse().unwrap(), None),
      postal_code: "110001".into(),
      location:    location.map(|(lat, lng)| GeoPoint { lat, lng }),
    }
  }

  fn ids(stops: &[RouteStop]) -> Vec<Uuid> {
    stops.iter().map(|s| s.obligation.obligation_id).collect()
  }

  #[test]
  fn haversine_one_degree_of_latitude() {
    let d = haversine_km(GeoPoint { lat: 0.0, lng: 0.0 }, GeoPoint { lat: 1.0, lng: 0.0 });
    assert!((d - 111.195).abs() < 0.01, "got {d}");
  }

  #[test]
  fn empty_and_single_are_returned_as_is() {
    let plan = optimize_route(vec![]);
    assert!(plan.stops.is_empty());
    assert_eq!(plan.total_distance_km, 0.0);
    assert_eq!(plan.estimated_minutes, 0);

    let only = stop(Some((28.6, 77.2)));
    let plan = optimize_route(vec![only.clone()]);
    assert_eq!(plan.stops, vec![only]);
    assert_eq!(plan.total_distance_km, 0.0);
    assert_eq!(plan.estimated_minutes, 5);
  }

  #[test]
  fn visits_nearest_first() {
    // Points on a line of longitude at 0, 3, 1, 2 degrees.
    let input = vec![
      stop(Some((0.0, 0.0))),
      stop(Some((3.0, 0.0))),
      stop(Some((1.0, 0.0))),
      stop(Some((2.0, 0.0))),
    ];
    let expected = vec![input[0].clone(), input[2].clone(), input[3].clone(), input[1].clone()];
    let plan = optimize_route(input);
    assert_eq!(ids(&plan.stops), ids(&expected));

    let three_degrees = 3.0 * 111.19;
    assert!((plan.total_distance_km - three_degrees).abs() < 0.1);
    assert!(plan.naive_distance_km > plan.total_distance_km);
  }

  #[test]
  fn ungeocoded_stops_go_last_in_input_order() {
    let input = vec![
      stop(None),
      stop(Some((0.0, 0.0))),
      stop(Some((95.0, 0.0))),
      stop(Some((0.5, 0.0))),
      stop(None),
    ];
    let plan = optimize_route(input.clone());
    assert_eq!(ids(&plan.stops), ids(&[
      input[1].clone(),
      input[3].clone(),
      input[0].clone(),
      input[2].clone(),
      input[4].clone(),
    ]));
  }

  #[test]
  fn tour_starts_at_first_geocoded_stop_even_when_it_is_an_outlier() {
    let input = vec![
      stop(None),
      stop(Some((10.0, 0.0))),
      stop(Some((0.0, 0.0))),
      stop(Some((1.0, 0.0))),
    ];
    let plan = optimize_route(input.clone());
    assert_eq!(ids(&plan.stops), ids(&[
      input[1].clone(),
      input[3].clone(),
      input[2].clone(),
      input[0].clone(),
    ]));
  }

  #[test]
  fn estimate_combines_handling_and_travel() {
    // Two stops 15 km apart: 10 minutes handling + 30 minutes driving.
    let fifteen_km_in_degrees = 15.0 / 111.195;
    let plan = optimize_route(vec![
      stop(Some((0.0, 0.0))),
      stop(Some((fifteen_km_in_degrees, 0.0))),
    ]);
    assert_eq!(plan.estimated_minutes, 40);
    assert!((plan.total_distance_km - 15.0).abs() < 0.01);
  }

  #[test]
  fn naive_distance_charges_unknown_legs() {
    let plan = optimize_route(vec![stop(None), stop(None), stop(None)]);
    assert_eq!(plan.naive_distance_km, 2.0);
    assert_eq!(plan.total_distance_km, 0.0);
    assert_eq!(plan.estimated_minutes, 15);
  }

  /// Deterministic pseudo-random points around a city centre.
  fn scattered(seed: u64, n: usize) -> Vec<RouteStop> {
    let mut state = seed;
    let mut next = move || {
      state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
      (state >> 33) as f64 / (1u64 << 31) as f64
    };
    (0..n)
      .map(|_| stop(Some((28.5 + next() * 0.3, 77.0 + next() * 0.3))))
      .collect()
  }

  #[test]
  fn output_is_a_permutation_of_input() {
    for seed in 1..=5 {
      let mut input = scattered(seed, 12);
      input.push(stop(None));
      let plan = optimize_route(input.clone());

      let mut got = ids(&plan.stops);
      let mut want = ids(&input);
      got.sort();
      want.sort();
      assert_eq!(got, want);
    }
  }

  #[test]
  fn greedy_is_within_a_bounded_factor_of_input_order() {
    // Nearest neighbour is at most (log2 n + 1) times an optimal path, and an
    // optimal path is never longer than the input order.
    for seed in 1..=10 {
      let input = scattered(seed, 20);
      let plan = optimize_route(input);
      let bound = ((20f64).log2().ceil() + 1.0) * plan.naive_distance_km;
      assert!(
        plan.total_distance_km <= bound,
        "seed {seed}: {} > {bound}",
        plan.total_distance_km
      );
    }
  }

  #[test]
  fn is_deterministic() {
    let input = scattered(42, 15);
    let a = optimize_route(input.clone());
    let b = optimize_route(input);
    assert_eq!(ids(&a.stops), ids(&b.stops));
    assert_eq!(a.total_distance_km, b.total_distance_km);
  }
}
