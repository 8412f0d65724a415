//! Route geometry and its cumulative distance profile.
//!
//! A [`Route`] stores decoded latitude/longitude points directly; polyline
//! encoding/decoding belongs at API boundaries, not in the planner core.

use serde::{Deserialize, Serialize};

use crate::geo::{LatLon, haversine_m};

/// An ordered route geometry from the vehicle's position toward its
/// destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route {
    points: Vec<LatLon>,
}

impl Route {
    pub fn new(points: Vec<LatLon>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[LatLon] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Per-point cumulative distance along a route, in meters.
///
/// Built once per plan by walking adjacent pairs; `cumulative_m(0)` is 0 and
/// the sequence is monotonically non-decreasing. Never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RouteProfile {
    cumulative_m: Vec<f64>,
    total_m: f64,
}

impl RouteProfile {
    pub fn of(route: &Route) -> Self {
        let pts = route.points();
        let mut cumulative_m = Vec::with_capacity(pts.len());
        let mut total_m = 0.0;
        if !pts.is_empty() {
            cumulative_m.push(0.0);
        }
        for pair in pts.windows(2) {
            total_m += haversine_m(pair[0], pair[1]);
            cumulative_m.push(total_m);
        }
        Self { cumulative_m, total_m }
    }

    /// Distance in meters from the route start to the point at `index`.
    pub fn cumulative_m(&self, index: usize) -> f64 {
        self.cumulative_m[index]
    }

    pub fn total_m(&self) -> f64 {
        self.total_m
    }
}

/// Coarse route character, derived from length and expected duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    Urban,
    Highway,
    Mixed,
}

/// Classifies a route as urban, highway or mixed.
///
/// Simple explainable rules: urban when short (< 8 km) or slow (< 40 km/h
/// average), highway when long (> 15 km) and fast (> 60 km/h average),
/// mixed otherwise. A non-positive duration classifies as mixed.
pub fn classify_route_class(distance_km: f64, duration_sec: f64) -> RouteClass {
    if duration_sec <= 0.0 {
        return RouteClass::Mixed;
    }

    let avg_speed_kmh = distance_km / (duration_sec / 3600.0);

    if distance_km < 8.0 || avg_speed_kmh < 40.0 {
        return RouteClass::Urban;
    }
    if distance_km > 15.0 && avg_speed_kmh > 60.0 {
        return RouteClass::Highway;
    }
    RouteClass::Mixed
}
