//! Great-circle geometry over latitude/longitude coordinates.
//!
//! Distances are meters, bearings compass degrees. Accurate enough for
//! junction spacing along a route; not a geodesy library.

use serde::{Deserialize, Serialize};

/// Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A coordinate in decimal degrees. Plain value, no identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_m(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial compass bearing from `a` to `b` in degrees, within `[0, 360)`.
///
/// Coincident points resolve to 0.0 (`atan2(0, 0)` is 0).
pub fn bearing_deg(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Heading change at `cur` when travelling `prev -> cur -> next`, wrapped
/// to the shorter arc, in degrees within `[0, 180]`.
pub fn turn_angle_deg(prev: LatLon, cur: LatLon, next: LatLon) -> f64 {
    let b1 = bearing_deg(prev, cur);
    let b2 = bearing_deg(cur, next);
    let diff = (b2 - b1).abs();
    diff.min(360.0 - diff)
}
