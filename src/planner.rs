//! Corridor planning over a profiled route.
//!
//! Scans the route for sharp turns, injects structural anchors, greedily
//! selects a spaced subset capped in size, then maps each selected junction
//! to an arrival window under a uniform average-speed model and classifies
//! its priority. The whole pipeline is a pure function of the request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{LatLon, turn_angle_deg};
use crate::route::{Route, RouteClass, RouteProfile, classify_route_class};

/// Documented bounds for the planner tuning knobs.
const MAX_JUNCTIONS_BOUNDS: (usize, usize) = (5, 80);
const MIN_SPACING_M_BOUNDS: (i32, i32) = (50, 3000);
const TURN_ANGLE_THRESHOLD_BOUNDS: (f64, f64) = (10.0, 120.0);
const WINDOW_BUFFER_S_BOUNDS: (i32, i32) = (5, 180);

/// Floor applied to the derived average speed when mapping distance to
/// time, so a degenerate route cannot divide by ~zero.
const MIN_AVG_SPEED_MPS: f64 = 0.1;

/// Rejection of a plan request before any planning runs.
///
/// Out-of-range values are rejected, never silently clamped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("route_geometry must contain at least 2 points, got {0}")]
    RouteTooShort(usize),
    #[error("final_eta_seconds must be > 0, got {0}")]
    NonPositiveEta(i32),
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, min, max, value })
    }
}

/// A corridor planning request.
///
/// `route_geometry` is the decoded route from the vehicle's position to its
/// destination and `final_eta_seconds` the projected time of arrival
/// (routing ETA plus predicted delay, supplied by the caller). The tuning
/// knobs carry safe defaults and are validated against their documented
/// ranges by [`CorridorPlanRequest::validate`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CorridorPlanRequest {
    /// Opaque trip reference, echoed unchanged in the response.
    #[serde(default)]
    pub trip_id: Option<String>,
    pub route_geometry: Route,
    pub final_eta_seconds: i32,
    #[serde(default = "default_max_junctions")]
    pub max_junctions: usize,
    #[serde(default = "default_min_spacing_m")]
    pub min_spacing_m: i32,
    #[serde(default = "default_turn_angle_threshold_deg")]
    pub turn_angle_threshold_deg: f64,
    #[serde(default = "default_window_buffer_seconds")]
    pub window_buffer_seconds: i32,
}

fn default_max_junctions() -> usize {
    25
}

fn default_min_spacing_m() -> i32 {
    250
}

fn default_turn_angle_threshold_deg() -> f64 {
    35.0
}

fn default_window_buffer_seconds() -> i32 {
    30
}

impl CorridorPlanRequest {
    /// Builds a request with default tuning knobs and no trip reference.
    pub fn new(route_geometry: Route, final_eta_seconds: i32) -> Self {
        Self {
            trip_id: None,
            route_geometry,
            final_eta_seconds,
            max_junctions: default_max_junctions(),
            min_spacing_m: default_min_spacing_m(),
            turn_angle_threshold_deg: default_turn_angle_threshold_deg(),
            window_buffer_seconds: default_window_buffer_seconds(),
        }
    }

    /// Checks every field against its documented range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.route_geometry.len() < 2 {
            return Err(ValidationError::RouteTooShort(self.route_geometry.len()));
        }
        if self.final_eta_seconds <= 0 {
            return Err(ValidationError::NonPositiveEta(self.final_eta_seconds));
        }

        let (lo, hi) = MAX_JUNCTIONS_BOUNDS;
        check_range("max_junctions", self.max_junctions as f64, lo as f64, hi as f64)?;
        let (lo, hi) = MIN_SPACING_M_BOUNDS;
        check_range("min_spacing_m", f64::from(self.min_spacing_m), f64::from(lo), f64::from(hi))?;
        let (lo, hi) = TURN_ANGLE_THRESHOLD_BOUNDS;
        check_range("turn_angle_threshold_deg", self.turn_angle_threshold_deg, lo, hi)?;
        let (lo, hi) = WINDOW_BUFFER_S_BOUNDS;
        check_range("window_buffer_seconds", f64::from(self.window_buffer_seconds), f64::from(lo), f64::from(hi))?;
        Ok(())
    }
}

/// Three-tier urgency of a junction intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Scores turn sharpness and progress along the route into a priority tier.
///
/// Sharp turns and late-route junctions (closest to the destination) rank
/// higher. Total function: any angle/ratio input yields a tier.
pub fn classify_priority(turn_angle_deg: f64, progress_ratio: f64) -> Priority {
    let mut score = 0;
    if turn_angle_deg >= 60.0 {
        score += 2;
    } else if turn_angle_deg >= 35.0 {
        score += 1;
    }

    if progress_ratio >= 0.70 {
        score += 2;
    } else if progress_ratio >= 0.40 {
        score += 1;
    }

    if score >= 4 {
        Priority::High
    } else if score >= 2 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// A route point flagged as potentially significant, before spacing and
/// count filtering. `turn_angle_deg` is 0.0 for structural anchors.
#[derive(Debug, Clone)]
struct CandidateJunction {
    route_index: usize,
    point: LatLon,
    cumulative_m: f64,
    turn_angle_deg: f64,
}

/// Scans interior points for turn-angle exceedances and injects the three
/// structural anchors (near start, midpoint, near end).
///
/// Anchors may collide with each other or with turn candidates on short
/// routes; duplicate indices are kept as-is and left for the selector's
/// spacing rule to suppress.
fn generate_candidates(
    route: &Route,
    profile: &RouteProfile,
    turn_angle_threshold_deg: f64,
) -> Vec<CandidateJunction> {
    let pts = route.points();
    let mut candidates = Vec::new();

    for i in 1..pts.len().saturating_sub(1) {
        let angle = turn_angle_deg(pts[i - 1], pts[i], pts[i + 1]);
        if angle >= turn_angle_threshold_deg {
            candidates.push(CandidateJunction {
                route_index: i,
                point: pts[i],
                cumulative_m: profile.cumulative_m(i),
                turn_angle_deg: angle,
            });
        }
    }

    let last = pts.len() - 1;
    for i in [1, (pts.len() / 2).max(1), pts.len().saturating_sub(2)] {
        let i = i.min(last);
        candidates.push(CandidateJunction {
            route_index: i,
            point: pts[i],
            cumulative_m: profile.cumulative_m(i),
            turn_angle_deg: 0.0,
        });
    }

    candidates
}

/// Interval-greedy selection along the route.
///
/// Candidates are stably sorted by cumulative distance (ties keep
/// generation order); a candidate is kept only when it sits at least
/// `min_spacing_m` past the previously kept one, and scanning stops once
/// `max_junctions` are kept. The result is strictly increasing in distance.
fn select_junctions(
    mut candidates: Vec<CandidateJunction>,
    min_spacing_m: f64,
    max_junctions: usize,
) -> Vec<CandidateJunction> {
    candidates.sort_by(|a, b| a.cumulative_m.total_cmp(&b.cumulative_m));

    let mut chosen: Vec<CandidateJunction> = Vec::new();
    let mut last_m = f64::NEG_INFINITY;
    for candidate in candidates {
        if chosen.len() >= max_junctions {
            break;
        }
        if candidate.cumulative_m - last_m >= min_spacing_m {
            last_m = candidate.cumulative_m;
            chosen.push(candidate);
        }
    }
    chosen
}

/// Uniform-speed mapping of distance along the route to seconds from now.
fn eta_seconds(cumulative_m: f64, avg_speed_mps: f64) -> i32 {
    (cumulative_m / avg_speed_mps.max(MIN_AVG_SPEED_MPS)).floor() as i32
}

/// One selected junction, in plan order (1-based).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JunctionOut {
    pub index: usize,
    pub lat: f64,
    pub lon: f64,
    pub cumulative_distance_m: f64,
    pub eta_seconds_from_now: i32,
    pub window_start_seconds_from_now: i32,
    pub window_end_seconds_from_now: i32,
    pub priority: Priority,
}

/// Effective parameters echoed for explainability and audit; downstream
/// behavior never depends on this block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanMeta {
    pub avg_speed_mps: f64,
    pub turn_angle_threshold_deg: f64,
    pub min_spacing_m: i32,
    pub max_junctions: usize,
    pub window_buffer_seconds: i32,
    pub route_class: RouteClass,
    pub explainability: &'static str,
}

const EXPLAINABILITY: &str =
    "distance->time mapping via avg speed; junctions via turn-angle threshold + spacing";

/// The ordered corridor plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorridorPlanResponse {
    pub trip_id: Option<String>,
    pub total_distance_m: f64,
    pub final_eta_seconds: i32,
    pub junctions: Vec<JunctionOut>,
    pub meta: PlanMeta,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Plans a prioritized junction corridor ahead of an arriving vehicle.
///
/// Pure and stateless: identical requests produce identical plans, and
/// concurrent calls need no synchronization. The only failure mode is an
/// invalid request; degenerate geometry (coincident points, zero-length
/// routes) produces a plan with all junctions at ETA 0 rather than an
/// error.
pub fn plan_corridor(req: &CorridorPlanRequest) -> Result<CorridorPlanResponse, ValidationError> {
    req.validate()?;

    let route = &req.route_geometry;
    let profile = RouteProfile::of(route);
    let total_m = profile.total_m();

    let candidates = generate_candidates(route, &profile, req.turn_angle_threshold_deg);
    tracing::debug!(
        candidates = candidates.len(),
        total_m,
        threshold = req.turn_angle_threshold_deg,
        "generated junction candidates"
    );

    let chosen = select_junctions(candidates, f64::from(req.min_spacing_m), req.max_junctions);
    let picked: Vec<usize> = chosen.iter().map(|c| c.route_index).collect();
    tracing::debug!(?picked, "selected junctions under spacing and count caps");

    let avg_speed_mps = total_m / f64::from(req.final_eta_seconds.max(1));

    let junctions = chosen
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let eta = eta_seconds(c.cumulative_m, avg_speed_mps);
            let progress = if total_m > 0.0 { c.cumulative_m / total_m } else { 0.0 };
            JunctionOut {
                index: i + 1,
                lat: c.point.lat,
                lon: c.point.lon,
                cumulative_distance_m: round2(c.cumulative_m),
                eta_seconds_from_now: eta,
                window_start_seconds_from_now: (eta - req.window_buffer_seconds).max(0),
                window_end_seconds_from_now: eta + req.window_buffer_seconds,
                priority: classify_priority(c.turn_angle_deg, progress),
            }
        })
        .collect();

    let route_class = classify_route_class(total_m / 1000.0, f64::from(req.final_eta_seconds));
    tracing::debug!(avg_speed_mps, ?route_class, "assembled corridor plan");

    Ok(CorridorPlanResponse {
        trip_id: req.trip_id.clone(),
        total_distance_m: round2(total_m),
        final_eta_seconds: req.final_eta_seconds,
        junctions,
        meta: PlanMeta {
            avg_speed_mps: round3(avg_speed_mps),
            turn_angle_threshold_deg: req.turn_angle_threshold_deg,
            min_spacing_m: req.min_spacing_m,
            max_junctions: req.max_junctions,
            window_buffer_seconds: req.window_buffer_seconds,
            route_class,
            explainability: EXPLAINABILITY,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatLon;

    fn pt(lat: f64, lon: f64) -> LatLon {
        LatLon::new(lat, lon)
    }

    fn candidate(route_index: usize, cumulative_m: f64, turn_angle_deg: f64) -> CandidateJunction {
        CandidateJunction {
            route_index,
            point: pt(0.0, 0.0),
            cumulative_m,
            turn_angle_deg,
        }
    }

    // --- candidate generation ---

    #[test]
    fn test_generator_emits_turns_and_anchors() {
        // Two sharp 90-degree turns at interior indices 1 and 2.
        let route = Route::new(vec![
            pt(0.0, 0.0),
            pt(0.01, 0.0),
            pt(0.01, 0.01),
            pt(0.02, 0.01),
        ]);
        let profile = RouteProfile::of(&route);
        let candidates = generate_candidates(&route, &profile, 35.0);

        // 2 turn candidates + 3 anchors (indices 1, 2, 2).
        assert_eq!(candidates.len(), 5);
        let mut indices: Vec<usize> = candidates.iter().map(|c| c.route_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 1, 2, 2, 2]);

        let turn_count = candidates.iter().filter(|c| c.turn_angle_deg > 0.0).count();
        assert_eq!(turn_count, 2);
    }

    #[test]
    fn test_generator_two_point_route_has_no_turn_candidates() {
        let route = Route::new(vec![pt(0.0, 0.0), pt(0.01, 0.0)]);
        let profile = RouteProfile::of(&route);
        let candidates = generate_candidates(&route, &profile, 35.0);

        // Anchors only, clamped into [0, 1]: indices 1, 1, 0.
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.turn_angle_deg == 0.0));
        assert!(candidates.iter().all(|c| c.route_index <= 1));
    }

    #[test]
    fn test_generator_high_threshold_keeps_only_anchors() {
        // Gentle ~11 degree bends never reach a 120 degree threshold.
        let route = Route::new(vec![
            pt(0.00, 0.000),
            pt(0.01, 0.000),
            pt(0.02, 0.002),
            pt(0.03, 0.002),
            pt(0.04, 0.004),
        ]);
        let profile = RouteProfile::of(&route);
        let candidates = generate_candidates(&route, &profile, 120.0);

        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| c.turn_angle_deg == 0.0));
    }

    // --- spacing selection ---

    #[test]
    fn test_selector_respects_spacing_floor() {
        let candidates = vec![
            candidate(1, 0.0, 0.0),
            candidate(2, 100.0, 40.0),
            candidate(3, 260.0, 50.0),
            candidate(4, 300.0, 90.0),
            candidate(5, 600.0, 0.0),
        ];
        let chosen = select_junctions(candidates, 250.0, 25);

        let distances: Vec<f64> = chosen.iter().map(|c| c.cumulative_m).collect();
        assert_eq!(distances, vec![0.0, 260.0, 600.0]);
    }

    #[test]
    fn test_selector_caps_count() {
        let candidates: Vec<_> = (0..20).map(|i| candidate(i, i as f64 * 500.0, 0.0)).collect();
        let chosen = select_junctions(candidates, 50.0, 5);
        assert_eq!(chosen.len(), 5);
    }

    #[test]
    fn test_selector_tie_keeps_generation_order() {
        // Equidistant duplicate: the earlier-generated entry wins, the
        // duplicate is suppressed by the spacing floor.
        let candidates = vec![
            candidate(3, 500.0, 72.0),
            candidate(3, 500.0, 0.0),
        ];
        let chosen = select_junctions(candidates, 50.0, 25);
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].turn_angle_deg, 72.0);
    }

    #[test]
    fn test_selector_output_strictly_increasing() {
        let candidates = vec![
            candidate(1, 0.0, 0.0),
            candidate(2, 0.0, 0.0),
            candidate(3, 75.0, 0.0),
            candidate(4, 75.0, 0.0),
            candidate(5, 150.0, 0.0),
        ];
        let chosen = select_junctions(candidates, 50.0, 25);
        for pair in chosen.windows(2) {
            assert!(pair[1].cumulative_m > pair[0].cumulative_m);
        }
    }

    // --- temporal mapping ---

    #[test]
    fn test_eta_uniform_speed_model() {
        // 1000 m route, 100 s ETA: 10 m/s, so 500 m maps to 50 s.
        let avg = 1000.0 / 100.0;
        assert_eq!(eta_seconds(500.0, avg), 50);
        assert_eq!(eta_seconds(0.0, avg), 0);
        assert_eq!(eta_seconds(1000.0, avg), 100);
    }

    #[test]
    fn test_eta_floors_fractional_seconds() {
        assert_eq!(eta_seconds(999.0, 10.0), 99);
    }

    #[test]
    fn test_eta_degenerate_speed_floors_to_zero() {
        // Zero-length route: speed floor kicks in, distance 0 maps to 0.
        assert_eq!(eta_seconds(0.0, 0.0), 0);
    }

    // --- priority classification ---

    #[test]
    fn test_priority_rule_table() {
        assert_eq!(classify_priority(90.0, 0.9), Priority::High);
        assert_eq!(classify_priority(60.0, 0.70), Priority::High);
        assert_eq!(classify_priority(60.0, 0.40), Priority::Medium);
        assert_eq!(classify_priority(35.0, 0.40), Priority::Medium);
        assert_eq!(classify_priority(0.0, 0.70), Priority::Medium);
        assert_eq!(classify_priority(35.0, 0.0), Priority::Low);
        assert_eq!(classify_priority(34.9, 0.39), Priority::Low);
        assert_eq!(classify_priority(0.0, 0.0), Priority::Low);
    }

    // --- validation ---

    #[test]
    fn test_validate_rejects_short_route() {
        let req = CorridorPlanRequest::new(Route::new(vec![pt(0.0, 0.0)]), 100);
        assert_eq!(req.validate(), Err(ValidationError::RouteTooShort(1)));
    }

    #[test]
    fn test_validate_rejects_non_positive_eta() {
        let route = Route::new(vec![pt(0.0, 0.0), pt(0.01, 0.0)]);
        let req = CorridorPlanRequest::new(route, 0);
        assert_eq!(req.validate(), Err(ValidationError::NonPositiveEta(0)));
    }

    #[test]
    fn test_validate_rejects_out_of_range_knobs() {
        let route = Route::new(vec![pt(0.0, 0.0), pt(0.01, 0.0)]);

        let mut req = CorridorPlanRequest::new(route.clone(), 100);
        req.max_junctions = 4;
        assert!(matches!(
            req.validate(),
            Err(ValidationError::OutOfRange { field: "max_junctions", .. })
        ));

        let mut req = CorridorPlanRequest::new(route.clone(), 100);
        req.min_spacing_m = 3001;
        assert!(matches!(
            req.validate(),
            Err(ValidationError::OutOfRange { field: "min_spacing_m", .. })
        ));

        let mut req = CorridorPlanRequest::new(route.clone(), 100);
        req.turn_angle_threshold_deg = 9.9;
        assert!(matches!(
            req.validate(),
            Err(ValidationError::OutOfRange { field: "turn_angle_threshold_deg", .. })
        ));

        let mut req = CorridorPlanRequest::new(route, 100);
        req.window_buffer_seconds = 181;
        assert!(matches!(
            req.validate(),
            Err(ValidationError::OutOfRange { field: "window_buffer_seconds", .. })
        ));
    }

    #[test]
    fn test_validate_accepts_boundary_values() {
        let route = Route::new(vec![pt(0.0, 0.0), pt(0.01, 0.0)]);
        let mut req = CorridorPlanRequest::new(route, 1);
        req.max_junctions = 5;
        req.min_spacing_m = 3000;
        req.turn_angle_threshold_deg = 120.0;
        req.window_buffer_seconds = 180;
        assert_eq!(req.validate(), Ok(()));
    }

    #[test]
    fn test_validation_error_names_offending_field() {
        let err = check_range("min_spacing_m", 10.0, 50.0, 3000.0).unwrap_err();
        assert_eq!(err.to_string(), "min_spacing_m must be within [50, 3000], got 10");
    }
}
