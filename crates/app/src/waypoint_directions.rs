//! Straight-segment directions provider for the demo session.
//!
//! Proposes the direct segment, a route through the suggested waypoint and
//! a few sideways detours around the midpoint. ETAs assume a constant
//! speed. Good enough to exercise candidate validation without a road
//! network.

use std::time::Duration;

use reroute::directions::{CandidateRoute, DirectionsProvider, DirectionsRequest};
use reroute::error::DirectionsError;
use reroute::Coordinate;

pub struct WaypointDirections {
    pub speed_kmh: f64,
    /// Sideways offsets of the detour vertex, in meters (sign picks the side).
    pub detour_offsets_m: Vec<f64>,
}

impl Default for WaypointDirections {
    fn default() -> Self {
        Self {
            speed_kmh: 40.0,
            detour_offsets_m: vec![800.0, -800.0, 1_600.0, -1_600.0],
        }
    }
}

impl WaypointDirections {
    fn candidate(&self, path: Vec<Coordinate>) -> CandidateRoute {
        let mut candidate = CandidateRoute::new(path, Duration::ZERO);
        candidate.eta = Duration::from_secs_f64(candidate.distance_km / self.speed_kmh * 3600.0);
        candidate
    }
}

/// Local (north, east) offset in meters from `a` to `b`.
fn local_offset_m(a: Coordinate, b: Coordinate) -> (f64, f64) {
    let north = a.distance_km(Coordinate::new(b.lat, a.lng)) * 1_000.0;
    let east = a.distance_km(Coordinate::new(a.lat, b.lng)) * 1_000.0;
    (
        if b.lat >= a.lat { north } else { -north },
        if b.lng >= a.lng { east } else { -east },
    )
}

impl DirectionsProvider for WaypointDirections {
    fn directions(
        &self,
        request: &DirectionsRequest,
    ) -> Result<Vec<CandidateRoute>, DirectionsError> {
        let (origin, destination) = (request.origin, request.destination);
        let (north, east) = local_offset_m(origin, destination);
        let length = north.hypot(east);
        if !(self.speed_kmh.is_finite() && self.speed_kmh > 0.0) || length < 1.0 {
            return Err(DirectionsError::NoRoute);
        }

        let mut candidates = vec![self.candidate(vec![origin, destination])];
        if let Some(waypoint) = request.waypoint {
            candidates.push(self.candidate(vec![origin, waypoint, destination]));
        }
        let midpoint = origin.offset_meters(north / 2.0, east / 2.0);
        let (perp_north, perp_east) = (-east / length, north / length);
        for offset in &self.detour_offsets_m {
            let via = midpoint.offset_meters(perp_north * offset, perp_east * offset);
            candidates.push(self.candidate(vec![origin, via, destination]));
        }
        Ok(candidates)
    }
}
