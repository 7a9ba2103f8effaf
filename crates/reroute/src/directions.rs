//! Seam to an external directions provider.
//!
//! The monitor never computes road geometry. It hands a provider the
//! endpoints, an optional waypoint and the cells to avoid (as a hint), then
//! checks each returned candidate against the tracked events before
//! adopting one.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::{RerouteRequest, ReroutingController};
use crate::error::{DirectionsError, SpatialError};
use crate::geo::Coordinate;
use crate::spatial_index::Cell;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub waypoint: Option<Coordinate>,
    pub avoid_cells: BTreeSet<Cell>,
}

impl DirectionsRequest {
    pub fn new(origin: Coordinate, destination: Coordinate) -> Self {
        Self {
            origin,
            destination,
            waypoint: None,
            avoid_cells: BTreeSet::new(),
        }
    }

    /// Request for an alternate to the route a [`RerouteRequest`] was raised
    /// for. `None` when the request does not know both endpoints.
    pub fn from_reroute(request: &RerouteRequest) -> Option<Self> {
        Some(Self {
            origin: request.origin?,
            destination: request.destination?,
            waypoint: None,
            avoid_cells: request.cells_to_avoid.clone(),
        })
    }

    pub fn with_waypoint(mut self, waypoint: Option<Coordinate>) -> Self {
        self.waypoint = waypoint;
        self
    }
}

/// One polyline proposed by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRoute {
    pub path: Vec<Coordinate>,
    pub eta: Duration,
    pub distance_km: f64,
}

impl CandidateRoute {
    pub fn new(path: Vec<Coordinate>, eta: Duration) -> Self {
        let distance_km = polyline_length_km(&path);
        Self {
            path,
            eta,
            distance_km,
        }
    }
}

/// Anything that can turn endpoints into candidate polylines.
pub trait DirectionsProvider: Send + Sync {
    fn directions(
        &self,
        request: &DirectionsRequest,
    ) -> Result<Vec<CandidateRoute>, DirectionsError>;
}

pub fn polyline_length_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| w[0].distance_km(w[1])).sum()
}

/// The fastest candidate that clears every event the controller tracks.
pub fn select_candidate(
    controller: &ReroutingController,
    candidates: Vec<CandidateRoute>,
    now: Duration,
) -> Result<Option<CandidateRoute>, SpatialError> {
    let mut best: Option<CandidateRoute> = None;
    for candidate in candidates {
        if candidate.path.is_empty() || !controller.validate_reroute(&candidate.path, now)? {
            continue;
        }
        if best.as_ref().map_or(true, |b| candidate.eta < b.eta) {
            best = Some(candidate);
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::MonitorConfig;
    use crate::spatial_index::{H3Index, Resolution};
    use crate::traffic_event::{EventId, EventKind, EventReport};

    const START: Coordinate = Coordinate::new(32.0853, 34.7818);

    #[test]
    fn test_polyline_length() {
        let path = vec![
            START,
            START.offset_meters(1_000.0, 0.0),
            START.offset_meters(2_000.0, 0.0),
        ];
        let len = polyline_length_km(&path);
        assert!((len - 2.0).abs() < 0.02, "{len}");
        assert_eq!(polyline_length_km(&[START]), 0.0);
    }

    #[test]
    fn test_select_skips_blocked_candidates() {
        let mut controller =
            ReroutingController::new(Arc::new(H3Index::initialized()), &MonitorConfig::default());
        let end = START.offset_meters(3_000.0, 0.0);
        let direct = vec![START, end];
        controller
            .set_route(&direct, Some(START), Some(end), true)
            .unwrap();
        let mid = START.offset_meters(1_500.0, 0.0);
        let closure = EventReport::new(EventKind::RoadClosure, mid, 1.0)
            .with_radius_km(0.2)
            .into_event(
                EventId(1),
                &H3Index::initialized(),
                Resolution::new(9).unwrap(),
                Duration::ZERO,
                0.5,
            )
            .unwrap();
        let request = controller
            .process_event(&closure, Duration::ZERO)
            .unwrap()
            .unwrap();

        let dir_request = DirectionsRequest::from_reroute(&request).unwrap();
        assert_eq!(dir_request.origin, START);
        assert_eq!(dir_request.avoid_cells, request.cells_to_avoid);

        let detour = vec![
            START,
            START.offset_meters(0.0, 2_000.0),
            end.offset_meters(0.0, 2_000.0),
            end,
        ];
        let candidates = vec![
            CandidateRoute::new(direct.clone(), Duration::from_secs(300)),
            CandidateRoute::new(detour.clone(), Duration::from_secs(600)),
            CandidateRoute::new(Vec::new(), Duration::from_secs(1)),
        ];
        let chosen = select_candidate(&controller, candidates, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(chosen.path, detour);
    }

    #[test]
    fn test_request_needs_endpoints() {
        let mut controller =
            ReroutingController::new(Arc::new(H3Index::initialized()), &MonitorConfig::default());
        let path = vec![START, START.offset_meters(1_000.0, 0.0)];
        controller.set_route(&path, None, None, true).unwrap();
        let event = EventReport::new(EventKind::Accident, START, 0.9)
            .into_event(
                EventId(1),
                &H3Index::initialized(),
                Resolution::new(9).unwrap(),
                Duration::ZERO,
                0.5,
            )
            .unwrap();
        let request = controller.process_event(&event, Duration::ZERO).unwrap().unwrap();
        assert!(DirectionsRequest::from_reroute(&request).is_none());
        let manual = DirectionsRequest::new(START, START).with_waypoint(Some(START));
        assert_eq!(manual.waypoint, Some(START));
    }
}
