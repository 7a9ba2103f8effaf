//! Tests for route coverage and relevance classification.

use std::sync::Arc;
use std::time::Duration;

use crate::geo::Coordinate;
use crate::spatial_index::{Cell, H3Index, Resolution, SharedIndex, SpatialIndex};
use crate::traffic_event::{EventId, EventKind, EventReport, TrafficEvent};

use super::*;

const START: Coordinate = Coordinate::new(32.0853, 34.7818);

fn res9() -> Resolution {
    Resolution::new(9).unwrap()
}

fn shared_index() -> SharedIndex {
    Arc::new(H3Index::initialized())
}

/// Roughly 2 km due north with a kink in the middle.
fn route() -> Vec<Coordinate> {
    vec![
        START,
        START.offset_meters(1_000.0, 0.0),
        START.offset_meters(2_000.0, 300.0),
    ]
}

fn detector_with_route() -> RelevanceDetector {
    let mut detector = RelevanceDetector::new(shared_index(), res9());
    detector.cache_route(&route()).unwrap();
    detector
}

fn event_at(id: u64, coord: Coordinate, kind: EventKind) -> TrafficEvent {
    let index = H3Index::initialized();
    EventReport::new(kind, coord, 0.5)
        .into_event(EventId(id), &index, res9(), Duration::ZERO, 0.5)
        .unwrap()
}

fn center_of(cell: Cell) -> Coordinate {
    H3Index::initialized().cell_to_coordinate(cell).unwrap()
}

#[test]
fn test_no_route_cached() {
    let detector = RelevanceDetector::new(shared_index(), res9());
    let result = detector.check_relevance(&event_at(1, START, EventKind::Accident));
    assert!(!result.relevant);
    assert_eq!(result.match_type, MatchType::NoMatch);
    assert_eq!(result.reason, NO_ROUTE_REASON);
    assert_eq!(result.matched_cell, None);
}

#[test]
fn test_every_route_cell_is_direct_hit() {
    let detector = detector_with_route();
    let cells: Vec<Cell> = detector.coverage().route_cells().iter().copied().collect();
    assert!(cells.len() > 5, "2 km at res 9 spans many cells");
    for (i, cell) in cells.into_iter().enumerate() {
        let event = event_at(i as u64, center_of(cell), EventKind::HeavyTraffic);
        let result = detector.check_relevance(&event);
        assert_eq!(result.match_type, MatchType::DirectHit, "cell {cell}");
        assert!(result.relevant);
        assert_eq!(result.matched_cell, Some(cell));
    }
}

#[test]
fn test_buffer_only_cells_are_adjacent() {
    let detector = detector_with_route();
    let coverage = detector.coverage();
    let buffer_only: Vec<Cell> = coverage
        .route_cells_with_neighbors()
        .difference(coverage.route_cells())
        .copied()
        .collect();
    assert!(!buffer_only.is_empty());
    for cell in buffer_only {
        let result = detector.check_relevance(&event_at(1, center_of(cell), EventKind::Weather));
        assert_eq!(result.match_type, MatchType::Adjacent, "cell {cell}");
        assert!(result.relevant);
    }
}

#[test]
fn test_far_event_is_no_match() {
    let detector = detector_with_route();
    let far = START.offset_meters(-10_000.0, 0.0);
    let result = detector.check_relevance(&event_at(1, far, EventKind::RoadClosure));
    assert!(!result.relevant);
    assert_eq!(result.match_type, MatchType::NoMatch);
    assert_ne!(result.reason, NO_ROUTE_REASON);
}

#[test]
fn test_caching_is_idempotent() {
    let mut detector = detector_with_route();
    let cells = detector.coverage().route_cells().clone();
    let buffered = detector.coverage().route_cells_with_neighbors().clone();
    detector.cache_route(&route()).unwrap();
    assert_eq!(detector.coverage().route_cells(), &cells);
    assert_eq!(detector.coverage().route_cells_with_neighbors(), &buffered);
    assert!(buffered.is_superset(&cells));
}

#[test]
fn test_empty_path_invalidates_cache() {
    let mut detector = detector_with_route();
    detector.cache_route(&[]).unwrap();
    assert!(!detector.coverage().is_valid());
    let result = detector.check_relevance(&event_at(1, START, EventKind::Accident));
    assert_eq!(result.reason, NO_ROUTE_REASON);
}

#[test]
fn test_failed_cache_leaves_no_stale_route() {
    let mut detector = detector_with_route();
    let bad = vec![START, Coordinate::new(f64::NAN, 34.0)];
    assert!(detector.cache_route(&bad).is_err());
    assert!(!detector.coverage().is_valid());
    assert!(detector.coverage().path().is_empty());
}

#[test]
fn test_single_vertex_route() {
    let mut detector = RelevanceDetector::new(shared_index(), res9());
    detector.cache_route(&[START]).unwrap();
    assert_eq!(detector.coverage().route_cells().len(), 1);
    assert_eq!(detector.coverage().route_cells_with_neighbors().len(), 7);
}

#[test]
fn test_stateless_check_matches_cached() {
    let detector = detector_with_route();
    let coverage = detector.coverage();
    let samples = [
        *coverage.route_cells().iter().next().unwrap(),
        *coverage
            .route_cells_with_neighbors()
            .difference(coverage.route_cells())
            .next()
            .unwrap(),
    ];
    for cell in samples {
        let event = event_at(1, center_of(cell), EventKind::Hazard);
        let cached = detector.check_relevance(&event);
        let stateless = detector.check_relevance_for_path(&event, &route()).unwrap();
        assert_eq!(cached.match_type, stateless.match_type);
    }
    let far = event_at(2, START.offset_meters(0.0, 10_000.0), EventKind::Hazard);
    assert_eq!(
        detector.check_relevance_for_path(&far, &route()).unwrap().match_type,
        MatchType::NoMatch
    );
}

#[test]
fn test_stateless_check_leaves_cache_untouched() {
    let detector = detector_with_route();
    let before = detector.coverage().route_cells().clone();
    let other = vec![START.offset_meters(0.0, 5_000.0), START.offset_meters(500.0, 5_000.0)];
    let event = event_at(1, START, EventKind::Accident);
    let _ = detector.check_relevance_for_path(&event, &other).unwrap();
    assert_eq!(detector.coverage().route_cells(), &before);
}

#[test]
fn test_affected_cells_radius() {
    let detector = detector_with_route();
    let event = event_at(1, START, EventKind::Construction);
    // 0.5 km at ~174 m edges -> 2 rings -> 19 cells.
    let cells = detector.affected_cells(&event).unwrap();
    assert_eq!(cells.len(), 19);
    assert!(cells.contains(&event.cell));

    let mut point = event.clone();
    point.radius_km = 0.0;
    assert_eq!(detector.affected_cells(&point).unwrap().len(), 1);
}

#[test]
fn test_route_avoids() {
    let detector = detector_with_route();
    let on_route = event_at(1, START.offset_meters(1_000.0, 0.0), EventKind::RoadClosure);
    assert!(!detector
        .route_avoids(&route(), [&on_route], Duration::from_secs(1))
        .unwrap());

    let detour = vec![START.offset_meters(0.0, 3_000.0), START.offset_meters(2_000.0, 3_000.0)];
    assert!(detector
        .route_avoids(&detour, [&on_route], Duration::from_secs(1))
        .unwrap());

    let mut expired = on_route.clone();
    expired.expires_at = Some(Duration::from_secs(10));
    assert!(detector
        .route_avoids(&route(), [&expired], Duration::from_secs(10))
        .unwrap());
}
