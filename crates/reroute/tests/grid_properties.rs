//! Grid properties and the headline closure scenario, exercised through the
//! public API only.
//!
//! Run: cargo test -p reroute --test grid_properties

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reroute::config::MonitorConfig;
use reroute::controller::ReroutingController;
use reroute::grid_cost::RouteOptimizer;
use reroute::relevance::{MatchType, RelevanceDetector};
use reroute::spatial_index::H3Index;
use reroute::traffic_event::{EventId, EventKind, EventReport};
use reroute::{Coordinate, Resolution, SpatialIndex};

const TEL_AVIV: Coordinate = Coordinate::new(32.0853, 34.7818);

fn res9() -> Resolution {
    Resolution::new(9).unwrap()
}

// ---------------------------------------------------------------------------
// 1. Hexagonal rings grow as 3k(k+1)+1
// ---------------------------------------------------------------------------

#[test]
fn test_k_ring_sizes() {
    let index = H3Index::initialized();
    let cell = index.coordinate_to_cell(TEL_AVIV, res9()).unwrap();
    for (k, expected) in [(0, 1), (1, 7), (2, 19), (3, 37)] {
        let ring = index.k_ring(cell, k).unwrap();
        assert_eq!(ring.len(), expected, "k = {k}");
        assert!(ring.contains(&cell));
    }
}

#[test]
fn test_rings_are_nested() {
    let index = H3Index::initialized();
    let cell = index.coordinate_to_cell(TEL_AVIV, res9()).unwrap();
    let inner = index.k_ring(cell, 1).unwrap();
    let outer = index.k_ring(cell, 2).unwrap();
    assert!(inner.is_subset(&outer));
    for neighbor in inner.iter().filter(|c| **c != cell) {
        assert!(index.are_neighbors(cell, *neighbor).unwrap());
        assert_eq!(index.grid_distance(cell, *neighbor).unwrap(), 1);
    }
}

// ---------------------------------------------------------------------------
// 2. Cell assignment is stable and local
// ---------------------------------------------------------------------------

#[test]
fn test_cell_assignment_is_stable() {
    let index = H3Index::initialized();
    let a = index.coordinate_to_cell(TEL_AVIV, res9()).unwrap();
    let b = index.coordinate_to_cell(TEL_AVIV, res9()).unwrap();
    assert_eq!(a, b);

    let center = index.cell_to_coordinate(a).unwrap();
    assert_eq!(index.coordinate_to_cell(center, res9()).unwrap(), a);
    assert_eq!(index.resolution_of(a).unwrap(), res9());
}

#[test]
fn test_nearby_and_distant_points() {
    let index = H3Index::initialized();
    let center = index
        .cell_to_coordinate(index.coordinate_to_cell(TEL_AVIV, res9()).unwrap())
        .unwrap();
    let here = index.coordinate_to_cell(center, res9()).unwrap();
    let near = index
        .coordinate_to_cell(center.offset_meters(30.0, 30.0), res9())
        .unwrap();
    assert_eq!(here, near, "50 m apart share a res-9 cell");

    let far = index
        .coordinate_to_cell(center.offset_meters(5_000.0, 0.0), res9())
        .unwrap();
    assert_ne!(here, far);
    assert!(index.grid_distance(here, far).unwrap() > 0);
}

#[test]
fn test_parent_contains_children() {
    let index = H3Index::initialized();
    let cell = index.coordinate_to_cell(TEL_AVIV, res9()).unwrap();
    let parent = index.parent(cell, Resolution::new(7).unwrap()).unwrap();
    let children: HashSet<_> = index
        .children(parent, res9())
        .unwrap()
        .into_iter()
        .collect();
    assert!(children.contains(&cell));
    assert_eq!(children.len(), 49);
}

// ---------------------------------------------------------------------------
// 3. Closure on a route: relevance, cost decision and request agree
// ---------------------------------------------------------------------------

#[test]
fn test_closure_scenario() {
    let index: Arc<dyn SpatialIndex> = Arc::new(H3Index::initialized());
    let config = MonitorConfig::default();
    let end = TEL_AVIV.offset_meters(2_000.0, 0.0);
    let route = vec![TEL_AVIV, TEL_AVIV.offset_meters(1_000.0, 0.0), end];
    let now = Duration::from_secs(10);

    let mut detector = RelevanceDetector::new(index.clone(), res9());
    detector.cache_route(&route).unwrap();
    let mut optimizer = RouteOptimizer::new(index.clone(), &config);
    optimizer.set_route(&route, Some(TEL_AVIV), Some(end)).unwrap();
    let mut controller = ReroutingController::new(index.clone(), &config);
    controller
        .set_route(&route, Some(TEL_AVIV), Some(end), true)
        .unwrap();

    let mid = TEL_AVIV.offset_meters(1_000.0, 0.0);
    let closure = EventReport::new(EventKind::RoadClosure, mid, 0.95)
        .with_radius_km(0.3)
        .into_event(EventId(1), index.as_ref(), res9(), now, config.default_radius_km)
        .unwrap();

    let relevance = detector.check_relevance(&closure);
    assert!(relevance.relevant);
    assert_eq!(relevance.match_type, MatchType::DirectHit);

    let evaluation = optimizer.add_event(closure.clone(), now).unwrap();
    assert!(evaluation.check.needs_reroute);
    let reroute = evaluation.reroute.unwrap();
    assert!(reroute.cells_to_avoid.contains(&closure.cell));
    assert!(optimizer.route_cost(now).unwrap().is_infinite());

    let request = controller.process_event(&closure, now).unwrap().unwrap();
    assert_eq!(request.affected_cells.len(), 19);
    assert!(!controller.validate_reroute(&route, now).unwrap());

    let detour = vec![
        TEL_AVIV,
        TEL_AVIV.offset_meters(0.0, 2_500.0),
        end.offset_meters(0.0, 2_500.0),
        end,
    ];
    assert!(controller.validate_reroute(&detour, now).unwrap());
}
