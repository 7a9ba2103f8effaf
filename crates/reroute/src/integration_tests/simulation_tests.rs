//! Synthetic event generation on the simulation timer.

use crate::config::MonitorConfig;
use crate::geo::{BoundingBox, Coordinate};
use crate::session;
use crate::test_harness::TestSession;

const START: Coordinate = Coordinate::new(32.0853, 34.7818);

fn route() -> Vec<Coordinate> {
    vec![START, START.offset_meters(1_500.0, 0.0), START.offset_meters(3_000.0, 0.0)]
}

#[test]
fn test_simulation_waits_for_start() {
    let mut session = TestSession::new().with_route(&route());
    session.advance_secs(60);
    assert!(session.events_reported.is_empty());
    assert_eq!(session.feed().counters().simulated, 0);
}

#[test]
fn test_simulation_generates_one_event_per_interval() {
    let mut session = TestSession::new().with_route(&route());
    session::start_simulation(session.world_mut());

    session.advance_secs(19);
    assert!(session.events_reported.is_empty());
    session.advance_secs(1);
    assert_eq!(session.events_reported.len(), 1);
    session.advance_secs(40);
    assert_eq!(session.events_reported.len(), 3);

    let counters = session.feed().counters();
    assert_eq!(counters.simulated, 3);
    assert_eq!(counters.reported, 0);
    for reported in &session.events_reported {
        let event = &reported.0;
        assert_eq!(event.metadata["source"], "simulated");
        assert!(event.expires_at.is_some());
        assert!(session.optimizer().event(event.id).is_some());
    }
}

#[test]
fn test_stop_simulation_halts_generation() {
    let mut session = TestSession::new().with_route(&route());
    session::start_simulation(session.world_mut());
    session.advance_secs(20);
    session::stop_simulation(session.world_mut());
    session.advance_secs(200);
    assert_eq!(session.events_reported.len(), 1);
    assert!(!session::status(session.world()).simulation_running);
}

#[test]
fn test_simulation_respects_cap() {
    let config = MonitorConfig {
        simulation_interval_secs: 1.0,
        max_simulated_events: 3,
        ..MonitorConfig::default()
    };
    let mut session = TestSession::with_config(config).with_route(&route());
    session::start_simulation(session.world_mut());
    session.advance_secs(10);
    assert_eq!(session.events_reported.len(), 3);
    assert_eq!(session.feed().simulated_live_count(), 3);
}

#[test]
fn test_relevant_simulated_events_reach_controller() {
    let config = MonitorConfig {
        simulation_interval_secs: 1.0,
        near_route_probability: 1.0,
        near_route_spread_m: 0.0,
        position_jitter_m: 0.0,
        ..MonitorConfig::default()
    };
    let mut session = TestSession::with_config(config).with_route(&route());
    session::start_simulation(session.world_mut());
    session.advance_secs(5);

    // Every event sits on a route vertex, so each one is tracked.
    assert_eq!(session.events_reported.len(), 5);
    assert_eq!(session.reroutes_requested.len(), 5);
    assert_eq!(session.controller().active_relevant_events().len(), 5);
}

#[test]
fn test_simulation_without_route_uses_region() {
    let region = BoundingBox {
        min_lat: 32.0,
        min_lng: 34.7,
        max_lat: 32.1,
        max_lng: 34.8,
    };
    let config = MonitorConfig {
        simulation_interval_secs: 1.0,
        simulation_region: Some(region),
        position_jitter_m: 0.0,
        ..MonitorConfig::default()
    };
    let mut session = TestSession::with_config(config);
    session::start_simulation(session.world_mut());
    session.advance_secs(4);
    assert_eq!(session.events_reported.len(), 4);
    for reported in &session.events_reported {
        assert!(region.contains(reported.0.coordinate));
    }
    assert!(session.reroutes_requested.is_empty());
}

#[test]
fn test_same_seed_same_events() {
    let run = || {
        let mut session = TestSession::new().with_route(&route());
        session::start_simulation(session.world_mut());
        session.advance_secs(100);
        session
            .events_reported
            .iter()
            .map(|r| (r.0.kind, r.0.coordinate))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}
