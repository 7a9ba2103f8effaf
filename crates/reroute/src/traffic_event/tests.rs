//! Tests for event values and their derived properties.

use std::time::Duration;

use crate::config::MAX_EVENT_RADIUS_KM;
use crate::geo::Coordinate;
use crate::spatial_index::{H3Index, Resolution};

use super::*;

const SPOT: Coordinate = Coordinate::new(32.0853, 34.7818);

fn make(kind: EventKind, severity: f64) -> TrafficEvent {
    let index = H3Index::initialized();
    EventReport::new(kind, SPOT, severity)
        .into_event(
            EventId(1),
            &index,
            Resolution::new(9).unwrap(),
            Duration::from_secs(100),
            0.5,
        )
        .unwrap()
}

#[test]
fn test_road_closure_is_impassable() {
    let e = make(EventKind::RoadClosure, 0.1);
    assert!(e.cost_multiplier().is_infinite());
    assert!(e.is_impassable());
    assert!(e.requires_reroute());
}

#[test]
fn test_other_kinds_scale_linearly_from_one() {
    for kind in EventKind::ALL {
        if kind == EventKind::RoadClosure {
            continue;
        }
        let low = cost_multiplier(kind, 0.0);
        let mid = cost_multiplier(kind, 0.5);
        let high = cost_multiplier(kind, 1.0);
        assert!((low - 1.0).abs() < 1e-12, "{kind}: {low}");
        assert!(high > mid && mid > low, "{kind}");
        assert!(((mid - low) * 2.0 - (high - low)).abs() < 1e-9, "{kind} not linear");
        assert!(!is_impassable_multiplier(high));
    }
}

#[test]
fn test_severity_clamped_in_multiplier() {
    assert_eq!(
        cost_multiplier(EventKind::Accident, 5.0),
        cost_multiplier(EventKind::Accident, 1.0)
    );
    assert_eq!(cost_multiplier(EventKind::Weather, -1.0), 1.0);
}

#[test]
fn test_requires_reroute_by_kind() {
    for kind in [
        EventKind::RoadClosure,
        EventKind::Flooding,
        EventKind::Accident,
        EventKind::Construction,
    ] {
        assert!(kind_requires_reroute(kind, 0.0, 0.7), "{kind}");
    }
    assert!(!kind_requires_reroute(EventKind::HeavyTraffic, 0.69, 0.7));
    assert!(kind_requires_reroute(EventKind::HeavyTraffic, 0.7, 0.7));
    assert!(!make(EventKind::Weather, 0.5).requires_reroute());
    assert!(make(EventKind::Weather, 0.9).requires_reroute());
}

#[test]
fn test_is_active_respects_expiry() {
    let mut e = make(EventKind::Hazard, 0.3);
    assert!(e.is_active(Duration::from_secs(1_000_000)));

    e.expires_at = Some(Duration::from_secs(200));
    assert!(e.is_active(Duration::from_secs(199)));
    assert!(!e.is_active(Duration::from_secs(200)));
}

#[test]
fn test_into_event_fills_defaults() {
    let index = H3Index::initialized();
    let event = EventReport::new(EventKind::Accident, SPOT, f64::NAN)
        .with_radius_km(-3.0)
        .with_duration(Duration::from_secs(60))
        .into_event(
            EventId(7),
            &index,
            Resolution::new(9).unwrap(),
            Duration::from_secs(10),
            0.5,
        )
        .unwrap();
    assert_eq!(event.severity, 0.0);
    assert_eq!(event.radius_km, 0.5);
    assert_eq!(event.description, "accident");
    assert_eq!(event.created_at, Duration::from_secs(10));
    assert_eq!(event.expires_at, Some(Duration::from_secs(70)));
}

#[test]
fn test_into_event_clamps_oversized_radius() {
    let index = H3Index::initialized();
    let event = EventReport::new(EventKind::Accident, SPOT, 0.5)
        .with_radius_km(1_000.0)
        .into_event(
            EventId(8),
            &index,
            Resolution::new(9).unwrap(),
            Duration::ZERO,
            0.5,
        )
        .unwrap();
    assert_eq!(event.radius_km, MAX_EVENT_RADIUS_KM);
}

#[test]
fn test_into_event_rejects_bad_coordinate() {
    let index = H3Index::initialized();
    let result = EventReport::new(EventKind::Accident, Coordinate::new(120.0, 0.0), 0.5).into_event(
        EventId(1),
        &index,
        Resolution::new(9).unwrap(),
        Duration::ZERO,
        0.5,
    );
    assert!(result.is_err());
}

#[test]
fn test_event_id_display() {
    assert_eq!(format!("{}", EventId(42)), "evt-000042");
}

#[test]
fn test_event_report_deserializes_with_defaults() {
    let json = r#"{"kind":"lane_restriction","coordinate":{"lat":32.0,"lng":34.8},"severity":0.4}"#;
    let report: EventReport = serde_json::from_str(json).unwrap();
    assert_eq!(report.kind, EventKind::LaneRestriction);
    assert!(report.radius_km.is_none());
    assert!(report.duration.is_none());
}
