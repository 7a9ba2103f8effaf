//! Pure cost and reroute rules per event kind.

use crate::config::DEFAULT_SEVERITY_REROUTE_THRESHOLD;

use super::types::EventKind;

/// Cost multiplier meaning "avoid completely".
pub const IMPASSABLE_MULTIPLIER: f64 = f64::INFINITY;

/// Traversal cost multiplier for an event of `kind` at `severity` (0..=1).
///
/// Road closures are impassable regardless of severity; every other kind
/// scales linearly from 1.0 with its own slope.
pub fn cost_multiplier(kind: EventKind, severity: f64) -> f64 {
    let s = severity.clamp(0.0, 1.0);
    match kind {
        EventKind::RoadClosure => IMPASSABLE_MULTIPLIER,
        EventKind::Flooding => 1.0 + 3.0 * s,
        EventKind::Accident => 1.0 + 2.0 * s,
        EventKind::HeavyTraffic => 1.0 + 1.5 * s,
        EventKind::Construction => 1.0 + 1.2 * s,
        EventKind::PublicEvent => 1.0 + 1.0 * s,
        EventKind::Hazard => 1.0 + 1.0 * s,
        EventKind::Weather => 1.0 + 0.8 * s,
        EventKind::PoliceActivity => 1.0 + 0.7 * s,
        EventKind::LaneRestriction => 1.0 + 0.5 * s,
    }
}

pub fn is_impassable_multiplier(multiplier: f64) -> bool {
    multiplier.is_infinite() && multiplier > 0.0
}

/// Closures, flooding, accidents and construction always warrant a reroute;
/// any other kind only at or above `severity_threshold`.
pub fn kind_requires_reroute(kind: EventKind, severity: f64, severity_threshold: f64) -> bool {
    matches!(
        kind,
        EventKind::RoadClosure
            | EventKind::Flooding
            | EventKind::Accident
            | EventKind::Construction
    ) || severity >= severity_threshold
}

/// [`kind_requires_reroute`] with the default severity threshold.
pub(crate) fn default_requires_reroute(kind: EventKind, severity: f64) -> bool {
    kind_requires_reroute(kind, severity, DEFAULT_SEVERITY_REROUTE_THRESHOLD)
}
