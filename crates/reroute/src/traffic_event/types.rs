//! Event value types.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SpatialError;
use crate::geo::Coordinate;
use crate::config::MAX_EVENT_RADIUS_KM;
use crate::spatial_index::{Cell, Resolution, SpatialIndex};

use super::calculations::{cost_multiplier, default_requires_reroute, is_impassable_multiplier};

/// Identifier assigned by the event feed when an event is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "evt-{:06}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RoadClosure,
    Accident,
    HeavyTraffic,
    Construction,
    Weather,
    PublicEvent,
    Hazard,
    LaneRestriction,
    PoliceActivity,
    Flooding,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::RoadClosure,
        EventKind::Accident,
        EventKind::HeavyTraffic,
        EventKind::Construction,
        EventKind::Weather,
        EventKind::PublicEvent,
        EventKind::Hazard,
        EventKind::LaneRestriction,
        EventKind::PoliceActivity,
        EventKind::Flooding,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EventKind::RoadClosure => "road closure",
            EventKind::Accident => "accident",
            EventKind::HeavyTraffic => "heavy traffic",
            EventKind::Construction => "construction",
            EventKind::Weather => "weather",
            EventKind::PublicEvent => "public event",
            EventKind::Hazard => "hazard",
            EventKind::LaneRestriction => "lane restriction",
            EventKind::PoliceActivity => "police activity",
            EventKind::Flooding => "flooding",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single disruption. Immutable once created: expiry is a function of
/// time, never a field update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub coordinate: Coordinate,
    /// Cell containing `coordinate` at the session resolution.
    pub cell: Cell,
    /// Severity in [0, 1].
    pub severity: f64,
    pub created_at: Duration,
    pub expires_at: Option<Duration>,
    pub description: String,
    pub radius_km: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TrafficEvent {
    pub fn cost_multiplier(&self) -> f64 {
        cost_multiplier(self.kind, self.severity)
    }

    pub fn is_impassable(&self) -> bool {
        is_impassable_multiplier(self.cost_multiplier())
    }

    /// Uses the default severity threshold (0.7).
    pub fn requires_reroute(&self) -> bool {
        default_requires_reroute(self.kind, self.severity)
    }

    /// Active while there is no expiry or the expiry is still in the future.
    pub fn is_active(&self, now: Duration) -> bool {
        self.expires_at.map_or(true, |expiry| expiry > now)
    }
}

/// An event as reported by a caller or synthesized by the simulator, before
/// it has an id and a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReport {
    pub kind: EventKind,
    pub coordinate: Coordinate,
    pub severity: f64,
    #[serde(default)]
    pub description: String,
    /// Effect radius; the session default applies when absent.
    #[serde(default)]
    pub radius_km: Option<f64>,
    /// Lifetime from ingestion; no expiry when absent.
    #[serde(default)]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl EventReport {
    pub fn new(kind: EventKind, coordinate: Coordinate, severity: f64) -> Self {
        Self {
            kind,
            coordinate,
            severity,
            description: String::new(),
            radius_km: None,
            duration: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = Some(radius_km);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Resolve the report into an event: locate its cell, clamp severity and
    /// radius, and fill in defaults. Fails only on an unusable coordinate.
    pub fn into_event(
        self,
        id: EventId,
        index: &dyn SpatialIndex,
        res: Resolution,
        now: Duration,
        default_radius_km: f64,
    ) -> Result<TrafficEvent, SpatialError> {
        let cell = index.coordinate_to_cell(self.coordinate, res)?;
        let severity = if self.severity.is_nan() {
            0.0
        } else {
            self.severity.clamp(0.0, 1.0)
        };
        let radius_km = self
            .radius_km
            .filter(|r| r.is_finite() && *r >= 0.0)
            .unwrap_or(default_radius_km)
            .min(MAX_EVENT_RADIUS_KM);
        let description = if self.description.trim().is_empty() {
            self.kind.label().to_string()
        } else {
            self.description
        };
        Ok(TrafficEvent {
            id,
            kind: self.kind,
            coordinate: self.coordinate,
            cell,
            severity,
            created_at: now,
            expires_at: self.duration.map(|d| now + d),
            description,
            radius_km,
            metadata: self.metadata,
        })
    }
}
