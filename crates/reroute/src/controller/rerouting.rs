use std::collections::BTreeSet;
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::broadcast::{ListenerId, ListenerResult, Listeners};
use crate::config::MonitorConfig;
use crate::error::SpatialError;
use crate::geo::Coordinate;
use crate::relevance::{RelevanceDetector, RelevanceResult};
use crate::spatial_index::{Cell, GridIndex, SharedIndex};
use crate::traffic_event::{EventId, TrafficEvent};

/// Emitted when a relevant event arrives. Carries everything a directions
/// layer needs to ask for an alternate route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerouteRequest {
    pub triggering_event: TrafficEvent,
    pub relevance: RelevanceResult,
    /// Footprint of the triggering event.
    pub affected_cells: BTreeSet<Cell>,
    /// Footprints of every tracked relevant event, the triggering one included.
    pub cells_to_avoid: BTreeSet<Cell>,
    pub all_affected_events: Vec<TrafficEvent>,
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
    pub previous_route_cells: BTreeSet<Cell>,
    pub timestamp: Duration,
}

#[derive(Debug, Clone, Default)]
struct RouteContext {
    path: Vec<Coordinate>,
    origin: Option<Coordinate>,
    destination: Option<Coordinate>,
}

/// Ties relevance detection to reroute signaling for one route.
#[derive(Resource)]
pub struct ReroutingController {
    detector: RelevanceDetector,
    context: Option<RouteContext>,
    active: Vec<TrafficEvent>,
    listeners: Listeners<RerouteRequest>,
}

impl FromWorld for ReroutingController {
    fn from_world(world: &mut World) -> Self {
        let index = world.get_resource_or_insert_with(GridIndex::default).0.clone();
        let config = world
            .get_resource::<MonitorConfig>()
            .cloned()
            .unwrap_or_default();
        Self::new(index, &config)
    }
}

impl ReroutingController {
    pub fn new(index: SharedIndex, config: &MonitorConfig) -> Self {
        Self {
            detector: RelevanceDetector::new(index, config.grid_resolution()),
            context: None,
            active: Vec::new(),
            listeners: Listeners::default(),
        }
    }

    pub fn detector(&self) -> &RelevanceDetector {
        &self.detector
    }

    pub fn path(&self) -> &[Coordinate] {
        self.context.as_ref().map_or(&[], |c| c.path.as_slice())
    }

    pub fn origin(&self) -> Option<Coordinate> {
        self.context.as_ref().and_then(|c| c.origin)
    }

    pub fn destination(&self) -> Option<Coordinate> {
        self.context.as_ref().and_then(|c| c.destination)
    }

    pub fn active_relevant_events(&self) -> &[TrafficEvent] {
        &self.active
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&RerouteRequest) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Re-cache the route. Tracked events survive unless `clear_events`.
    pub fn set_route(
        &mut self,
        path: &[Coordinate],
        origin: Option<Coordinate>,
        destination: Option<Coordinate>,
        clear_events: bool,
    ) -> Result<(), SpatialError> {
        if clear_events {
            self.active.clear();
        }
        if let Err(e) = self.detector.cache_route(path) {
            self.context = None;
            return Err(e);
        }
        self.context = (!path.is_empty()).then(|| RouteContext {
            path: path.to_vec(),
            origin,
            destination,
        });
        Ok(())
    }

    pub fn check_relevance(&self, event: &TrafficEvent) -> RelevanceResult {
        self.detector.check_relevance(event)
    }

    /// Classify `event` and, when it is relevant and not yet tracked, start
    /// tracking it and emit a [`RerouteRequest`]. Irrelevant events leave no
    /// trace.
    pub fn process_event(
        &mut self,
        event: &TrafficEvent,
        now: Duration,
    ) -> Result<Option<RerouteRequest>, SpatialError> {
        if !event.is_active(now) {
            debug!("ignoring {}: already expired", event.id);
            return Ok(None);
        }
        let relevance = self.detector.check_relevance(event);
        if !relevance.relevant {
            debug!("ignoring {}: {}", event.id, relevance.reason);
            return Ok(None);
        }
        if self.is_tracked(event.id) {
            return Ok(None);
        }

        let affected_cells: BTreeSet<Cell> =
            self.detector.affected_cells(event)?.into_iter().collect();
        let mut cells_to_avoid = self.cells_to_avoid(now)?;
        cells_to_avoid.extend(affected_cells.iter().copied());
        self.active.push(event.clone());

        let request = RerouteRequest {
            triggering_event: event.clone(),
            relevance,
            affected_cells,
            cells_to_avoid,
            all_affected_events: self.active.clone(),
            origin: self.origin(),
            destination: self.destination(),
            previous_route_cells: self.detector.coverage().route_cells().iter().copied().collect(),
            timestamp: now,
        };
        info!(
            "reroute requested by {} {} ({:?}), {} cells to avoid",
            event.id,
            event.kind,
            request.relevance.match_type,
            request.cells_to_avoid.len()
        );
        self.listeners.notify(&request);
        Ok(Some(request))
    }

    pub fn is_tracked(&self, id: EventId) -> bool {
        self.active.iter().any(|e| e.id == id)
    }

    /// True iff `path` stays clear of every tracked event still active.
    pub fn validate_reroute(
        &self,
        path: &[Coordinate],
        now: Duration,
    ) -> Result<bool, SpatialError> {
        self.detector.route_avoids(path, &self.active, now)
    }

    /// Union of the footprints of the tracked events still active at `now`.
    pub fn cells_to_avoid(&self, now: Duration) -> Result<BTreeSet<Cell>, SpatialError> {
        let mut cells = BTreeSet::new();
        for event in self.active.iter().filter(|e| e.is_active(now)) {
            cells.extend(self.detector.affected_cells(event)?);
        }
        Ok(cells)
    }

    pub fn remove_event(&mut self, id: EventId) -> Option<TrafficEvent> {
        let pos = self.active.iter().position(|e| e.id == id)?;
        Some(self.active.remove(pos))
    }

    /// Stop tracking events that are no longer active.
    pub fn prune_inactive(&mut self, now: Duration) -> usize {
        let before = self.active.len();
        self.active.retain(|e| e.is_active(now));
        before - self.active.len()
    }

    /// Switch to `path` if it clears every tracked event, keeping those
    /// events tracked. Returns whether the route was adopted.
    pub fn adopt_reroute(
        &mut self,
        path: &[Coordinate],
        now: Duration,
    ) -> Result<bool, SpatialError> {
        if path.is_empty() || !self.validate_reroute(path, now)? {
            return Ok(false);
        }
        let origin = self.origin().or_else(|| path.first().copied());
        let destination = self.destination().or_else(|| path.last().copied());
        self.set_route(path, origin, destination, false)?;
        Ok(true)
    }
}
