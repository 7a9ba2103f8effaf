//! The route optimizer: cost model over [`GridState`] and reroute decisions.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::broadcast::{DeliveryReport, ListenerId, ListenerResult, Listeners};
use crate::config::MonitorConfig;
use crate::error::SpatialError;
use crate::geo::Coordinate;
use crate::relevance::{buffered_cells, route_cells_of};
use crate::spatial_index::{Cell, GridIndex, Resolution, SharedIndex};
use crate::traffic_event::{
    is_impassable_multiplier, kind_requires_reroute, EventId, TrafficEvent, IMPASSABLE_MULTIPLIER,
};

use super::congestion::{congestion_cost_multiplier, CongestionLevel, CongestionSample};
use super::state::GridState;

pub const NO_ACTIVE_ROUTE_REASON: &str = "no active route";
pub const NO_EVENTS_REASON: &str = "no events on route";
pub const MINOR_IMPACT_REASON: &str = "minor impact only";

// =============================================================================
// Value types
// =============================================================================

/// Monitoring state of the current route. `RerouteRequired` only reflects
/// the most recent evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    NoRoute,
    Active,
    RerouteRequired,
}

/// Outcome of [`RouteOptimizer::check_reroute_needed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerouteCheckResult {
    pub needs_reroute: bool,
    pub reason: String,
    /// Active on-route events, oldest first.
    pub affected_events: Vec<TrafficEvent>,
    /// `sum(multiplier - 1)` over the finite on-route multipliers.
    pub total_cost_increase: f64,
    pub blocking_event: Option<EventId>,
    pub triggering_event: Option<EventId>,
}

impl RerouteCheckResult {
    fn not_needed(reason: &str, affected_events: Vec<TrafficEvent>) -> Self {
        Self {
            needs_reroute: false,
            reason: reason.to_string(),
            affected_events,
            total_cost_increase: 0.0,
            blocking_event: None,
            triggering_event: None,
        }
    }
}

/// A positive reroute decision, delivered to reroute listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerouteResult {
    pub required: bool,
    pub reason: String,
    pub affected_events: Vec<TrafficEvent>,
    pub cells_to_avoid: BTreeSet<Cell>,
    pub suggested_waypoint: Option<Coordinate>,
    pub timestamp: Duration,
}

/// What [`RouteOptimizer::add_event`] and the monitoring tick return.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub check: RerouteCheckResult,
    /// Set when a reroute was required and broadcast.
    pub reroute: Option<RerouteResult>,
}

#[derive(Debug, Clone)]
struct ActiveRoute {
    path: Vec<Coordinate>,
    origin: Option<Coordinate>,
    destination: Option<Coordinate>,
    core_cells: HashSet<Cell>,
    cells: HashSet<Cell>,
}

// =============================================================================
// RouteOptimizer
// =============================================================================

/// Owns the canonical [`GridState`] and decides whether the current route
/// must be replaced.
#[derive(Resource)]
pub struct RouteOptimizer {
    index: SharedIndex,
    resolution: Resolution,
    reroute_cost_threshold: f64,
    severity_reroute_threshold: f64,
    max_congestion_multiplier: f64,
    congestion_ttl: Duration,
    state: GridState,
    route: Option<ActiveRoute>,
    status: RouteStatus,
    listeners: Listeners<RerouteResult>,
    /// Decisions not yet published as Bevy events.
    outbox: Vec<RerouteResult>,
}

impl FromWorld for RouteOptimizer {
    fn from_world(world: &mut World) -> Self {
        let index = world.get_resource_or_insert_with(GridIndex::default).0.clone();
        let config = world
            .get_resource::<MonitorConfig>()
            .cloned()
            .unwrap_or_default();
        Self::new(index, &config)
    }
}

impl RouteOptimizer {
    pub fn new(index: SharedIndex, config: &MonitorConfig) -> Self {
        Self {
            index,
            resolution: config.grid_resolution(),
            reroute_cost_threshold: config.reroute_cost_threshold,
            severity_reroute_threshold: config.severity_reroute_threshold,
            max_congestion_multiplier: config.max_congestion_multiplier,
            congestion_ttl: config.congestion_ttl(),
            state: GridState::default(),
            route: None,
            status: RouteStatus::NoRoute,
            listeners: Listeners::default(),
            outbox: Vec::new(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn status(&self) -> RouteStatus {
        self.status
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn route_path(&self) -> &[Coordinate] {
        self.route.as_ref().map_or(&[], |r| r.path.as_slice())
    }

    pub fn origin(&self) -> Option<Coordinate> {
        self.route.as_ref().and_then(|r| r.origin)
    }

    pub fn destination(&self) -> Option<Coordinate> {
        self.route.as_ref().and_then(|r| r.destination)
    }

    /// Route cells plus their one-ring buffer; empty without a route.
    pub fn route_cells(&self) -> HashSet<Cell> {
        self.route.as_ref().map(|r| r.cells.clone()).unwrap_or_default()
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&RerouteResult) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Take the decisions made since the last call.
    pub fn drain_decisions(&mut self) -> Vec<RerouteResult> {
        std::mem::take(&mut self.outbox)
    }

    // -------------------------------------------------------------------------
    // Route and event registration
    // -------------------------------------------------------------------------

    /// Replace the monitored route. An empty path clears it.
    pub fn set_route(
        &mut self,
        path: &[Coordinate],
        origin: Option<Coordinate>,
        destination: Option<Coordinate>,
    ) -> Result<(), SpatialError> {
        if path.is_empty() {
            self.route = None;
            self.status = RouteStatus::NoRoute;
            return Ok(());
        }
        let core_cells = route_cells_of(self.index.as_ref(), path, self.resolution)?;
        let cells = buffered_cells(self.index.as_ref(), &core_cells)?;
        debug!(
            "optimizer route set: {} cells, {} with buffer",
            core_cells.len(),
            cells.len()
        );
        self.route = Some(ActiveRoute {
            path: path.to_vec(),
            origin,
            destination,
            core_cells,
            cells,
        });
        self.status = RouteStatus::Active;
        Ok(())
    }

    /// Cells within the event's radius, plus its own cell.
    pub fn footprint(&self, event: &TrafficEvent) -> Result<HashSet<Cell>, SpatialError> {
        let mut cells =
            self.index
                .cells_in_radius(event.coordinate, event.radius_km, self.resolution)?;
        cells.insert(event.cell);
        Ok(cells)
    }

    /// Register `event` and evaluate the route with it as the trigger.
    /// Listeners hear about a required reroute before this returns.
    pub fn add_event(
        &mut self,
        event: TrafficEvent,
        now: Duration,
    ) -> Result<Evaluation, SpatialError> {
        let footprint = self.footprint(&event)?;
        let trigger = event.clone();
        self.state.insert(event, footprint);
        self.evaluate(Some(&trigger), now)
    }

    pub fn remove_event(&mut self, id: EventId) -> Option<TrafficEvent> {
        self.state.remove(id)
    }

    pub fn event(&self, id: EventId) -> Option<&TrafficEvent> {
        self.state.event(id)
    }

    /// Events still active at `now`, oldest first.
    pub fn active_events(&self, now: Duration) -> Vec<&TrafficEvent> {
        let mut events: Vec<&TrafficEvent> =
            self.state.events().filter(|e| e.is_active(now)).collect();
        events.sort_by_key(|e| (e.created_at, e.id));
        events
    }

    pub fn update_congestion(
        &mut self,
        cell: Cell,
        level: CongestionLevel,
        speed_ratio: f64,
        now: Duration,
    ) {
        self.state.set_congestion(
            cell,
            CongestionSample {
                level,
                speed_ratio,
                updated_at: now,
            },
        );
    }

    /// Drop inactive events and stale congestion samples.
    pub fn expire_inactive(&mut self, now: Duration) -> usize {
        let expired = self.state.expire_events(now);
        let samples = self.state.prune_congestion(now, self.congestion_ttl);
        if !expired.is_empty() || samples > 0 {
            debug!(
                "expiry sweep removed {} events and {} congestion samples",
                expired.len(),
                samples
            );
        }
        expired.len()
    }

    /// One periodic monitoring pass: sweep, then re-evaluate without a
    /// triggering event.
    pub fn monitor_tick(&mut self, now: Duration) -> Result<Evaluation, SpatialError> {
        self.expire_inactive(now);
        self.evaluate(None, now)
    }

    pub fn clear(&mut self) {
        self.state.clear();
        self.route = None;
        self.status = RouteStatus::NoRoute;
        self.outbox.clear();
    }

    // -------------------------------------------------------------------------
    // Cost model
    // -------------------------------------------------------------------------

    /// Product of active event multipliers at `cell` times its congestion
    /// multiplier. Infinite as soon as one factor is.
    pub fn cell_cost(&self, cell: Cell, now: Duration) -> f64 {
        let mut cost = 1.0;
        for event in self.state.events_at(cell).filter(|e| e.is_active(now)) {
            let multiplier = event.cost_multiplier();
            if is_impassable_multiplier(multiplier) {
                return IMPASSABLE_MULTIPLIER;
            }
            cost *= multiplier;
        }
        cost * self.congestion_multiplier(cell)
    }

    pub fn congestion_multiplier(&self, cell: Cell) -> f64 {
        self.state.congestion(cell).map_or(1.0, |sample| {
            congestion_cost_multiplier(sample.speed_ratio, self.max_congestion_multiplier)
        })
    }

    /// Sum of [`cell_cost`](Self::cell_cost) over the route's own cells
    /// (buffer excluded). `None` without a route.
    pub fn route_cost(&self, now: Duration) -> Option<f64> {
        let route = self.route.as_ref()?;
        let mut total = 0.0;
        for cell in &route.core_cells {
            let cost = self.cell_cost(*cell, now);
            if cost.is_infinite() {
                return Some(IMPASSABLE_MULTIPLIER);
            }
            total += cost;
        }
        Some(total)
    }

    pub fn is_passable(&self, cell: Cell, now: Duration) -> bool {
        !self
            .state
            .events_at(cell)
            .any(|e| e.is_active(now) && e.is_impassable())
    }

    /// Active events registered under any route cell, oldest first.
    pub fn events_on_route(&self, now: Duration) -> Vec<TrafficEvent> {
        let Some(route) = &self.route else {
            return Vec::new();
        };
        let ids: BTreeSet<EventId> = route
            .cells
            .iter()
            .flat_map(|cell| self.state.ids_at(*cell))
            .collect();
        let mut events: Vec<TrafficEvent> = ids
            .into_iter()
            .filter_map(|id| self.state.event(id))
            .filter(|e| e.is_active(now))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.created_at, e.id));
        events
    }

    // -------------------------------------------------------------------------
    // Decisions
    // -------------------------------------------------------------------------

    /// Re-derive the reroute decision for the current route and record the
    /// resulting [`RouteStatus`].
    pub fn check_reroute_needed(
        &mut self,
        trigger: Option<&TrafficEvent>,
        now: Duration,
    ) -> RerouteCheckResult {
        let mut check = self.decide(now);
        check.triggering_event = trigger.map(|e| e.id);
        if self.route.is_some() {
            self.status = if check.needs_reroute {
                RouteStatus::RerouteRequired
            } else {
                RouteStatus::Active
            };
        }
        check
    }

    fn decide(&self, now: Duration) -> RerouteCheckResult {
        if self.route.is_none() {
            return RerouteCheckResult::not_needed(NO_ACTIVE_ROUTE_REASON, Vec::new());
        }
        let on_route = self.events_on_route(now);
        if on_route.is_empty() {
            return RerouteCheckResult::not_needed(NO_EVENTS_REASON, on_route);
        }

        let total = finite_cost_increase(&on_route);
        let blocking = on_route
            .iter()
            .find(|e| {
                kind_requires_reroute(e.kind, e.severity, self.severity_reroute_threshold)
                    && !self.is_passable(e.cell, now)
            })
            .map(|e| (e.id, format!("{} blocks the route ({})", e.kind, e.id)));
        if let Some((id, reason)) = blocking {
            return RerouteCheckResult {
                needs_reroute: true,
                reason,
                affected_events: on_route,
                total_cost_increase: total,
                blocking_event: Some(id),
                triggering_event: None,
            };
        }

        if total > self.reroute_cost_threshold {
            RerouteCheckResult {
                needs_reroute: true,
                reason: format!(
                    "route cost up {:.0}% from {} event(s)",
                    total * 100.0,
                    on_route.len()
                ),
                affected_events: on_route,
                total_cost_increase: total,
                blocking_event: None,
                triggering_event: None,
            }
        } else {
            let mut check = RerouteCheckResult::not_needed(MINOR_IMPACT_REASON, on_route);
            check.total_cost_increase = total;
            check
        }
    }

    fn evaluate(
        &mut self,
        trigger: Option<&TrafficEvent>,
        now: Duration,
    ) -> Result<Evaluation, SpatialError> {
        let check = self.check_reroute_needed(trigger, now);
        if !check.needs_reroute {
            return Ok(Evaluation {
                check,
                reroute: None,
            });
        }

        let anchor = trigger
            .filter(|t| check.affected_events.iter().any(|e| e.id == t.id))
            .or_else(|| {
                check
                    .blocking_event
                    .and_then(|id| check.affected_events.iter().find(|e| e.id == id))
            })
            .or_else(|| check.affected_events.first());
        let suggested_waypoint = match anchor {
            Some(event) => self.find_avoidance_waypoint(event, now)?,
            None => None,
        };
        let mut cells_to_avoid = BTreeSet::new();
        for event in &check.affected_events {
            if let Some(cells) = self.state.footprint(event.id) {
                cells_to_avoid.extend(cells.iter().copied());
            }
        }

        let result = RerouteResult {
            required: true,
            reason: check.reason.clone(),
            affected_events: check.affected_events.clone(),
            cells_to_avoid,
            suggested_waypoint,
            timestamp: now,
        };
        info!("reroute required: {}", result.reason);
        let report: DeliveryReport = self.listeners.notify(&result);
        if report.failed > 0 {
            warn!("{} reroute listener(s) failed", report.failed);
        }
        self.outbox.push(result.clone());
        Ok(Evaluation {
            check,
            reroute: Some(result),
        })
    }

    /// A passable cell just outside `event`'s footprint that borders an
    /// impassable cell, nearest to the destination. `None` when the
    /// destination is unknown or no such cell exists.
    pub fn find_avoidance_waypoint(
        &self,
        event: &TrafficEvent,
        now: Duration,
    ) -> Result<Option<Coordinate>, SpatialError> {
        let Some(destination) = self.destination() else {
            return Ok(None);
        };
        let search = self.index.cells_in_radius(
            event.coordinate,
            event.radius_km * 2.0,
            self.resolution,
        )?;
        let footprint = self.footprint(event)?;

        let mut best: Option<(f64, Cell, Coordinate)> = None;
        for cell in search.difference(&footprint) {
            if !self.is_passable(*cell, now) {
                continue;
            }
            let mut ring = self.index.k_ring(*cell, 1)?;
            ring.remove(cell);
            if ring.iter().all(|n| self.is_passable(*n, now)) {
                continue;
            }
            let center = self.index.cell_to_coordinate(*cell)?;
            let distance = center.distance_km(destination);
            let closer = match &best {
                None => true,
                Some((d, c, _)) => match distance.total_cmp(d) {
                    Ordering::Less => true,
                    Ordering::Equal => cell < c,
                    Ordering::Greater => false,
                },
            };
            if closer {
                best = Some((distance, *cell, center));
            }
        }
        Ok(best.map(|(_, _, center)| center))
    }
}

fn finite_cost_increase(events: &[TrafficEvent]) -> f64 {
    events
        .iter()
        .map(TrafficEvent::cost_multiplier)
        .filter(|m| m.is_finite())
        .map(|m| m - 1.0)
        .sum()
}
