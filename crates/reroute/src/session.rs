//! Synchronous helpers for driving a monitoring session between frames.
//!
//! Every function takes the `World` of an app built with
//! [`RerouteMonitorPlugin`](crate::RerouteMonitorPlugin) and keeps the
//! optimizer, feed and controller in step with one another.

use std::collections::BTreeSet;
use std::time::Duration;

use bevy::prelude::*;
use serde::Serialize;

use crate::controller::{dispatch_monitor_events, ReroutingController};
use crate::error::SpatialError;
use crate::event_feed::{EventFeed, FeedCounters, SimulationTask};
use crate::geo::Coordinate;
use crate::grid_cost::{
    CongestionLevel, Evaluation, MonitoringTask, RerouteCheckResult, RouteOptimizer, RouteStatus,
};
use crate::relevance::RelevanceResult;
use crate::spatial_index::Cell;
use crate::traffic_event::{EventId, EventReport, TrafficEvent};

/// Session clock: elapsed virtual time.
pub fn now(world: &World) -> Duration {
    world
        .get_resource::<Time>()
        .map_or(Duration::ZERO, Time::elapsed)
}

/// Monitor `path`. Origin and destination default to its endpoints.
/// Previously tracked relevant events are dropped.
pub fn set_route(
    world: &mut World,
    path: &[Coordinate],
    origin: Option<Coordinate>,
    destination: Option<Coordinate>,
) -> Result<(), SpatialError> {
    let origin = origin.or_else(|| path.first().copied());
    let destination = destination.or_else(|| path.last().copied());
    world
        .resource_mut::<RouteOptimizer>()
        .set_route(path, origin, destination)?;
    world
        .resource_mut::<ReroutingController>()
        .set_route(path, origin, destination, true)
}

/// What happened to one reported event.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub event: TrafficEvent,
    pub evaluation: Evaluation,
    pub relevance: RelevanceResult,
    /// Whether the controller now tracks the event as relevant.
    pub tracked: bool,
}

/// Ingest a report and run it through the controller immediately.
pub fn report_event(world: &mut World, report: EventReport) -> Result<ReportOutcome, SpatialError> {
    let at = now(world);
    let ingested = world.resource_scope(|world, mut feed: Mut<EventFeed>| {
        let mut optimizer = world.resource_mut::<RouteOptimizer>();
        feed.report(report, &mut optimizer, at)
    })?;
    dispatch_monitor_events(world);
    let controller = world.resource::<ReroutingController>();
    Ok(ReportOutcome {
        relevance: controller.check_relevance(&ingested.event),
        tracked: controller.is_tracked(ingested.event.id),
        event: ingested.event,
        evaluation: ingested.evaluation,
    })
}

/// Remove an event everywhere. Returns false if nothing knew about it.
pub fn remove_event(world: &mut World, id: EventId) -> bool {
    let in_grid = world.resource_mut::<RouteOptimizer>().remove_event(id).is_some();
    let tracked = world
        .resource_mut::<ReroutingController>()
        .remove_event(id)
        .is_some();
    let fed = world.resource_mut::<EventFeed>().forget(id);
    in_grid || tracked || fed
}

pub fn update_congestion(
    world: &mut World,
    cell: Cell,
    level: Option<CongestionLevel>,
    speed_ratio: f64,
) {
    let at = now(world);
    let level = level.unwrap_or_else(|| CongestionLevel::from_speed_ratio(speed_ratio));
    world
        .resource_mut::<RouteOptimizer>()
        .update_congestion(cell, level, speed_ratio, at);
}

pub fn check_reroute(world: &mut World) -> RerouteCheckResult {
    let at = now(world);
    world
        .resource_mut::<RouteOptimizer>()
        .check_reroute_needed(None, at)
}

pub fn validate_reroute(world: &World, path: &[Coordinate]) -> Result<bool, SpatialError> {
    world
        .resource::<ReroutingController>()
        .validate_reroute(path, now(world))
}

/// Adopt `path` if it clears every tracked event; the optimizer follows.
pub fn adopt_reroute(world: &mut World, path: &[Coordinate]) -> Result<bool, SpatialError> {
    let at = now(world);
    let mut controller = world.resource_mut::<ReroutingController>();
    if !controller.adopt_reroute(path, at)? {
        return Ok(false);
    }
    let (origin, destination) = (controller.origin(), controller.destination());
    world
        .resource_mut::<RouteOptimizer>()
        .set_route(path, origin, destination)?;
    Ok(true)
}

pub fn cells_to_avoid(world: &World) -> Result<BTreeSet<Cell>, SpatialError> {
    world
        .resource::<ReroutingController>()
        .cells_to_avoid(now(world))
}

pub fn start_simulation(world: &mut World) {
    world.resource_mut::<SimulationTask>().0.start();
}

pub fn stop_simulation(world: &mut World) {
    world.resource_mut::<SimulationTask>().0.stop();
}

pub fn start_monitoring(world: &mut World) {
    world.resource_mut::<MonitoringTask>().0.start();
}

pub fn stop_monitoring(world: &mut World) {
    world.resource_mut::<MonitoringTask>().0.stop();
}

/// Point-in-time summary of the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub elapsed_secs: f64,
    pub route_status: RouteStatus,
    pub route_vertices: usize,
    pub events: usize,
    pub relevant_events: Vec<EventId>,
    pub route_cost: Option<f64>,
    pub simulation_running: bool,
    pub monitoring_running: bool,
    pub counters: FeedCounters,
}

pub fn status(world: &World) -> SessionStatus {
    let at = now(world);
    let optimizer = world.resource::<RouteOptimizer>();
    let controller = world.resource::<ReroutingController>();
    SessionStatus {
        elapsed_secs: at.as_secs_f64(),
        route_status: optimizer.status(),
        route_vertices: optimizer.route_path().len(),
        events: optimizer.active_events(at).len(),
        relevant_events: controller
            .active_relevant_events()
            .iter()
            .map(|e| e.id)
            .collect(),
        // JSON has no infinity; an impassable route reports no cost.
        route_cost: optimizer.route_cost(at).filter(|c| c.is_finite()),
        simulation_running: world.resource::<SimulationTask>().0.is_running(),
        monitoring_running: world.resource::<MonitoringTask>().0.is_running(),
        counters: world.resource::<EventFeed>().counters(),
    }
}
