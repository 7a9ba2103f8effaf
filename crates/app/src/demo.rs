//! Default mode: a simulated monitoring session along a fixed route.
//!
//! Synthetic events stream in, the monitor raises reroute requests, and the
//! straight-segment provider proposes alternates. The fastest candidate that
//! clears every tracked event is adopted.

use bevy::ecs::event::EventCursor;
use bevy::prelude::*;

use reroute::controller::{RerouteRequest, RerouteRequested, ReroutingController};
use reroute::directions::{select_candidate, DirectionsProvider, DirectionsRequest};
use reroute::grid_cost::RerouteRequired;
use reroute::session;
use reroute::Coordinate;

use crate::waypoint_directions::WaypointDirections;

/// Dizengoff Square to Ramat Aviv, roughly following Ibn Gabirol.
const DEMO_ROUTE: [Coordinate; 6] = [
    Coordinate::new(32.0779, 34.7740),
    Coordinate::new(32.0853, 34.7818),
    Coordinate::new(32.0935, 34.7830),
    Coordinate::new(32.1010, 34.7890),
    Coordinate::new(32.1085, 34.7945),
    Coordinate::new(32.1130, 34.8040),
];

const STATUS_EVERY_SECS: u64 = 300;

pub fn run_demo(app: &mut App, minutes: u64) {
    if let Err(e) = session::set_route(app.world_mut(), &DEMO_ROUTE, None, None) {
        error!("demo route rejected: {}", e);
        return;
    }
    session::start_simulation(app.world_mut());
    session::start_monitoring(app.world_mut());
    info!(
        "demo session: {} vertices, {} simulated minutes",
        DEMO_ROUTE.len(),
        minutes
    );

    let provider = WaypointDirections::default();
    let mut required_cursor = EventCursor::<RerouteRequired>::default();
    let mut requested_cursor = EventCursor::<RerouteRequested>::default();
    let mut last_waypoint: Option<Coordinate> = None;
    let mut adopted = 0usize;

    let total_frames = minutes * 60 / crate::FRAME.as_secs().max(1);
    for frame in 1..=total_frames {
        app.update();

        let world = app.world();
        for decision in required_cursor.read(world.resource::<Events<RerouteRequired>>()) {
            if decision.0.suggested_waypoint.is_some() {
                last_waypoint = decision.0.suggested_waypoint;
            }
        }
        let requests: Vec<RerouteRequest> = requested_cursor
            .read(world.resource::<Events<RerouteRequested>>())
            .map(|r| r.0.clone())
            .collect();

        for request in requests {
            if try_reroute(app.world_mut(), &provider, &request, last_waypoint) {
                adopted += 1;
            }
        }

        if frame % STATUS_EVERY_SECS == 0 {
            log_status(app.world());
        }
    }

    let status = session::status(app.world());
    info!("demo finished, {} reroute(s) adopted", adopted);
    match serde_json::to_string_pretty(&status) {
        Ok(json) => println!("{json}"),
        Err(e) => error!("failed to serialize final status: {}", e),
    }
}

/// Ask the provider for alternates and adopt the best clear one.
fn try_reroute(
    world: &mut World,
    provider: &dyn DirectionsProvider,
    request: &RerouteRequest,
    waypoint: Option<Coordinate>,
) -> bool {
    let Some(directions) = DirectionsRequest::from_reroute(request) else {
        warn!("reroute request without endpoints, skipping");
        return false;
    };
    let candidates = match provider.directions(&directions.with_waypoint(waypoint)) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("directions failed: {}", e);
            return false;
        }
    };

    let now = session::now(world);
    let chosen = match select_candidate(world.resource::<ReroutingController>(), candidates, now) {
        Ok(Some(chosen)) => chosen,
        Ok(None) => {
            info!(
                "no clear alternate for {}, keeping the current route",
                request.triggering_event.id
            );
            return false;
        }
        Err(e) => {
            warn!("candidate validation failed: {}", e);
            return false;
        }
    };

    match session::adopt_reroute(world, &chosen.path) {
        Ok(true) => {
            info!(
                "adopted alternate around {}: {:.1} km, eta {}s",
                request.triggering_event.id,
                chosen.distance_km,
                chosen.eta.as_secs()
            );
            true
        }
        Ok(false) => false,
        Err(e) => {
            warn!("failed to adopt alternate: {}", e);
            false
        }
    }
}

fn log_status(world: &World) {
    let status = session::status(world);
    info!(
        "t={:.0}s route {:?}: {} events, {} relevant, cost {}",
        status.elapsed_secs,
        status.route_status,
        status.events,
        status.relevant_events.len(),
        status
            .route_cost
            .map_or_else(|| "impassable".to_string(), |c| format!("{c:.1}"))
    );
}
