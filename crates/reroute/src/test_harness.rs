//! # TestSession: headless harness for monitoring-session tests
//!
//! Wraps a Bevy `App` with `MinimalPlugins`, the monitor plugin and a
//! manually stepped virtual clock, so timers and expiry can be driven to the
//! second without wall-clock waits.

use std::time::Duration;

use bevy::app::App;
use bevy::ecs::event::EventCursor;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use crate::config::MonitorConfig;
use crate::controller::{RerouteRequested, ReroutingController};
use crate::error::SpatialError;
use crate::event_feed::{EventFeed, EventReported};
use crate::geo::Coordinate;
use crate::grid_cost::{RerouteRequired, RouteOptimizer};
use crate::session::{self, ReportOutcome};
use crate::traffic_event::EventReport;
use crate::RerouteMonitorPlugin;

/// Virtual time added by every `app.update()`.
pub const FRAME: Duration = Duration::from_secs(1);

pub struct TestSession {
    app: App,
    required: EventCursor<RerouteRequired>,
    requested: EventCursor<RerouteRequested>,
    reported: EventCursor<EventReported>,
    pub reroutes_required: Vec<RerouteRequired>,
    pub reroutes_requested: Vec<RerouteRequested>,
    pub events_reported: Vec<EventReported>,
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSession {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    pub fn with_config(config: MonitorConfig) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(FRAME));
        app.insert_resource(config);
        app.add_plugins(RerouteMonitorPlugin);
        app.world_mut()
            .resource_mut::<Time<Virtual>>()
            .set_max_delta(Duration::from_secs(3600));

        // The first update only primes the clocks (zero delta).
        app.update();

        Self {
            app,
            required: EventCursor::default(),
            requested: EventCursor::default(),
            reported: EventCursor::default(),
            reroutes_required: Vec::new(),
            reroutes_requested: Vec::new(),
            events_reported: Vec::new(),
        }
    }

    /// Monitor `path`, endpoints taken from its ends.
    pub fn with_route(mut self, path: &[Coordinate]) -> Self {
        if let Err(e) = session::set_route(self.world_mut(), path, None, None) {
            panic!("test route rejected: {e}");
        }
        self
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Run `frames` updates, one [`FRAME`] of virtual time each.
    pub fn advance(&mut self, frames: u32) {
        for _ in 0..frames {
            self.app.update();
            self.collect();
        }
    }

    pub fn advance_secs(&mut self, secs: u64) {
        let frames = secs.div_ceil(FRAME.as_secs().max(1));
        self.advance(frames as u32);
    }

    pub fn report(&mut self, report: EventReport) -> Result<ReportOutcome, SpatialError> {
        let outcome = session::report_event(self.world_mut(), report);
        self.collect();
        outcome
    }

    fn collect(&mut self) {
        let world = self.app.world();
        let events = world.resource::<Events<RerouteRequired>>();
        self.reroutes_required
            .extend(self.required.read(events).cloned());
        let events = world.resource::<Events<RerouteRequested>>();
        self.reroutes_requested
            .extend(self.requested.read(events).cloned());
        let events = world.resource::<Events<EventReported>>();
        self.events_reported.extend(self.reported.read(events).cloned());
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn world(&self) -> &World {
        self.app.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn now(&self) -> Duration {
        session::now(self.world())
    }

    pub fn optimizer(&self) -> &RouteOptimizer {
        self.world().resource::<RouteOptimizer>()
    }

    pub fn controller(&self) -> &ReroutingController {
        self.world().resource::<ReroutingController>()
    }

    pub fn feed(&self) -> &EventFeed {
        self.world().resource::<EventFeed>()
    }
}
