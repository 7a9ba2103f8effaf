use std::time::Duration;

use bevy::prelude::*;

use crate::event_feed::{EventFeed, EventReported};
use crate::MonitorSet;

use super::rerouting::{RerouteRequest, ReroutingController};

/// Emitted for every reroute request of the controller.
#[derive(Event, Debug, Clone)]
pub struct RerouteRequested(pub RerouteRequest);

/// Run every freshly ingested event through the controller, then publish
/// the events and any resulting requests. Exclusive so hosts can call it
/// directly between frames and observe the outcome synchronously.
pub fn dispatch_monitor_events(world: &mut World) {
    let now = world
        .get_resource::<Time>()
        .map_or(Duration::ZERO, Time::elapsed);
    let reported = match world.get_resource_mut::<EventFeed>() {
        Some(mut feed) => feed.drain_reported(),
        None => Vec::new(),
    };
    let Some(mut controller) = world.get_resource_mut::<ReroutingController>() else {
        return;
    };
    controller.prune_inactive(now);

    let mut requests = Vec::new();
    for event in &reported {
        match controller.process_event(event, now) {
            Ok(Some(request)) => requests.push(request),
            Ok(None) => {}
            Err(e) => warn!("relevance check for {} failed: {}", event.id, e),
        }
    }
    for event in reported {
        world.send_event(EventReported(event));
    }
    for request in requests {
        world.send_event(RerouteRequested(request));
    }
}

pub struct ControllerPlugin;

impl Plugin for ControllerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ReroutingController>()
            .add_event::<RerouteRequested>()
            .add_systems(Update, dispatch_monitor_events.in_set(MonitorSet::Publish));
    }
}
