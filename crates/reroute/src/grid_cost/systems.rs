use bevy::prelude::*;

use crate::config::MonitorConfig;
use crate::schedule::PeriodicTask;
use crate::MonitorSet;

use super::optimizer::{RerouteResult, RouteOptimizer};

// =============================================================================
// Resources and events
// =============================================================================

/// Periodic monitoring timer. Stopped until a host starts it.
#[derive(Resource, Debug, Clone)]
pub struct MonitoringTask(pub PeriodicTask);

impl FromWorld for MonitoringTask {
    fn from_world(world: &mut World) -> Self {
        let interval = world
            .get_resource::<MonitorConfig>()
            .cloned()
            .unwrap_or_default()
            .monitor_interval();
        Self(PeriodicTask::new(interval))
    }
}

/// Emitted for every positive reroute decision of the optimizer.
#[derive(Event, Debug, Clone)]
pub struct RerouteRequired(pub RerouteResult);

// =============================================================================
// Systems
// =============================================================================

/// Runs the expiry sweep and re-evaluation once per elapsed monitoring
/// interval. Several intervals in one frame collapse into one pass since
/// the outcome only depends on the current time.
pub fn run_route_monitoring(
    time: Res<Time>,
    mut task: ResMut<MonitoringTask>,
    mut optimizer: ResMut<RouteOptimizer>,
) {
    if task.0.tick(time.delta()) == 0 {
        return;
    }
    if let Err(e) = optimizer.monitor_tick(time.elapsed()) {
        warn!("route monitoring pass failed: {}", e);
    }
}

/// Forward the optimizer's pending decisions to ECS readers.
pub fn publish_reroute_decisions(
    mut optimizer: ResMut<RouteOptimizer>,
    mut writer: EventWriter<RerouteRequired>,
) {
    for decision in optimizer.drain_decisions() {
        writer.send(RerouteRequired(decision));
    }
}

// =============================================================================
// Plugin
// =============================================================================

pub struct GridCostPlugin;

impl Plugin for GridCostPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RouteOptimizer>()
            .init_resource::<MonitoringTask>()
            .add_event::<RerouteRequired>()
            .add_systems(
                Update,
                (
                    run_route_monitoring.in_set(MonitorSet::Monitor),
                    publish_reroute_decisions.in_set(MonitorSet::Publish),
                ),
            );
    }
}
