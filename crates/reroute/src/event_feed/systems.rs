use bevy::prelude::*;

use crate::config::MonitorConfig;
use crate::grid_cost::RouteOptimizer;
use crate::schedule::PeriodicTask;
use crate::sim_rng::SimRng;
use crate::traffic_event::TrafficEvent;
use crate::MonitorSet;

use super::feed::EventFeed;

/// Synthetic event timer. Stopped until a host starts the simulation.
#[derive(Resource, Debug, Clone)]
pub struct SimulationTask(pub PeriodicTask);

impl FromWorld for SimulationTask {
    fn from_world(world: &mut World) -> Self {
        let interval = world
            .get_resource::<MonitorConfig>()
            .cloned()
            .unwrap_or_default()
            .simulation_interval();
        Self(PeriodicTask::new(interval))
    }
}

/// Every event the feed ingests, reported or simulated.
#[derive(Event, Debug, Clone)]
pub struct EventReported(pub TrafficEvent);

/// Expire stale events, then generate one synthetic event per elapsed
/// simulation interval.
pub fn run_event_simulation(
    time: Res<Time>,
    mut task: ResMut<SimulationTask>,
    mut feed: ResMut<EventFeed>,
    mut optimizer: ResMut<RouteOptimizer>,
    mut rng: ResMut<SimRng>,
) {
    let fired = task.0.tick(time.delta());
    if fired == 0 {
        return;
    }
    let now = time.elapsed();
    feed.expire_stale(&mut optimizer, now);
    let route = optimizer.route_path().to_vec();
    for _ in 0..fired {
        match feed.generate(&mut rng.0, &route, &mut optimizer, now) {
            Ok(Some(ingested)) => info!(
                "simulated {} {} (severity {:.2})",
                ingested.event.id, ingested.event.kind, ingested.event.severity
            ),
            Ok(None) => break,
            Err(e) => warn!("failed to simulate event: {}", e),
        }
    }
}

pub struct EventFeedPlugin;

impl Plugin for EventFeedPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimRng>()
            .init_resource::<EventFeed>()
            .init_resource::<SimulationTask>()
            .add_event::<EventReported>()
            .add_systems(Update, run_event_simulation.in_set(MonitorSet::Simulate));
    }
}
