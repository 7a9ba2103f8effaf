use bevy::prelude::*;

pub mod agent_protocol;
pub mod broadcast;
pub mod config;
pub mod controller;
pub mod directions;
pub mod error;
pub mod event_feed;
pub mod geo;
pub mod grid_cost;
pub mod relevance;
pub mod schedule;
pub mod session;
pub mod sim_rng;
pub mod spatial_index;
pub mod traffic_event;

#[cfg(test)]
mod integration_tests;
#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use config::MonitorConfig;
pub use geo::{BoundingBox, Coordinate};
pub use spatial_index::{Cell, GridIndex, Resolution, SpatialIndex};

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Per-frame ordering of the monitor systems in `Update`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum MonitorSet {
    /// Synthetic event generation and feed expiry.
    Simulate,
    /// Periodic expiry sweep and route re-evaluation.
    Monitor,
    /// Relevance dispatch and publication of Bevy events.
    Publish,
}

/// Everything a route-monitoring session needs: spatial index, optimizer,
/// event feed, controller and their systems.
///
/// Insert a [`MonitorConfig`] and optionally a custom [`GridIndex`] before
/// adding the plugin; defaults are used otherwise.
pub struct RerouteMonitorPlugin;

impl Plugin for RerouteMonitorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MonitorConfig>()
            .init_resource::<GridIndex>()
            .configure_sets(
                Update,
                (MonitorSet::Simulate, MonitorSet::Monitor, MonitorSet::Publish).chain(),
            );

        app.add_plugins((
            grid_cost::GridCostPlugin,
            event_feed::EventFeedPlugin,
            controller::ControllerPlugin,
        ));
    }
}
