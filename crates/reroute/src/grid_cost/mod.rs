//! Grid cost model and route optimizer.
//!
//! The optimizer owns the per-cell grid state: which events cover which
//! cells, and the latest congestion sample per cell. From it derive:
//!
//!   * the traversal cost of a cell (product of event multipliers times the
//!     congestion multiplier, infinite for impassable cells),
//!   * the reroute decision for the current route (blocking rule first, then
//!     the cumulative cost-increase threshold),
//!   * an avoidance waypoint on the frontier of a blocked area.
//!
//! Decisions are broadcast to in-process listeners synchronously and to ECS
//! readers as [`RerouteRequired`] events.

mod congestion;
mod optimizer;
mod state;
mod systems;


pub use congestion::{congestion_cost_multiplier, CongestionLevel, CongestionSample};
pub use optimizer::{
    Evaluation, RerouteCheckResult, RerouteResult, RouteOptimizer, RouteStatus,
    MINOR_IMPACT_REASON, NO_ACTIVE_ROUTE_REASON, NO_EVENTS_REASON,
};
pub use state::GridState;
pub use systems::{
    publish_reroute_decisions, run_route_monitoring, GridCostPlugin, MonitoringTask,
    RerouteRequired,
};
