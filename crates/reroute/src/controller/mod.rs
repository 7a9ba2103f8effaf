//! Rerouting controller.
//!
//! Holds the route context and the events that passed relevance checking.
//! Relevant events produce a [`RerouteRequest`] with the cells a directions
//! provider should avoid; candidate routes come back through
//! [`ReroutingController::validate_reroute`] and
//! [`ReroutingController::adopt_reroute`]. Irrelevant events are dropped
//! without side effects.

mod rerouting;
mod systems;


pub use rerouting::{RerouteRequest, ReroutingController};
pub use systems::{dispatch_monitor_events, ControllerPlugin, RerouteRequested};
