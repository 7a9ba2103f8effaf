//! Disruption events: kinds, immutable event values and the cost/reroute
//! properties derived from them.

mod calculations;
mod types;

#[cfg(test)]
mod tests;

pub use calculations::{
    cost_multiplier, is_impassable_multiplier, kind_requires_reroute, IMPASSABLE_MULTIPLIER,
};
pub use types::{EventId, EventKind, EventReport, TrafficEvent};
