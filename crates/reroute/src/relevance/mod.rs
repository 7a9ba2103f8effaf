//! Route coverage caching and event relevance classification.
//!
//! A route polyline is discretized into the cells it passes through plus a
//! one-ring buffer. Incoming events are then classified by set membership of
//! their primary cell: a direct hit on the route, adjacent to it, or no match.

mod coverage;
mod detector;

#[cfg(test)]
mod tests;

pub use coverage::{buffered_cells, route_cells_of, RouteCoverage};
pub use detector::{MatchType, RelevanceDetector, RelevanceResult, NO_ROUTE_REASON};
