//! Event ingestion and the simulated event feed.
//!
//! The feed turns reports into immutable [`TrafficEvent`](crate::traffic_event::TrafficEvent)
//! values, registers them with the route optimizer and broadcasts them to
//! subscribers. Synthetic events are drawn from a per-kind template pool
//! with bounded severity, duration and radius ranges.

mod feed;
mod systems;
mod templates;


pub use feed::{EventFeed, FeedCounters, Ingested};
pub use systems::{run_event_simulation, EventFeedPlugin, EventReported, SimulationTask};
pub use templates::{template_for, EventTemplate, TEMPLATES};
