use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::time::Duration;

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::broadcast::{ListenerId, ListenerResult, Listeners};
use crate::config::{MonitorConfig, DEFAULT_REGION_PADDING_M};
use crate::error::SpatialError;
use crate::geo::{BoundingBox, Coordinate};
use crate::grid_cost::{Evaluation, RouteOptimizer};
use crate::spatial_index::{GridIndex, Resolution, SharedIndex};
use crate::traffic_event::{EventId, EventReport, TrafficEvent};

use super::templates::{uniform, TEMPLATES};

/// Running totals since the feed was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCounters {
    pub reported: u64,
    pub simulated: u64,
    pub expired: u64,
}

/// An event accepted by the feed, with the optimizer's evaluation of it.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub event: TrafficEvent,
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Reported,
    Simulated,
}

#[derive(Debug, Clone, Copy)]
struct LiveEntry {
    expires_at: Option<Duration>,
    source: Source,
}

/// Creates events, registers them with the optimizer and broadcasts them.
#[derive(Resource)]
pub struct EventFeed {
    index: SharedIndex,
    resolution: Resolution,
    default_radius_km: f64,
    near_route_probability: f64,
    near_route_spread_m: f64,
    position_jitter_m: f64,
    simulation_region: Option<BoundingBox>,
    max_simulated_events: usize,
    next_id: u64,
    live: BTreeMap<EventId, LiveEntry>,
    counters: FeedCounters,
    subscribers: Listeners<TrafficEvent>,
    pending: Vec<TrafficEvent>,
}

impl FromWorld for EventFeed {
    fn from_world(world: &mut World) -> Self {
        let index = world.get_resource_or_insert_with(GridIndex::default).0.clone();
        let config = world
            .get_resource::<MonitorConfig>()
            .cloned()
            .unwrap_or_default();
        Self::new(index, &config)
    }
}

impl EventFeed {
    pub fn new(index: SharedIndex, config: &MonitorConfig) -> Self {
        Self {
            index,
            resolution: config.grid_resolution(),
            default_radius_km: config.default_radius_km,
            near_route_probability: config.near_route_probability.clamp(0.0, 1.0),
            near_route_spread_m: config.near_route_spread_m,
            position_jitter_m: config.position_jitter_m,
            simulation_region: config.simulation_region,
            max_simulated_events: config.max_simulated_events,
            next_id: 1,
            live: BTreeMap::new(),
            counters: FeedCounters::default(),
            subscribers: Listeners::default(),
            pending: Vec::new(),
        }
    }

    pub fn counters(&self) -> FeedCounters {
        self.counters
    }

    /// Events ingested through the feed and not yet expired or forgotten.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn simulated_live_count(&self) -> usize {
        self.live
            .values()
            .filter(|e| e.source == Source::Simulated)
            .count()
    }

    pub fn subscribe(
        &mut self,
        subscriber: impl FnMut(&TrafficEvent) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.subscribers.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Events ingested since the last call, in ingestion order.
    pub fn drain_reported(&mut self) -> Vec<TrafficEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Ingest an externally reported event.
    pub fn report(
        &mut self,
        report: EventReport,
        optimizer: &mut RouteOptimizer,
        now: Duration,
    ) -> Result<Ingested, SpatialError> {
        let ingested = self.ingest(report, Source::Reported, optimizer, now)?;
        self.counters.reported += 1;
        Ok(ingested)
    }

    /// Synthesize one event from the template pool. Placed near `route`
    /// with the configured probability, otherwise uniformly in the
    /// simulation region (or the padded route bounds). Returns `None` when
    /// the simulated-event cap is reached or there is nowhere to place it.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        route: &[Coordinate],
        optimizer: &mut RouteOptimizer,
        now: Duration,
    ) -> Result<Option<Ingested>, SpatialError> {
        if self.simulated_live_count() >= self.max_simulated_events {
            debug!("simulated event cap of {} reached", self.max_simulated_events);
            return Ok(None);
        }
        let Some(position) = self.pick_position(rng, route) else {
            debug!("no route or region to place a synthetic event in");
            return Ok(None);
        };
        let template = &TEMPLATES[rng.gen_range(0..TEMPLATES.len())];
        let mut report = EventReport::new(template.kind, position, template.sample_severity(rng))
            .with_description(template.sample_description(rng))
            .with_radius_km(template.sample_radius_km(rng))
            .with_duration(template.sample_duration(rng));
        report
            .metadata
            .insert("source".to_string(), serde_json::Value::from("simulated"));

        let ingested = self.ingest(report, Source::Simulated, optimizer, now)?;
        self.counters.simulated += 1;
        Ok(Some(ingested))
    }

    fn pick_position<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        route: &[Coordinate],
    ) -> Option<Coordinate> {
        let base = if !route.is_empty() && rng.gen_bool(self.near_route_probability) {
            let vertex = route[rng.gen_range(0..route.len())];
            let bearing = rng.gen_range(0.0..TAU);
            let distance = uniform(rng, 0.0, self.near_route_spread_m);
            vertex.offset_meters(distance * bearing.cos(), distance * bearing.sin())
        } else {
            let region = self.simulation_region.or_else(|| {
                BoundingBox::around(route).map(|b| b.padded(DEFAULT_REGION_PADDING_M))
            })?;
            Coordinate::new(
                uniform(rng, region.min_lat, region.max_lat),
                uniform(rng, region.min_lng, region.max_lng),
            )
        };
        let jitter = self.position_jitter_m;
        Some(base.offset_meters(uniform(rng, -jitter, jitter), uniform(rng, -jitter, jitter)))
    }

    fn ingest(
        &mut self,
        report: EventReport,
        source: Source,
        optimizer: &mut RouteOptimizer,
        now: Duration,
    ) -> Result<Ingested, SpatialError> {
        let id = EventId(self.next_id);
        let event = report.into_event(
            id,
            self.index.as_ref(),
            self.resolution,
            now,
            self.default_radius_km,
        )?;
        self.next_id += 1;

        let evaluation = optimizer.add_event(event.clone(), now)?;
        self.live.insert(
            id,
            LiveEntry {
                expires_at: event.expires_at,
                source,
            },
        );
        debug!("ingested {} {} at cell {}", event.id, event.kind, event.cell);
        self.subscribers.notify(&event);
        self.pending.push(event.clone());
        Ok(Ingested { event, evaluation })
    }

    /// Remove events whose expiry has passed from the optimizer.
    pub fn expire_stale(&mut self, optimizer: &mut RouteOptimizer, now: Duration) -> Vec<EventId> {
        let expired: Vec<EventId> = self
            .live
            .iter()
            .filter(|(_, entry)| entry.expires_at.is_some_and(|t| t <= now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.live.remove(id);
            optimizer.remove_event(*id);
        }
        // Drop bookkeeping for events removed through other paths.
        self.live.retain(|id, _| optimizer.event(*id).is_some());
        if !expired.is_empty() {
            debug!("feed expired {} event(s)", expired.len());
        }
        self.counters.expired += expired.len() as u64;
        expired
    }

    /// Stop tracking an event removed by the host.
    pub fn forget(&mut self, id: EventId) -> bool {
        self.live.remove(&id).is_some()
    }
}
