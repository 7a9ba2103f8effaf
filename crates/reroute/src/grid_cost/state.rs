//! Per-cell grid state: event buckets and congestion samples.
//!
//! Only [`super::RouteOptimizer`] holds a `GridState`, and registration
//! always goes through [`GridState::insert`], which writes the full
//! footprint in one step.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use crate::spatial_index::Cell;
use crate::traffic_event::{EventId, TrafficEvent};

use super::congestion::CongestionSample;

#[derive(Debug, Default, Clone)]
pub struct GridState {
    events: HashMap<EventId, TrafficEvent>,
    buckets: HashMap<Cell, BTreeSet<EventId>>,
    footprints: HashMap<EventId, Vec<Cell>>,
    congestion: HashMap<Cell, CongestionSample>,
}

impl GridState {
    /// Register `event` under every cell of `footprint`. An event with the
    /// same id is replaced, footprint included.
    pub fn insert(&mut self, event: TrafficEvent, footprint: HashSet<Cell>) {
        let id = event.id;
        self.remove(id);
        let mut cells: Vec<Cell> = footprint.into_iter().collect();
        cells.sort_unstable();
        for cell in &cells {
            self.buckets.entry(*cell).or_default().insert(id);
        }
        self.footprints.insert(id, cells);
        self.events.insert(id, event);
    }

    /// Strip the event from every bucket it was registered under, dropping
    /// buckets left empty.
    pub fn remove(&mut self, id: EventId) -> Option<TrafficEvent> {
        let event = self.events.remove(&id)?;
        for cell in self.footprints.remove(&id).unwrap_or_default() {
            if let Some(bucket) = self.buckets.get_mut(&cell) {
                bucket.remove(&id);
                if bucket.is_empty() {
                    self.buckets.remove(&cell);
                }
            }
        }
        Some(event)
    }

    pub fn event(&self, id: EventId) -> Option<&TrafficEvent> {
        self.events.get(&id)
    }

    pub fn events(&self) -> impl Iterator<Item = &TrafficEvent> {
        self.events.values()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Ids registered at `cell`, in id order.
    pub fn ids_at(&self, cell: Cell) -> impl Iterator<Item = EventId> + '_ {
        self.buckets.get(&cell).into_iter().flatten().copied()
    }

    pub fn events_at(&self, cell: Cell) -> impl Iterator<Item = &TrafficEvent> {
        self.ids_at(cell).filter_map(|id| self.events.get(&id))
    }

    pub fn footprint(&self, id: EventId) -> Option<&[Cell]> {
        self.footprints.get(&id).map(Vec::as_slice)
    }

    pub fn occupied_cells(&self) -> usize {
        self.buckets.len()
    }

    pub fn congestion(&self, cell: Cell) -> Option<&CongestionSample> {
        self.congestion.get(&cell)
    }

    pub fn set_congestion(&mut self, cell: Cell, sample: CongestionSample) {
        self.congestion.insert(cell, sample);
    }

    pub fn congestion_samples(&self) -> usize {
        self.congestion.len()
    }

    /// Remove every event no longer active at `now`; returns their ids.
    pub fn expire_events(&mut self, now: Duration) -> Vec<EventId> {
        let mut expired: Vec<EventId> = self
            .events
            .values()
            .filter(|e| !e.is_active(now))
            .map(|e| e.id)
            .collect();
        expired.sort_unstable();
        for id in &expired {
            self.remove(*id);
        }
        expired
    }

    /// Drop congestion samples older than `ttl`; returns how many went.
    pub fn prune_congestion(&mut self, now: Duration, ttl: Duration) -> usize {
        let before = self.congestion.len();
        self.congestion.retain(|_, sample| !sample.is_stale(now, ttl));
        before - self.congestion.len()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.buckets.clear();
        self.footprints.clear();
        self.congestion.clear();
    }
}
