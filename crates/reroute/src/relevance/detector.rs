//! Event relevance against the cached route.

use std::collections::HashSet;
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::SpatialError;
use crate::geo::Coordinate;
use crate::spatial_index::{Cell, Resolution, SharedIndex};
use crate::traffic_event::TrafficEvent;

use super::coverage::{route_cells_of, RouteCoverage};

pub const NO_ROUTE_REASON: &str = "no route cached";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    DirectHit,
    Adjacent,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceResult {
    pub relevant: bool,
    pub match_type: MatchType,
    pub reason: String,
    /// The event cell that matched the route coverage, if any.
    pub matched_cell: Option<Cell>,
}

impl RelevanceResult {
    fn no_route() -> Self {
        Self {
            relevant: false,
            match_type: MatchType::NoMatch,
            reason: NO_ROUTE_REASON.to_string(),
            matched_cell: None,
        }
    }

    fn direct_hit(event: &TrafficEvent) -> Self {
        Self {
            relevant: true,
            match_type: MatchType::DirectHit,
            reason: format!("{} on route cell {}", event.kind, event.cell),
            matched_cell: Some(event.cell),
        }
    }

    fn adjacent(event: &TrafficEvent) -> Self {
        Self {
            relevant: true,
            match_type: MatchType::Adjacent,
            reason: format!("{} in cell {} next to the route", event.kind, event.cell),
            matched_cell: Some(event.cell),
        }
    }

    fn no_match(event: &TrafficEvent) -> Self {
        Self {
            relevant: false,
            match_type: MatchType::NoMatch,
            reason: format!("{} in cell {} is away from the route", event.kind, event.cell),
            matched_cell: None,
        }
    }
}

/// Owns the route coverage cache; nothing else mutates it.
pub struct RelevanceDetector {
    index: SharedIndex,
    resolution: Resolution,
    coverage: RouteCoverage,
}

impl RelevanceDetector {
    pub fn new(index: SharedIndex, resolution: Resolution) -> Self {
        Self {
            index,
            resolution,
            coverage: RouteCoverage::default(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn coverage(&self) -> &RouteCoverage {
        &self.coverage
    }

    /// Recompute the coverage for `path` at the detector's resolution.
    pub fn cache_route(&mut self, path: &[Coordinate]) -> Result<(), SpatialError> {
        self.cache_route_at(path, self.resolution)
    }

    /// Recompute the coverage at an explicit resolution. On error the cache
    /// is left empty and invalid rather than half-updated.
    pub fn cache_route_at(
        &mut self,
        path: &[Coordinate],
        res: Resolution,
    ) -> Result<(), SpatialError> {
        match RouteCoverage::compute(self.index.as_ref(), path, res) {
            Ok(coverage) => {
                info!(
                    "cached route: {} vertices, {} cells, {} with buffer",
                    path.len(),
                    coverage.route_cells().len(),
                    coverage.route_cells_with_neighbors().len()
                );
                self.coverage = coverage;
                Ok(())
            }
            Err(e) => {
                self.coverage = RouteCoverage::default();
                Err(e)
            }
        }
    }

    pub fn clear_route(&mut self) {
        self.coverage = RouteCoverage::default();
    }

    /// Classify `event` against the cached route.
    pub fn check_relevance(&self, event: &TrafficEvent) -> RelevanceResult {
        if !self.coverage.is_valid() {
            return RelevanceResult::no_route();
        }
        if self.coverage.route_cells().contains(&event.cell) {
            RelevanceResult::direct_hit(event)
        } else if self.coverage.route_cells_with_neighbors().contains(&event.cell) {
            RelevanceResult::adjacent(event)
        } else {
            RelevanceResult::no_match(event)
        }
    }

    /// Same classification against an arbitrary path, leaving the cache
    /// untouched. Adjacency is tested per route cell instead of through a
    /// precomputed buffer.
    pub fn check_relevance_for_path(
        &self,
        event: &TrafficEvent,
        path: &[Coordinate],
    ) -> Result<RelevanceResult, SpatialError> {
        if path.is_empty() {
            return Ok(RelevanceResult::no_route());
        }
        let route_cells = route_cells_of(self.index.as_ref(), path, self.resolution)?;
        if route_cells.contains(&event.cell) {
            return Ok(RelevanceResult::direct_hit(event));
        }
        for cell in &route_cells {
            if self.index.k_ring(*cell, 1)?.contains(&event.cell) {
                return Ok(RelevanceResult::adjacent(event));
            }
        }
        Ok(RelevanceResult::no_match(event))
    }

    /// Footprint of `event`: every cell within its effect radius.
    pub fn affected_cells(&self, event: &TrafficEvent) -> Result<HashSet<Cell>, SpatialError> {
        self.index
            .cells_in_radius(event.coordinate, event.radius_km, self.resolution)
    }

    /// True iff `path` touches none of the footprints of the events still
    /// active at `now`.
    pub fn route_avoids<'a>(
        &self,
        path: &[Coordinate],
        events: impl IntoIterator<Item = &'a TrafficEvent>,
        now: Duration,
    ) -> Result<bool, SpatialError> {
        let route_cells = route_cells_of(self.index.as_ref(), path, self.resolution)?;
        for event in events.into_iter().filter(|e| e.is_active(now)) {
            if !self.affected_cells(event)?.is_disjoint(&route_cells) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
