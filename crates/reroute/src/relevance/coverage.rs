//! Route-to-cell coverage.

use std::collections::HashSet;

use bevy::prelude::*;

use crate::error::SpatialError;
use crate::geo::Coordinate;
use crate::spatial_index::{Cell, Resolution, SpatialIndex};

/// Cells covering `path`: every vertex cell plus the interpolated grid path
/// between consecutive vertices. A segment without a direct grid path
/// contributes only its endpoint cells.
pub fn route_cells_of(
    index: &dyn SpatialIndex,
    path: &[Coordinate],
    res: Resolution,
) -> Result<HashSet<Cell>, SpatialError> {
    let mut cells = HashSet::with_capacity(path.len() * 4);
    for vertex in path {
        cells.insert(index.coordinate_to_cell(*vertex, res)?);
    }
    for pair in path.windows(2) {
        match index.line_cells(pair[0], pair[1], res) {
            Ok(segment) => cells.extend(segment),
            Err(SpatialError::NoGridPath { from, to }) => {
                debug!("no grid path {} -> {}, keeping endpoint cells only", from, to);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(cells)
}

/// `cells` plus the one-ring around each of them.
pub fn buffered_cells(
    index: &dyn SpatialIndex,
    cells: &HashSet<Cell>,
) -> Result<HashSet<Cell>, SpatialError> {
    let mut buffered = HashSet::with_capacity(cells.len() * 3);
    for cell in cells {
        buffered.extend(index.k_ring(*cell, 1)?);
    }
    Ok(buffered)
}

/// Snapshot of a cached route: the polyline and the two cell sets derived
/// from it. All three always describe the same polyline.
#[derive(Debug, Clone, Default)]
pub struct RouteCoverage {
    path: Vec<Coordinate>,
    route_cells: HashSet<Cell>,
    with_neighbors: HashSet<Cell>,
    resolution: Option<Resolution>,
}

impl RouteCoverage {
    /// Discretize `path`. An empty path yields an empty, invalid coverage.
    pub fn compute(
        index: &dyn SpatialIndex,
        path: &[Coordinate],
        res: Resolution,
    ) -> Result<Self, SpatialError> {
        if path.is_empty() {
            return Ok(Self::default());
        }
        let route_cells = route_cells_of(index, path, res)?;
        let with_neighbors = buffered_cells(index, &route_cells)?;
        Ok(Self {
            path: path.to_vec(),
            route_cells,
            with_neighbors,
            resolution: Some(res),
        })
    }

    /// True once a non-empty path has been cached.
    pub fn is_valid(&self) -> bool {
        self.resolution.is_some() && !self.route_cells.is_empty()
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    pub fn route_cells(&self) -> &HashSet<Cell> {
        &self.route_cells
    }

    pub fn route_cells_with_neighbors(&self) -> &HashSet<Cell> {
        &self.with_neighbors
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }
}
