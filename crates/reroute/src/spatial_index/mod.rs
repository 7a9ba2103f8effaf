//! Coordinate <-> cell conversion and grid algebra.
//!
//! Every higher component depends only on the [`SpatialIndex`] trait, so a
//! fake grid can stand in for the H3 implementation in tests. The index is
//! injected as a shared [`GridIndex`] resource rather than a process-wide
//! singleton, which lets several monitoring sessions coexist in one process.

mod h3;
mod types;


use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

use bevy::prelude::*;

use crate::error::SpatialError;
use crate::geo::Coordinate;

pub use h3::H3Index;
pub use types::{Cell, Resolution, EDGE_LENGTH_KM, MAX_RINGS};

/// Narrow, pure contract over a hexagonal hierarchical grid.
pub trait SpatialIndex: Send + Sync {
    fn coordinate_to_cell(&self, coord: Coordinate, res: Resolution) -> Result<Cell, SpatialError>;

    /// Center point of the cell.
    fn cell_to_coordinate(&self, cell: Cell) -> Result<Coordinate, SpatialError>;

    fn cell_to_boundary(&self, cell: Cell) -> Result<Vec<Coordinate>, SpatialError>;

    /// All cells within `k` grid steps, including `cell` itself.
    fn k_ring(&self, cell: Cell, k: u32) -> Result<HashSet<Cell>, SpatialError>;

    /// Cells a straight segment passes through, start and end included.
    /// Fails with [`SpatialError::NoGridPath`] when no direct grid path
    /// exists; callers fall back to the endpoint cells.
    fn line_cells(
        &self,
        start: Coordinate,
        end: Coordinate,
        res: Resolution,
    ) -> Result<Vec<Cell>, SpatialError>;

    fn grid_distance(&self, a: Cell, b: Cell) -> Result<u32, SpatialError>;

    fn parent(&self, cell: Cell, res: Resolution) -> Result<Cell, SpatialError>;

    fn children(&self, cell: Cell, res: Resolution) -> Result<Vec<Cell>, SpatialError>;

    fn resolution_of(&self, cell: Cell) -> Result<Resolution, SpatialError>;

    fn are_neighbors(&self, a: Cell, b: Cell) -> Result<bool, SpatialError>;

    fn edge_length_km(&self, res: Resolution) -> f64 {
        res.edge_length_km()
    }

    fn cell_area_km2(&self, res: Resolution) -> f64 {
        res.cell_area_km2()
    }

    /// `k_ring` around the center's cell with
    /// `k = ceil(radius_km / (edge_length_km * 1.5))`.
    fn cells_in_radius(
        &self,
        center: Coordinate,
        radius_km: f64,
        res: Resolution,
    ) -> Result<HashSet<Cell>, SpatialError> {
        let origin = self.coordinate_to_cell(center, res)?;
        self.k_ring(origin, res.rings_for_radius(radius_km))
    }
}

/// Shared handle to the session's spatial index.
pub type SharedIndex = Arc<dyn SpatialIndex>;

/// The spatial index every monitor component of an `App` shares.
///
/// Insert a custom one before adding the plugin to substitute the grid;
/// the default is an initialized [`H3Index`].
#[derive(Resource, Clone)]
pub struct GridIndex(pub SharedIndex);

impl Default for GridIndex {
    fn default() -> Self {
        Self(Arc::new(H3Index::initialized()))
    }
}

impl Deref for GridIndex {
    type Target = dyn SpatialIndex;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
