//! [`SpatialIndex`] backed by the `h3o` hexagonal hierarchical grid.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use bevy::prelude::*;
use h3o::{CellIndex, LatLng};

use crate::error::SpatialError;
use crate::geo::Coordinate;

use super::types::{Cell, Resolution};
use super::SpatialIndex;

/// H3 grid index. Starts uninitialized; every operation fails with
/// [`SpatialError::NotInitialized`] until [`H3Index::initialize`] runs.
#[derive(Debug, Default)]
pub struct H3Index {
    ready: AtomicBool,
}

impl H3Index {
    /// An index that still needs [`initialize`](Self::initialize).
    pub fn new() -> Self {
        Self::default()
    }

    /// An index that is ready for use.
    pub fn initialized() -> Self {
        let index = Self::new();
        index.initialize();
        index
    }

    /// One-time setup. Repeated calls are no-ops.
    pub fn initialize(&self) {
        if !self.ready.swap(true, Ordering::AcqRel) {
            info!("H3 spatial index initialized");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn ensure_ready(&self) -> Result<(), SpatialError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(SpatialError::NotInitialized)
        }
    }

    fn to_h3(&self, cell: Cell) -> Result<CellIndex, SpatialError> {
        self.ensure_ready()?;
        CellIndex::try_from(cell.raw()).map_err(|_| SpatialError::InvalidCell(cell.raw()))
    }
}

fn from_h3(index: CellIndex) -> Cell {
    Cell::from_raw(u64::from(index))
}

fn h3_resolution(res: Resolution) -> Result<h3o::Resolution, SpatialError> {
    h3o::Resolution::try_from(res.get()).map_err(|_| SpatialError::InvalidResolution(res.get()))
}

fn to_coordinate(ll: LatLng) -> Coordinate {
    Coordinate::new(ll.lat(), ll.lng())
}

impl SpatialIndex for H3Index {
    fn coordinate_to_cell(&self, coord: Coordinate, res: Resolution) -> Result<Cell, SpatialError> {
        self.ensure_ready()?;
        let coord = coord.validate()?;
        let ll = LatLng::new(coord.lat, coord.lng).map_err(|_| SpatialError::InvalidCoordinate {
            lat: coord.lat,
            lng: coord.lng,
        })?;
        Ok(from_h3(ll.to_cell(h3_resolution(res)?)))
    }

    fn cell_to_coordinate(&self, cell: Cell) -> Result<Coordinate, SpatialError> {
        let index = self.to_h3(cell)?;
        Ok(to_coordinate(LatLng::from(index)))
    }

    fn cell_to_boundary(&self, cell: Cell) -> Result<Vec<Coordinate>, SpatialError> {
        let index = self.to_h3(cell)?;
        Ok(index.boundary().iter().map(|ll| to_coordinate(*ll)).collect())
    }

    fn k_ring(&self, cell: Cell, k: u32) -> Result<HashSet<Cell>, SpatialError> {
        let index = self.to_h3(cell)?;
        Ok(index
            .grid_disk::<Vec<_>>(k)
            .into_iter()
            .map(from_h3)
            .collect())
    }

    fn line_cells(
        &self,
        start: Coordinate,
        end: Coordinate,
        res: Resolution,
    ) -> Result<Vec<Cell>, SpatialError> {
        let from = self.coordinate_to_cell(start, res)?;
        let to = self.coordinate_to_cell(end, res)?;
        if from == to {
            return Ok(vec![from]);
        }
        let no_path = SpatialError::NoGridPath { from, to };
        let path = self
            .to_h3(from)?
            .grid_path_cells(self.to_h3(to)?)
            .map_err(|_| no_path.clone())?;
        path.map(|step| step.map(from_h3))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| no_path)
    }

    fn grid_distance(&self, a: Cell, b: Cell) -> Result<u32, SpatialError> {
        let (ia, ib) = (self.to_h3(a)?, self.to_h3(b)?);
        if ia.resolution() != ib.resolution() {
            return Err(SpatialError::ResolutionMismatch);
        }
        ia.grid_distance(ib)
            .map(|d| d.unsigned_abs())
            .map_err(|_| SpatialError::NoGridPath { from: a, to: b })
    }

    fn parent(&self, cell: Cell, res: Resolution) -> Result<Cell, SpatialError> {
        let index = self.to_h3(cell)?;
        index
            .parent(h3_resolution(res)?)
            .map(from_h3)
            .ok_or(SpatialError::ResolutionMismatch)
    }

    fn children(&self, cell: Cell, res: Resolution) -> Result<Vec<Cell>, SpatialError> {
        let index = self.to_h3(cell)?;
        let target = h3_resolution(res)?;
        if target < index.resolution() {
            return Err(SpatialError::ResolutionMismatch);
        }
        Ok(index.children(target).map(from_h3).collect())
    }

    fn resolution_of(&self, cell: Cell) -> Result<Resolution, SpatialError> {
        let index = self.to_h3(cell)?;
        Resolution::new(u8::from(index.resolution()))
    }

    fn are_neighbors(&self, a: Cell, b: Cell) -> Result<bool, SpatialError> {
        let (ia, ib) = (self.to_h3(a)?, self.to_h3(b)?);
        ia.is_neighbor_with(ib)
            .map_err(|_| SpatialError::ResolutionMismatch)
    }
}
