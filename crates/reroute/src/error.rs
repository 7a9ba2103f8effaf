//! Error types for the spatial index, configuration and listener seams.
//!
//! Business outcomes such as "no route cached" or "no avoidance waypoint" are
//! ordinary return values, never errors. Only geometry/index misuse and I/O
//! surface here.

use crate::spatial_index::Cell;

/// Errors raised by the spatial index and everything that converts
/// coordinates into cells.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpatialError {
    /// The index was used before its one-time setup completed.
    #[error("spatial index used before initialization")]
    NotInitialized,
    /// NaN, infinite or out-of-range latitude/longitude.
    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },
    #[error("invalid resolution {0}, expected 0..=15")]
    InvalidResolution(u8),
    #[error("invalid cell identifier {0:#x}")]
    InvalidCell(u64),
    #[error("cells are at different resolutions")]
    ResolutionMismatch,
    /// No direct grid path exists between the two cells (e.g. across a
    /// pentagon or icosahedron face boundary).
    #[error("no grid path between {from} and {to}")]
    NoGridPath { from: Cell, to: Cell },
}

/// Failure to parse a hexadecimal cell identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse cell identifier {input:?}")]
pub struct ParseCellError {
    pub input: String,
}

/// Errors loading or validating a [`crate::config::MonitorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Returned by a listener that could not handle a notification. The
/// broadcaster logs it and moves on to the next listener.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors from an external directions provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectionsError {
    #[error("no route found between origin and destination")]
    NoRoute,
    #[error("directions provider unavailable: {0}")]
    Unavailable(String),
}
