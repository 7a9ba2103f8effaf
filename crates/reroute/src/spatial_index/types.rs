//! Cell identifiers and grid resolutions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ParseCellError, SpatialError};

/// Average hexagon edge length in kilometers, indexed by resolution 0..=15.
pub const EDGE_LENGTH_KM: [f64; 16] = [
    1107.712591,
    418.676_005_5,
    158.244_655_8,
    59.810_857_94,
    22.606_379_4,
    8.544_408_276,
    3.229_482_772,
    1.220_629_759,
    0.461_354_684,
    0.174_375_668,
    0.065_907_807,
    0.024_910_561,
    0.009_415_526,
    0.003_559_893,
    0.001_348_575,
    0.000_509_713,
];

/// One hexagon of the grid at a given resolution.
///
/// Opaque 64-bit identifier; the hexadecimal form is what crosses process
/// boundaries (JSON, logs, directions-provider hints).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell(u64);

impl Cell {
    /// Wrap a raw identifier. No validation happens here; the spatial index
    /// rejects identifiers it does not recognise with `SpatialError::InvalidCell`.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub fn to_hex(self) -> String {
        format!("{:x}", self.0)
    }

    /// Parse a hexadecimal identifier, with or without a `0x` prefix.
    pub fn from_hex(input: &str) -> Result<Self, ParseCellError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > 16 {
            return Err(ParseCellError {
                input: input.to_string(),
            });
        }
        u64::from_str_radix(digits, 16)
            .map(Cell)
            .map_err(|_| ParseCellError {
                input: input.to_string(),
            })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell({:x})", self.0)
    }
}

impl FromStr for Cell {
    type Err = ParseCellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cell::from_hex(s)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Cell::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Largest ring count a radius converts to; a disk of this size holds
/// 1 + 3k(k+1) = 120,601 cells.
pub const MAX_RINGS: u32 = 200;

/// Grid granularity, 0 (coarsest) through 15 (finest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Resolution(u8);

impl Resolution {
    pub const MIN: Resolution = Resolution(0);
    pub const MAX: Resolution = Resolution(15);

    pub const fn new(value: u8) -> Result<Self, SpatialError> {
        if value <= 15 {
            Ok(Resolution(value))
        } else {
            Err(SpatialError::InvalidResolution(value))
        }
    }

    /// Clamp to the finest resolution instead of failing.
    pub const fn saturating(value: u8) -> Self {
        if value > 15 {
            Resolution(15)
        } else {
            Resolution(value)
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Average edge length for this resolution, from the fixed table.
    pub fn edge_length_km(self) -> f64 {
        EDGE_LENGTH_KM[self.0 as usize]
    }

    /// Area of a regular hexagon with the average edge length.
    pub fn cell_area_km2(self) -> f64 {
        let edge = self.edge_length_km();
        (3.0 * 3f64.sqrt() / 2.0) * edge * edge
    }

    /// Number of rings needed so that `k_ring` covers `radius_km`, at most
    /// [`MAX_RINGS`].
    pub fn rings_for_radius(self, radius_km: f64) -> u32 {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return 0;
        }
        let k = (radius_km / (self.edge_length_km() * 1.5)).ceil();
        k.min(MAX_RINGS as f64) as u32
    }
}

impl TryFrom<u8> for Resolution {
    type Error = SpatialError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Resolution::new(value)
    }
}

impl From<Resolution> for u8 {
    fn from(res: Resolution) -> u8 {
        res.0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}
