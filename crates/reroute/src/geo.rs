//! WGS84 coordinates and the small amount of spherical math the monitor needs.

use serde::{Deserialize, Serialize};

use crate::error::SpatialError;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// A latitude/longitude pair in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Rejects NaN/infinite values and anything outside [-90, 90] x [-180, 180].
    pub fn validate(self) -> Result<Self, SpatialError> {
        let in_range = self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng);
        if in_range {
            Ok(self)
        } else {
            Err(SpatialError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }

    /// Great-circle (haversine) distance in kilometers.
    pub fn distance_km(self, other: Coordinate) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Shift by a local north/east offset in meters (flat-earth approximation,
    /// fine for the sub-kilometer offsets used by jitter and placement).
    pub fn offset_meters(self, north_m: f64, east_m: f64) -> Coordinate {
        let lat = self.lat + north_m / METERS_PER_DEGREE_LAT;
        let cos_lat = self.lat.to_radians().cos().max(1e-6);
        let lng = self.lng + east_m / (METERS_PER_DEGREE_LAT * cos_lat);
        Coordinate { lat, lng }
    }
}

/// An axis-aligned lat/lng box, used to bound synthetic event placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for an empty slice.
    pub fn around(points: &[Coordinate]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = BoundingBox {
            min_lat: first.lat,
            min_lng: first.lng,
            max_lat: first.lat,
            max_lng: first.lng,
        };
        for p in &points[1..] {
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.min_lng = bbox.min_lng.min(p.lng);
            bbox.max_lat = bbox.max_lat.max(p.lat);
            bbox.max_lng = bbox.max_lng.max(p.lng);
        }
        Some(bbox)
    }

    /// Grow the box by `margin_m` meters on every side.
    pub fn padded(self, margin_m: f64) -> Self {
        let sw = Coordinate::new(self.min_lat, self.min_lng).offset_meters(-margin_m, -margin_m);
        let ne = Coordinate::new(self.max_lat, self.max_lng).offset_meters(margin_m, margin_m);
        BoundingBox {
            min_lat: sw.lat.max(-90.0),
            min_lng: sw.lng.max(-180.0),
            max_lat: ne.lat.min(90.0),
            max_lng: ne.lng.min(180.0),
        }
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&c.lat)
            && (self.min_lng..=self.max_lng).contains(&c.lng)
    }

    pub fn is_valid(&self) -> bool {
        self.min_lat <= self.max_lat
            && self.min_lng <= self.max_lng
            && Coordinate::new(self.min_lat, self.min_lng).validate().is_ok()
            && Coordinate::new(self.max_lat, self.max_lng).validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_range_edges() {
        assert!(Coordinate::new(90.0, 180.0).validate().is_ok());
        assert!(Coordinate::new(-90.0, -180.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nan_and_out_of_range() {
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).validate().is_err());
        assert!(Coordinate::new(90.5, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, -180.1).validate().is_err());
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let a = Coordinate::new(32.0, 34.8);
        let b = Coordinate::new(33.0, 34.8);
        let d = a.distance_km(b);
        assert!((d - 111.2).abs() < 0.5, "got {d}");
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let a = Coordinate::new(32.08, 34.78);
        assert!(a.distance_km(a).abs() < 1e-9);
    }

    #[test]
    fn test_offset_meters_roundtrips_through_distance() {
        let a = Coordinate::new(32.08, 34.78);
        let north = a.offset_meters(500.0, 0.0);
        let east = a.offset_meters(0.0, 500.0);
        assert!((a.distance_km(north) - 0.5).abs() < 0.01);
        assert!((a.distance_km(east) - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_bounding_box_around_and_padded() {
        let pts = [
            Coordinate::new(32.05, 34.76),
            Coordinate::new(32.10, 34.80),
            Coordinate::new(32.07, 34.75),
        ];
        let bbox = BoundingBox::around(&pts).unwrap();
        assert_eq!(bbox.min_lat, 32.05);
        assert_eq!(bbox.max_lng, 34.80);
        assert!(pts.iter().all(|p| bbox.contains(*p)));

        let padded = bbox.padded(1000.0);
        assert!(padded.min_lat < bbox.min_lat);
        assert!(padded.max_lng > bbox.max_lng);
        assert!(padded.is_valid());
    }

    #[test]
    fn test_bounding_box_around_empty() {
        assert!(BoundingBox::around(&[]).is_none());
    }
}
