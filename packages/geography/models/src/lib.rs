#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate and bounding-box types shared by every map layer.
//!
//! A [`GeoPoint`] is an immutable WGS84 coordinate. [`GeoBounds`] is the
//! axis-aligned box used for viewport fitting and cluster bounds. The
//! [`projection`] module converts coordinates to Web-Mercator pixel space
//! at a given zoom level, which is what screen-distance clustering needs.

pub mod projection;

use geo::BoundingRect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a coordinate falls outside the WGS84 range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoPointError {
    /// Latitude not finite or outside `-90..=90`.
    #[error("invalid latitude {0}: expected -90..=90")]
    Latitude(f64),
    /// Longitude not finite or outside `-180..=180`.
    #[error("invalid longitude {0}: expected -180..=180")]
    Longitude(f64),
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a validated coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeoPointError`] if either component is non-finite or out
    /// of range.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoPointError> {
        let point = Self { lat, lng };
        point.validate()?;
        Ok(point)
    }

    /// Checks the WGS84 range invariant.
    ///
    /// Points deserialized straight from a payload skip [`GeoPoint::new`],
    /// so consumers call this before using them.
    ///
    /// # Errors
    ///
    /// Returns [`GeoPointError`] if either component is non-finite or out
    /// of range.
    pub fn validate(&self) -> Result<(), GeoPointError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(GeoPointError::Latitude(self.lat));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(GeoPointError::Longitude(self.lng));
        }
        Ok(())
    }

    /// Returns `true` if the point satisfies the WGS84 range invariant.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl From<GeoPoint> for geo::Coord<f64> {
    fn from(point: GeoPoint) -> Self {
        Self {
            x: point.lng,
            y: point.lat,
        }
    }
}

impl From<geo::Coord<f64>> for GeoPoint {
    fn from(coord: geo::Coord<f64>) -> Self {
        Self {
            lat: coord.y,
            lng: coord.x,
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl GeoBounds {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The smallest box containing every point, or `None` for an empty
    /// slice.
    #[must_use]
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        let multi: geo::MultiPoint<f64> = points
            .iter()
            .map(|p| geo::Point::from(geo::Coord::from(*p)))
            .collect();
        multi
            .bounding_rect()
            .map(|rect| Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    /// Whether the point lies inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lng)
    }

    /// The geometric center of the box.
    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: f64::midpoint(self.south, self.north),
            lng: f64::midpoint(self.west, self.east),
        }
    }

    /// The whole world.
    #[must_use]
    pub const fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert_eq!(
            GeoPoint::new(91.0, 0.0),
            Err(GeoPointError::Latitude(91.0))
        );
        assert_eq!(
            GeoPoint::new(0.0, -180.5),
            Err(GeoPointError::Longitude(-180.5))
        );
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn bounds_cover_all_points() {
        let points = [
            GeoPoint { lat: 17.44, lng: 78.34 },
            GeoPoint { lat: 17.40, lng: 78.50 },
            GeoPoint { lat: 17.48, lng: 78.41 },
        ];
        let bounds = GeoBounds::from_points(&points).unwrap();
        assert!((bounds.south - 17.40).abs() < 1e-9);
        assert!((bounds.north - 17.48).abs() < 1e-9);
        assert!((bounds.west - 78.34).abs() < 1e-9);
        assert!((bounds.east - 78.50).abs() < 1e-9);
        for p in points {
            assert!(bounds.contains(p));
        }
        assert!(GeoBounds::from_points(&[]).is_none());
    }

    #[test]
    fn deserializes_object_form() {
        let point: GeoPoint = serde_json::from_str(r#"{"lat": 17.4401, "lng": 78.3489}"#).unwrap();
        assert!((point.lat - 17.4401).abs() < 1e-9);
        assert!((point.lng - 78.3489).abs() < 1e-9);
    }
}
