//! Web-Mercator pixel projection.
//!
//! Map surfaces render the world as a square of `256 * 2^zoom` pixels.
//! Screen-space distances (icon overlap, fit-to-bounds) are computed in
//! this pixel space rather than in degrees.

use std::f64::consts::PI;

use crate::{GeoBounds, GeoPoint};

/// Edge length in pixels of a single tile at zoom 0.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the Web-Mercator square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A position in world pixel space at some zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    /// Pixels east of the antimeridian.
    pub x: f64,
    /// Pixels south of the northern Mercator limit.
    pub y: f64,
}

impl PixelPoint {
    /// Euclidean distance to another pixel position.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Width (and height) of the world in pixels at `zoom`.
#[must_use]
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// Projects a coordinate to world pixels at `zoom`.
#[must_use]
pub fn project(point: GeoPoint, zoom: f64) -> PixelPoint {
    let size = world_size(zoom);
    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (point.lng + 180.0) / 360.0 * size;
    let y = (1.0 - lat.tan().asinh() / PI) / 2.0 * size;
    PixelPoint { x, y }
}

/// Inverse of [`project`].
#[must_use]
pub fn unproject(pixel: PixelPoint, zoom: f64) -> GeoPoint {
    let size = world_size(zoom);
    let lng = pixel.x / size * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * pixel.y / size);
    let lat = n.sinh().atan().to_degrees();
    GeoPoint { lat, lng }
}

/// Largest whole zoom level at which `bounds` fits inside a
/// `width` x `height` pixel viewport with `padding` pixels on every side.
///
/// The result is clamped to `0..=max_zoom`.
#[must_use]
pub fn fit_zoom(bounds: &GeoBounds, width: f64, height: f64, padding: f64, max_zoom: u8) -> u8 {
    let usable_w = (2.0f64.mul_add(-padding, width)).max(1.0);
    let usable_h = (2.0f64.mul_add(-padding, height)).max(1.0);

    let nw = project(
        GeoPoint {
            lat: bounds.north,
            lng: bounds.west,
        },
        0.0,
    );
    let se = project(
        GeoPoint {
            lat: bounds.south,
            lng: bounds.east,
        },
        0.0,
    );
    let span_x = (se.x - nw.x).abs();
    let span_y = (se.y - nw.y).abs();

    let mut zoom = max_zoom;
    while zoom > 0 {
        let scale = f64::from(zoom).exp2();
        if span_x * scale <= usable_w && span_y * scale <= usable_h {
            break;
        }
        zoom -= 1;
    }
    zoom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_projects_to_world_center() {
        let p = project(GeoPoint { lat: 0.0, lng: 0.0 }, 0.0);
        assert!((p.x - 128.0).abs() < 1e-9);
        assert!((p.y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn each_zoom_level_doubles_pixel_distance() {
        let a = GeoPoint { lat: 17.44, lng: 78.34 };
        let b = GeoPoint { lat: 17.45, lng: 78.35 };
        let d10 = project(a, 10.0).distance(&project(b, 10.0));
        let d11 = project(a, 11.0).distance(&project(b, 11.0));
        assert!((d11 / d10 - 2.0).abs() < 1e-6);
    }

    #[test]
    fn unproject_inverts_project() {
        let point = GeoPoint {
            lat: -33.8688,
            lng: 151.2093,
        };
        let back = unproject(project(point, 14.0), 14.0);
        assert!((back.lat - point.lat).abs() < 1e-9);
        assert!((back.lng - point.lng).abs() < 1e-9);
    }

    #[test]
    fn small_bounds_fit_at_high_zoom() {
        let bounds = GeoBounds::new(78.34, 17.43, 78.36, 17.45);
        let zoom = fit_zoom(&bounds, 800.0, 600.0, 30.0, 19);
        assert!(zoom >= 13, "zoom {zoom} too low for a 2km box");
        let world = fit_zoom(&GeoBounds::world(), 800.0, 600.0, 30.0, 19);
        assert!(world <= 2);
    }
}
