//! Viewport state: center, zoom and pixel dimensions.

use safe_route_geography_models::projection::{self, PixelPoint};
use safe_route_geography_models::{GeoBounds, GeoPoint};

/// Highest zoom level a surface will display.
pub const MAX_ZOOM: u8 = 19;

/// What the map currently shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Geographic center.
    pub center: GeoPoint,
    /// Whole-number zoom level.
    pub zoom: u8,
    /// Width of the map container in pixels.
    pub width_px: u32,
    /// Height of the map container in pixels.
    pub height_px: u32,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(center: GeoPoint, zoom: u8, width_px: u32, height_px: u32) -> Self {
        Self {
            center,
            zoom,
            width_px,
            height_px,
        }
    }

    /// The geographic area currently visible.
    #[must_use]
    pub fn bounds(&self) -> GeoBounds {
        self.pixel_bounds(0.0)
    }

    /// The visible area grown by `padding_px` on every side.
    ///
    /// Longitudes are clamped to the world rather than wrapped.
    #[must_use]
    pub fn pixel_bounds(&self, padding_px: f64) -> GeoBounds {
        let zoom = f64::from(self.zoom);
        let center = projection::project(self.center, zoom);
        let half_w = f64::from(self.width_px) / 2.0 + padding_px;
        let half_h = f64::from(self.height_px) / 2.0 + padding_px;

        let north_west = projection::unproject(
            PixelPoint {
                x: center.x - half_w,
                y: center.y - half_h,
            },
            zoom,
        );
        let south_east = projection::unproject(
            PixelPoint {
                x: center.x + half_w,
                y: center.y + half_h,
            },
            zoom,
        );

        GeoBounds::new(
            north_west.lng.max(-180.0),
            south_east.lat.max(-90.0),
            south_east.lng.min(180.0),
            north_west.lat.min(90.0),
        )
    }
}
