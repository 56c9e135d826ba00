#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map surface abstraction.
//!
//! The route layer manager and the clustering engine never talk to a
//! concrete map library. They draw through [`MapSurface`] (overlays,
//! viewport, heat layer) and report to the user through [`StatusPanel`]
//! (progress, notices, route list). Each owner keeps the [`OverlayId`]s it
//! created and only ever removes or restyles its own.
//!
//! [`RecordingSurface`] is a complete in-memory implementation of both
//! traits. It backs the terminal front end and every map-level test.

pub mod panel;
pub mod recording;
pub mod viewport;

use safe_route_geography_models::{GeoBounds, GeoPoint};
use safe_route_render::{MarkerIcon, RouteLineStyle};
use thiserror::Error;

pub use panel::{Notice, NoticeLevel, RouteListEntry, StatusPanel};
pub use recording::{Overlay, RecordingSurface};
pub use viewport::Viewport;

/// Handle to one overlay drawn on a [`MapSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId(pub u64);

impl std::fmt::Display for OverlayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "overlay#{}", self.0)
    }
}

/// Errors reported by optional surface features.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// The surface cannot render this feature.
    #[error("{feature} is not supported by this map surface")]
    Unsupported {
        /// Name of the missing feature.
        feature: &'static str,
    },
}

/// A map that overlays can be drawn on.
///
/// All calls happen on the rendering thread and each one completes before
/// the next starts.
pub trait MapSurface {
    /// Draws a polyline and returns its handle.
    fn add_polyline(
        &mut self,
        path: &[GeoPoint],
        style: RouteLineStyle,
        popup: Option<String>,
    ) -> OverlayId;

    /// Restyles an existing polyline. Unknown ids are ignored.
    fn set_polyline_style(&mut self, id: OverlayId, style: RouteLineStyle);

    /// Draws a marker and returns its handle.
    fn add_marker(&mut self, position: GeoPoint, icon: MarkerIcon, title: Option<String>)
    -> OverlayId;

    /// Removes an overlay. Unknown ids are ignored.
    fn remove_overlay(&mut self, id: OverlayId);

    /// Opens a transient popup anchored on an overlay.
    fn open_popup(&mut self, id: OverlayId, content: &str);

    /// Moves the viewport so `bounds` is fully visible with `padding_px`
    /// pixels to spare on every side.
    fn fit_bounds(&mut self, bounds: GeoBounds, padding_px: u32);

    /// Centers the viewport on `center` at `zoom`.
    fn set_view(&mut self, center: GeoPoint, zoom: u8);

    /// The current viewport.
    fn viewport(&self) -> Viewport;

    /// Asks the surface to re-measure its container.
    fn resize(&mut self);

    /// Replaces the heat layer's points.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Unsupported`] if the surface has no heat
    /// layer.
    fn set_heat_points(&mut self, points: &[GeoPoint]) -> Result<(), SurfaceError>;
}
