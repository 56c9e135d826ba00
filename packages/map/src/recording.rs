//! In-memory map surface.
//!
//! [`RecordingSurface`] keeps every overlay, popup, notice and viewport
//! change in plain collections so callers can inspect exactly what a map
//! would be showing. Viewport fitting uses the same Web-Mercator math a
//! tiled map uses, so zoom-dependent behavior (clustering) reacts the way
//! it would on a real map.

use std::collections::BTreeMap;

use safe_route_geography_models::projection::fit_zoom;
use safe_route_geography_models::{GeoBounds, GeoPoint};
use safe_route_render::{MarkerIcon, RouteLineStyle};

use crate::viewport::MAX_ZOOM;
use crate::{
    MapSurface, Notice, OverlayId, RouteListEntry, StatusPanel, SurfaceError, Viewport,
};

/// An overlay as drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// A route line.
    Polyline {
        /// Path in traversal order.
        path: Vec<GeoPoint>,
        /// Current stroke style.
        style: RouteLineStyle,
        /// Popup text, if any.
        popup: Option<String>,
    },
    /// A point marker.
    Marker {
        /// Marker position.
        position: GeoPoint,
        /// Icon description.
        icon: MarkerIcon,
        /// Hover title, if any.
        title: Option<String>,
    },
}

/// A [`MapSurface`] + [`StatusPanel`] that records instead of rendering.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    overlays: BTreeMap<OverlayId, Overlay>,
    next_id: u64,
    viewport: Viewport,
    heat_supported: bool,
    heat_points: Vec<GeoPoint>,
    popups: Vec<(OverlayId, String)>,
    resize_count: usize,
    busy: bool,
    status: Option<String>,
    notices: Vec<Notice>,
    route_list: Vec<RouteListEntry>,
    route_summary: Option<String>,
}

impl RecordingSurface {
    /// Creates an empty surface showing `viewport`, with a heat layer.
    #[must_use]
    pub const fn new(viewport: Viewport) -> Self {
        Self {
            overlays: BTreeMap::new(),
            next_id: 1,
            viewport,
            heat_supported: true,
            heat_points: Vec::new(),
            popups: Vec::new(),
            resize_count: 0,
            busy: false,
            status: None,
            notices: Vec::new(),
            route_list: Vec::new(),
            route_summary: None,
        }
    }

    /// Same surface without a heat layer.
    #[must_use]
    pub fn without_heat_layer(mut self) -> Self {
        self.heat_supported = false;
        self
    }

    fn insert(&mut self, overlay: Overlay) -> OverlayId {
        let id = OverlayId(self.next_id);
        self.next_id += 1;
        self.overlays.insert(id, overlay);
        id
    }

    /// Every overlay currently drawn, in creation order.
    pub fn overlays(&self) -> impl Iterator<Item = (OverlayId, &Overlay)> {
        self.overlays.iter().map(|(id, overlay)| (*id, overlay))
    }

    /// Looks up one overlay.
    #[must_use]
    pub fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(&id)
    }

    /// Number of overlays currently drawn.
    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Polylines currently drawn, with their styles.
    #[must_use]
    pub fn polylines(&self) -> Vec<(OverlayId, RouteLineStyle)> {
        self.overlays
            .iter()
            .filter_map(|(id, overlay)| match overlay {
                Overlay::Polyline { style, .. } => Some((*id, *style)),
                Overlay::Marker { .. } => None,
            })
            .collect()
    }

    /// Markers currently drawn.
    #[must_use]
    pub fn markers(&self) -> Vec<(OverlayId, GeoPoint, &MarkerIcon)> {
        self.overlays
            .iter()
            .filter_map(|(id, overlay)| match overlay {
                Overlay::Marker { position, icon, .. } => Some((*id, *position, icon)),
                Overlay::Polyline { .. } => None,
            })
            .collect()
    }

    /// Popups opened so far, oldest first.
    #[must_use]
    pub fn popups(&self) -> &[(OverlayId, String)] {
        &self.popups
    }

    /// Points currently in the heat layer.
    #[must_use]
    pub fn heat_points(&self) -> &[GeoPoint] {
        &self.heat_points
    }

    /// How many times [`MapSurface::resize`] was called.
    #[must_use]
    pub const fn resize_count(&self) -> usize {
        self.resize_count
    }

    /// Whether the progress indicator is showing.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    /// Current route status text.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Notices shown so far, oldest first.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Current route list.
    #[must_use]
    pub fn route_list(&self) -> &[RouteListEntry] {
        &self.route_list
    }

    /// Current selected-route summary.
    #[must_use]
    pub fn route_summary(&self) -> Option<&str> {
        self.route_summary.as_deref()
    }

    /// Simulates the user zooming the map without moving its center.
    pub fn set_zoom(&mut self, zoom: u8) {
        self.viewport.zoom = if zoom > MAX_ZOOM { MAX_ZOOM } else { zoom };
    }
}

impl MapSurface for RecordingSurface {
    fn add_polyline(
        &mut self,
        path: &[GeoPoint],
        style: RouteLineStyle,
        popup: Option<String>,
    ) -> OverlayId {
        self.insert(Overlay::Polyline {
            path: path.to_vec(),
            style,
            popup,
        })
    }

    fn set_polyline_style(&mut self, id: OverlayId, new_style: RouteLineStyle) {
        if let Some(Overlay::Polyline { style, .. }) = self.overlays.get_mut(&id) {
            *style = new_style;
        } else {
            log::debug!("Ignoring style change for unknown polyline {id}");
        }
    }

    fn add_marker(
        &mut self,
        position: GeoPoint,
        icon: MarkerIcon,
        title: Option<String>,
    ) -> OverlayId {
        self.insert(Overlay::Marker {
            position,
            icon,
            title,
        })
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        if self.overlays.remove(&id).is_none() {
            log::debug!("Ignoring removal of unknown overlay {id}");
        }
    }

    fn open_popup(&mut self, id: OverlayId, content: &str) {
        self.popups.push((id, content.to_string()));
    }

    fn fit_bounds(&mut self, bounds: GeoBounds, padding_px: u32) {
        let zoom = fit_zoom(
            &bounds,
            f64::from(self.viewport.width_px),
            f64::from(self.viewport.height_px),
            f64::from(padding_px),
            MAX_ZOOM,
        );
        self.viewport.center = bounds.center();
        self.viewport.zoom = zoom;
    }

    fn set_view(&mut self, center: GeoPoint, zoom: u8) {
        self.viewport.center = center;
        self.viewport.zoom = zoom.min(MAX_ZOOM);
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn resize(&mut self) {
        self.resize_count += 1;
    }

    fn set_heat_points(&mut self, points: &[GeoPoint]) -> Result<(), SurfaceError> {
        if !self.heat_supported {
            return Err(SurfaceError::Unsupported {
                feature: "heat layer",
            });
        }
        self.heat_points = points.to_vec();
        Ok(())
    }
}

impl StatusPanel for RecordingSurface {
    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    fn set_status(&mut self, text: Option<&str>) {
        self.status = text.map(str::to_string);
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn show_route_list(&mut self, entries: &[RouteListEntry]) {
        self.route_list = entries.to_vec();
    }

    fn set_route_summary(&mut self, summary: Option<&str>) {
        self.route_summary = summary.map(str::to_string);
    }
}
