//! A map surface that prints to the terminal.

use safe_route_cli_utils::{BusyIndicator, MultiProgress};
use safe_route_geography_models::{GeoBounds, GeoPoint};
use safe_route_map::{
    MapSurface, Notice, NoticeLevel, OverlayId, RecordingSurface, RouteListEntry, StatusPanel,
    SurfaceError, Viewport,
};
use safe_route_render::{MarkerIcon, RouteLineStyle};

/// Keeps map state in a [`RecordingSurface`] and echoes everything the
/// user should see as plain lines above the spinner.
#[derive(Debug)]
pub struct TerminalMap {
    map: RecordingSurface,
    busy: BusyIndicator,
}

impl TerminalMap {
    #[must_use]
    pub fn new(multi: &MultiProgress, viewport: Viewport) -> Self {
        Self {
            map: RecordingSurface::new(viewport),
            busy: BusyIndicator::new(multi, "Working..."),
        }
    }

    /// The recorded map state.
    #[must_use]
    pub const fn map(&self) -> &RecordingSurface {
        &self.map
    }

    fn line(&self, text: &str) {
        self.busy.println(text);
    }
}

impl MapSurface for TerminalMap {
    fn add_polyline(
        &mut self,
        path: &[GeoPoint],
        style: RouteLineStyle,
        popup: Option<String>,
    ) -> OverlayId {
        self.map.add_polyline(path, style, popup)
    }

    fn set_polyline_style(&mut self, id: OverlayId, style: RouteLineStyle) {
        self.map.set_polyline_style(id, style);
    }

    fn add_marker(&mut self, position: GeoPoint, icon: MarkerIcon, title: Option<String>)
    -> OverlayId {
        self.map.add_marker(position, icon, title)
    }

    fn remove_overlay(&mut self, id: OverlayId) {
        self.map.remove_overlay(id);
    }

    fn open_popup(&mut self, id: OverlayId, content: &str) {
        self.map.open_popup(id, content);
        self.line(content);
    }

    fn fit_bounds(&mut self, bounds: GeoBounds, padding_px: u32) {
        self.map.fit_bounds(bounds, padding_px);
        let viewport = self.map.viewport();
        log::debug!("View fitted to {} at zoom {}", viewport.center, viewport.zoom);
    }

    fn set_view(&mut self, center: GeoPoint, zoom: u8) {
        self.map.set_view(center, zoom);
    }

    fn viewport(&self) -> Viewport {
        self.map.viewport()
    }

    fn resize(&mut self) {
        self.map.resize();
    }

    fn set_heat_points(&mut self, points: &[GeoPoint]) -> Result<(), SurfaceError> {
        self.map.set_heat_points(points)
    }
}

impl StatusPanel for TerminalMap {
    fn set_busy(&mut self, busy: bool) {
        self.map.set_busy(busy);
        if busy {
            self.busy.start();
        } else {
            self.busy.stop();
        }
    }

    fn set_status(&mut self, text: Option<&str>) {
        self.map.set_status(text);
        if let Some(text) = text {
            self.line(text);
        }
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => self.line(&notice.text),
            NoticeLevel::Error => self.line(&format!("error: {}", notice.text)),
        }
        self.map.notify(notice);
    }

    fn show_route_list(&mut self, entries: &[RouteListEntry]) {
        self.map.show_route_list(entries);
        for entry in entries {
            self.line(&format_entry(entry));
        }
    }

    fn set_route_summary(&mut self, summary: Option<&str>) {
        self.map.set_route_summary(summary);
        if let Some(summary) = summary {
            self.line(summary);
        }
    }
}

/// One route list row as a single line.
#[must_use]
pub fn format_entry(entry: &RouteListEntry) -> String {
    let marker = if entry.is_selected { '>' } else { ' ' };
    let best = if entry.is_best { " (best)" } else { "" };
    format!(
        "{marker} Route {}{best}: {} ({}/100), {}, {}, {} incidents nearby",
        entry.number,
        entry.label,
        entry.safety_score,
        entry.distance,
        entry.duration,
        entry.crime_count,
    )
}
