//! Route overlays and the single-selection invariant.

use safe_route_geography_models::GeoBounds;
use safe_route_map::{MapSurface, OverlayId, RouteListEntry, StatusPanel};
use safe_route_render::popup::{best_route_summary, route_popup, selected_route_summary};
use safe_route_render::{MarkerIcon, RouteLineStyle, SafetyTier, tier_for_score};
use safe_route_route_models::{Route, RouteSet};

/// Padding kept around the selected route when the map is fitted to it.
pub const FIT_PADDING_PX: u32 = 30;

/// Pin label of the origin marker.
pub const START_LABEL: &str = "Start";

/// Pin label of the destination marker.
pub const END_LABEL: &str = "Destination";

#[derive(Debug, Clone)]
struct DrawnRoute {
    overlay: OverlayId,
    route: Route,
    tier: SafetyTier,
}

/// Owns the route polylines and endpoint markers of the current
/// [`RouteSet`].
///
/// Route overlays correspond positionally to the routes of the last drawn
/// set, and at most one of them is selected.
#[derive(Debug, Clone, Default)]
pub struct RouteLayerManager {
    routes: Vec<DrawnRoute>,
    endpoints: Vec<OverlayId>,
    best_index: Option<usize>,
    selected: Option<usize>,
}

impl RouteLayerManager {
    /// Creates a manager with nothing drawn.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            routes: Vec::new(),
            endpoints: Vec::new(),
            best_index: None,
            selected: None,
        }
    }

    /// Index of the selected route.
    #[must_use]
    pub const fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Number of route overlays drawn.
    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.routes.len()
    }

    /// Whether a route set is drawn.
    #[must_use]
    pub fn is_drawn(&self) -> bool {
        !self.routes.is_empty()
    }

    /// The drawn route at `index`.
    #[must_use]
    pub fn route(&self, index: usize) -> Option<&Route> {
        self.routes.get(index).map(|drawn| &drawn.route)
    }

    /// Position of the route drawn as `overlay`, if it is one of ours.
    #[must_use]
    pub fn index_of(&self, overlay: OverlayId) -> Option<usize> {
        self.routes.iter().position(|drawn| drawn.overlay == overlay)
    }

    /// Replaces whatever is drawn with `set` and selects its best route.
    pub fn draw<S>(&mut self, surface: &mut S, set: &RouteSet)
    where
        S: MapSurface + StatusPanel + ?Sized,
    {
        self.clear(surface);

        for (position, route) in set.routes().iter().enumerate() {
            let tier = tier_for_score(route.safety_score);
            let overlay = surface.add_polyline(
                &route.points,
                RouteLineStyle::unselected(tier),
                Some(route_popup(position, route)),
            );
            self.routes.push(DrawnRoute {
                overlay,
                route: route.clone(),
                tier,
            });
        }

        if let Some(start) = set.start() {
            let icon = MarkerIcon::pin("A", SafetyTier::Safe.color());
            let id = surface.add_marker(start, icon, Some(START_LABEL.to_string()));
            self.endpoints.push(id);
        }
        if let Some(end) = set.end() {
            let icon = MarkerIcon::pin("B", SafetyTier::Danger.color());
            let id = surface.add_marker(end, icon, Some(END_LABEL.to_string()));
            self.endpoints.push(id);
        }

        self.best_index = Some(set.best_index());
        surface.set_status(Some(&best_route_summary(set.best())));
        log::debug!(
            "Drew {} routes, best is #{}",
            self.routes.len(),
            set.best_index() + 1
        );

        self.select(surface, set.best_index());
    }

    /// Selects the route at `index`: restyles every route, fits the map to
    /// the selected one and refreshes the summary and route list.
    ///
    /// Returns `false` without touching anything if nothing is drawn or
    /// `index` is out of range.
    pub fn select<S>(&mut self, surface: &mut S, index: usize) -> bool
    where
        S: MapSurface + StatusPanel + ?Sized,
    {
        let Some(chosen) = self.routes.get(index) else {
            log::debug!(
                "Ignoring selection of route {index}: {} drawn",
                self.routes.len()
            );
            return false;
        };

        let bounds = GeoBounds::from_points(&chosen.route.points);
        let summary = selected_route_summary(index, &chosen.route);

        for (position, drawn) in self.routes.iter().enumerate() {
            surface.set_polyline_style(
                drawn.overlay,
                RouteLineStyle::for_selection(drawn.tier, position == index),
            );
        }
        self.selected = Some(index);

        if let Some(bounds) = bounds {
            surface.fit_bounds(bounds, FIT_PADDING_PX);
        }
        surface.set_route_summary(Some(&summary));
        surface.show_route_list(&self.list_entries());
        true
    }

    /// Removes every overlay this manager drew and clears the route list,
    /// summary and status. Calling it again is a no-op.
    pub fn clear<S>(&mut self, surface: &mut S)
    where
        S: MapSurface + StatusPanel + ?Sized,
    {
        for drawn in self.routes.drain(..) {
            surface.remove_overlay(drawn.overlay);
        }
        for id in self.endpoints.drain(..) {
            surface.remove_overlay(id);
        }
        self.best_index = None;
        self.selected = None;

        surface.show_route_list(&[]);
        surface.set_route_summary(None);
        surface.set_status(None);
    }

    /// Route list rows for the drawn set.
    #[must_use]
    pub fn list_entries(&self) -> Vec<RouteListEntry> {
        self.routes
            .iter()
            .enumerate()
            .map(|(position, drawn)| RouteListEntry {
                number: position + 1,
                safety_score: drawn.route.safety_score,
                color: drawn.tier.color(),
                label: drawn.tier.label(),
                distance: drawn.route.distance.clone(),
                duration: drawn.route.duration.clone(),
                crime_count: drawn.route.crime_count,
                is_best: self.best_index == Some(position),
                is_selected: self.selected == Some(position),
            })
            .collect()
    }
}
