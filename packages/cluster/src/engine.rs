//! The incident marker layer.

use safe_route_geography_models::{GeoBounds, GeoPoint};
use safe_route_incident_models::Incident;
use safe_route_map::{MapSurface, OverlayId, SurfaceError, Viewport};
use safe_route_render::popup::incident_detail;
use safe_route_render::{
    MarkerIcon, SafetyTier, dominant_tier, style_for_cluster, style_for_severity,
};

use crate::{ClusterItem, Clusterer, singletons};

/// Padding used when zooming into an activated cluster.
pub const CLUSTER_FIT_PADDING_PX: u32 = 30;

/// What a recompute drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Cluster icons drawn.
    pub clusters: usize,
    /// Individual incident markers drawn.
    pub singles: usize,
    /// Whether the unclustered fallback was used.
    pub fallback: bool,
}

/// Result of activating one of the engine's markers.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// An incident's detail popup was opened.
    Detail(String),
    /// The viewport zoomed to a cluster's members.
    ZoomedTo(GeoBounds),
}

#[derive(Debug, Clone)]
enum Drawn {
    Incident(usize),
    Cluster(GeoBounds),
}

/// Owns the incident set and every marker drawn for it.
pub struct ClusteringEngine {
    clusterer: Option<Box<dyn Clusterer>>,
    incidents: Vec<Incident>,
    drawn: Vec<(OverlayId, Drawn)>,
    rendered_for: Option<Viewport>,
}

impl std::fmt::Debug for ClusteringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusteringEngine")
            .field("clustered", &self.clusterer.is_some())
            .field("incidents", &self.incidents.len())
            .field("drawn", &self.drawn.len())
            .finish_non_exhaustive()
    }
}

impl ClusteringEngine {
    /// Creates an engine that groups incidents with `clusterer`.
    #[must_use]
    pub fn new(clusterer: Box<dyn Clusterer>) -> Self {
        Self {
            clusterer: Some(clusterer),
            incidents: Vec::new(),
            drawn: Vec::new(),
            rendered_for: None,
        }
    }

    /// Creates an engine that always draws incidents individually.
    #[must_use]
    pub const fn unclustered() -> Self {
        Self {
            clusterer: None,
            incidents: Vec::new(),
            drawn: Vec::new(),
            rendered_for: None,
        }
    }

    /// The current incident set.
    #[must_use]
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Number of markers this engine has on the surface.
    #[must_use]
    pub fn drawn_count(&self) -> usize {
        self.drawn.len()
    }

    /// Replaces the incident set wholesale, refreshes the heat layer and
    /// redraws.
    pub fn set_incidents<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        incidents: Vec<Incident>,
    ) -> RenderSummary {
        log::debug!("Replacing incident set with {} incidents", incidents.len());
        self.incidents = incidents;

        let points: Vec<GeoPoint> = self.incidents.iter().map(|i| i.position).collect();
        if let Err(SurfaceError::Unsupported { feature }) = surface.set_heat_points(&points) {
            log::warn!("Skipping heat layer update: {feature} is not supported");
        }

        self.recompute(surface)
    }

    /// Clears every marker this engine drew and draws the partition for
    /// the surface's current viewport.
    pub fn recompute<S: MapSurface + ?Sized>(&mut self, surface: &mut S) -> RenderSummary {
        self.remove_markers(surface);

        let viewport = surface.viewport();
        let (items, fallback) = match &self.clusterer {
            Some(clusterer) => match clusterer.cluster(&self.incidents, &viewport) {
                Ok(items) => (items, false),
                Err(e) => {
                    log::warn!("Clustering failed, drawing incidents individually: {e}");
                    (singletons(&self.incidents), true)
                }
            },
            None => (singletons(&self.incidents), true),
        };

        let mut summary = RenderSummary {
            fallback,
            ..RenderSummary::default()
        };
        for item in items {
            match item {
                ClusterItem::Single(index) => {
                    let incident = &self.incidents[index];
                    let icon = MarkerIcon::incident(style_for_severity(incident.severity));
                    let id = surface.add_marker(
                        incident.position,
                        icon,
                        Some(incident.incident_type.clone()),
                    );
                    self.drawn.push((id, Drawn::Incident(index)));
                    summary.singles += 1;
                }
                ClusterItem::Cluster(cluster) => {
                    let dominant = dominant_tier(cluster.member_severities(&self.incidents))
                        .unwrap_or(SafetyTier::Caution);
                    let style = style_for_cluster(cluster.count(), dominant);
                    let id = surface.add_marker(
                        cluster.anchor,
                        style.icon(),
                        Some(format!("{} incidents", cluster.count())),
                    );
                    self.drawn.push((id, Drawn::Cluster(cluster.bounds)));
                    summary.clusters += 1;
                }
            }
        }

        self.rendered_for = Some(viewport);
        log::debug!(
            "Drew {} clusters and {} incidents at zoom {}",
            summary.clusters,
            summary.singles,
            viewport.zoom
        );
        summary
    }

    /// Redraws if the viewport moved since the last recompute.
    pub fn on_viewport_changed<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> Option<RenderSummary> {
        if self.rendered_for == Some(surface.viewport()) {
            return None;
        }
        Some(self.recompute(surface))
    }

    /// Handles a click on `overlay`.
    ///
    /// An incident opens its detail popup. A cluster zooms the viewport to
    /// its members and redraws. Returns `None` for overlays this engine did
    /// not draw.
    pub fn activate<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        overlay: OverlayId,
    ) -> Option<Activation> {
        let (_, drawn) = self.drawn.iter().find(|(id, _)| *id == overlay)?;
        match drawn.clone() {
            Drawn::Incident(index) => {
                let detail = incident_detail(&self.incidents[index]);
                surface.open_popup(overlay, &detail);
                Some(Activation::Detail(detail))
            }
            Drawn::Cluster(bounds) => {
                surface.fit_bounds(bounds, CLUSTER_FIT_PADDING_PX);
                self.recompute(surface);
                Some(Activation::ZoomedTo(bounds))
            }
        }
    }

    /// Removes every marker and forgets the incident set.
    pub fn clear<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        self.remove_markers(surface);
        self.incidents.clear();
        self.rendered_for = None;
        if surface.set_heat_points(&[]).is_err() {
            log::trace!("No heat layer to clear");
        }
    }

    /// Overlays currently drawn by this engine, in draw order.
    pub fn overlays(&self) -> impl Iterator<Item = OverlayId> + '_ {
        self.drawn.iter().map(|(id, _)| *id)
    }

    fn remove_markers<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        for (id, _) in self.drawn.drain(..) {
            surface.remove_overlay(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use safe_route_geography_models::projection::{self, PixelPoint};
    use safe_route_incident_models::Severity;
    use safe_route_map::{Overlay, RecordingSurface};
    use safe_route_render::RouteLineStyle;

    use super::*;
    use crate::{ClusterError, GridClusterer};

    struct BrokenClusterer;

    impl Clusterer for BrokenClusterer {
        fn cluster(
            &self,
            _incidents: &[Incident],
            _viewport: &Viewport,
        ) -> Result<Vec<ClusterItem>, ClusterError> {
            Err(ClusterError::Unavailable {
                reason: "no clustering plugin".to_string(),
            })
        }
    }

    const CENTER: GeoPoint = GeoPoint {
        lat: 17.4401,
        lng: 78.3489,
    };

    fn surface(zoom: u8) -> RecordingSurface {
        RecordingSurface::new(Viewport::new(CENTER, zoom, 800, 600))
    }

    fn incident(lat: f64, lng: f64, severity: Severity) -> Incident {
        Incident {
            id: None,
            position: GeoPoint { lat, lng },
            incident_type: "Assault".to_string(),
            severity,
            description: Some("Reported near the station".to_string()),
            date: Some("2024-03-01".to_string()),
        }
    }

    fn tight_group(count: u32) -> Vec<Incident> {
        (0..count)
            .map(|i| {
                let offset = f64::from(i) * 0.0001;
                incident(CENTER.lat + offset, CENTER.lng + offset, Severity::new(2))
            })
            .collect()
    }

    fn spread() -> Vec<Incident> {
        vec![
            incident(17.4401, 78.3489, Severity::new(1)),
            incident(17.4411, 78.3499, Severity::new(3)),
            incident(17.4391, 78.3479, Severity::new(7)),
        ]
    }

    fn fills(surface: &RecordingSurface) -> Vec<&'static str> {
        surface.markers().iter().map(|(_, _, icon)| icon.fill).collect()
    }

    #[test]
    fn twenty_close_incidents_draw_one_danger_cluster() {
        let mut surface = surface(10);
        let mut engine = ClusteringEngine::new(Box::new(GridClusterer::default()));

        let summary = engine.set_incidents(&mut surface, tight_group(20));

        assert_eq!(summary.clusters, 1);
        assert_eq!(summary.singles, 0);
        let markers = surface.markers();
        assert_eq!(markers.len(), 1);
        let icon = markers[0].2;
        assert_eq!(icon.label.as_deref(), Some("20"));
        assert_eq!(icon.fill, SafetyTier::Danger.color());
        assert_eq!(icon.stroke, Some(SafetyTier::Safe.color()));
        assert_eq!(icon.z_index, 1000);
    }

    #[test]
    fn zooming_in_splits_the_danger_cluster_into_severity_colored_markers() {
        let incidents: Vec<Incident> = (0..20)
            .map(|i| {
                let offset = f64::from(i) * 0.0005;
                incident(
                    CENTER.lat + offset,
                    CENTER.lng + offset,
                    Severity::new(i64::from(i % 5 + 1)),
                )
            })
            .collect();
        let mut surface = surface(10);
        let mut engine = ClusteringEngine::new(Box::new(GridClusterer::default()));

        let zoomed_out = engine.set_incidents(&mut surface, incidents.clone());
        assert_eq!(zoomed_out.clusters, 1);
        assert_eq!(zoomed_out.singles, 0);
        let markers = surface.markers();
        assert_eq!(markers[0].2.label.as_deref(), Some("20"));
        assert_eq!(markers[0].2.fill, SafetyTier::Danger.color());

        surface.set_zoom(18);
        let zoomed_in = engine.on_viewport_changed(&mut surface).unwrap();
        assert_eq!(zoomed_in.clusters, 0);
        assert!(zoomed_in.singles > 1);

        let markers = surface.markers();
        assert_eq!(markers.len(), zoomed_in.singles);
        for (_, position, icon) in markers {
            let incident = incidents
                .iter()
                .find(|incident| incident.position == position)
                .unwrap();
            assert_eq!(icon.fill, style_for_severity(incident.severity).color());
            assert_eq!(icon.label, None);
        }
    }

    #[test]
    fn cluster_icons_never_overlap_when_centroids_crowd_together() {
        const ZOOM: u8 = 14;
        let origin = projection::project(GeoPoint { lat: 0.0, lng: 0.0 }, f64::from(ZOOM));
        let east_of_origin = |dx: f64| {
            projection::unproject(
                PixelPoint {
                    x: origin.x + dx,
                    y: origin.y,
                },
                f64::from(ZOOM),
            )
        };
        // One group seeded at 0 px with members at +55 px, another seeded
        // at +70 px with members at +72 px: the centroids end up ~30 px apart.
        let incidents: Vec<Incident> = [0.0, 55.0, 55.0, 55.0, 70.0, 72.0, 72.0, 72.0]
            .into_iter()
            .map(|dx| {
                let at = east_of_origin(dx);
                incident(at.lat, at.lng, Severity::new(3))
            })
            .collect();
        let mut surface =
            RecordingSurface::new(Viewport::new(east_of_origin(35.0), ZOOM, 800, 600));
        let mut engine = ClusteringEngine::new(Box::new(GridClusterer::default()));

        let summary = engine.set_incidents(&mut surface, incidents);
        assert_eq!(summary.clusters, 2);

        let icons: Vec<(PixelPoint, u32)> = surface
            .markers()
            .into_iter()
            .map(|(_, position, icon)| {
                (projection::project(position, f64::from(ZOOM)), icon.diameter)
            })
            .collect();
        assert_eq!(icons.len(), 2);
        let (a, a_size) = icons[0];
        let (b, b_size) = icons[1];
        let radii = f64::from(a_size + b_size) / 2.0;
        assert!(
            a.distance(&b) >= radii,
            "icons {a:?} and {b:?} are {} px apart, radii sum {radii}",
            a.distance(&b)
        );
    }

    #[test]
    fn zoomed_in_incidents_are_colored_by_severity() {
        let mut surface = surface(18);
        let mut engine = ClusteringEngine::new(Box::new(GridClusterer::default()));

        engine.set_incidents(&mut surface, spread());

        assert_eq!(
            fills(&surface),
            vec![
                SafetyTier::Safe.color(),
                SafetyTier::Caution.color(),
                SafetyTier::Danger.color()
            ]
        );
    }

    #[test]
    fn missing_severity_is_drawn_as_caution() {
        let mut surface = surface(18);
        let mut engine = ClusteringEngine::unclustered();

        engine.set_incidents(
            &mut surface,
            vec![incident(CENTER.lat, CENTER.lng, Severity::unknown())],
        );

        assert_eq!(fills(&surface), vec![SafetyTier::Caution.color()]);
    }

    #[test]
    fn failing_clusterer_falls_back_to_individual_markers() {
        let mut surface = surface(10);
        let mut engine = ClusteringEngine::new(Box::new(BrokenClusterer));

        let summary = engine.set_incidents(&mut surface, tight_group(4));

        assert!(summary.fallback);
        assert_eq!(summary.singles, 4);
        assert_eq!(surface.markers().len(), 4);
    }

    #[test]
    fn recompute_never_leaves_stale_markers() {
        let mut surface = surface(10);
        let mut engine = ClusteringEngine::new(Box::new(GridClusterer::default()));
        engine.set_incidents(&mut surface, tight_group(8));
        assert_eq!(surface.markers().len(), 1);

        surface.set_zoom(19);
        engine.on_viewport_changed(&mut surface);
        assert_eq!(surface.markers().len(), 8);

        surface.set_zoom(10);
        engine.on_viewport_changed(&mut surface);
        assert_eq!(surface.markers().len(), 1);
        assert_eq!(engine.drawn_count(), 1);

        engine.set_incidents(&mut surface, Vec::new());
        assert!(surface.markers().is_empty());
    }

    #[test]
    fn unchanged_viewport_does_not_redraw() {
        let mut surface = surface(12);
        let mut engine = ClusteringEngine::new(Box::new(GridClusterer::default()));
        engine.set_incidents(&mut surface, spread());

        assert_eq!(engine.on_viewport_changed(&mut surface), None);
    }

    #[test]
    fn activating_an_incident_opens_its_detail() {
        let mut surface = surface(18);
        let mut engine = ClusteringEngine::unclustered();
        engine.set_incidents(&mut surface, spread());
        let first = engine.overlays().next().unwrap();

        let activation = engine.activate(&mut surface, first);

        let expected = "Assault\n2024-03-01\nSeverity: 1/5\nReported near the station";
        assert_eq!(activation, Some(Activation::Detail(expected.to_string())));
        assert_eq!(surface.popups(), &[(first, expected.to_string())]);
        assert_eq!(engine.drawn_count(), 3);
    }

    #[test]
    fn activating_a_cluster_zooms_in() {
        let mut surface = surface(10);
        let mut engine = ClusteringEngine::new(Box::new(GridClusterer::default()));
        engine.set_incidents(&mut surface, tight_group(20));
        let cluster = engine.overlays().next().unwrap();

        let activation = engine.activate(&mut surface, cluster);

        assert!(matches!(activation, Some(Activation::ZoomedTo(_))));
        assert!(surface.viewport().zoom > 10);
        assert!(surface.overlay(cluster).is_none());
    }

    #[test]
    fn unknown_overlay_is_ignored() {
        let mut surface = surface(10);
        let mut engine = ClusteringEngine::unclustered();
        assert_eq!(engine.activate(&mut surface, OverlayId(99)), None);
    }

    #[test]
    fn heat_layer_gets_every_incident() {
        let mut surface = surface(10);
        let mut engine = ClusteringEngine::new(Box::new(GridClusterer::default()));
        engine.set_incidents(&mut surface, spread());
        assert_eq!(surface.heat_points().len(), 3);
    }

    #[test]
    fn missing_heat_layer_is_not_fatal() {
        let mut surface = surface(18).without_heat_layer();
        let mut engine = ClusteringEngine::unclustered();

        let summary = engine.set_incidents(&mut surface, spread());

        assert_eq!(summary.singles, 3);
        assert!(surface.heat_points().is_empty());
    }

    #[test]
    fn clear_removes_only_incident_markers() {
        let mut surface = surface(18);
        let route = surface.add_polyline(
            &[CENTER, GeoPoint { lat: 17.45, lng: 78.36 }],
            RouteLineStyle::selected(SafetyTier::Safe),
            None,
        );
        let mut engine = ClusteringEngine::unclustered();
        engine.set_incidents(&mut surface, spread());

        engine.clear(&mut surface);

        assert!(engine.incidents().is_empty());
        assert_eq!(surface.overlay_count(), 1);
        assert!(matches!(surface.overlay(route), Some(Overlay::Polyline { .. })));
    }
}
