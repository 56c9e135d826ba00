#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! A map session.
//!
//! [`MapSession`] is the explicit owner of everything one open map needs:
//! the surface, the route selection flow, the incident layer and the
//! user-location marker. It is built once the surface is ready and torn
//! down with [`MapSession::close`], which removes every overlay it drew and
//! hands the surface back.
//!
//! Collaborator calls are `async` and never hold the surface across an
//! await point in a way that lets two mutations interleave: each operation
//! takes `&mut self`. Callers that want to overlap requests use the split
//! `begin_*`/`finish_*` pairs, whose tickets discard stale answers.

pub mod location;

use std::time::Duration;

use safe_route_client::{ClientConfig, ClientError, IncidentService, RoutingService};
use safe_route_cluster::{
    Activation, ClusterOptions, ClusteringEngine, GridClusterer, RenderSummary,
};
use safe_route_geography_models::GeoPoint;
use safe_route_incident_models::Incident;
use safe_route_map::{MapSurface, Notice, OverlayId, StatusPanel, Viewport};
use safe_route_render::MarkerIcon;
use safe_route_route_models::CalculateRouteResponse;
use safe_route_routes::{CalculationOutcome, CalculationTicket, InputError, RouteSelection};

pub use location::{FixedLocation, LocationError, LocationProvider};

/// Zoom used when centering on the user.
pub const USER_ZOOM: u8 = 15;

/// Fill color of the user-location pin.
pub const USER_MARKER_COLOR: &str = "#1E88E5";

/// Handle for one dispatched incident refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncidentRefresh {
    sequence: u64,
}

impl IncidentRefresh {
    /// Sequence number of this refresh.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// How an incident refresh was handled.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The new incident set replaced the old one.
    Rendered(RenderSummary),
    /// The feed failed; the previous incidents stay on the map.
    Failed(ClientError),
    /// A newer refresh was dispatched after this one.
    Stale,
}

/// What activating an overlay did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionActivation {
    /// A route line was clicked and is now selected.
    RouteSelected(usize),
    /// An incident or cluster marker was activated.
    Incident(Activation),
}

/// The initial viewport described by `config`.
#[must_use]
pub const fn initial_viewport(config: &ClientConfig) -> Viewport {
    Viewport::new(
        config.map.center,
        config.map.zoom,
        config.map.width_px,
        config.map.height_px,
    )
}

/// Everything one open map owns.
#[derive(Debug)]
pub struct MapSession<S> {
    surface: S,
    routes: RouteSelection,
    incidents: ClusteringEngine,
    resize_delays: Vec<Duration>,
    user_location: Option<GeoPoint>,
    user_marker: Option<OverlayId>,
    last_refresh: u64,
    pending_refresh: Option<u64>,
}

impl<S: MapSurface + StatusPanel> MapSession<S> {
    /// Starts a session on a ready surface.
    pub fn new(surface: S, config: &ClientConfig) -> Self {
        let clusterer = GridClusterer::new(ClusterOptions {
            grid_size_px: config.cluster.grid_size_px,
            max_zoom: config.cluster.max_zoom,
            minimum_cluster_size: config.cluster.minimum_cluster_size,
        });
        Self::with_engine(surface, config, ClusteringEngine::new(Box::new(clusterer)))
    }

    /// Starts a session with a specific incident engine.
    pub fn with_engine(surface: S, config: &ClientConfig, incidents: ClusteringEngine) -> Self {
        Self {
            surface,
            routes: RouteSelection::new(),
            incidents,
            resize_delays: config
                .layout
                .resize_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            user_location: None,
            user_marker: None,
            last_refresh: 0,
            pending_refresh: None,
        }
    }

    /// The surface.
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    /// The route selection flow.
    pub const fn routes(&self) -> &RouteSelection {
        &self.routes
    }

    /// The loaded incidents.
    pub fn incidents(&self) -> &[Incident] {
        self.incidents.incidents()
    }

    /// The incident layer.
    pub const fn incident_layer(&self) -> &ClusteringEngine {
        &self.incidents
    }

    /// The user's last known position.
    pub const fn user_location(&self) -> Option<GeoPoint> {
        self.user_location
    }

    /// Calculates routes between two free-text locations and draws them.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] if either location is blank. Collaborator
    /// failures are reported through the returned outcome.
    #[allow(clippy::future_not_send)]
    pub async fn calculate_route(
        &mut self,
        service: &dyn RoutingService,
        start: &str,
        end: &str,
    ) -> Result<CalculationOutcome, InputError> {
        let ticket = self.begin_route_calculation(start, end)?;
        let result = service.calculate_route(ticket.request()).await;
        Ok(self.finish_route_calculation(&ticket, result))
    }

    /// Validates input and dispatches a calculation.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] if either location is blank.
    pub fn begin_route_calculation(
        &mut self,
        start: &str,
        end: &str,
    ) -> Result<CalculationTicket, InputError> {
        self.routes.begin_calculation(&mut self.surface, start, end)
    }

    /// Applies a collaborator answer for `ticket`.
    pub fn finish_route_calculation(
        &mut self,
        ticket: &CalculationTicket,
        result: Result<CalculateRouteResponse, ClientError>,
    ) -> CalculationOutcome {
        let outcome = self
            .routes
            .complete_calculation(&mut self.surface, ticket, result);
        if matches!(outcome, CalculationOutcome::Rendered { .. }) {
            self.incidents.on_viewport_changed(&mut self.surface);
        }
        outcome
    }

    /// Selects route `index`. Returns `false` if it does not exist.
    pub fn select_route(&mut self, index: usize) -> bool {
        let selected = self.routes.select(&mut self.surface, index);
        if selected {
            self.incidents.on_viewport_changed(&mut self.surface);
        }
        selected
    }

    /// Removes the routes and abandons any outstanding calculation.
    pub fn clear_routes(&mut self) {
        self.routes.clear(&mut self.surface);
    }

    /// Reloads the incident set from `service`.
    #[allow(clippy::future_not_send)]
    pub async fn refresh_incidents(&mut self, service: &dyn IncidentService) -> RefreshOutcome {
        let refresh = self.begin_incident_refresh();
        let result = service.fetch_incidents().await;
        self.finish_incident_refresh(refresh, result)
    }

    /// Dispatches an incident refresh, superseding any outstanding one.
    pub fn begin_incident_refresh(&mut self) -> IncidentRefresh {
        self.last_refresh += 1;
        self.pending_refresh = Some(self.last_refresh);
        IncidentRefresh {
            sequence: self.last_refresh,
        }
    }

    /// Applies a feed answer for `refresh`.
    pub fn finish_incident_refresh(
        &mut self,
        refresh: IncidentRefresh,
        result: Result<Vec<Incident>, ClientError>,
    ) -> RefreshOutcome {
        if self.pending_refresh != Some(refresh.sequence) {
            log::debug!("Dropping stale incident refresh #{}", refresh.sequence);
            return RefreshOutcome::Stale;
        }
        self.pending_refresh = None;

        match result {
            Ok(incidents) => {
                RefreshOutcome::Rendered(self.incidents.set_incidents(&mut self.surface, incidents))
            }
            Err(e) => {
                log::warn!("Failed to load incidents: {e}");
                self.surface
                    .notify(Notice::error(format!("Could not load crime data: {e}")));
                RefreshOutcome::Failed(e)
            }
        }
    }

    /// Centers the map on the user and marks their position.
    ///
    /// On failure the map is left as it is.
    ///
    /// # Errors
    ///
    /// Returns the provider's [`LocationError`].
    #[allow(clippy::future_not_send)]
    pub async fn locate_user(
        &mut self,
        provider: &dyn LocationProvider,
    ) -> Result<GeoPoint, LocationError> {
        match provider.current_position().await {
            Ok(position) => {
                log::info!("User located at {position}");
                self.user_location = Some(position);
                if let Some(previous) = self.user_marker.take() {
                    self.surface.remove_overlay(previous);
                }
                self.user_marker = Some(self.surface.add_marker(
                    position,
                    MarkerIcon::pin("You", USER_MARKER_COLOR),
                    Some("Your location".to_string()),
                ));
                self.surface.set_view(position, USER_ZOOM);
                self.incidents.on_viewport_changed(&mut self.surface);
                Ok(position)
            }
            Err(e) => {
                log::warn!("Geolocation failed, keeping the default view: {e}");
                Err(e)
            }
        }
    }

    /// Asks the surface to re-measure itself after each configured delay,
    /// re-centering on the user when their position is known.
    #[allow(clippy::future_not_send)]
    pub async fn settle_layout(&mut self) {
        let mut waited = Duration::ZERO;
        for delay in self.resize_delays.clone() {
            tokio::time::sleep(delay.saturating_sub(waited)).await;
            waited = waited.max(delay);

            self.surface.resize();
            if let Some(position) = self.user_location {
                let zoom = self.surface.viewport().zoom;
                self.surface.set_view(position, zoom);
            }
        }
        self.incidents.on_viewport_changed(&mut self.surface);
    }

    /// Changes the zoom around the current center.
    pub fn zoom_to(&mut self, zoom: u8) -> Option<RenderSummary> {
        let center = self.surface.viewport().center;
        self.surface.set_view(center, zoom);
        self.incidents.on_viewport_changed(&mut self.surface)
    }

    /// Handles a click on `overlay`.
    pub fn activate(&mut self, overlay: OverlayId) -> Option<SessionActivation> {
        if let Some(index) = self.routes.layers().index_of(overlay) {
            self.select_route(index);
            return Some(SessionActivation::RouteSelected(index));
        }
        self.incidents
            .activate(&mut self.surface, overlay)
            .map(SessionActivation::Incident)
    }

    /// Tears the session down, removing everything it drew.
    pub fn close(mut self) -> S {
        self.routes.clear(&mut self.surface);
        self.incidents.clear(&mut self.surface);
        if let Some(marker) = self.user_marker.take() {
            self.surface.remove_overlay(marker);
        }
        log::debug!("Map session closed");
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use safe_route_incident_models::Severity;
    use safe_route_map::{NoticeLevel, RecordingSurface};
    use safe_route_render::SafetyTier;
    use safe_route_route_models::CalculateRouteRequest;
    use safe_route_routes::RoutePhase;

    use super::*;

    struct CannedRoutes(&'static str);

    #[async_trait::async_trait]
    impl RoutingService for CannedRoutes {
        async fn calculate_route(
            &self,
            _request: &CalculateRouteRequest,
        ) -> Result<CalculateRouteResponse, ClientError> {
            Ok(serde_json::from_str(self.0)?)
        }
    }

    struct Unreachable;

    #[async_trait::async_trait]
    impl RoutingService for Unreachable {
        async fn calculate_route(
            &self,
            _request: &CalculateRouteRequest,
        ) -> Result<CalculateRouteResponse, ClientError> {
            Err(ClientError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            })
        }
    }

    #[async_trait::async_trait]
    impl IncidentService for Unreachable {
        async fn fetch_incidents(&self) -> Result<Vec<Incident>, ClientError> {
            Err(ClientError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            })
        }
    }

    struct CannedIncidents(Vec<Incident>);

    #[async_trait::async_trait]
    impl IncidentService for CannedIncidents {
        async fn fetch_incidents(&self) -> Result<Vec<Incident>, ClientError> {
            Ok(self.0.clone())
        }
    }

    struct Denied;

    #[async_trait::async_trait]
    impl LocationProvider for Denied {
        async fn current_position(&self) -> Result<GeoPoint, LocationError> {
            Err(LocationError::Denied)
        }
    }

    const ROUTES: &str = r#"{
        "success": true,
        "routes": [
            {"points": [[17.44, 78.34], [17.45, 78.38]], "distance": "4.2 km",
             "duration": "11 mins", "crime_count": 2, "safety_score": 85},
            {"points": [[17.44, 78.34], [17.46, 78.37], [17.45, 78.38]], "distance": "4.9 km",
             "duration": "13 mins", "crime_count": 6, "safety_score": 55}
        ],
        "best_index": 0
    }"#;

    fn config() -> ClientConfig {
        let mut config = ClientConfig::embedded().unwrap();
        config.layout.resize_delays_ms = vec![1, 2, 3];
        config
    }

    fn session() -> MapSession<RecordingSurface> {
        let config = config();
        MapSession::new(RecordingSurface::new(initial_viewport(&config)), &config)
    }

    fn incidents() -> Vec<Incident> {
        (0..20)
            .map(|i| Incident {
                id: Some(i),
                position: GeoPoint {
                    lat: 17.4401 + f64::from(u8::try_from(i).unwrap()) * 0.0001,
                    lng: 78.3489,
                },
                incident_type: "Theft".to_string(),
                severity: Severity::new(4),
                description: None,
                date: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn calculates_and_draws_routes() {
        let mut session = session();

        let outcome = session
            .calculate_route(&CannedRoutes(ROUTES), "Hitech City", "Gachibowli")
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            CalculationOutcome::Rendered {
                routes: 2,
                best_index: 0
            }
        ));
        assert_eq!(session.surface().polylines().len(), 2);
        assert_eq!(session.routes().phase(), RoutePhase::Rendered { selected: 0 });
    }

    #[tokio::test]
    async fn blank_input_never_reaches_the_service() {
        let mut session = session();
        let result = session.calculate_route(&Unreachable, "", "Gachibowli").await;
        assert_eq!(result.err(), Some(InputError::MissingStart));
        assert_eq!(session.routes().phase(), RoutePhase::Idle);
    }

    #[tokio::test]
    async fn unreachable_backend_is_reported() {
        let mut session = session();
        let outcome = session.calculate_route(&Unreachable, "a", "b").await.unwrap();

        assert!(matches!(outcome, CalculationOutcome::Failed(_)));
        assert_eq!(session.routes().phase(), RoutePhase::Idle);
        let notices = session.surface().notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn clicking_a_route_selects_it() {
        let mut session = session();
        session
            .calculate_route(&CannedRoutes(ROUTES), "a", "b")
            .await
            .unwrap();
        let (second, _) = session.surface().polylines()[1];

        assert_eq!(
            session.activate(second),
            Some(SessionActivation::RouteSelected(1))
        );
        assert_eq!(session.routes().selected(), Some(1));
    }

    #[tokio::test]
    async fn refresh_replaces_incidents_and_clusters_them() {
        let mut session = session();
        session.zoom_to(10);

        let outcome = session
            .refresh_incidents(&CannedIncidents(incidents()))
            .await;

        let RefreshOutcome::Rendered(summary) = outcome else {
            panic!("expected a render, got {outcome:?}");
        };
        assert_eq!(summary.clusters, 1);
        assert_eq!(session.incidents().len(), 20);
        let markers = session.surface().markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].2.fill, SafetyTier::Danger.color());

        let split = session.zoom_to(19).unwrap();
        assert_eq!(split.clusters, 0);
        assert!(split.singles > 1);
        assert_eq!(session.surface().markers().len(), split.singles);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_incidents() {
        let mut session = session();
        session
            .refresh_incidents(&CannedIncidents(incidents()))
            .await;

        let outcome = session.refresh_incidents(&Unreachable).await;

        assert!(matches!(outcome, RefreshOutcome::Failed(_)));
        assert_eq!(session.incidents().len(), 20);
        assert_eq!(session.surface().notices().len(), 1);
    }

    #[test]
    fn stale_refresh_is_dropped() {
        let mut session = session();
        let older = session.begin_incident_refresh();
        let newer = session.begin_incident_refresh();

        let outcome = session.finish_incident_refresh(older, Ok(incidents()));
        assert!(matches!(outcome, RefreshOutcome::Stale));
        assert!(session.incidents().is_empty());

        let outcome = session.finish_incident_refresh(newer, Ok(Vec::new()));
        assert!(matches!(outcome, RefreshOutcome::Rendered(_)));
    }

    #[test]
    fn stale_route_answer_is_dropped() {
        let mut session = session();
        let older = session.begin_route_calculation("a", "b").unwrap();
        let newer = session.begin_route_calculation("a", "c").unwrap();

        let stale =
            session.finish_route_calculation(&older, Ok(serde_json::from_str(ROUTES).unwrap()));
        assert!(matches!(stale, CalculationOutcome::Stale));
        assert!(session.surface().polylines().is_empty());

        let fresh =
            session.finish_route_calculation(&newer, Ok(serde_json::from_str(ROUTES).unwrap()));
        assert!(matches!(fresh, CalculationOutcome::Rendered { .. }));
    }

    #[tokio::test]
    async fn locating_the_user_centers_and_marks() {
        let mut session = session();
        let here = GeoPoint {
            lat: 17.45,
            lng: 78.37,
        };

        session.locate_user(&FixedLocation(here)).await.unwrap();
        session.locate_user(&FixedLocation(here)).await.unwrap();

        let viewport = session.surface().viewport();
        assert_eq!(viewport.center, here);
        assert_eq!(viewport.zoom, USER_ZOOM);
        assert_eq!(session.surface().markers().len(), 1);
        assert_eq!(session.user_location(), Some(here));
    }

    #[tokio::test]
    async fn denied_location_leaves_the_map_alone() {
        let mut session = session();
        let before = session.surface().viewport();

        let result = session.locate_user(&Denied).await;

        assert_eq!(result, Err(LocationError::Denied));
        assert_eq!(session.surface().viewport(), before);
        assert!(session.surface().markers().is_empty());
    }

    #[tokio::test]
    async fn settle_layout_resizes_once_per_delay() {
        let mut session = session();
        let here = GeoPoint {
            lat: 17.45,
            lng: 78.37,
        };
        session.locate_user(&FixedLocation(here)).await.unwrap();

        session.settle_layout().await;

        assert_eq!(session.surface().resize_count(), 3);
        assert_eq!(session.surface().viewport().center, here);
    }

    #[tokio::test]
    async fn close_removes_everything() {
        let mut session = session();
        session
            .calculate_route(&CannedRoutes(ROUTES), "a", "b")
            .await
            .unwrap();
        session
            .refresh_incidents(&CannedIncidents(incidents()))
            .await;
        session
            .locate_user(&FixedLocation(GeoPoint {
                lat: 17.45,
                lng: 78.37,
            }))
            .await
            .unwrap();

        let surface = session.close();

        assert_eq!(surface.overlay_count(), 0);
        assert!(surface.route_list().is_empty());
    }
}
