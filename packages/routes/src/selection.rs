//! The route selection state machine.
//!
//! ```text
//! Idle ──begin──▶ Calculating ──complete(ok)──▶ Rendered ◀──▶ Selecting
//!   ▲                 │                            │
//!   └──complete(err)──┘◀────────── clear ──────────┘
//! ```
//!
//! Calculations are tagged with a monotonic sequence number. Only the
//! latest dispatched calculation may complete; anything older is reported
//! as [`CalculationOutcome::Stale`] and dropped without touching the map.

use safe_route_client::ClientError;
use safe_route_map::{MapSurface, Notice, StatusPanel};
use safe_route_route_models::{CalculateRouteRequest, CalculateRouteResponse, RouteSet};
use strum_macros::AsRefStr;

use crate::{CalculationError, InputError, RouteLayerManager};

/// Where the selection flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum RoutePhase {
    /// No route set loaded.
    Idle,
    /// A calculation is outstanding.
    Calculating {
        /// Sequence number of the outstanding calculation.
        sequence: u64,
    },
    /// A route set is drawn.
    Rendered {
        /// Index of the selected route.
        selected: usize,
    },
    /// The user is switching routes.
    Selecting {
        /// Route being selected.
        target: usize,
    },
}

/// Handle for one dispatched calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationTicket {
    sequence: u64,
    request: CalculateRouteRequest,
}

impl CalculationTicket {
    /// Sequence number of this calculation.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The validated request to send.
    #[must_use]
    pub const fn request(&self) -> &CalculateRouteRequest {
        &self.request
    }
}

/// How a completed calculation was handled.
#[derive(Debug)]
pub enum CalculationOutcome {
    /// The route set was drawn.
    Rendered {
        /// Number of routes drawn.
        routes: usize,
        /// Index of the recommended (and selected) route.
        best_index: usize,
    },
    /// The calculation failed and the user was told why.
    Failed(CalculationError),
    /// A newer calculation was dispatched (or the routes were cleared)
    /// after this one; its result was dropped.
    Stale,
}

/// Drives route calculation, selection and clearing over a
/// [`RouteLayerManager`].
#[derive(Debug, Clone)]
pub struct RouteSelection {
    layers: RouteLayerManager,
    phase: RoutePhase,
    last_sequence: u64,
    pending: Option<u64>,
}

impl Default for RouteSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteSelection {
    /// Starts idle with nothing drawn.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            layers: RouteLayerManager::new(),
            phase: RoutePhase::Idle,
            last_sequence: 0,
            pending: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> RoutePhase {
        self.phase
    }

    /// The route overlays.
    #[must_use]
    pub const fn layers(&self) -> &RouteLayerManager {
        &self.layers
    }

    /// Index of the selected route.
    #[must_use]
    pub const fn selected(&self) -> Option<usize> {
        self.layers.selected()
    }

    fn transition(&mut self, next: RoutePhase) {
        if self.phase != next {
            log::debug!("Route phase {} -> {}", self.phase.as_ref(), next.as_ref());
        }
        self.phase = next;
    }

    fn resting_phase(&self) -> RoutePhase {
        self.layers
            .selected()
            .map_or(RoutePhase::Idle, |selected| RoutePhase::Rendered { selected })
    }

    /// Validates the origin and destination text and dispatches a new
    /// calculation, superseding any outstanding one.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] (after notifying the user) if either field is
    /// blank; nothing else changes in that case.
    pub fn begin_calculation<P>(
        &mut self,
        panel: &mut P,
        start: &str,
        end: &str,
    ) -> Result<CalculationTicket, InputError>
    where
        P: StatusPanel + ?Sized,
    {
        let start = start.trim();
        let end = end.trim();
        let missing = if start.is_empty() {
            Some(InputError::MissingStart)
        } else if end.is_empty() {
            Some(InputError::MissingEnd)
        } else {
            None
        };
        if let Some(e) = missing {
            log::debug!("Rejected route request: {e}");
            panel.notify(Notice::error(e.to_string()));
            return Err(e);
        }

        if let Some(previous) = self.pending {
            log::debug!("Calculation #{previous} superseded");
        }
        self.last_sequence += 1;
        let sequence = self.last_sequence;
        self.pending = Some(sequence);

        panel.set_busy(true);
        self.transition(RoutePhase::Calculating { sequence });

        Ok(CalculationTicket {
            sequence,
            request: CalculateRouteRequest {
                start: start.to_string(),
                end: end.to_string(),
            },
        })
    }

    /// Applies the collaborator's answer to `ticket`.
    ///
    /// A valid route set replaces whatever was drawn and its best route is
    /// selected. A failure is shown to the user and the phase returns to
    /// what it was before the calculation (routes drawn earlier stay
    /// drawn). Answers to superseded or abandoned tickets are dropped.
    pub fn complete_calculation<S>(
        &mut self,
        surface: &mut S,
        ticket: &CalculationTicket,
        result: Result<CalculateRouteResponse, ClientError>,
    ) -> CalculationOutcome
    where
        S: MapSurface + StatusPanel + ?Sized,
    {
        if self.pending != Some(ticket.sequence) {
            log::debug!(
                "Dropping stale response for calculation #{} (latest #{})",
                ticket.sequence,
                self.last_sequence
            );
            return CalculationOutcome::Stale;
        }
        self.pending = None;
        surface.set_busy(false);

        let set = result
            .map_err(CalculationError::from)
            .and_then(|response| RouteSet::try_from(response).map_err(CalculationError::from));

        match set {
            Ok(set) => {
                self.layers.draw(surface, &set);
                let best_index = set.best_index();
                self.transition(RoutePhase::Rendered {
                    selected: best_index,
                });
                log::info!(
                    "Calculation #{} produced {} routes",
                    ticket.sequence,
                    set.len()
                );
                CalculationOutcome::Rendered {
                    routes: set.len(),
                    best_index,
                }
            }
            Err(e) => {
                log::warn!("Calculation #{} failed: {e}", ticket.sequence);
                surface.notify(Notice::error(e.to_string()));
                let resting = self.resting_phase();
                self.transition(resting);
                CalculationOutcome::Failed(e)
            }
        }
    }

    /// Switches the selected route. Out-of-range indices and calls with
    /// nothing drawn are ignored and return `false`.
    pub fn select<S>(&mut self, surface: &mut S, index: usize) -> bool
    where
        S: MapSurface + StatusPanel + ?Sized,
    {
        if index >= self.layers.overlay_count() {
            log::debug!("Ignoring selection of route {index}");
            return false;
        }

        let settled = matches!(self.phase, RoutePhase::Rendered { .. });
        if settled {
            self.transition(RoutePhase::Selecting { target: index });
        }
        let selected = self.layers.select(surface, index);
        if settled {
            let resting = self.resting_phase();
            self.transition(resting);
        }
        selected
    }

    /// Removes every route overlay, abandons any outstanding calculation
    /// and returns to [`RoutePhase::Idle`]. Calling it again is a no-op.
    pub fn clear<S>(&mut self, surface: &mut S)
    where
        S: MapSurface + StatusPanel + ?Sized,
    {
        if let Some(sequence) = self.pending.take() {
            log::debug!("Abandoning calculation #{sequence}");
            surface.set_busy(false);
        }
        self.layers.clear(surface);
        self.transition(RoutePhase::Idle);
    }
}

#[cfg(test)]
mod tests {
    use safe_route_geography_models::GeoPoint;
    use safe_route_map::{NoticeLevel, RecordingSurface, Viewport};
    use safe_route_render::{RouteLineStyle, SafetyTier};
    use safe_route_route_models::RouteSetError;

    use super::*;

    fn surface() -> RecordingSurface {
        RecordingSurface::new(Viewport::new(
            GeoPoint {
                lat: 17.4401,
                lng: 78.3489,
            },
            13,
            1024,
            768,
        ))
    }

    fn response(json: &str) -> Result<CalculateRouteResponse, ClientError> {
        Ok(serde_json::from_str(json).unwrap())
    }

    fn three_routes() -> Result<CalculateRouteResponse, ClientError> {
        response(
            r#"{
                "success": true,
                "start": {"lat": 17.44, "lng": 78.34},
                "end": {"lat": 17.45, "lng": 78.38},
                "routes": [
                    {"points": [[17.44, 78.34], [17.45, 78.38]], "distance": "4.2 km",
                     "duration": "11 mins", "crime_count": 2, "safety_score": 85},
                    {"points": [[17.44, 78.34], [17.46, 78.37], [17.45, 78.38]], "distance": "4.9 km",
                     "duration": "13 mins", "crime_count": 6, "safety_score": 55},
                    {"points": [[17.44, 78.34], [17.43, 78.36], [17.45, 78.38]], "distance": "5.1 km",
                     "duration": "14 mins", "crime_count": 14, "safety_score": 20}
                ],
                "best_index": 0
            }"#,
        )
    }

    fn errors(surface: &RecordingSurface) -> Vec<&str> {
        surface
            .notices()
            .iter()
            .filter(|n| n.level == NoticeLevel::Error)
            .map(|n| n.text.as_str())
            .collect()
    }

    #[test]
    fn full_flow_renders_and_reselects() {
        let mut surface = surface();
        let mut selection = RouteSelection::new();

        let ticket = selection
            .begin_calculation(&mut surface, " Hitech City ", "Gachibowli")
            .unwrap();
        assert_eq!(ticket.request().start, "Hitech City");
        assert!(surface.is_busy());
        assert_eq!(
            selection.phase(),
            RoutePhase::Calculating {
                sequence: ticket.sequence()
            }
        );

        let outcome = selection.complete_calculation(&mut surface, &ticket, three_routes());
        assert!(matches!(
            outcome,
            CalculationOutcome::Rendered {
                routes: 3,
                best_index: 0
            }
        ));
        assert!(!surface.is_busy());
        assert_eq!(selection.phase(), RoutePhase::Rendered { selected: 0 });

        let colors: Vec<&str> = surface.polylines().iter().map(|(_, s)| s.color).collect();
        assert_eq!(
            colors,
            vec![
                SafetyTier::Safe.color(),
                SafetyTier::Caution.color(),
                SafetyTier::Danger.color()
            ]
        );

        assert!(selection.select(&mut surface, 1));
        assert_eq!(selection.phase(), RoutePhase::Rendered { selected: 1 });
        assert_eq!(
            surface.polylines()[1].1,
            RouteLineStyle::selected(SafetyTier::Caution)
        );
    }

    #[test]
    fn blank_input_is_rejected_without_state_change() {
        let mut surface = surface();
        let mut selection = RouteSelection::new();

        assert_eq!(
            selection.begin_calculation(&mut surface, "  ", "Gachibowli"),
            Err(InputError::MissingStart)
        );
        assert_eq!(
            selection.begin_calculation(&mut surface, "Hitech City", ""),
            Err(InputError::MissingEnd)
        );
        assert_eq!(selection.phase(), RoutePhase::Idle);
        assert!(!surface.is_busy());
        assert_eq!(errors(&surface).len(), 2);
    }

    #[test]
    fn unsuccessful_response_is_surfaced_verbatim() {
        let mut surface = surface();
        let mut selection = RouteSelection::new();
        let ticket = selection.begin_calculation(&mut surface, "a", "b").unwrap();

        let outcome = selection.complete_calculation(
            &mut surface,
            &ticket,
            response(r#"{"success": false, "error": "no route"}"#),
        );

        assert!(matches!(
            outcome,
            CalculationOutcome::Failed(CalculationError::Route(RouteSetError::Unsuccessful { .. }))
        ));
        assert_eq!(selection.phase(), RoutePhase::Idle);
        assert_eq!(surface.overlay_count(), 0);
        assert_eq!(errors(&surface), vec!["no route"]);
        assert!(!surface.is_busy());
    }

    #[test]
    fn malformed_responses_do_not_draw() {
        let cases = [
            r#"{"routes": [{"points": [[0, 0], [1, 1]], "safety_score": 50}]}"#,
            r#"{"success": true, "routes": []}"#,
            r#"{"success": true, "best_index": 4,
                "routes": [{"points": [[0, 0], [1, 1]], "safety_score": 50}]}"#,
        ];
        for json in cases {
            let mut surface = surface();
            let mut selection = RouteSelection::new();
            let ticket = selection.begin_calculation(&mut surface, "a", "b").unwrap();

            let outcome = selection.complete_calculation(&mut surface, &ticket, response(json));

            assert!(matches!(outcome, CalculationOutcome::Failed(_)), "{json}");
            assert_eq!(selection.phase(), RoutePhase::Idle);
            assert_eq!(surface.overlay_count(), 0);
            assert_eq!(errors(&surface).len(), 1);
        }
    }

    #[test]
    fn transport_failure_keeps_previous_routes() {
        let mut surface = surface();
        let mut selection = RouteSelection::new();
        let first = selection.begin_calculation(&mut surface, "a", "b").unwrap();
        selection.complete_calculation(&mut surface, &first, three_routes());

        let second = selection.begin_calculation(&mut surface, "a", "c").unwrap();
        let outcome = selection.complete_calculation(
            &mut surface,
            &second,
            Err(ClientError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
        );

        assert!(matches!(
            outcome,
            CalculationOutcome::Failed(CalculationError::Client(_))
        ));
        assert_eq!(selection.phase(), RoutePhase::Rendered { selected: 0 });
        assert_eq!(surface.polylines().len(), 3);
    }

    #[test]
    fn stale_responses_are_dropped() {
        let mut surface = surface();
        let mut selection = RouteSelection::new();
        let older = selection.begin_calculation(&mut surface, "a", "b").unwrap();
        let newer = selection.begin_calculation(&mut surface, "a", "c").unwrap();
        assert!(newer.sequence() > older.sequence());

        let outcome = selection.complete_calculation(&mut surface, &older, three_routes());
        assert!(matches!(outcome, CalculationOutcome::Stale));
        assert_eq!(surface.overlay_count(), 0);
        assert!(surface.is_busy());

        let outcome = selection.complete_calculation(&mut surface, &newer, three_routes());
        assert!(matches!(outcome, CalculationOutcome::Rendered { .. }));

        let replay = selection.complete_calculation(&mut surface, &newer, three_routes());
        assert!(matches!(replay, CalculationOutcome::Stale));
    }

    #[test]
    fn clear_abandons_outstanding_calculation() {
        let mut surface = surface();
        let mut selection = RouteSelection::new();
        let ticket = selection.begin_calculation(&mut surface, "a", "b").unwrap();

        selection.clear(&mut surface);
        assert_eq!(selection.phase(), RoutePhase::Idle);
        assert!(!surface.is_busy());

        let outcome = selection.complete_calculation(&mut surface, &ticket, three_routes());
        assert!(matches!(outcome, CalculationOutcome::Stale));
        assert_eq!(surface.overlay_count(), 0);
    }

    #[test]
    fn clear_twice_matches_clear_once() {
        let mut surface = surface();
        let mut selection = RouteSelection::new();
        let ticket = selection.begin_calculation(&mut surface, "a", "b").unwrap();
        selection.complete_calculation(&mut surface, &ticket, three_routes());

        selection.clear(&mut surface);
        let once = (selection.phase(), selection.selected(), surface.overlay_count());
        selection.clear(&mut surface);
        let twice = (selection.phase(), selection.selected(), surface.overlay_count());

        assert_eq!(once, (RoutePhase::Idle, None, 0));
        assert_eq!(once, twice);
    }

    #[test]
    fn select_out_of_range_changes_nothing() {
        let mut surface = surface();
        let mut selection = RouteSelection::new();
        assert!(!selection.select(&mut surface, 0));
        assert_eq!(selection.phase(), RoutePhase::Idle);

        let ticket = selection.begin_calculation(&mut surface, "a", "b").unwrap();
        selection.complete_calculation(&mut surface, &ticket, three_routes());

        assert!(!selection.select(&mut surface, 7));
        assert_eq!(selection.phase(), RoutePhase::Rendered { selected: 0 });
        assert_eq!(surface.polylines().len(), 3);
    }
}
