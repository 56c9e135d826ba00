#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scored route types and the calculate-route wire contract.
//!
//! The routing backend answers a calculate-route request with a loosely
//! shaped JSON envelope ([`CalculateRouteResponse`]). Nothing downstream
//! touches that envelope directly: it is validated once into a
//! [`RouteSet`], whose invariants (non-empty, every route has at least two
//! valid points, scores within `0..=100`, `best_index` in range) the map
//! layers rely on.

use safe_route_geography_models::{GeoPoint, GeoPointError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown when the backend reports failure without an error text.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Route failed";

/// Body of a calculate-route request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculateRouteRequest {
    /// Free-text origin (address or `"lat, lng"`).
    pub start: String,
    /// Free-text destination.
    pub end: String,
}

/// Calculate-route response envelope as sent by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculateRouteResponse {
    /// Whether the backend produced routes. Absent means malformed.
    pub success: Option<bool>,
    /// Backend error text when `success` is false.
    pub error: Option<String>,
    /// Candidate routes in backend order.
    #[serde(default)]
    pub routes: Vec<RoutePayload>,
    /// Index of the backend's recommended route.
    pub best_index: Option<i64>,
    /// Geocoded origin.
    pub start: Option<GeoPoint>,
    /// Geocoded destination.
    pub end: Option<GeoPoint>,
}

/// One candidate route as sent by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePayload {
    /// Polyline as `[lat, lng]` pairs in traversal order.
    pub points: Vec<[f64; 2]>,
    /// Safety score; validated into `0..=100`.
    pub safety_score: i64,
    /// Display distance (e.g. `"4.2 km"`).
    #[serde(default)]
    pub distance: String,
    /// Display duration (e.g. `"12 mins"`).
    #[serde(default)]
    pub duration: String,
    /// Incidents the backend counted near this route.
    #[serde(default)]
    pub crime_count: u32,
}

/// A validated candidate route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    /// Polyline in traversal order, at least two points.
    pub points: Vec<GeoPoint>,
    /// Safety score in `0..=100`, higher is safer.
    pub safety_score: u8,
    /// Display distance, not interpreted.
    pub distance: String,
    /// Display duration, not interpreted.
    pub duration: String,
    /// Incidents considered near this route.
    pub crime_count: u32,
}

/// Reasons a calculate-route response cannot become a [`RouteSet`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteSetError {
    /// The backend reported failure. Displays the backend text verbatim.
    #[error("{message}")]
    Unsuccessful {
        /// Backend error text, or [`DEFAULT_FAILURE_MESSAGE`].
        message: String,
    },
    /// The `success` flag was missing.
    #[error("malformed route response: missing success flag")]
    MissingSuccess,
    /// No routes were returned.
    #[error("malformed route response: no routes")]
    Empty,
    /// `best_index` does not point at a route.
    #[error("malformed route response: best_index {index} out of range for {len} routes")]
    BestIndexOutOfRange {
        /// The index the backend sent.
        index: i64,
        /// Number of routes in the response.
        len: usize,
    },
    /// A route has fewer than two points.
    #[error("malformed route response: route {route} has {count} point(s)")]
    TooFewPoints {
        /// Zero-based route position.
        route: usize,
        /// Number of points received.
        count: usize,
    },
    /// A route point is outside the WGS84 range.
    #[error("malformed route response: route {route}: {source}")]
    InvalidPoint {
        /// Zero-based route position.
        route: usize,
        /// The coordinate error.
        source: GeoPointError,
    },
    /// A safety score is outside `0..=100`.
    #[error("malformed route response: route {route} has safety score {score}")]
    ScoreOutOfRange {
        /// Zero-based route position.
        route: usize,
        /// The score received.
        score: i64,
    },
}

impl RoutePayload {
    fn into_route(self, position: usize) -> Result<Route, RouteSetError> {
        if self.points.len() < 2 {
            return Err(RouteSetError::TooFewPoints {
                route: position,
                count: self.points.len(),
            });
        }
        let points = self
            .points
            .into_iter()
            .map(|[lat, lng]| GeoPoint::new(lat, lng))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| RouteSetError::InvalidPoint {
                route: position,
                source,
            })?;
        let safety_score = u8::try_from(self.safety_score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or(RouteSetError::ScoreOutOfRange {
                route: position,
                score: self.safety_score,
            })?;

        Ok(Route {
            points,
            safety_score,
            distance: self.distance,
            duration: self.duration,
            crime_count: self.crime_count,
        })
    }
}

/// The ordered candidate routes from one calculation plus the recommended
/// index.
///
/// Always non-empty, and `best_index < routes().len()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSet {
    routes: Vec<Route>,
    best_index: usize,
    start: Option<GeoPoint>,
    end: Option<GeoPoint>,
}

impl RouteSet {
    /// Builds a route set from already-validated routes.
    ///
    /// # Errors
    ///
    /// Returns [`RouteSetError::Empty`] for no routes, or
    /// [`RouteSetError::BestIndexOutOfRange`] if `best_index` is past the end.
    pub fn new(routes: Vec<Route>, best_index: usize) -> Result<Self, RouteSetError> {
        if routes.is_empty() {
            return Err(RouteSetError::Empty);
        }
        if best_index >= routes.len() {
            return Err(RouteSetError::BestIndexOutOfRange {
                index: i64::try_from(best_index).unwrap_or(i64::MAX),
                len: routes.len(),
            });
        }
        Ok(Self {
            routes,
            best_index,
            start: None,
            end: None,
        })
    }

    /// Attaches the geocoded endpoints.
    #[must_use]
    pub const fn with_endpoints(mut self, start: Option<GeoPoint>, end: Option<GeoPoint>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Routes in backend order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Number of routes (never zero).
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Index of the recommended route.
    #[must_use]
    pub const fn best_index(&self) -> usize {
        self.best_index
    }

    /// The recommended route.
    #[must_use]
    pub fn best(&self) -> &Route {
        &self.routes[self.best_index]
    }

    /// Geocoded origin, if the backend sent one.
    #[must_use]
    pub const fn start(&self) -> Option<GeoPoint> {
        self.start
    }

    /// Geocoded destination, if the backend sent one.
    #[must_use]
    pub const fn end(&self) -> Option<GeoPoint> {
        self.end
    }
}

impl TryFrom<CalculateRouteResponse> for RouteSet {
    type Error = RouteSetError;

    fn try_from(response: CalculateRouteResponse) -> Result<Self, Self::Error> {
        match response.success {
            None => return Err(RouteSetError::MissingSuccess),
            Some(false) => {
                return Err(RouteSetError::Unsuccessful {
                    message: response
                        .error
                        .filter(|e| !e.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
                });
            }
            Some(true) => {}
        }

        if response.routes.is_empty() {
            return Err(RouteSetError::Empty);
        }

        let len = response.routes.len();
        let raw_best = response.best_index.unwrap_or(0);
        let best_index = usize::try_from(raw_best)
            .ok()
            .filter(|i| *i < len)
            .ok_or(RouteSetError::BestIndexOutOfRange {
                index: raw_best,
                len,
            })?;

        let routes = response
            .routes
            .into_iter()
            .enumerate()
            .map(|(position, payload)| payload.into_route(position))
            .collect::<Result<Vec<_>, _>>()?;

        let start = response.start.filter(GeoPoint::is_valid);
        let end = response.end.filter(GeoPoint::is_valid);

        Ok(Self::new(routes, best_index)?.with_endpoints(start, end))
    }
}
