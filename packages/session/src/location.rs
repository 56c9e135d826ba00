//! One-shot user location.

use safe_route_geography_models::GeoPoint;
use thiserror::Error;

/// Why the user's position is not available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user refused to share their location.
    #[error("location permission denied")]
    Denied,
    /// No position could be determined.
    #[error("location unavailable: {reason}")]
    Unavailable {
        /// Provider-specific detail.
        reason: String,
    },
    /// The provider did not answer in time.
    #[error("location request timed out")]
    Timeout,
}

/// Source of the user's current position.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    /// Resolves the current position once.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] if the position cannot be determined.
    async fn current_position(&self) -> Result<GeoPoint, LocationError>;
}

/// A provider that always reports the same position, e.g. one given on the
/// command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLocation(pub GeoPoint);

#[async_trait::async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<GeoPoint, LocationError> {
        self.0
            .validate()
            .map(|()| self.0)
            .map_err(|e| LocationError::Unavailable {
                reason: e.to_string(),
            })
    }
}
