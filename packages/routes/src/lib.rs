#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Route rendering and selection.
//!
//! [`RouteLayerManager`] owns the route polylines on the map and keeps
//! exactly one of them emphasized. [`RouteSelection`] sits on top of it and
//! drives a calculation from request to rendered routes, dropping stale or
//! failed answers without partial draws.

pub mod layers;
pub mod selection;

use safe_route_client::ClientError;
use safe_route_route_models::RouteSetError;
use thiserror::Error;

pub use layers::RouteLayerManager;
pub use selection::{CalculationOutcome, CalculationTicket, RoutePhase, RouteSelection};

/// A route request rejected before anything was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InputError {
    /// The origin field is blank.
    #[error("Please enter a starting location")]
    MissingStart,
    /// The destination field is blank.
    #[error("Please enter a destination")]
    MissingEnd,
}

/// Why a calculation produced no routes.
#[derive(Debug, Error)]
pub enum CalculationError {
    /// The backend could not be reached or answered garbage.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The backend answered but the routes are unusable.
    #[error(transparent)]
    Route(#[from] RouteSetError),
}
