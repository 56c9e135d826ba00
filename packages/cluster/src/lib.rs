#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident clustering.
//!
//! Groups nearby incidents so that no two drawn icons overlap at the
//! current zoom. Distances are measured in screen pixels, so the same
//! incidents merge when zoomed out and split apart when zoomed in.
//!
//! The partitioning itself sits behind the [`Clusterer`] trait
//! ([`GridClusterer`] is the built-in implementation). The
//! [`ClusteringEngine`] owns the incident markers on the map: it clears and
//! redraws them on every recompute, and falls back to drawing each incident
//! individually whenever no clusterer is available or it fails.

pub mod engine;
pub mod grid;

use safe_route_geography_models::{GeoBounds, GeoPoint};
use safe_route_incident_models::{Incident, Severity};
use safe_route_map::Viewport;
use thiserror::Error;

pub use engine::{Activation, ClusteringEngine, RenderSummary};
pub use grid::{ClusterOptions, GridClusterer};

/// Errors from a [`Clusterer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    /// The clustering primitive cannot run on this surface.
    #[error("clustering unavailable: {reason}")]
    Unavailable {
        /// Why it is unavailable.
        reason: String,
    },
}

/// A group of nearby incidents drawn as one icon.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Centroid of the members.
    pub position: GeoPoint,
    /// Where the icon is drawn: the position of the member that seeded the
    /// cluster. Seeds are spaced so icons drawn here never overlap.
    pub anchor: GeoPoint,
    /// Indices into the incident slice that was clustered.
    pub members: Vec<usize>,
    /// Bounding box of the members.
    pub bounds: GeoBounds,
}

impl Cluster {
    /// Number of members (at least the minimum cluster size).
    #[must_use]
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Severities of the members, in member order.
    pub fn member_severities<'a>(
        &'a self,
        incidents: &'a [Incident],
    ) -> impl Iterator<Item = Severity> + 'a {
        self.members.iter().map(|i| incidents[*i].severity)
    }
}

/// One drawable item of a partition.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterItem {
    /// Several incidents summarized by one icon.
    Cluster(Cluster),
    /// An isolated incident, by index.
    Single(usize),
}

/// Partitions incidents for a viewport.
pub trait Clusterer: Send + Sync {
    /// Groups `incidents` into clusters and singletons for `viewport`.
    ///
    /// Must be deterministic for the same inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] if clustering cannot be performed.
    fn cluster(
        &self,
        incidents: &[Incident],
        viewport: &Viewport,
    ) -> Result<Vec<ClusterItem>, ClusterError>;
}

/// The unclustered partition: every incident on its own.
#[must_use]
pub fn singletons(incidents: &[Incident]) -> Vec<ClusterItem> {
    (0..incidents.len()).map(ClusterItem::Single).collect()
}
