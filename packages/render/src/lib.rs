#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Visual styling for incidents, clusters and routes.
//!
//! Everything here is a pure mapping from a value (severity, cluster
//! count, safety score) to a description of how it should look. Nothing
//! in this crate touches a map surface; the clustering engine and the
//! route layer manager materialize these descriptions.
//!
//! All three kinds of input share one three-tier palette ([`SafetyTier`]).
//! The tiers are a fixed bucketing, not a continuous gradient: a severity
//! of 4 and a severity of 5 look the same.

pub mod icon;
pub mod popup;
pub mod route_style;

use safe_route_incident_models::{Severity, SeverityLevel};
use serde::Serialize;

pub use icon::{ClusterStyle, IconShape, MarkerIcon, style_for_cluster};
pub use route_style::{RouteLineStyle, tier_for_score};

/// One of the three shared color buckets, ordered from least to most
/// severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyTier {
    /// Green.
    Safe,
    /// Amber.
    Caution,
    /// Red.
    Danger,
}

impl SafetyTier {
    /// Hex color for this tier.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Safe => "#28a745",
            Self::Caution => "#FFC107",
            Self::Danger => "#FF3547",
        }
    }

    /// Human-readable safety label, as shown next to a route score.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Safe => "Very Safe",
            Self::Caution => "Use Caution",
            Self::Danger => "High Risk",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Safe, Self::Caution, Self::Danger]
    }
}

/// Tier for a coerced severity level: 1-2 safe, 3 caution, 4-5 danger.
#[must_use]
pub const fn tier_for_level(level: SeverityLevel) -> SafetyTier {
    match level {
        SeverityLevel::Minimal | SeverityLevel::Low => SafetyTier::Safe,
        SeverityLevel::Moderate => SafetyTier::Caution,
        SeverityLevel::High | SeverityLevel::Critical => SafetyTier::Danger,
    }
}

/// Tier for a received severity.
///
/// Never fails: out-of-range numbers fall into the nearest bucket and an
/// unreadable severity lands in the middle one.
#[must_use]
pub const fn style_for_severity(severity: Severity) -> SafetyTier {
    tier_for_level(severity.level())
}

/// The most common tier among `severities`; ties go to the more severe
/// tier. Returns `None` for an empty input.
pub fn dominant_tier<I>(severities: I) -> Option<SafetyTier>
where
    I: IntoIterator<Item = Severity>,
{
    let mut counts = [0usize; 3];
    for severity in severities {
        counts[style_for_severity(severity) as usize] += 1;
    }
    SafetyTier::all()
        .iter()
        .copied()
        .filter(|tier| counts[*tier as usize] > 0)
        .max_by_key(|tier| (counts[*tier as usize], *tier))
}
