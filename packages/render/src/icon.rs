//! Marker and cluster icon descriptions.
//!
//! A [`MarkerIcon`] is a renderable description (shape primitive, colors,
//! diameter, label). Surfaces decide how to draw it.

use serde::Serialize;

use crate::SafetyTier;

/// Diameter in pixels of an individual incident marker.
pub const INCIDENT_MARKER_DIAMETER: u32 = 12;

/// Smallest cluster icon diameter in pixels.
pub const MIN_CLUSTER_DIAMETER: u32 = 26;

/// Largest cluster icon diameter in pixels.
pub const MAX_CLUSTER_DIAMETER: u32 = 48;

/// Pixels of diameter added per natural-log unit of `count + 1`.
const CLUSTER_GROWTH: f64 = 6.0;

/// Cluster icons stack above individual markers.
const CLUSTER_Z_INDEX: i32 = 1000;

/// Shape primitive of a marker icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IconShape {
    /// Filled circle, optionally with centered label text.
    Circle,
    /// Map pin, used for route endpoints and the user's location.
    Pin,
}

/// How a marker should look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerIcon {
    /// Shape primitive.
    pub shape: IconShape,
    /// Fill color (hex).
    pub fill: &'static str,
    /// Outline color (hex), if any.
    pub stroke: Option<&'static str>,
    /// Diameter in pixels.
    pub diameter: u32,
    /// Text drawn inside the icon, or the pin's tooltip.
    pub label: Option<String>,
    /// Stacking order relative to other markers.
    pub z_index: i32,
}

impl MarkerIcon {
    /// Small filled circle for a single incident.
    #[must_use]
    pub const fn incident(tier: SafetyTier) -> Self {
        Self {
            shape: IconShape::Circle,
            fill: tier.color(),
            stroke: None,
            diameter: INCIDENT_MARKER_DIAMETER,
            label: None,
            z_index: 0,
        }
    }

    /// A labelled pin (route start/end, user location).
    #[must_use]
    pub fn pin(label: &str, fill: &'static str) -> Self {
        Self {
            shape: IconShape::Pin,
            fill,
            stroke: Some("#ffffff"),
            diameter: 24,
            label: Some(label.to_string()),
            z_index: 500,
        }
    }
}

/// Visual summary of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterStyle {
    /// Fill tier, chosen by member count.
    pub color: SafetyTier,
    /// Outline tier, the dominant severity among members.
    pub ring: SafetyTier,
    /// Diameter in pixels.
    pub size: u32,
    /// Label text (the member count).
    pub label: String,
}

impl ClusterStyle {
    /// The icon that draws this cluster.
    #[must_use]
    pub fn icon(&self) -> MarkerIcon {
        MarkerIcon {
            shape: IconShape::Circle,
            fill: self.color.color(),
            stroke: Some(self.ring.color()),
            diameter: self.size,
            label: Some(self.label.clone()),
            z_index: CLUSTER_Z_INDEX,
        }
    }
}

/// Tier for a cluster of `count` incidents: more than 15 is danger, 6 to
/// 15 is caution, anything smaller is safe.
#[must_use]
pub const fn tier_for_count(count: usize) -> SafetyTier {
    if count > 15 {
        SafetyTier::Danger
    } else if count > 5 {
        SafetyTier::Caution
    } else {
        SafetyTier::Safe
    }
}

/// Cluster icon diameter: grows with `ln(count + 1)`, clamped to
/// [`MIN_CLUSTER_DIAMETER`]..=[`MAX_CLUSTER_DIAMETER`].
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn cluster_diameter(count: usize) -> u32 {
    let growth = ((count as f64) + 1.0).ln() * CLUSTER_GROWTH;
    let size = f64::from(MIN_CLUSTER_DIAMETER) + growth.floor();
    (size as u32).clamp(MIN_CLUSTER_DIAMETER, MAX_CLUSTER_DIAMETER)
}

/// Style for a cluster of `count` members whose dominant severity tier is
/// `dominant`.
#[must_use]
pub fn style_for_cluster(count: usize, dominant: SafetyTier) -> ClusterStyle {
    ClusterStyle {
        color: tier_for_count(count),
        ring: dominant,
        size: cluster_diameter(count),
        label: count.to_string(),
    }
}
