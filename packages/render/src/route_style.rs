//! Route line styling.
//!
//! Routes are colored by a three-tier score table shared with the route
//! list badges. The selected route is drawn heavier and fully opaque; the
//! rest are thinner and translucent.

use serde::Serialize;

use crate::SafetyTier;

/// Lowest score in the safe tier.
pub const SAFE_SCORE: u8 = 70;

/// Lowest score in the caution tier.
pub const CAUTION_SCORE: u8 = 40;

/// Tier for a route safety score: 70 and up safe, 40 to 69 caution, below
/// 40 danger. Higher scores never map to a more severe tier.
#[must_use]
pub const fn tier_for_score(score: u8) -> SafetyTier {
    if score >= SAFE_SCORE {
        SafetyTier::Safe
    } else if score >= CAUTION_SCORE {
        SafetyTier::Caution
    } else {
        SafetyTier::Danger
    }
}

/// Stroke style of a route polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteLineStyle {
    /// Stroke color (hex).
    pub color: &'static str,
    /// Stroke weight in pixels.
    pub weight: u32,
    /// Stroke opacity in `0.0..=1.0`.
    pub opacity: f64,
}

impl RouteLineStyle {
    /// Weight of the selected route.
    pub const SELECTED_WEIGHT: u32 = 7;
    /// Weight of every other route.
    pub const UNSELECTED_WEIGHT: u32 = 4;
    /// Opacity of every other route.
    pub const UNSELECTED_OPACITY: f64 = 0.6;

    /// Emphasized style for the selected route.
    #[must_use]
    pub const fn selected(tier: SafetyTier) -> Self {
        Self {
            color: tier.color(),
            weight: Self::SELECTED_WEIGHT,
            opacity: 1.0,
        }
    }

    /// De-emphasized style for unselected routes.
    #[must_use]
    pub const fn unselected(tier: SafetyTier) -> Self {
        Self {
            color: tier.color(),
            weight: Self::UNSELECTED_WEIGHT,
            opacity: Self::UNSELECTED_OPACITY,
        }
    }

    /// Picks [`Self::selected`] or [`Self::unselected`].
    #[must_use]
    pub const fn for_selection(tier: SafetyTier, is_selected: bool) -> Self {
        if is_selected {
            Self::selected(tier)
        } else {
            Self::unselected(tier)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_tiers() {
        assert_eq!(tier_for_score(85), SafetyTier::Safe);
        assert_eq!(tier_for_score(70), SafetyTier::Safe);
        assert_eq!(tier_for_score(69), SafetyTier::Caution);
        assert_eq!(tier_for_score(55), SafetyTier::Caution);
        assert_eq!(tier_for_score(40), SafetyTier::Caution);
        assert_eq!(tier_for_score(20), SafetyTier::Danger);
        assert_eq!(tier_for_score(0), SafetyTier::Danger);
    }

    #[test]
    fn score_tiers_are_monotonic() {
        for low in 0..=100u8 {
            for high in low..=100u8 {
                assert!(tier_for_score(high) <= tier_for_score(low));
            }
        }
    }

    #[test]
    fn selected_style_outweighs_unselected() {
        let selected = RouteLineStyle::selected(SafetyTier::Caution);
        let other = RouteLineStyle::unselected(SafetyTier::Caution);
        assert!(selected.weight > other.weight);
        assert!(selected.opacity > other.opacity);
        assert_eq!(selected.color, other.color);
    }
}
