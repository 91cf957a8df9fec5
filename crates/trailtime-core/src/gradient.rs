// ABOUTME: Canonical 11-bin gradient taxonomy plus its legacy 7-bin projection
// ABOUTME: Exact numeric boundaries ground this in the original gradient classification tables

use serde::{Deserialize, Serialize};

/// The canonical gradient taxonomy used for bucketing paces and for the 11→7 legacy projection.
///
/// Boundaries are half-open `[min, max)` in gradient percent, except the two outer
/// bins which clamp everything beyond ±23%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientCategory {
    /// `[-100, -23)` percent.
    ExtremeDown,
    /// `[-23, -17)` percent.
    SteepDown,
    /// `[-17, -12)` percent.
    ModerateDown,
    /// `[-12, -8)` percent.
    LightDown,
    /// `[-8, -3)` percent.
    GentleDown,
    /// `[-3, 3)` percent.
    Flat,
    /// `[3, 8)` percent.
    GentleUp,
    /// `[8, 12)` percent.
    LightUp,
    /// `[12, 17)` percent.
    ModerateUp,
    /// `[17, 23)` percent.
    SteepUp,
    /// `[23, 100)` percent.
    ExtremeUp,
}

/// All eleven categories, in ascending gradient order.
pub const ALL_CATEGORIES: [GradientCategory; 11] = [
    GradientCategory::ExtremeDown,
    GradientCategory::SteepDown,
    GradientCategory::ModerateDown,
    GradientCategory::LightDown,
    GradientCategory::GentleDown,
    GradientCategory::Flat,
    GradientCategory::GentleUp,
    GradientCategory::LightUp,
    GradientCategory::ModerateUp,
    GradientCategory::SteepUp,
    GradientCategory::ExtremeUp,
];

impl GradientCategory {
    /// Classify a gradient percentage into the 11-bin taxonomy.
    #[must_use]
    pub fn classify(gradient_percent: f64) -> Self {
        let g = gradient_percent.clamp(-100.0, 100.0);
        match g {
            g if g < -23.0 => Self::ExtremeDown,
            g if g < -17.0 => Self::SteepDown,
            g if g < -12.0 => Self::ModerateDown,
            g if g < -8.0 => Self::LightDown,
            g if g < -3.0 => Self::GentleDown,
            g if g < 3.0 => Self::Flat,
            g if g < 8.0 => Self::GentleUp,
            g if g < 12.0 => Self::LightUp,
            g if g < 17.0 => Self::ModerateUp,
            g if g < 23.0 => Self::SteepUp,
            _ => Self::ExtremeUp,
        }
    }

    /// Midpoint gradient percent representative of this category, used as the
    /// fallback-formula input when a profile lacks enough samples.
    #[must_use]
    pub fn midpoint_percent(self) -> f64 {
        match self {
            Self::ExtremeDown => -30.0,
            Self::SteepDown => -20.0,
            Self::ModerateDown => -14.5,
            Self::LightDown => -10.0,
            Self::GentleDown => -5.5,
            Self::Flat => 0.0,
            Self::GentleUp => 5.5,
            Self::LightUp => 10.0,
            Self::ModerateUp => 14.5,
            Self::SteepUp => 20.0,
            Self::ExtremeUp => 30.0,
        }
    }

    /// Project this 11-bin category down to its legacy 7-bin equivalent.
    #[must_use]
    pub fn to_legacy(self) -> LegacyGradientCategory {
        match self {
            Self::ExtremeDown | Self::SteepDown => LegacyGradientCategory::SteepDownhill,
            Self::ModerateDown | Self::LightDown => LegacyGradientCategory::ModerateDownhill,
            Self::GentleDown => LegacyGradientCategory::GentleDownhill,
            Self::Flat => LegacyGradientCategory::Flat,
            Self::GentleUp => LegacyGradientCategory::GentleUphill,
            Self::LightUp | Self::ModerateUp => LegacyGradientCategory::ModerateUphill,
            Self::SteepUp | Self::ExtremeUp => LegacyGradientCategory::SteepUphill,
        }
    }
}

/// Legacy 7-bin gradient taxonomy, kept only as a display-layer projection of
/// the 11-bin taxonomy. Paces are never computed directly in this space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyGradientCategory {
    /// Projected from `ExtremeDown`/`SteepDown`.
    SteepDownhill,
    /// Projected from `ModerateDown`/`LightDown`.
    ModerateDownhill,
    /// Projected from `GentleDown`.
    GentleDownhill,
    /// Projected from `Flat`.
    Flat,
    /// Projected from `GentleUp`.
    GentleUphill,
    /// Projected from `LightUp`/`ModerateUp`.
    ModerateUphill,
    /// Projected from `SteepUp`/`ExtremeUp`.
    SteepUphill,
}

impl From<GradientCategory> for LegacyGradientCategory {
    fn from(value: GradientCategory) -> Self {
        value.to_legacy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_flat() {
        assert_eq!(GradientCategory::classify(0.0), GradientCategory::Flat);
        assert_eq!(GradientCategory::classify(-2.9), GradientCategory::Flat);
        assert_eq!(GradientCategory::classify(2.9), GradientCategory::Flat);
    }

    #[test]
    fn classifies_boundaries_half_open() {
        assert_eq!(GradientCategory::classify(3.0), GradientCategory::GentleUp);
        assert_eq!(GradientCategory::classify(-3.0), GradientCategory::GentleDown);
        assert_eq!(GradientCategory::classify(23.0), GradientCategory::ExtremeUp);
        assert_eq!(GradientCategory::classify(-23.0), GradientCategory::ExtremeDown);
    }

    #[test]
    fn clamps_extremes() {
        assert_eq!(GradientCategory::classify(500.0), GradientCategory::ExtremeUp);
        assert_eq!(GradientCategory::classify(-500.0), GradientCategory::ExtremeDown);
    }

    #[test]
    fn legacy_projection_matches_mapping() {
        assert_eq!(
            GradientCategory::ExtremeDown.to_legacy(),
            LegacyGradientCategory::SteepDownhill
        );
        assert_eq!(
            GradientCategory::SteepUp.to_legacy(),
            LegacyGradientCategory::SteepUphill
        );
        assert_eq!(GradientCategory::Flat.to_legacy(), LegacyGradientCategory::Flat);
    }
}
