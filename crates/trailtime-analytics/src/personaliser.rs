// ABOUTME: Looks up a user's own observed pace for a segment's gradient category
// ABOUTME: Falls back to a base formula, evaluated at the category midpoint, when data is thin

use trailtime_core::constants::MIN_SAMPLES_FOR_PERSONALISATION;
use trailtime_core::gradient::GradientCategory;
use trailtime_core::model::{EffortLevel, PaceTable};

use crate::formulas::{strava_gap_factor, tobler_speed_kmh};

/// Which formula backs a category that lacks enough personal samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackFormula {
    /// Tobler's hiking function — the hiking path's fallback.
    Tobler,
    /// Strava's GAP table over a 10 km/h flat-running baseline — the running path's fallback.
    StravaGap,
}

/// Pace (minutes/km) for the fallback formula at a given gradient percent.
#[must_use]
pub fn fallback_pace_min_per_km(gradient_percent: f64, fallback: FallbackFormula) -> f64 {
    match fallback {
        FallbackFormula::Tobler => {
            let speed = tobler_speed_kmh(gradient_percent / 100.0);
            if speed > 0.0 {
                60.0 / speed
            } else {
                0.0
            }
        }
        FallbackFormula::StravaGap => {
            let factor = strava_gap_factor(gradient_percent);
            let flat_run_speed_kmh = 10.0;
            let speed = if factor > 0.0 { flat_run_speed_kmh / factor } else { flat_run_speed_kmh };
            if speed > 0.0 {
                60.0 / speed
            } else {
                0.0
            }
        }
    }
}

/// Resolve a personalised pace (minutes/km) for a gradient, consulting `table`
/// and falling back to `fallback` evaluated at the category midpoint when the
/// category has fewer than `MIN_SAMPLES_FOR_PERSONALISATION` samples.
#[must_use]
pub fn personalised_pace_min_per_km(
    table: &PaceTable,
    gradient_percent: f64,
    effort: EffortLevel,
    fallback: FallbackFormula,
) -> f64 {
    let category = GradientCategory::classify(gradient_percent);

    match table.get(category) {
        Some(stats) if stats.sample_count >= MIN_SAMPLES_FOR_PERSONALISATION => {
            stats.percentiles.map_or(stats.avg_pace_min_per_km, |p| effort.percentile(p))
        }
        _ => fallback_pace_min_per_km(category.midpoint_percent(), fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailtime_core::model::CategoryStats;

    #[test]
    fn thin_category_falls_back_to_formula_at_midpoint() {
        let table = PaceTable::new();
        let gradient = 25.0; // SteepUp
        let pace = personalised_pace_min_per_km(&table, gradient, EffortLevel::Moderate, FallbackFormula::Tobler);
        let category = GradientCategory::classify(gradient);
        let expected = fallback_pace_min_per_km(category.midpoint_percent(), FallbackFormula::Tobler);
        assert!((pace - expected).abs() < 1e-9);
    }

    #[test]
    fn well_populated_category_uses_percentile() {
        let mut table = PaceTable::new();
        table.insert(
            GradientCategory::Flat,
            CategoryStats {
                avg_pace_min_per_km: 5.5,
                sample_count: 20,
                percentiles: Some(trailtime_core::model::Percentiles { p25: 5.0, p50: 5.5, p75: 6.0 }),
            },
        );
        let pace = personalised_pace_min_per_km(&table, 0.0, EffortLevel::Race, FallbackFormula::StravaGap);
        assert!((pace - 5.0).abs() < 1e-9);
    }
}
