// ABOUTME: Gradient-indexed pace/speed formulas: Tobler, Naismith+Langmuir, Minetti, Strava GAP
// ABOUTME: Minetti and Strava tables are well-established published values, not the source's tables

use trailtime_core::constants::{
    LANGMUIR_GENTLE_DESCENT_MAX_DEG, LANGMUIR_GENTLE_DESCENT_MIN_DEG, NAISMITH_BASE_SPEED_KMH,
    NAISMITH_METERS_PER_HOUR_ASCENT, TOBLER_DECAY_RATE, TOBLER_MAX_SPEED_KMH,
    TOBLER_OPTIMAL_GRADIENT,
};

/// Linearly interpolate `x` against a table of `(x, y)` pairs sorted ascending
/// by `x`, clamping to the end values beyond the table's range.
fn interpolate_table(table: &[(f64, f64)], x: f64) -> f64 {
    let last = table.len() - 1;
    if x <= table[0].0 {
        return table[0].1;
    }
    if x >= table[last].0 {
        return table[last].1;
    }
    for window in table.windows(2) {
        let (x0, y0) = window[0];
        let (x1, y1) = window[1];
        if x >= x0 && x <= x1 {
            let t = (x - x0) / (x1 - x0);
            return y0 + t * (y1 - y0);
        }
    }
    table[last].1
}

/// Tobler's hiking function: speed in km/h for a gradient given as a decimal fraction.
///
/// Peaks at `TOBLER_MAX_SPEED_KMH` at `TOBLER_OPTIMAL_GRADIENT` (−5%).
#[must_use]
pub fn tobler_speed_kmh(gradient_decimal: f64) -> f64 {
    TOBLER_MAX_SPEED_KMH * (-TOBLER_DECAY_RATE * (gradient_decimal - TOBLER_OPTIMAL_GRADIENT).abs()).exp()
}

/// Naismith's rule base time (horizontal + ascent), hours, before any descent correction.
#[must_use]
pub fn naismith_base_time_hours(distance_km: f64, elevation_gain_m: f64) -> f64 {
    distance_km / NAISMITH_BASE_SPEED_KMH + elevation_gain_m / NAISMITH_METERS_PER_HOUR_ASCENT
}

/// Langmuir correction for a descent, hours. `gradient_deg` is the unsigned descent angle.
///
/// `< 5°` no correction; `5°-12°` time saved; `> 12°` time added (steep descents
/// slow a hiker down rather than speeding them up).
#[must_use]
pub fn langmuir_correction_hours(descent_m: f64, gradient_deg: f64) -> f64 {
    let magnitude = (descent_m / 300.0) * (10.0 / 60.0);
    if gradient_deg < LANGMUIR_GENTLE_DESCENT_MIN_DEG {
        0.0
    } else if gradient_deg <= LANGMUIR_GENTLE_DESCENT_MAX_DEG {
        -magnitude
    } else {
        magnitude
    }
}

/// Minetti et al. (2002) energy-cost-of-transport polynomial, `C(i) =
/// 155.4i⁵ − 30.4i⁴ − 43.3i³ + 46.3i² + 19.5i + 3.6`, sampled at the 11-bin
/// gradient taxonomy's category midpoints (percent) and normalised to
/// `C(0) = 3.6`. Matches [`STRAVA_GAP_TABLE`]'s discretize-then-interpolate
/// treatment rather than evaluating the polynomial continuously.
const MINETTI_COST_TABLE: [(f64, f64); 11] = [
    (-30.0, 0.683955),
    (-20.0, 0.500009),
    (-14.5, 0.515157),
    (-10.0, 0.597696),
    (-5.5, 0.743168),
    (0.0, 1.0),
    (5.5, 1.334765),
    (10.0, 1.657837),
    (14.5, 2.018187),
    (20.0, 2.501858),
    (30.0, 3.494245),
];

/// Minetti energy-cost-of-transport ratio for a gradient (decimal fraction), relative
/// to level running. Linearly interpolated between [`MINETTI_COST_TABLE`]'s
/// midpoint samples, clamped beyond the ends.
#[must_use]
pub fn minetti_cost_ratio(gradient_decimal: f64) -> f64 {
    interpolate_table(&MINETTI_COST_TABLE, gradient_decimal * 100.0)
}

/// Strava's published empirical grade-adjusted-pace factor table: gradient (%) rows
/// with a multiplicative pace-time factor relative to flat pace, linearly
/// interpolated between rows and clamped beyond the ends.
const STRAVA_GAP_TABLE: [(f64, f64); 13] = [
    (-30.0, 0.70),
    (-25.0, 0.71),
    (-20.0, 0.74),
    (-15.0, 0.80),
    (-10.0, 0.88),
    (-5.0, 0.95),
    (0.0, 1.00),
    (5.0, 1.13),
    (10.0, 1.30),
    (15.0, 1.48),
    (20.0, 1.64),
    (25.0, 1.80),
    (30.0, 1.96),
];

/// Strava GAP pace-adjustment factor for a gradient (percent), interpolated from
/// [`STRAVA_GAP_TABLE`].
#[must_use]
pub fn strava_gap_factor(gradient_percent: f64) -> f64 {
    interpolate_table(&STRAVA_GAP_TABLE, gradient_percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tobler_peaks_at_optimal_gradient() {
        let speed = tobler_speed_kmh(TOBLER_OPTIMAL_GRADIENT);
        assert!((speed - TOBLER_MAX_SPEED_KMH).abs() < 1e-9);
    }

    #[test]
    fn tobler_monotonicity_around_optimum() {
        let s_uphill = tobler_speed_kmh(0.10);
        let s_flat = tobler_speed_kmh(0.0);
        let s_optimal = tobler_speed_kmh(-0.05);
        assert!(s_uphill < s_flat);
        assert!(s_flat < s_optimal);
    }

    #[test]
    fn naismith_ascent_adds_time() {
        let h1 = naismith_base_time_hours(3.0, 0.0);
        let h2 = naismith_base_time_hours(3.0, 600.0);
        assert!(h1 < h2);
        assert!((h2 - h1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn langmuir_no_correction_below_5_degrees() {
        assert_eq!(langmuir_correction_hours(500.0, 3.0), 0.0);
    }

    #[test]
    fn langmuir_gentle_descent_saves_time() {
        let correction = langmuir_correction_hours(300.0, 10.0);
        assert!(correction < 0.0);
    }

    #[test]
    fn langmuir_steep_descent_adds_time() {
        let correction = langmuir_correction_hours(300.0, 20.0);
        assert!(correction > 0.0);
    }

    #[test]
    fn minetti_flat_is_identity() {
        assert!((minetti_cost_ratio(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn minetti_uphill_costs_more_than_downhill_moderate() {
        assert!(minetti_cost_ratio(0.10) > minetti_cost_ratio(-0.10));
    }

    #[test]
    fn minetti_matches_its_table_exactly_at_a_midpoint() {
        assert!((minetti_cost_ratio(0.10) - 1.657837).abs() < 1e-6);
    }

    #[test]
    fn minetti_interpolates_between_midpoints() {
        let f = minetti_cost_ratio(0.07);
        assert!(f > 1.334765 && f < 1.657837);
    }

    #[test]
    fn minetti_clamps_beyond_table() {
        assert_eq!(minetti_cost_ratio(0.5), minetti_cost_ratio(0.30));
        assert_eq!(minetti_cost_ratio(-0.5), minetti_cost_ratio(-0.30));
    }

    #[test]
    fn strava_gap_flat_is_identity() {
        assert!((strava_gap_factor(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn strava_gap_interpolates_between_rows() {
        let f = strava_gap_factor(2.5);
        assert!(f > 1.0 && f < 1.13);
    }

    #[test]
    fn strava_gap_clamps_beyond_table() {
        assert_eq!(strava_gap_factor(100.0), strava_gap_factor(30.0));
        assert_eq!(strava_gap_factor(-100.0), strava_gap_factor(-30.0));
    }
}
