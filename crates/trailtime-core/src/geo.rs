// ABOUTME: Great-circle distance, gradient conversions and elevation smoothing
// ABOUTME: Pure functions over raw coordinates; no dependency on the Point/Track types

use crate::constants::EARTH_RADIUS_KM;

/// Great-circle distance between two lat/lon pairs (degrees), in kilometres.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1_r, lon1_r) = (lat1.to_radians(), lon1.to_radians());
    let (lat2_r, lon2_r) = (lat2.to_radians(), lon2.to_radians());

    let dlat = lat2_r - lat1_r;
    let dlon = lon2_r - lon1_r;

    let a = (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Gradient as a decimal fraction from a horizontal distance and an elevation change.
///
/// Returns `0.0` when `distance_km <= 0.0` to avoid a division by zero on
/// degenerate (duplicate-point) steps.
#[must_use]
pub fn gradient_decimal(distance_km: f64, elevation_diff_m: f64) -> f64 {
    if distance_km <= 0.0 {
        return 0.0;
    }
    elevation_diff_m / (distance_km * 1000.0)
}

/// Gradient as a percentage.
#[must_use]
pub fn gradient_to_percent(gradient_decimal: f64) -> f64 {
    gradient_decimal * 100.0
}

/// Gradient as an angle in degrees.
#[must_use]
pub fn gradient_to_degrees(gradient_decimal: f64) -> f64 {
    gradient_decimal.atan().to_degrees()
}

/// Centred moving-average smoothing over an elevation profile.
///
/// Returns the input unchanged if it has fewer points than `window`. Edge
/// points use a shrinking window rather than padding, matching a simple
/// centred average.
#[must_use]
pub fn smooth_elevations(elevations: &[f64], window: usize) -> Vec<f64> {
    if elevations.len() < window || window == 0 {
        return elevations.to_vec();
    }

    let half = window / 2;
    let n = elevations.len();
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            let slice = &elevations[start..end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Total ascent and descent (metres) over a sequential elevation profile.
#[must_use]
pub fn elevation_changes(elevations: &[f64]) -> (f64, f64) {
    let mut gain = 0.0;
    let mut loss = 0.0;
    for pair in elevations.windows(2) {
        let diff = pair[1] - pair[0];
        if diff > 0.0 {
            gain += diff;
        } else {
            loss += -diff;
        }
    }
    (gain, loss)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_distance() {
        assert!((haversine_km(45.0, 7.0, 45.0, 7.0)).abs() < 1e-9);
    }

    #[test]
    fn haversine_known_distance() {
        // Paris to London, roughly 343 km great-circle.
        let d = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((300.0..380.0).contains(&d), "got {d}");
    }

    #[test]
    fn gradient_decimal_guards_zero_distance() {
        assert_eq!(gradient_decimal(0.0, 100.0), 0.0);
    }

    #[test]
    fn gradient_conversions_roundtrip_sign() {
        let g = gradient_decimal(1.0, 50.0);
        assert!(gradient_to_percent(g) > 0.0);
        assert!(gradient_to_degrees(g) > 0.0);
    }

    #[test]
    fn smoothing_noop_under_window() {
        let e = vec![1.0, 2.0, 3.0];
        assert_eq!(smooth_elevations(&e, 5), e);
    }

    #[test]
    fn smoothing_averages_centre() {
        let e = vec![0.0, 0.0, 10.0, 0.0, 0.0];
        let smoothed = smooth_elevations(&e, 5);
        assert!((smoothed[2] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn elevation_changes_accumulate_gain_and_loss() {
        let (gain, loss) = elevation_changes(&[100.0, 110.0, 105.0, 120.0]);
        assert!((gain - 25.0).abs() < 1e-9);
        assert!((loss - 5.0).abs() < 1e-9);
    }
}
