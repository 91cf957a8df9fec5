// ABOUTME: Fatigue multiplier model applied to base segment times as elapsed time accumulates
// ABOUTME: Shared shape for hiking and running; running adds a route-length-adaptive threshold

use trailtime_core::constants::{
    DOWNHILL_FATIGUE_GRADIENT_PERCENT, FATIGUE_DISTANCE_100K_KM, FATIGUE_DISTANCE_50K_KM,
    HIKING_FATIGUE_LINEAR_RATE, HIKING_FATIGUE_QUADRATIC_RATE, HIKING_FATIGUE_THRESHOLD_HOURS,
    RUNNING_DOWNHILL_FATIGUE_MULTIPLIER, RUNNING_FATIGUE_LINEAR_RATE,
    RUNNING_FATIGUE_QUADRATIC_RATE, RUNNING_FATIGUE_THRESHOLD_HOURS,
    RUNNING_FATIGUE_THRESHOLD_HOURS_100K, RUNNING_FATIGUE_THRESHOLD_HOURS_50K,
};

/// Tunable parameters for the fatigue multiplier.
#[derive(Debug, Clone, Copy)]
pub struct FatigueConfig {
    /// Hours before degradation begins.
    pub threshold_h: f64,
    /// Linear degradation rate per hour past the threshold.
    pub linear_rate: f64,
    /// Quadratic degradation rate per hour² past the threshold.
    pub quadratic_rate: f64,
    /// Extra multiplier applied on downhill segments (`1.0` disables it — hiking default).
    pub downhill_multiplier: f64,
    /// Whether fatigue is applied at all; when `false`, `multiplier` always returns `1.0`.
    pub enabled: bool,
}

impl FatigueConfig {
    /// Hiking fatigue defaults: 3.0h threshold, 0.03 linear, 0.005 quadratic, no downhill bump.
    #[must_use]
    pub fn hiking() -> Self {
        Self {
            threshold_h: HIKING_FATIGUE_THRESHOLD_HOURS,
            linear_rate: HIKING_FATIGUE_LINEAR_RATE,
            quadratic_rate: HIKING_FATIGUE_QUADRATIC_RATE,
            downhill_multiplier: 1.0,
            enabled: true,
        }
    }

    /// Running fatigue defaults, with the threshold auto-adapted to route length:
    /// `>=100km -> 4.0h`, `>=50km -> 3.0h`, else `2.0h`.
    #[must_use]
    pub fn running(total_distance_km: f64) -> Self {
        let threshold_h = if total_distance_km >= FATIGUE_DISTANCE_100K_KM {
            RUNNING_FATIGUE_THRESHOLD_HOURS_100K
        } else if total_distance_km >= FATIGUE_DISTANCE_50K_KM {
            RUNNING_FATIGUE_THRESHOLD_HOURS_50K
        } else {
            RUNNING_FATIGUE_THRESHOLD_HOURS
        };
        Self {
            threshold_h,
            linear_rate: RUNNING_FATIGUE_LINEAR_RATE,
            quadratic_rate: RUNNING_FATIGUE_QUADRATIC_RATE,
            downhill_multiplier: RUNNING_DOWNHILL_FATIGUE_MULTIPLIER,
            enabled: true,
        }
    }

    /// A disabled fatigue model: `multiplier` is always `1.0`.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            threshold_h: 0.0,
            linear_rate: 0.0,
            quadratic_rate: 0.0,
            downhill_multiplier: 1.0,
            enabled: false,
        }
    }

    /// Fatigue multiplier at a point `elapsed_h` into the route, for a segment with
    /// the given gradient (percent).
    #[must_use]
    pub fn multiplier(&self, elapsed_h: f64, gradient_percent: f64) -> f64 {
        if !self.enabled {
            return 1.0;
        }
        let extra = elapsed_h - self.threshold_h;
        if extra <= 0.0 {
            return 1.0;
        }
        let base = 1.0 + self.linear_rate * extra + self.quadratic_rate * extra * extra;
        if gradient_percent < DOWNHILL_FATIGUE_GRADIENT_PERCENT {
            base * self.downhill_multiplier
        } else {
            base
        }
    }

    /// Apply fatigue to one segment's base time, evaluating the multiplier at the
    /// segment's midpoint (`cumulative_elapsed_h + base_time_hours/2`).
    ///
    /// Returns `(adjusted_time_hours, multiplier_applied)`.
    #[must_use]
    pub fn apply_to_segment(
        &self,
        base_time_hours: f64,
        cumulative_elapsed_h: f64,
        gradient_percent: f64,
    ) -> (f64, f64) {
        let midpoint = cumulative_elapsed_h + base_time_hours / 2.0;
        let multiplier = self.multiplier(midpoint, gradient_percent);
        (base_time_hours * multiplier, multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_below_threshold() {
        let f = FatigueConfig::hiking();
        assert_eq!(f.multiplier(1.0, 0.0), 1.0);
        assert_eq!(f.multiplier(f.threshold_h, 0.0), 1.0);
    }

    #[test]
    fn downhill_multiplier_scales_uphill_multiplier() {
        let f = FatigueConfig::running(10.0);
        let uphill = f.multiplier(5.0, 0.0);
        let downhill = f.multiplier(5.0, -10.0);
        assert!((downhill - uphill * RUNNING_DOWNHILL_FATIGUE_MULTIPLIER).abs() < 1e-9);
    }

    #[test]
    fn running_threshold_adapts_to_distance() {
        assert_eq!(FatigueConfig::running(10.0).threshold_h, RUNNING_FATIGUE_THRESHOLD_HOURS);
        assert_eq!(FatigueConfig::running(60.0).threshold_h, RUNNING_FATIGUE_THRESHOLD_HOURS_50K);
        assert_eq!(FatigueConfig::running(120.0).threshold_h, RUNNING_FATIGUE_THRESHOLD_HOURS_100K);
    }

    #[test]
    fn disabled_is_always_identity() {
        let f = FatigueConfig::disabled();
        assert_eq!(f.multiplier(100.0, -50.0), 1.0);
    }

    #[test]
    fn s4_fatigue_formula_matches_midpoint_rule() {
        let f = FatigueConfig::running(60.0); // threshold 2h, 0.05 linear, 0.008 quadratic
        let (_, m) = f.apply_to_segment(1.0, 2.5, 0.0);
        let x = 3.0 - f.threshold_h;
        let expected = 1.0 + f.linear_rate * x + f.quadratic_rate * x * x;
        assert!((m - expected).abs() < 1e-9);
    }
}
