// ABOUTME: Decides per-segment whether a runner would run or power-hike
// ABOUTME: Supports a static threshold and a load-adaptive one driven by elapsed time/distance

use trailtime_core::constants::{
    DEFAULT_DOWNHILL_HIKE_THRESHOLD_PERCENT, DEFAULT_HIKE_THRESHOLD_PERCENT,
    MAX_HIKE_THRESHOLD_PERCENT, MIN_HIKE_THRESHOLD_PERCENT, MIN_UPHILL_SPLITS_FOR_THRESHOLD,
    UPHILL_SPLIT_GRADIENT_PERCENT,
};
use trailtime_core::model::{MacroSegment, Split};

/// Run or hike, as decided by the `ThresholdDetector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementMode {
    /// The runner covers this segment running.
    Run,
    /// The runner covers this segment power-hiking.
    Hike,
}

/// The outcome of a single per-segment run/hike decision, with the reasoning kept
/// around for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct HikeRunDecision {
    /// The decided mode.
    pub mode: MovementMode,
    /// The uphill threshold that was in effect when this decision was made.
    pub threshold_used: f64,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Decide a single segment statically, against a fixed uphill/downhill threshold.
#[must_use]
pub fn decide(segment: &MacroSegment, uphill_threshold: f64, downhill_threshold: f64) -> HikeRunDecision {
    let gradient = segment.gradient_percent();

    if gradient >= uphill_threshold {
        let confidence = if gradient > uphill_threshold + 5.0 { 0.9 } else { 0.7 };
        return HikeRunDecision {
            mode: MovementMode::Hike,
            threshold_used: uphill_threshold,
            confidence,
        };
    }

    if gradient <= downhill_threshold {
        return HikeRunDecision {
            mode: MovementMode::Hike,
            threshold_used: uphill_threshold,
            confidence: 0.8,
        };
    }

    HikeRunDecision {
        mode: MovementMode::Run,
        threshold_used: uphill_threshold,
        confidence: 0.9,
    }
}

/// Compute the load-adaptive effective uphill threshold for a point partway through a route.
///
/// Non-increasing in both `elapsed_h` and `total_km`; clamped to
/// `[MIN_HIKE_THRESHOLD_PERCENT, MAX_HIKE_THRESHOLD_PERCENT]`.
#[must_use]
pub fn effective_threshold(base: f64, elapsed_h: f64, total_km: f64) -> f64 {
    let fatigue_reduction = if elapsed_h > 2.0 {
        (5.0_f64).min((elapsed_h - 2.0) * 1.5)
    } else {
        0.0
    };
    let distance_reduction = if total_km > 50.0 {
        (3.0_f64).min((total_km - 50.0) / 25.0)
    } else {
        0.0
    };
    (base - fatigue_reduction - distance_reduction)
        .clamp(MIN_HIKE_THRESHOLD_PERCENT, MAX_HIKE_THRESHOLD_PERCENT)
}

/// Rough speed (km/h) used only to advance the elapsed-time clock while processing
/// a route under the adaptive threshold — not a prediction output.
fn rough_speed_kmh(mode: MovementMode) -> f64 {
    match mode {
        MovementMode::Run => 9.0,
        MovementMode::Hike => 4.5,
    }
}

/// Process a full route under the load-adaptive threshold, deciding each segment
/// in order and advancing elapsed time with a rough speed estimate.
#[must_use]
pub fn process_route_adaptive(
    segments: &[MacroSegment],
    total_distance_km: f64,
    base_threshold: f64,
    downhill_threshold: f64,
) -> Vec<HikeRunDecision> {
    let mut elapsed_h = 0.0;
    let mut decisions = Vec::with_capacity(segments.len());

    for segment in segments {
        let threshold = effective_threshold(base_threshold, elapsed_h, total_distance_km);
        let decision = decide(segment, threshold, downhill_threshold);
        let speed = rough_speed_kmh(decision.mode);
        if speed > 0.0 {
            elapsed_h += segment.distance_km / speed;
        }
        decisions.push(decision);
    }

    decisions
}

/// Process a full route under a static threshold (no load adaptation).
#[must_use]
pub fn process_route_static(
    segments: &[MacroSegment],
    uphill_threshold: f64,
    downhill_threshold: f64,
) -> Vec<HikeRunDecision> {
    segments
        .iter()
        .map(|s| decide(s, uphill_threshold, downhill_threshold))
        .collect()
}

/// Learn an uphill walk threshold from a user's uphill (`> 5%` gradient) splits by
/// finding the gradient at which `d(pace)/d(gradient)` is maximal.
///
/// Requires at least `MIN_UPHILL_SPLITS_FOR_THRESHOLD` splits; returns `None`
/// otherwise so the caller can substitute the default.
#[must_use]
pub fn detect_uphill_threshold(uphill_splits: &[Split]) -> Option<f64> {
    let mut paced: Vec<(f64, f64)> = uphill_splits
        .iter()
        .filter_map(|s| {
            let gradient = s.gradient_percent()?;
            let pace = s.pace_min_per_km()?;
            (gradient > UPHILL_SPLIT_GRADIENT_PERCENT).then_some((gradient, pace))
        })
        .collect();

    if paced.len() < MIN_UPHILL_SPLITS_FOR_THRESHOLD {
        return None;
    }

    paced.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut best_derivative = f64::MIN;
    let mut best_midpoint = DEFAULT_HIKE_THRESHOLD_PERCENT;

    for window in paced.windows(2) {
        let (g0, p0) = window[0];
        let (g1, p1) = window[1];
        let dgrad = g1 - g0;
        let dpace = p1 - p0;
        if dgrad <= 0.0 || dpace <= 0.0 {
            continue;
        }
        let derivative = dpace / dgrad;
        if derivative > best_derivative {
            best_derivative = derivative;
            best_midpoint = (g0 + g1) / 2.0;
        }
    }

    Some((best_midpoint.clamp(MIN_HIKE_THRESHOLD_PERCENT, MAX_HIKE_THRESHOLD_PERCENT) * 10.0).round() / 10.0)
}

/// The default static thresholds, used when no profile-driven or auto-detected
/// threshold is available.
#[must_use]
pub fn default_thresholds() -> (f64, f64) {
    (DEFAULT_HIKE_THRESHOLD_PERCENT, DEFAULT_DOWNHILL_HIKE_THRESHOLD_PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailtime_core::model::SegmentType;

    fn seg(gradient_percent: f64) -> MacroSegment {
        let distance_km = 1.0;
        let change = gradient_percent / 100.0 * distance_km * 1000.0;
        MacroSegment {
            ordinal: 1,
            segment_type: MacroSegment::classify_type(gradient_percent),
            distance_km,
            elevation_gain_m: change.max(0.0),
            elevation_loss_m: (-change).max(0.0),
            start_elevation_m: 0.0,
            end_elevation_m: change,
        }
    }

    #[test]
    fn steep_uphill_is_hike() {
        let d = decide(&seg(30.0), 25.0, -30.0);
        assert_eq!(d.mode, MovementMode::Hike);
        assert!((d.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn gentle_uphill_is_run() {
        let d = decide(&seg(5.0), 25.0, -30.0);
        assert_eq!(d.mode, MovementMode::Run);
    }

    #[test]
    fn steep_downhill_is_hike() {
        let d = decide(&seg(-35.0), 25.0, -30.0);
        assert_eq!(d.mode, MovementMode::Hike);
        assert!((d.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn threshold_monotonic_non_increasing_in_elapsed_and_distance() {
        let t0 = effective_threshold(25.0, 0.0, 0.0);
        let t1 = effective_threshold(25.0, 4.0, 0.0);
        let t2 = effective_threshold(25.0, 4.0, 80.0);
        assert!(t1 <= t0);
        assert!(t2 <= t1);
        assert!((MIN_HIKE_THRESHOLD_PERCENT..=MAX_HIKE_THRESHOLD_PERCENT).contains(&t2));
    }

    #[test]
    fn too_few_uphill_splits_returns_none() {
        let splits = vec![Split {
            ordinal: 1,
            distance_m: 1000.0,
            moving_time_s: 360,
            elevation_diff_m: 100.0,
        }];
        assert!(detect_uphill_threshold(&splits).is_none());
    }
}
