// ABOUTME: Orchestrates segmenter output through calculators, threshold detection and fatigue
// ABOUTME: Two paths: hiking (Naismith/Tobler, optionally personalised) and trail-running (GAP/threshold)

use trailtime_core::gradient::GradientCategory;
use trailtime_core::model::{EffortLevel, HikingProfile, MacroSegment, RunProfile};

use crate::calculators::{calculate, GapMode, PaceMethod};
use crate::fatigue::FatigueConfig;
use crate::personaliser::{fallback_pace_min_per_km, personalised_pace_min_per_km, FallbackFormula};
use crate::threshold::{self, MovementMode};

/// Accumulates one method's time across a route, feeding its own cumulative
/// elapsed time into the fatigue model — each method fatigues independently,
/// since they reach the same segment at different cumulative times.
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    elapsed_h: f64,
    total_h: f64,
}

impl Accumulator {
    fn push(&mut self, raw_time_hours: f64, fatigue: Option<&FatigueConfig>, gradient_percent: f64) {
        let adjusted = fatigue.map_or(raw_time_hours, |f| f.apply_to_segment(raw_time_hours, self.elapsed_h, gradient_percent).0);
        self.elapsed_h += adjusted;
        self.total_h += adjusted;
    }
}

/// Result of predicting a hiking route.
#[derive(Debug, Clone, Copy)]
pub struct HikingEstimate {
    /// Naismith's rule total, hours.
    pub naismith_hours: f64,
    /// Tobler's function total, hours.
    pub tobler_hours: f64,
    /// Naismith scaled by the user's personalised multiplier, hours. `None` without a valid profile.
    pub naismith_personalized_hours: Option<f64>,
    /// Tobler scaled by the user's personalised multiplier, hours. `None` without a valid profile.
    pub tobler_personalized_hours: Option<f64>,
    /// Total route distance, kilometres.
    pub total_distance_km: f64,
    /// Total elevation gain, metres.
    pub total_elevation_gain_m: f64,
}

/// Ratio of a user's personalised Tobler-anchored pace to the generic Tobler
/// pace at a gradient, `1.0` when the category lacks enough samples. The same
/// multiplier scales both Naismith and Tobler — it is a measure of how this
/// user differs from the generic model, not a Tobler-specific correction.
fn tobler_personal_multiplier(profile: &HikingProfile, gradient_percent: f64) -> f64 {
    let category = GradientCategory::classify(gradient_percent);
    let personalised =
        personalised_pace_min_per_km(&profile.pace_table, gradient_percent, EffortLevel::Moderate, FallbackFormula::Tobler);
    let generic = fallback_pace_min_per_km(category.midpoint_percent(), FallbackFormula::Tobler);
    if generic > 0.0 {
        personalised / generic
    } else {
        1.0
    }
}

/// Predict a hiking route: Naismith and Tobler always; both personalised
/// flavours when `profile` is present and valid; fatigue applied per segment
/// when `fatigue` is given.
#[must_use]
pub fn predict_hiking(
    segments: &[MacroSegment],
    profile: Option<&HikingProfile>,
    fatigue: Option<&FatigueConfig>,
) -> HikingEstimate {
    let mut naismith = Accumulator::default();
    let mut tobler = Accumulator::default();
    let mut naismith_personalized = Accumulator::default();
    let mut tobler_personalized = Accumulator::default();

    let valid_profile = profile.filter(|p| p.is_valid());

    let mut total_distance_km = 0.0;
    let mut total_elevation_gain_m = 0.0;

    for segment in segments {
        total_distance_km += segment.distance_km;
        total_elevation_gain_m += segment.elevation_gain_m;
        let gradient = segment.gradient_percent();

        tobler.push(calculate(segment, PaceMethod::Tobler, 1.0).time_hours, fatigue, gradient);
        naismith.push(calculate(segment, PaceMethod::Naismith, 1.0).time_hours, fatigue, gradient);

        if let Some(profile) = valid_profile {
            let multiplier = tobler_personal_multiplier(profile, gradient);
            tobler_personalized.push(
                calculate(segment, PaceMethod::ToblerPersonalised { multiplier }, 1.0).time_hours,
                fatigue,
                gradient,
            );
            naismith_personalized.push(
                calculate(segment, PaceMethod::NaismithPersonalised { multiplier }, 1.0).time_hours,
                fatigue,
                gradient,
            );
        }
    }

    HikingEstimate {
        naismith_hours: naismith.total_h,
        tobler_hours: tobler.total_h,
        naismith_personalized_hours: valid_profile.map(|_| naismith_personalized.total_h),
        tobler_personalized_hours: valid_profile.map(|_| tobler_personalized.total_h),
        total_distance_km,
        total_elevation_gain_m,
    }
}

/// Personalised running totals at each effort level, mirroring `EffortLevel`.
#[derive(Debug, Clone, Copy)]
pub struct PersonalizedTotals {
    /// `p25`-anchored (race pace) total, hours.
    pub race_hours: f64,
    /// `p50`-anchored (moderate) total, hours.
    pub moderate_hours: f64,
    /// `p75`-anchored (easy) total, hours.
    pub easy_hours: f64,
}

/// The six always-run-GAP × always-hiked-formula totals, each summing the
/// GAP time on segments the threshold detector assigned to `Run` and the
/// hike-formula time on segments it assigned to `Hike`.
#[derive(Debug, Clone, Copy)]
pub struct RunHikeTotals {
    /// Strava GAP for running, Tobler for hiking.
    pub strava_tobler_hours: f64,
    /// Strava GAP for running, Naismith for hiking.
    pub strava_naismith_hours: f64,
    /// Minetti GAP for running, Tobler for hiking.
    pub minetti_tobler_hours: f64,
    /// Minetti GAP for running, Naismith for hiking.
    pub minetti_naismith_hours: f64,
    /// Hybrid Strava/Minetti GAP for running, Tobler for hiking.
    pub strava_minetti_tobler_hours: f64,
    /// Hybrid Strava/Minetti GAP for running, Naismith for hiking.
    pub strava_minetti_naismith_hours: f64,
}

/// Result of predicting a trail-running route.
#[derive(Debug, Clone, Copy)]
pub struct RunningEstimate {
    /// Whole route run under Strava's GAP table, hours.
    pub all_run_strava_hours: f64,
    /// Whole route run under Minetti's cost polynomial, hours.
    pub all_run_minetti_hours: f64,
    /// Whole route run under the hybrid GAP source, hours.
    pub all_run_strava_minetti_hours: f64,
    /// Whole route run under the user's personalised pace, all three effort levels. `None` without a valid profile.
    pub all_run_personalized_hours: Option<PersonalizedTotals>,
    /// The six GAP-variant × hike-formula combinations, split by the threshold decision.
    pub run_hike_hours: RunHikeTotals,
    /// The primary estimate: personalised where available, else the hybrid GAP variant for
    /// run segments and Tobler for hike segments, with fatigue applied per segment.
    pub combined_hours: f64,
    /// Distance covered on segments decided `Run`, kilometres.
    pub running_distance_km: f64,
    /// Time spent on segments decided `Run` in the combined estimate, hours.
    pub running_time_hours: f64,
    /// Distance covered on segments decided `Hike`, kilometres.
    pub hiking_distance_km: f64,
    /// Time spent on segments decided `Hike` in the combined estimate, hours.
    pub hiking_time_hours: f64,
    /// Total route distance, kilometres.
    pub total_distance_km: f64,
    /// How much slower the combined estimate is than a flat-equivalent route, percent.
    pub elevation_impact_percent: f64,
}

/// Flat-running baseline speed (km/h) used to judge elevation impact — the
/// same baseline `calculators::gap` normalises grade-adjusted pace against.
const FLAT_BASELINE_SPEED_KMH: f64 = 10.0;

/// Predict a trail-running route: threshold-detected run/hike assignment per
/// segment, all three GAP variants run-only, Tobler/Naismith hike-only, the
/// six run+hike combinations, personalised totals when a profile is present,
/// and a primary `combined` estimate.
#[must_use]
pub fn predict_running(
    segments: &[MacroSegment],
    profile: Option<&RunProfile>,
    fatigue: Option<&FatigueConfig>,
) -> RunningEstimate {
    let total_distance_km: f64 = segments.iter().map(|s| s.distance_km).sum();
    let (default_uphill, default_downhill) = threshold::default_thresholds();
    let base_uphill_threshold = profile.and_then(|p| p.walk_threshold_percent).unwrap_or(default_uphill);
    let decisions = threshold::process_route_adaptive(segments, total_distance_km, base_uphill_threshold, default_downhill);

    let mut strava = Accumulator::default();
    let mut minetti = Accumulator::default();
    let mut strava_minetti = Accumulator::default();

    let valid_profile = profile.filter(|p| p.is_valid());
    let mut personalized_race = Accumulator::default();
    let mut personalized_moderate = Accumulator::default();
    let mut personalized_easy = Accumulator::default();

    let mut combo_strava_tobler = Accumulator::default();
    let mut combo_strava_naismith = Accumulator::default();
    let mut combo_minetti_tobler = Accumulator::default();
    let mut combo_minetti_naismith = Accumulator::default();
    let mut combo_strava_minetti_tobler = Accumulator::default();
    let mut combo_strava_minetti_naismith = Accumulator::default();

    let mut combined = Accumulator::default();
    let mut running_distance_km = 0.0;
    let mut running_time_hours = 0.0;
    let mut hiking_distance_km = 0.0;
    let mut hiking_time_hours = 0.0;

    for (segment, decision) in segments.iter().zip(decisions.iter()) {
        let gradient = segment.gradient_percent();

        let strava_raw = calculate(segment, PaceMethod::Gap(GapMode::Strava), 1.0).time_hours;
        strava.push(strava_raw, fatigue, gradient);

        let minetti_raw = calculate(segment, PaceMethod::Gap(GapMode::Minetti), 1.0).time_hours;
        minetti.push(minetti_raw, fatigue, gradient);

        let strava_minetti_raw = calculate(segment, PaceMethod::Gap(GapMode::StravaMinetti), 1.0).time_hours;
        strava_minetti.push(strava_minetti_raw, fatigue, gradient);

        let tobler_raw = calculate(segment, PaceMethod::Tobler, 1.0).time_hours;
        let naismith_raw = calculate(segment, PaceMethod::Naismith, 1.0).time_hours;

        if let Some(profile) = valid_profile {
            for (effort, accumulator) in [
                (EffortLevel::Race, &mut personalized_race),
                (EffortLevel::Moderate, &mut personalized_moderate),
                (EffortLevel::Easy, &mut personalized_easy),
            ] {
                let pace = personalised_pace_min_per_km(&profile.pace_table, gradient, effort, FallbackFormula::StravaGap);
                let time_hours = calculate(segment, PaceMethod::PersonalisedRun { pace_min_per_km: pace, effort }, 1.0).time_hours;
                accumulator.push(time_hours, fatigue, gradient);
            }
        }

        let is_hike = decision.mode == MovementMode::Hike;

        let run_value_for = |gap_raw: f64| if is_hike { None } else { Some(gap_raw) };
        combo_strava_tobler.push(run_value_for(strava_raw).unwrap_or(tobler_raw), fatigue, gradient);
        combo_strava_naismith.push(run_value_for(strava_raw).unwrap_or(naismith_raw), fatigue, gradient);
        combo_minetti_tobler.push(run_value_for(minetti_raw).unwrap_or(tobler_raw), fatigue, gradient);
        combo_minetti_naismith.push(run_value_for(minetti_raw).unwrap_or(naismith_raw), fatigue, gradient);
        combo_strava_minetti_tobler.push(run_value_for(strava_minetti_raw).unwrap_or(tobler_raw), fatigue, gradient);
        combo_strava_minetti_naismith.push(run_value_for(strava_minetti_raw).unwrap_or(naismith_raw), fatigue, gradient);

        let combined_raw = if is_hike {
            tobler_raw
        } else if let Some(profile) = valid_profile {
            let pace =
                personalised_pace_min_per_km(&profile.pace_table, gradient, EffortLevel::Moderate, FallbackFormula::StravaGap);
            calculate(segment, PaceMethod::PersonalisedRun { pace_min_per_km: pace, effort: EffortLevel::Moderate }, 1.0)
                .time_hours
        } else {
            strava_minetti_raw
        };
        let elapsed_before = combined.elapsed_h;
        combined.push(combined_raw, fatigue, gradient);
        let adjusted = combined.elapsed_h - elapsed_before;

        if is_hike {
            hiking_distance_km += segment.distance_km;
            hiking_time_hours += adjusted;
        } else {
            running_distance_km += segment.distance_km;
            running_time_hours += adjusted;
        }
    }

    let flat_equivalent_hours = if FLAT_BASELINE_SPEED_KMH > 0.0 { total_distance_km / FLAT_BASELINE_SPEED_KMH } else { 0.0 };
    let elevation_impact_percent = if flat_equivalent_hours > 0.0 {
        (combined.total_h / flat_equivalent_hours - 1.0) * 100.0
    } else {
        0.0
    };

    RunningEstimate {
        all_run_strava_hours: strava.total_h,
        all_run_minetti_hours: minetti.total_h,
        all_run_strava_minetti_hours: strava_minetti.total_h,
        all_run_personalized_hours: valid_profile.map(|_| PersonalizedTotals {
            race_hours: personalized_race.total_h,
            moderate_hours: personalized_moderate.total_h,
            easy_hours: personalized_easy.total_h,
        }),
        run_hike_hours: RunHikeTotals {
            strava_tobler_hours: combo_strava_tobler.total_h,
            strava_naismith_hours: combo_strava_naismith.total_h,
            minetti_tobler_hours: combo_minetti_tobler.total_h,
            minetti_naismith_hours: combo_minetti_naismith.total_h,
            strava_minetti_tobler_hours: combo_strava_minetti_tobler.total_h,
            strava_minetti_naismith_hours: combo_strava_minetti_naismith.total_h,
        },
        combined_hours: combined.total_h,
        running_distance_km,
        running_time_hours,
        hiking_distance_km,
        hiking_time_hours,
        total_distance_km,
        elevation_impact_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailtime_core::model::{CategoryStats, PaceTable, SegmentType};

    fn flat_segment(distance_km: f64) -> MacroSegment {
        MacroSegment {
            ordinal: 1,
            segment_type: SegmentType::Flat,
            distance_km,
            elevation_gain_m: 0.0,
            elevation_loss_m: 0.0,
            start_elevation_m: 1000.0,
            end_elevation_m: 1000.0,
        }
    }

    fn steep_ascent(distance_km: f64, gain_m: f64) -> MacroSegment {
        MacroSegment {
            ordinal: 2,
            segment_type: SegmentType::Ascent,
            distance_km,
            elevation_gain_m: gain_m,
            elevation_loss_m: 0.0,
            start_elevation_m: 1000.0,
            end_elevation_m: 1000.0 + gain_m,
        }
    }

    #[test]
    fn hiking_without_profile_has_no_personalized_totals() {
        let segments = vec![flat_segment(5.0)];
        let estimate = predict_hiking(&segments, None, None);
        assert!(estimate.naismith_personalized_hours.is_none());
        assert!(estimate.tobler_personalized_hours.is_none());
        assert!(estimate.naismith_hours > 0.0);
    }

    #[test]
    fn hiking_with_profile_produces_personalized_totals() {
        let segments = vec![flat_segment(5.0)];
        let mut table = PaceTable::new();
        table.insert(
            GradientCategory::Flat,
            CategoryStats { avg_pace_min_per_km: 10.0, sample_count: 20, percentiles: None },
        );
        let profile = HikingProfile {
            user_id: uuid::Uuid::nil(),
            pace_table: table,
            total_activities_analyzed: 10,
            total_hike_activities: 10,
            total_distance_km: 100.0,
            total_elevation_m: 2000.0,
            vertical_ability: 1.0,
            last_calculated_at: chrono::Utc::now(),
        };
        let estimate = predict_hiking(&segments, Some(&profile), None);
        assert!(estimate.tobler_personalized_hours.is_some());
    }

    #[test]
    fn running_estimate_splits_distance_between_run_and_hike() {
        let segments = vec![flat_segment(5.0), steep_ascent(1.0, 400.0)];
        let estimate = predict_running(&segments, None, None);
        assert!((estimate.running_distance_km + estimate.hiking_distance_km - estimate.total_distance_km).abs() < 1e-6);
        assert!(estimate.hiking_distance_km > 0.0, "steep ascent should be hiked");
    }

    #[test]
    fn running_estimate_has_six_run_hike_combinations() {
        let segments = vec![flat_segment(10.0)];
        let estimate = predict_running(&segments, None, None);
        assert!(estimate.run_hike_hours.strava_tobler_hours > 0.0);
        assert!(estimate.run_hike_hours.strava_minetti_naismith_hours > 0.0);
    }
}
