// ABOUTME: Rebuilds a user's hiking/running pace profile from their synced splits
// ABOUTME: Physiological-band filter, 11-bin bucketing, IQR outlier removal, then percentiles

use chrono::{DateTime, Utc};
use uuid::Uuid;

use trailtime_core::constants::{
    HIKING_PACE_BAND_MIN_KM, MIN_SAMPLES_FOR_IQR, MIN_SPLITS_FOR_DETAILED_PROFILE,
    RUNNING_PACE_BAND_MIN_KM,
};
use trailtime_core::gradient::{GradientCategory, ALL_CATEGORIES};
use trailtime_core::model::{
    CategoryStats, HikingProfile, PaceTable, Percentiles, RunProfile, Split,
};

use crate::threshold::detect_uphill_threshold;

/// Aggregate counters the caller has already computed from a user's stored
/// activities (the profile builder itself only sees splits).
#[derive(Debug, Clone, Copy)]
pub struct ProfileAggregate {
    /// Total activities of any supported type analysed.
    pub total_activities_analyzed: u32,
    /// Total activities of the profile's own kind (hiking or running).
    pub total_type_activities: u32,
    /// Total distance analysed, kilometres.
    pub total_distance_km: f64,
    /// Total elevation gain analysed, metres.
    pub total_elevation_m: f64,
}

/// Nearest-rank quantile over already-sorted data: `rank = ceil(p * n)`,
/// 1-indexed and clamped to `[1, n]`. Matches the `statistics.quantiles`
/// quartile boundaries the profile data was originally computed with.
fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let rank = (p * n as f64).ceil() as usize;
    let idx = rank.clamp(1, n) - 1;
    sorted[idx]
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Remove IQR outliers (`[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`) from a bucket of paces.
/// A no-op when fewer than `MIN_SAMPLES_FOR_IQR` samples are present.
#[must_use]
pub fn filter_outliers_iqr(paces: &[f64]) -> Vec<f64> {
    if paces.len() < MIN_SAMPLES_FOR_IQR {
        return paces.to_vec();
    }
    let mut sorted = paces.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q1 = quantile_sorted(&sorted, 0.25);
    let q3 = quantile_sorted(&sorted, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;
    sorted.into_iter().filter(|&p| p >= lower && p <= upper).collect()
}

/// Compute `{p25, p50, p75}` for a bucket. `None` for an empty bucket; a
/// degenerate triple (all equal to the median) for fewer than three samples.
#[must_use]
pub fn calculate_percentiles(paces: &[f64]) -> Option<Percentiles> {
    if paces.is_empty() {
        return None;
    }
    let mut sorted = paces.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.len() < 3 {
        let median = quantile_sorted(&sorted, 0.5);
        return Some(Percentiles { p25: median, p50: median, p75: median });
    }
    Some(Percentiles {
        p25: quantile_sorted(&sorted, 0.25),
        p50: quantile_sorted(&sorted, 0.5),
        p75: quantile_sorted(&sorted, 0.75),
    })
}

/// Gradient/pace pairs from splits that have both, filtered to a physiological
/// pace band.
fn valid_banded_samples(splits: &[Split], band: (f64, f64)) -> Vec<(f64, f64)> {
    splits
        .iter()
        .filter_map(|s| Some((s.gradient_percent()?, s.pace_min_per_km()?)))
        .filter(|&(_, pace)| pace >= band.0 && pace <= band.1)
        .collect()
}

fn bucket_by_category(samples: &[(f64, f64)]) -> std::collections::HashMap<GradientCategory, Vec<f64>> {
    let mut buckets: std::collections::HashMap<GradientCategory, Vec<f64>> = std::collections::HashMap::new();
    for &(gradient, pace) in samples {
        buckets.entry(GradientCategory::classify(gradient)).or_default().push(pace);
    }
    buckets
}

/// Rebuild a user's running profile from their synced splits.
///
/// Returns `None` when there are fewer than `MIN_SPLITS_FOR_DETAILED_PROFILE`
/// splits with both a gradient and a pace — too thin to build any profile.
#[must_use]
pub fn rebuild_running(
    splits: &[Split],
    aggregate: ProfileAggregate,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Option<RunProfile> {
    let samples = valid_banded_samples(splits, RUNNING_PACE_BAND_MIN_KM);
    if samples.len() < MIN_SPLITS_FOR_DETAILED_PROFILE {
        return None;
    }

    let buckets = bucket_by_category(&samples);
    let mut table = PaceTable::new();
    for category in ALL_CATEGORIES {
        let Some(paces) = buckets.get(&category) else { continue };
        let filtered = filter_outliers_iqr(paces);
        if filtered.is_empty() {
            continue;
        }
        table.insert(
            category,
            CategoryStats {
                avg_pace_min_per_km: mean(&filtered),
                sample_count: filtered.len(),
                percentiles: calculate_percentiles(&filtered),
            },
        );
    }

    let walk_threshold_percent = detect_uphill_threshold(splits);

    Some(RunProfile {
        user_id,
        pace_table: table,
        total_activities_analyzed: aggregate.total_activities_analyzed,
        total_run_activities: aggregate.total_type_activities,
        total_distance_km: aggregate.total_distance_km,
        total_elevation_m: aggregate.total_elevation_m,
        walk_threshold_percent,
        last_calculated_at: now,
    })
}

/// Rebuild a user's hiking profile from their synced splits.
///
/// Below `MIN_SPLITS_FOR_DETAILED_PROFILE` valid samples, falls back to a
/// single flat-equivalent bucket built from the overall average pace rather
/// than returning nothing — a hiker with a handful of short walks still gets
/// a usable (if coarse) profile.
#[must_use]
pub fn rebuild_hiking(
    splits: &[Split],
    aggregate: ProfileAggregate,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> HikingProfile {
    let samples = valid_banded_samples(splits, HIKING_PACE_BAND_MIN_KM);

    let mut table = PaceTable::new();
    if samples.len() >= MIN_SPLITS_FOR_DETAILED_PROFILE {
        let buckets = bucket_by_category(&samples);
        for category in ALL_CATEGORIES {
            let Some(paces) = buckets.get(&category) else { continue };
            if paces.is_empty() {
                continue;
            }
            table.insert(
                category,
                CategoryStats {
                    avg_pace_min_per_km: mean(paces),
                    sample_count: paces.len(),
                    percentiles: None,
                },
            );
        }
    } else if !samples.is_empty() {
        let paces: Vec<f64> = samples.iter().map(|&(_, pace)| pace).collect();
        table.insert(
            GradientCategory::Flat,
            CategoryStats { avg_pace_min_per_km: mean(&paces), sample_count: paces.len(), percentiles: None },
        );
    }

    let vertical_ability = calculate_vertical_ability(&table);

    HikingProfile {
        user_id,
        pace_table: table,
        total_activities_analyzed: aggregate.total_activities_analyzed,
        total_hike_activities: aggregate.total_type_activities,
        total_distance_km: aggregate.total_distance_km,
        total_elevation_m: aggregate.total_elevation_m,
        vertical_ability,
        last_calculated_at: now,
    }
}

/// `(uphill_pace / flat_pace) / EXPECTED_UPHILL_FLAT_RATIO`, rounded to two
/// decimal places; `1.0` (Naismith's own assumption) when either pace is
/// unavailable.
fn calculate_vertical_ability(table: &PaceTable) -> f64 {
    use trailtime_core::constants::EXPECTED_UPHILL_FLAT_RATIO;
    use trailtime_core::gradient::LegacyGradientCategory;

    let Some(flat_pace) = table.flat_pace() else { return 1.0 };
    if flat_pace <= 0.0 {
        return 1.0;
    }
    let legacy = table.legacy_view();
    let uphill_pace = legacy
        .get(&LegacyGradientCategory::ModerateUphill)
        .or_else(|| legacy.get(&LegacyGradientCategory::GentleUphill))
        .map(|s| s.avg_pace_min_per_km);
    let Some(uphill_pace) = uphill_pace else { return 1.0 };

    let ratio = (uphill_pace / flat_pace) / EXPECTED_UPHILL_FLAT_RATIO;
    (ratio * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(gradient_percent: f64, pace_min_per_km: f64) -> Split {
        let distance_m = 1000.0;
        let elevation_diff_m = gradient_percent / 100.0 * distance_m;
        let moving_time_s = (pace_min_per_km * 60.0) as u32;
        Split { ordinal: 1, distance_m, moving_time_s, elevation_diff_m }
    }

    fn agg() -> ProfileAggregate {
        ProfileAggregate {
            total_activities_analyzed: 3,
            total_type_activities: 3,
            total_distance_km: 30.0,
            total_elevation_m: 500.0,
        }
    }

    #[test]
    fn too_few_splits_returns_no_running_profile() {
        let splits = vec![split(0.0, 6.0), split(0.0, 6.0)];
        assert!(rebuild_running(&splits, agg(), Uuid::nil(), Utc::now()).is_none());
    }

    #[test]
    fn running_profile_buckets_flat_splits() {
        let splits: Vec<Split> = (0..6).map(|_| split(0.0, 5.0)).collect();
        let profile = rebuild_running(&splits, agg(), Uuid::nil(), Utc::now()).expect("enough splits");
        let stats = profile.pace_table.get(GradientCategory::Flat).expect("flat bucket");
        assert_eq!(stats.sample_count, 6);
        assert!((stats.avg_pace_min_per_km - 5.0).abs() < 1e-9);
    }

    #[test]
    fn iqr_removes_a_single_extreme_outlier() {
        let mut paces = vec![5.0, 5.1, 4.9, 5.05, 5.0];
        paces.push(50.0);
        let filtered = filter_outliers_iqr(&paces);
        assert!(!filtered.contains(&50.0));
    }

    #[test]
    fn single_bucket_profile_matches_the_worked_percentile_example() {
        let paces = [5.0, 5.1, 5.2, 5.2, 5.3, 5.3, 5.4, 5.5, 5.6, 5.7, 12.0, 25.5];
        let splits: Vec<Split> = paces.iter().map(|&pace| split(0.0, pace)).collect();
        let profile = rebuild_running(&splits, agg(), Uuid::nil(), Utc::now()).expect("enough splits");
        let stats = profile.pace_table.get(GradientCategory::Flat).expect("flat bucket");

        assert_eq!(stats.sample_count, 10);
        assert!((stats.avg_pace_min_per_km - 5.33).abs() < 0.01);
        let percentiles = stats.percentiles.expect("enough samples for percentiles");
        assert!((percentiles.p25 - 5.2).abs() < 1e-9);
        assert!((percentiles.p50 - 5.3).abs() < 1e-9);
        assert!((percentiles.p75 - 5.5).abs() < 1e-9);
    }

    #[test]
    fn hiking_profile_falls_back_to_single_bucket_when_thin() {
        let splits = vec![split(0.0, 12.0), split(1.0, 13.0)];
        let profile = rebuild_hiking(&splits, agg(), Uuid::nil(), Utc::now());
        assert_eq!(profile.pace_table.len(), 1);
        assert!(profile.pace_table.get(GradientCategory::Flat).is_some());
    }

    #[test]
    fn vertical_ability_defaults_to_one_without_uphill_data() {
        let splits = vec![split(0.0, 12.0); 6];
        let profile = rebuild_hiking(&splits, agg(), Uuid::nil(), Utc::now());
        assert!((profile.vertical_ability - 1.0).abs() < 1e-9);
    }
}
