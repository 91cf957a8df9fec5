// ABOUTME: Shared numeric constants for segmentation, pace formulas, fatigue and sync tuning
// ABOUTME: Single source of truth so calculators, profile builder and sync pipeline agree on tuning

/// Earth radius in kilometres, used by every Haversine computation.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Minimum macro-segment length in kilometres (the terminal segment may be shorter).
pub const MIN_SEGMENT_KM: f64 = 0.3;

/// Gradient, in percent, below which a step is classified `flat` (inclusive bound is `>`).
pub const FLAT_GRADIENT_MIN_PERCENT: f64 = -3.0;
/// Gradient, in percent, above which a step is classified `flat` (inclusive bound is `<`).
pub const FLAT_GRADIENT_MAX_PERCENT: f64 = 3.0;

/// Window size (points) for the centred moving-average elevation smoothing.
pub const ELEVATION_SMOOTHING_WINDOW: usize = 5;

/// Tobler's hiking function: gradient (decimal) at which speed peaks.
pub const TOBLER_OPTIMAL_GRADIENT: f64 = -0.05;
/// Tobler's hiking function: peak speed in km/h.
pub const TOBLER_MAX_SPEED_KMH: f64 = 6.0;
/// Tobler's hiking function: exponential decay rate.
pub const TOBLER_DECAY_RATE: f64 = 3.5;

/// Naismith's rule: base walking speed on flat ground, km/h.
pub const NAISMITH_BASE_SPEED_KMH: f64 = 5.0;
/// Naismith's rule: metres of ascent added per hour of extra time.
pub const NAISMITH_METERS_PER_HOUR_ASCENT: f64 = 600.0;
/// Langmuir correction: descent gradient (degrees) below which no correction applies.
pub const LANGMUIR_GENTLE_DESCENT_MIN_DEG: f64 = 5.0;
/// Langmuir correction: descent gradient (degrees) above which the correction flips sign.
pub const LANGMUIR_GENTLE_DESCENT_MAX_DEG: f64 = 12.0;

/// Default uphill gradient (%) above which a runner is assumed to hike.
pub const DEFAULT_HIKE_THRESHOLD_PERCENT: f64 = 25.0;
/// Default downhill gradient (%) below which a runner is assumed to hike.
pub const DEFAULT_DOWNHILL_HIKE_THRESHOLD_PERCENT: f64 = -30.0;
/// Lower clamp for an auto-detected or load-adjusted uphill threshold.
pub const MIN_HIKE_THRESHOLD_PERCENT: f64 = 25.0;
/// Upper clamp for an auto-detected or load-adjusted uphill threshold.
pub const MAX_HIKE_THRESHOLD_PERCENT: f64 = 35.0;
/// Minimum number of uphill splits required to auto-detect a walk threshold.
pub const MIN_UPHILL_SPLITS_FOR_THRESHOLD: usize = 10;
/// Gradient (%) above which a split counts as "uphill" for threshold detection.
pub const UPHILL_SPLIT_GRADIENT_PERCENT: f64 = 5.0;

/// Hiking fatigue: hours before degradation kicks in.
pub const HIKING_FATIGUE_THRESHOLD_HOURS: f64 = 3.0;
/// Hiking fatigue: linear degradation rate per hour past the threshold.
pub const HIKING_FATIGUE_LINEAR_RATE: f64 = 0.03;
/// Hiking fatigue: quadratic degradation rate per hour² past the threshold.
pub const HIKING_FATIGUE_QUADRATIC_RATE: f64 = 0.005;

/// Running fatigue: hours before degradation kicks in (short routes).
pub const RUNNING_FATIGUE_THRESHOLD_HOURS: f64 = 2.0;
/// Running fatigue: hours before degradation kicks in (≥50 km routes).
pub const RUNNING_FATIGUE_THRESHOLD_HOURS_50K: f64 = 3.0;
/// Running fatigue: hours before degradation kicks in (≥100 km routes).
pub const RUNNING_FATIGUE_THRESHOLD_HOURS_100K: f64 = 4.0;
/// Distance (km) at which the 50K fatigue threshold applies.
pub const FATIGUE_DISTANCE_50K_KM: f64 = 50.0;
/// Distance (km) at which the 100K fatigue threshold applies.
pub const FATIGUE_DISTANCE_100K_KM: f64 = 100.0;
/// Running fatigue: linear degradation rate per hour past the threshold.
pub const RUNNING_FATIGUE_LINEAR_RATE: f64 = 0.05;
/// Running fatigue: quadratic degradation rate per hour² past the threshold.
pub const RUNNING_FATIGUE_QUADRATIC_RATE: f64 = 0.008;
/// Running fatigue: extra multiplier applied on downhill segments.
pub const RUNNING_DOWNHILL_FATIGUE_MULTIPLIER: f64 = 1.5;
/// Gradient (%) below which a segment counts as "downhill" for fatigue purposes.
pub const DOWNHILL_FATIGUE_GRADIENT_PERCENT: f64 = -5.0;

/// Minimum samples in a pace-table category before it is trusted over the fallback formula.
pub const MIN_SAMPLES_FOR_PERSONALISATION: usize = 5;

/// Physiological pace band for hikers, minutes per km.
pub const HIKING_PACE_BAND_MIN_KM: (f64, f64) = (4.0, 25.0);
/// Physiological pace band for runners, minutes per km.
pub const RUNNING_PACE_BAND_MIN_KM: (f64, f64) = (2.5, 30.0);
/// Minimum splits required for the detailed (bucketed) profile-building path.
pub const MIN_SPLITS_FOR_DETAILED_PROFILE: usize = 5;
/// Minimum remaining samples in a bucket after IQR filtering to compute full percentiles.
pub const MIN_SAMPLES_FOR_IQR: usize = 4;

/// Expected uphill/flat pace ratio Naismith assumes, used to derive `vertical_ability`.
pub const EXPECTED_UPHILL_FLAT_RATIO: f64 = 1.5;

/// Token refresh margin in seconds: refresh when `now + margin >= expires_at`.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Activity-provider rate limit: requests allowed per 15-minute window.
pub const PROVIDER_RATE_LIMIT_SHORT_WINDOW_REQUESTS: u32 = 200;
/// Activity-provider rate limit: short window duration in seconds.
pub const PROVIDER_RATE_LIMIT_SHORT_WINDOW_SECS: u64 = 15 * 60;
/// Activity-provider rate limit: requests allowed per 24-hour window.
pub const PROVIDER_RATE_LIMIT_DAILY_WINDOW_REQUESTS: u32 = 2000;
/// Activity-provider rate limit: daily window duration in seconds.
pub const PROVIDER_RATE_LIMIT_DAILY_WINDOW_SECS: u64 = 24 * 60 * 60;
/// Maximum activities requested per provider page.
pub const MAX_ACTIVITIES_PER_PAGE: u32 = 200;

/// Cross-service token resolver cache TTL in seconds.
pub const CROSS_SERVICE_TOKEN_CACHE_SECS: u64 = 30 * 60;

/// How far back the initial historical sync reaches, in days.
pub const MAX_SYNC_HISTORY_DAYS: i64 = 365;
/// Default batch size for one sync pass.
pub const DEFAULT_SYNC_BATCH_SIZE: u32 = 10;
/// Delay between per-activity detail fetches, in milliseconds.
pub const API_CALL_DELAY_MS: u64 = 1500;
/// Emit a `sync_progress` notification every N synced activities during initial sync.
pub const PROGRESS_NOTIFICATION_INTERVAL: u32 = 10;
/// Activities-with-splits count that fires the first incremental recalculation.
pub const INITIAL_RECALC_AFTER_N_ACTIVITIES: u32 = 5;
/// Percent-of-estimated-total checkpoints for incremental recalculation during initial sync.
pub const INITIAL_RECALC_PROGRESS_CHECKPOINTS: [u32; 2] = [30, 60];
/// New activities (with splits) since the last recalculation that triggers a post-sync rebuild.
pub const POST_SYNC_RECALC_MIN_NEW_ACTIVITIES: u32 = 3;
/// Minimum interval between scheduled syncs for an idle user, in hours.
pub const MIN_SYNC_INTERVAL_HOURS: i64 = 6;
/// Concurrent users processed per scheduler batch.
pub const USERS_PER_BATCH: usize = 5;
/// Age, in hours, past which a stuck `in_progress` flag is cleared by crash recovery.
pub const STUCK_SYNC_RECOVERY_HOURS: i64 = 1;

/// HTTP timeout for calls to the activity provider, in seconds.
pub const PROVIDER_HTTP_TIMEOUT_SECS: u64 = 30;
/// HTTP timeout for calls to the cross-service token resolver, in seconds.
pub const CROSS_SERVICE_HTTP_TIMEOUT_SECS: u64 = 10;
/// Timeout for a notification push to the external channel, in seconds.
pub const NOTIFICATION_PUSH_TIMEOUT_SECS: u64 = 10;
