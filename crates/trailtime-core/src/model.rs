// ABOUTME: Persisted and computed domain types shared by the analytics, provider and sync crates
// ABOUTME: Points/segments are pure computation; Activity/Profile/Token/Notification are persisted rows

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gradient::{GradientCategory, LegacyGradientCategory, ALL_CATEGORIES};

/// A single GPS fix: latitude and longitude in degrees, elevation in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Latitude, degrees.
    pub latitude_deg: f64,
    /// Longitude, degrees.
    pub longitude_deg: f64,
    /// Elevation, metres.
    pub elevation_m: f64,
}

impl Point {
    /// Construct a point.
    #[must_use]
    pub fn new(latitude_deg: f64, longitude_deg: f64, elevation_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            elevation_m,
        }
    }
}

/// The movement-type classification of a macro-segment, derived from its own signed gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    /// Net signed gradient `> +3%`.
    Ascent,
    /// Net signed gradient `< -3%`.
    Descent,
    /// Net signed gradient within `[-3%, +3%]`.
    Flat,
}

/// A direction-coherent stretch of a track, the unit of prediction.
///
/// Invariant: `distance_km >= MIN_SEGMENT_KM` except possibly the last segment
/// of a track. Invariant: `segment_type` is derived from this segment's own
/// `start_elevation_m`/`end_elevation_m`, never from the direction label used
/// while detecting the segment boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroSegment {
    /// 1-based position of this segment within its track.
    pub ordinal: u32,
    /// Movement-type classification.
    pub segment_type: SegmentType,
    /// Horizontal distance, kilometres.
    pub distance_km: f64,
    /// Cumulative elevation gain within the segment, metres (always `>= 0`).
    pub elevation_gain_m: f64,
    /// Cumulative elevation loss within the segment, metres (always `>= 0`).
    pub elevation_loss_m: f64,
    /// Elevation at the segment's start, metres.
    pub start_elevation_m: f64,
    /// Elevation at the segment's end, metres.
    pub end_elevation_m: f64,
}

impl MacroSegment {
    /// Net signed elevation change (`end - start`), metres.
    #[must_use]
    pub fn elevation_change_m(&self) -> f64 {
        self.end_elevation_m - self.start_elevation_m
    }

    /// Gradient in percent over the segment's full span.
    #[must_use]
    pub fn gradient_percent(&self) -> f64 {
        if self.distance_km <= 0.0 {
            return 0.0;
        }
        (self.elevation_change_m() / (self.distance_km * 1000.0)) * 100.0
    }

    /// Gradient in degrees over the segment's full span.
    #[must_use]
    pub fn gradient_degrees(&self) -> f64 {
        (self.gradient_percent() / 100.0).atan().to_degrees()
    }

    /// Classify this segment's type from its own signed gradient.
    #[must_use]
    pub fn classify_type(gradient_percent: f64) -> SegmentType {
        if gradient_percent > 3.0 {
            SegmentType::Ascent
        } else if gradient_percent < -3.0 {
            SegmentType::Descent
        } else {
            SegmentType::Flat
        }
    }
}

/// Percentile triple for a pace-table category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    /// 25th percentile pace, min/km.
    pub p25: f64,
    /// 50th percentile (median) pace, min/km.
    pub p50: f64,
    /// 75th percentile pace, min/km.
    pub p75: f64,
}

/// Aggregate statistics for one gradient-taxonomy category within a `PaceTable`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Mean pace of retained (post-filter) samples, min/km.
    pub avg_pace_min_per_km: f64,
    /// Number of retained samples backing this category.
    pub sample_count: usize,
    /// Percentile breakdown, when enough samples survived filtering to compute them.
    pub percentiles: Option<Percentiles>,
}

/// A mapping from gradient category to pace statistics, for one user and one activity kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaceTable {
    entries: HashMap<GradientCategory, CategoryStats>,
}

impl PaceTable {
    /// An empty pace table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the stats for a category.
    pub fn insert(&mut self, category: GradientCategory, stats: CategoryStats) {
        self.entries.insert(category, stats);
    }

    /// Look up the stats for a category, if present.
    #[must_use]
    pub fn get(&self, category: GradientCategory) -> Option<&CategoryStats> {
        self.entries.get(&category)
    }

    /// The flat-category pace, used by the Personaliser's validity predicate.
    #[must_use]
    pub fn flat_pace(&self) -> Option<f64> {
        self.get(GradientCategory::Flat).map(|s| s.avg_pace_min_per_km)
    }

    /// Number of populated categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no populated categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over populated `(category, stats)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&GradientCategory, &CategoryStats)> {
        self.entries.iter()
    }

    /// Project the 11-bin table down to the legacy 7-bin taxonomy, as a
    /// sample-weighted mean over the 11-bin entries mapping to each legacy
    /// label. A display-layer view only — never a second pace-fitting pass.
    #[must_use]
    pub fn legacy_view(&self) -> HashMap<LegacyGradientCategory, CategoryStats> {
        let mut weighted: HashMap<LegacyGradientCategory, (f64, usize)> = HashMap::new();
        for category in ALL_CATEGORIES {
            let Some(stats) = self.get(category) else { continue };
            let entry = weighted.entry(category.to_legacy()).or_insert((0.0, 0));
            entry.0 += stats.avg_pace_min_per_km * stats.sample_count as f64;
            entry.1 += stats.sample_count;
        }
        weighted
            .into_iter()
            .filter(|(_, (_, count))| *count > 0)
            .map(|(legacy, (weighted_sum, count))| {
                (
                    legacy,
                    CategoryStats {
                        avg_pace_min_per_km: weighted_sum / count as f64,
                        sample_count: count,
                        percentiles: None,
                    },
                )
            })
            .collect()
    }
}

/// A user's hiking pace profile, rebuilt by the `ProfileBuilder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HikingProfile {
    /// Owning user.
    pub user_id: Uuid,
    /// 11-bin pace table.
    pub pace_table: PaceTable,
    /// Total activities analysed when this profile was last built.
    pub total_activities_analyzed: u32,
    /// Total hiking (Hike/Walk) activities contributing.
    pub total_hike_activities: u32,
    /// Total distance analysed, kilometres.
    pub total_distance_km: f64,
    /// Total elevation gain analysed, metres.
    pub total_elevation_m: f64,
    /// `(uphill_pace / flat_pace) / 1.5`; deviation from Naismith's assumed 1.5x slowdown.
    pub vertical_ability: f64,
    /// When this profile was last (re)calculated.
    pub last_calculated_at: DateTime<Utc>,
}

impl HikingProfile {
    /// A profile is usable by the Personaliser iff it has a flat pace and at least one
    /// analysed activity.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.pace_table.flat_pace().is_some() && self.total_activities_analyzed >= 1
    }
}

/// Effort level selecting which percentile of a pace-table category to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    /// Fastest plausible pace: `p25`.
    Race,
    /// Typical pace: `p50`.
    Moderate,
    /// Conservative pace: `p75`.
    Easy,
}

impl EffortLevel {
    /// Select the percentile this effort level maps to.
    #[must_use]
    pub fn percentile(self, p: Percentiles) -> f64 {
        match self {
            Self::Race => p.p25,
            Self::Moderate => p.p50,
            Self::Easy => p.p75,
        }
    }
}

/// Which of a user's two profiles an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// The hiking (Hike/Walk) pace profile.
    Hiking,
    /// The running (Run/TrailRun/VirtualRun) pace profile.
    Running,
}

/// A user's running pace profile, rebuilt by the `ProfileBuilder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProfile {
    /// Owning user.
    pub user_id: Uuid,
    /// 11-bin pace table.
    pub pace_table: PaceTable,
    /// Total activities analysed when this profile was last built.
    pub total_activities_analyzed: u32,
    /// Total running (Run/TrailRun/VirtualRun) activities contributing.
    pub total_run_activities: u32,
    /// Total distance analysed, kilometres.
    pub total_distance_km: f64,
    /// Total elevation gain analysed, metres.
    pub total_elevation_m: f64,
    /// Auto-detected uphill walk threshold, percent; `None` if not enough uphill splits.
    pub walk_threshold_percent: Option<f64>,
    /// When this profile was last (re)calculated.
    pub last_calculated_at: DateTime<Utc>,
}

impl RunProfile {
    /// A profile is usable by the Personaliser iff it has a flat pace and at least one
    /// analysed activity.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.pace_table.flat_pace().is_some() && self.total_activities_analyzed >= 1
    }
}

/// The activity-provider's workout type for one `Activity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ActivityType {
    /// Road or trail run.
    Run,
    /// Trail-specific run.
    TrailRun,
    /// Indoor/virtual run.
    VirtualRun,
    /// Hike.
    Hike,
    /// Walk.
    Walk,
    /// Any other provider activity type, not relevant to this system.
    Other,
}

impl ActivityType {
    /// Whether this type belongs to the hiking family (`Hike`, `Walk`).
    #[must_use]
    pub fn is_hiking(self) -> bool {
        matches!(self, Self::Hike | Self::Walk)
    }

    /// Whether this type belongs to the running family (`Run`, `TrailRun`, `VirtualRun`).
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Run | Self::TrailRun | Self::VirtualRun)
    }

    /// Whether splits for this type are worth fetching and syncing.
    #[must_use]
    pub fn is_supported(self) -> bool {
        self.is_hiking() || self.is_running()
    }
}

/// An external workout record, keyed by the provider's own activity id. GPS traces
/// are never persisted here — only the aggregate fields and derived `Split`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Provider's activity id (unique, used for insert-if-absent dedup).
    pub provider_activity_id: i64,
    /// Owning user.
    pub user_id: Uuid,
    /// The provider's activity title.
    pub name: String,
    /// Workout type.
    pub activity_type: ActivityType,
    /// Start timestamp (UTC).
    pub start_date: DateTime<Utc>,
    /// Distance, metres.
    pub distance_m: f64,
    /// Moving time, seconds.
    pub moving_time_s: u32,
    /// Elapsed (wall-clock) time, seconds.
    pub elapsed_time_s: u32,
    /// Total elevation gain, metres.
    pub elevation_gain_m: f64,
    /// Total elevation loss, metres (the provider does not always supply this).
    pub elevation_loss_m: Option<f64>,
    /// Average speed, m/s, as reported by the provider.
    pub average_speed_mps: Option<f64>,
    /// Peak speed, m/s, as reported by the provider.
    pub max_speed_mps: Option<f64>,
    /// Average heart rate, bpm, as reported by the provider.
    pub average_heartrate: Option<f64>,
    /// Peak heart rate, bpm, as reported by the provider.
    pub max_heartrate: Option<f64>,
    /// Average cadence, as reported by the provider.
    pub average_cadence: Option<f64>,
    /// Provider's relative-effort score for the activity.
    pub suffer_score: Option<i64>,
    /// Whether per-kilometre splits have been fetched and stored for this activity.
    pub splits_synced: bool,
}

/// One ~1 km split of an `Activity`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Split {
    /// 1-based position within the activity.
    pub ordinal: u32,
    /// Split distance, metres.
    pub distance_m: f64,
    /// Split moving time, seconds.
    pub moving_time_s: u32,
    /// Elevation difference over the split, metres.
    pub elevation_diff_m: f64,
}

impl Split {
    /// Pace, minutes per kilometre. `None` if distance is non-positive.
    #[must_use]
    pub fn pace_min_per_km(&self) -> Option<f64> {
        if self.distance_m <= 0.0 {
            return None;
        }
        Some((f64::from(self.moving_time_s) / 60.0) / (self.distance_m / 1000.0))
    }

    /// Gradient, percent.
    #[must_use]
    pub fn gradient_percent(&self) -> Option<f64> {
        if self.distance_m <= 0.0 {
            return None;
        }
        Some(self.elevation_diff_m / self.distance_m * 100.0)
    }
}

/// Per-user incremental-sync state. Owns the `in_progress` flag that acts as a
/// per-user distributed lock: held for the duration of one sync pass, released
/// on both success and failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCursor {
    /// Owning user.
    pub user_id: Uuid,
    /// Oldest synced activity start date.
    pub oldest_synced_date: Option<DateTime<Utc>>,
    /// Newest synced activity start date; monotonically non-decreasing across passes.
    pub newest_synced_date: Option<DateTime<Utc>>,
    /// Total activities synced to date.
    pub total_activities_synced: u32,
    /// Total activities with splits fetched to date.
    pub activities_with_splits: u32,
    /// Last error message, if the previous pass failed (truncated to 500 chars).
    pub last_error: Option<String>,
    /// Distributed-lock flag for "a pass is currently running".
    pub in_progress: bool,
    /// Whether the first full historical import has completed.
    pub initial_sync_complete: bool,
    /// Last checkpoint (percent, or 100 for final) at which a recalculation fired.
    pub last_recalc_checkpoint: u32,
    /// New activities (with splits) accumulated since the last post-sync recalculation.
    pub new_activities_since_recalc: u32,
    /// Timestamp of the last completed sync pass.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// When the currently-held `in_progress` lock was acquired; `None` when idle.
    /// Used by crash recovery to detect and clear a lock abandoned by a dead worker.
    pub sync_started_at: Option<DateTime<Utc>>,
}

impl SyncCursor {
    /// A fresh cursor for a user who has never been synced.
    #[must_use]
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            oldest_synced_date: None,
            newest_synced_date: None,
            total_activities_synced: 0,
            activities_with_splits: 0,
            last_error: None,
            in_progress: false,
            initial_sync_complete: false,
            last_recalc_checkpoint: 0,
            new_activities_since_recalc: 0,
            last_sync_at: None,
            sync_started_at: None,
        }
    }
}

/// OAuth credentials for one user against the activity provider. Treated as an
/// opaque secret pair by every caller except the `TokenVault`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Owning user.
    pub user_id: Uuid,
    /// Current access token.
    pub access_token: String,
    /// Current refresh token.
    pub refresh_token: String,
    /// Access token expiry, Unix epoch seconds.
    pub expires_at: i64,
    /// OAuth scope granted.
    pub scope: String,
}

impl Token {
    /// Whether this token is expired (or within the refresh margin) at `now`.
    #[must_use]
    pub fn needs_refresh(&self, now_epoch: i64, refresh_margin_secs: i64) -> bool {
        now_epoch + refresh_margin_secs >= self.expires_at
    }
}

/// The kind of user-visible event a `Notification` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Fired periodically during initial sync.
    SyncProgress,
    /// Fired once when initial sync completes.
    SyncComplete,
    /// Fired when a profile has been rebuilt.
    ProfileUpdated,
    /// Fired when a profile reaches a "fully built" state.
    ProfileComplete,
    /// Fired when a profile could not be built for lack of data.
    ProfileIncomplete,
    /// Fired when a user completes the provider OAuth connection flow.
    StravaConnected,
}

/// A user-visible event, created by the core and consumed by a presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Notification id, assigned by the store on insert.
    pub id: Option<i64>,
    /// Owning user.
    pub user_id: Uuid,
    /// Event kind.
    pub notification_type: NotificationType,
    /// Structured, type-specific payload.
    pub payload: Option<serde_json::Value>,
    /// Whether the presentation layer has marked this as read.
    pub read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
