// ABOUTME: Storage abstraction for the sync pipeline: activities, splits, cursors, profiles,
// ABOUTME: tokens and notifications, grouped the way DatabaseProvider groups its repositories

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use trailtime_core::model::{
    Activity, ActivityType, HikingProfile, Notification, NotificationType, ProfileKind, RunProfile,
    Split, SyncCursor, Token,
};

/// Everything the sync pipeline, scheduler and notification bus need from
/// persistent storage. One implementation (`sqlite::SqliteActivityStore`) is
/// provided; tests may substitute their own.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    // ================================
    // Activities
    // ================================

    /// Insert an activity if its `provider_activity_id` isn't already present.
    /// Returns `None` on a duplicate rather than an error.
    async fn insert_activity_if_absent(&self, activity: &Activity) -> anyhow::Result<Option<Activity>>;

    /// Find an activity by its provider id, scoped to one user.
    async fn find_activity(&self, user_id: Uuid, provider_activity_id: i64) -> anyhow::Result<Option<Activity>>;

    /// List a user's activities, newest first, optionally filtered by type and paginated.
    async fn list_activities(
        &self,
        user_id: Uuid,
        activity_type: Option<ActivityType>,
        limit: u32,
        offset: u32,
    ) -> anyhow::Result<Vec<Activity>>;

    /// Mark an activity's splits as synced after they've been written.
    async fn mark_splits_synced(&self, user_id: Uuid, provider_activity_id: i64) -> anyhow::Result<()>;

    // ================================
    // Splits
    // ================================

    /// List splits for an activity, in ordinal order.
    async fn list_splits(&self, user_id: Uuid, provider_activity_id: i64) -> anyhow::Result<Vec<Split>>;

    /// Replace an activity's splits: delete any existing rows, then insert `splits`.
    async fn replace_splits(&self, user_id: Uuid, provider_activity_id: i64, splits: &[Split]) -> anyhow::Result<()>;

    /// List every split belonging to the user's activities of `activity_type`,
    /// across all activities — the input the `ProfileBuilder` consumes.
    async fn list_splits_for_activity_type(
        &self,
        user_id: Uuid,
        activity_type_family: ActivityTypeFamily,
    ) -> anyhow::Result<Vec<Split>>;

    // ================================
    // Sync cursor
    // ================================

    /// Fetch the user's sync cursor, creating a fresh one if none exists.
    async fn get_or_create_cursor(&self, user_id: Uuid) -> anyhow::Result<SyncCursor>;

    /// Persist a (possibly modified) cursor in place.
    async fn save_cursor(&self, cursor: &SyncCursor) -> anyhow::Result<()>;

    // ================================
    // Profiles
    // ================================

    /// Fetch a user's hiking profile, if one has been built.
    async fn get_hiking_profile(&self, user_id: Uuid) -> anyhow::Result<Option<HikingProfile>>;

    /// Fetch a user's running profile, if one has been built.
    async fn get_running_profile(&self, user_id: Uuid) -> anyhow::Result<Option<RunProfile>>;

    /// Replace a user's hiking profile.
    async fn upsert_hiking_profile(&self, profile: &HikingProfile) -> anyhow::Result<()>;

    /// Replace a user's running profile.
    async fn upsert_running_profile(&self, profile: &RunProfile) -> anyhow::Result<()>;

    // ================================
    // Tokens
    // ================================

    /// Fetch a user's stored provider token.
    async fn get_token(&self, user_id: Uuid) -> anyhow::Result<Option<Token>>;

    /// Replace a user's stored provider token (insert or update).
    async fn upsert_token(&self, token: &Token) -> anyhow::Result<()>;

    // ================================
    // Notifications
    // ================================

    /// Insert a notification and return its assigned id.
    async fn insert_notification(&self, notification: &Notification) -> anyhow::Result<i64>;

    /// List a user's notifications, optionally restricted to unread ones.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: u32,
    ) -> anyhow::Result<Vec<Notification>>;

    /// Mark the given notification ids as read for `user_id`.
    async fn mark_notifications_read(&self, user_id: Uuid, ids: &[i64]) -> anyhow::Result<()>;

    /// The external-channel identifier to push notifications to (e.g. a
    /// Telegram chat id), if the user has one on file.
    async fn notification_channel_for(&self, user_id: Uuid) -> anyhow::Result<Option<String>>;

    /// Users due for a scheduled sync: `last_sync_at` older than `stale_after`,
    /// or never synced.
    async fn users_due_for_sync(&self, stale_after: DateTime<Utc>) -> anyhow::Result<Vec<Uuid>>;

    /// Clear `in_progress` on any cursor whose lock was acquired before
    /// `stuck_before`, recovering from a worker that crashed mid-pass.
    /// Returns the affected user ids.
    async fn recover_stuck_syncs(&self, stuck_before: DateTime<Utc>) -> anyhow::Result<Vec<Uuid>>;
}

/// The activity-type family a profile rebuild or split query applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityTypeFamily {
    /// `Run`, `TrailRun`, `VirtualRun`.
    Running,
    /// `Hike`, `Walk`.
    Hiking,
}

impl ActivityTypeFamily {
    /// The `ProfileKind` this family rebuilds.
    #[must_use]
    pub const fn profile_kind(self) -> ProfileKind {
        match self {
            Self::Running => ProfileKind::Running,
            Self::Hiking => ProfileKind::Hiking,
        }
    }

    /// Whether `activity_type` belongs to this family.
    #[must_use]
    pub fn contains(self, activity_type: ActivityType) -> bool {
        match self {
            Self::Running => activity_type.is_running(),
            Self::Hiking => activity_type.is_hiking(),
        }
    }
}

/// Notification payload rendering, shared by the `ActivityStore`'s insert path
/// and the `NotificationBus`'s push formatter.
#[must_use]
pub fn notification_type_label(kind: NotificationType) -> &'static str {
    match kind {
        NotificationType::SyncProgress => "sync_progress",
        NotificationType::SyncComplete => "sync_complete",
        NotificationType::ProfileUpdated => "profile_updated",
        NotificationType::ProfileComplete => "profile_complete",
        NotificationType::ProfileIncomplete => "profile_incomplete",
        NotificationType::StravaConnected => "strava_connected",
    }
}
