// ABOUTME: Per-user sync state machine: fetch new activities, their splits, then rebuild profiles
// ABOUTME: The cursor's in_progress flag is a per-user distributed lock, cleared on every exit path

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use trailtime_analytics::profile_builder::{rebuild_hiking, rebuild_running, ProfileAggregate};
use trailtime_core::constants::{
    API_CALL_DELAY_MS, INITIAL_RECALC_AFTER_N_ACTIVITIES, INITIAL_RECALC_PROGRESS_CHECKPOINTS,
    MAX_SYNC_HISTORY_DAYS, POST_SYNC_RECALC_MIN_NEW_ACTIVITIES, PROGRESS_NOTIFICATION_INTERVAL,
};
use trailtime_core::model::{Activity, ActivityType, NotificationType, ProfileKind, SyncCursor};
use trailtime_providers::ProviderClient;

use crate::error::SyncError;
use crate::notifications::NotificationBus;
use crate::store::{ActivityStore, ActivityTypeFamily};

/// Outcome of one `sync_user` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pass ran to completion (which may itself have done no work, if the
    /// provider returned no new activities).
    Completed,
    /// Skipped: another pass for this user was already running.
    AlreadyInProgress,
}

/// Drives one user's activity sync and the incremental profile rebuilds it triggers.
pub struct SyncPipeline {
    store: Arc<dyn ActivityStore>,
    provider: Arc<ProviderClient>,
    notifications: Arc<NotificationBus>,
}

impl SyncPipeline {
    /// Build a pipeline over `store`, fetching from `provider` and notifying through `notifications`.
    #[must_use]
    pub fn new(store: Arc<dyn ActivityStore>, provider: Arc<ProviderClient>, notifications: Arc<NotificationBus>) -> Self {
        Self { store, provider, notifications }
    }

    /// Run one sync pass for `user_id`, fetching up to `batch` new activities.
    ///
    /// Returns [`SyncOutcome::AlreadyInProgress`] without doing any work if a
    /// pass for this user is already running. On any other failure, the
    /// cursor's `in_progress` flag is cleared and `last_error` recorded before
    /// the error is returned.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, batch))]
    pub async fn sync_user(&self, user_id: Uuid, batch: u32) -> anyhow::Result<SyncOutcome> {
        if self.store.get_token(user_id).await?.is_none() {
            return Err(SyncError::NotConnected { user_id }.into());
        }

        let mut cursor = self.store.get_or_create_cursor(user_id).await?;
        if cursor.in_progress {
            return Ok(SyncOutcome::AlreadyInProgress);
        }
        cursor.in_progress = true;
        cursor.sync_started_at = Some(Utc::now());
        self.store.save_cursor(&cursor).await?;

        match self.run_pass(user_id, batch, cursor).await {
            Ok(()) => Ok(SyncOutcome::Completed),
            Err(source) => {
                let mut cursor = self.store.get_or_create_cursor(user_id).await?;
                cursor.in_progress = false;
                cursor.sync_started_at = None;
                cursor.last_error = Some(truncate(&source.to_string(), 500));
                self.store.save_cursor(&cursor).await?;
                Err(source)
            }
        }
    }

    async fn run_pass(&self, user_id: Uuid, batch: u32, mut cursor: SyncCursor) -> anyhow::Result<()> {
        let after =
            cursor.newest_synced_date.unwrap_or_else(|| Utc::now() - chrono::Duration::days(MAX_SYNC_HISTORY_DAYS));
        let before = Utc::now();
        let page = self.provider.list_activities(user_id, after, before, batch).await?;
        let page_len = page.len() as u32;

        let mut inserted: Vec<Activity> = Vec::new();
        for wire in page {
            let activity = wire.into_activity(user_id);
            if let Some(activity) = self.store.insert_activity_if_absent(&activity).await? {
                inserted.push(activity);
            }
        }

        let mut types_in_batch: HashSet<ActivityType> = HashSet::new();
        let mut new_splits_this_pass: u32 = 0;
        for activity in &inserted {
            if !activity.activity_type.is_supported() {
                continue;
            }
            tokio::time::sleep(Duration::from_millis(API_CALL_DELAY_MS)).await;
            match self.provider.fetch_activity_detail(user_id, activity.provider_activity_id).await {
                Ok(detail) => {
                    self.store.replace_splits(user_id, activity.provider_activity_id, &detail.splits).await?;
                    self.store.mark_splits_synced(user_id, activity.provider_activity_id).await?;
                    types_in_batch.insert(activity.activity_type);
                    cursor.activities_with_splits += 1;
                    new_splits_this_pass += 1;
                }
                Err(source) => {
                    tracing::warn!(
                        %user_id,
                        provider_activity_id = activity.provider_activity_id,
                        %source,
                        "failed to fetch activity detail",
                    );
                }
            }
        }

        let synced_before = cursor.total_activities_synced;
        if let Some(newest) = inserted.iter().map(|a| a.start_date).max() {
            cursor.newest_synced_date = Some(cursor.newest_synced_date.map_or(newest, |prev| prev.max(newest)));
        }
        if let Some(oldest) = inserted.iter().map(|a| a.start_date).min() {
            cursor.oldest_synced_date = Some(cursor.oldest_synced_date.map_or(oldest, |prev| prev.min(oldest)));
        }
        cursor.total_activities_synced += inserted.len() as u32;
        cursor.last_sync_at = Some(Utc::now());
        cursor.last_error = None;

        if !cursor.initial_sync_complete
            && crossed_multiple(synced_before, cursor.total_activities_synced, PROGRESS_NOTIFICATION_INTERVAL)
        {
            self.notifications
                .create_and_send(
                    user_id,
                    NotificationType::SyncProgress,
                    Some(json!({ "total_activities_synced": cursor.total_activities_synced })),
                )
                .await?;
        }

        let was_already_complete = cursor.initial_sync_complete;
        let just_completed = !was_already_complete && page_len < batch;
        if just_completed {
            cursor.initial_sync_complete = true;
            cursor.last_recalc_checkpoint = 100;
        } else if was_already_complete {
            cursor.new_activities_since_recalc += new_splits_this_pass;
        }

        self.store.save_cursor(&cursor).await?;

        if just_completed {
            self.rebuild_profile(user_id, ProfileKind::Running).await?;
            self.rebuild_profile(user_id, ProfileKind::Hiking).await?;
            self.notifications.create_and_send(user_id, NotificationType::SyncComplete, None).await?;
        } else if should_recalc(&mut cursor) {
            self.store.save_cursor(&cursor).await?;
            for family in families_in(&types_in_batch) {
                self.rebuild_profile(user_id, family.profile_kind()).await?;
            }
        }

        cursor.in_progress = false;
        cursor.sync_started_at = None;
        self.store.save_cursor(&cursor).await?;

        Ok(())
    }

    async fn rebuild_profile(&self, user_id: Uuid, kind: ProfileKind) -> anyhow::Result<()> {
        let family = match kind {
            ProfileKind::Running => ActivityTypeFamily::Running,
            ProfileKind::Hiking => ActivityTypeFamily::Hiking,
        };
        let splits = self.store.list_splits_for_activity_type(user_id, family).await?;
        let aggregate = self.aggregate_for(user_id, family).await?;
        let now = Utc::now();

        let label = match family {
            ActivityTypeFamily::Running => "running",
            ActivityTypeFamily::Hiking => "hiking",
        };

        match family {
            ActivityTypeFamily::Running => match rebuild_running(&splits, aggregate, user_id, now) {
                Some(profile) => {
                    self.store.upsert_running_profile(&profile).await?;
                    self.notifications
                        .create_and_send(user_id, NotificationType::ProfileUpdated, Some(json!({ "kind": label })))
                        .await?;
                }
                None => {
                    self.notifications
                        .create_and_send(user_id, NotificationType::ProfileIncomplete, Some(json!({ "kind": label })))
                        .await?;
                }
            },
            ActivityTypeFamily::Hiking => {
                let profile = rebuild_hiking(&splits, aggregate, user_id, now);
                self.store.upsert_hiking_profile(&profile).await?;
                self.notifications
                    .create_and_send(user_id, NotificationType::ProfileUpdated, Some(json!({ "kind": label })))
                    .await?;
            }
        }
        Ok(())
    }

    async fn aggregate_for(&self, user_id: Uuid, family: ActivityTypeFamily) -> anyhow::Result<ProfileAggregate> {
        let activities = self.store.list_activities(user_id, None, u32::MAX, 0).await?;
        let supported = activities.iter().filter(|a| a.activity_type.is_supported());
        let mut total_activities_analyzed = 0;
        let mut total_type_activities = 0;
        let mut total_distance_km = 0.0;
        let mut total_elevation_m = 0.0;
        for activity in supported {
            total_activities_analyzed += 1;
            if family.contains(activity.activity_type) {
                total_type_activities += 1;
                total_distance_km += activity.distance_m / 1000.0;
                total_elevation_m += activity.elevation_gain_m;
            }
        }
        Ok(ProfileAggregate { total_activities_analyzed, total_type_activities, total_distance_km, total_elevation_m })
    }
}

fn families_in(types: &HashSet<ActivityType>) -> Vec<ActivityTypeFamily> {
    let mut families = Vec::new();
    if types.iter().any(|t| t.is_running()) {
        families.push(ActivityTypeFamily::Running);
    }
    if types.iter().any(|t| t.is_hiking()) {
        families.push(ActivityTypeFamily::Hiking);
    }
    families
}

/// Whether `after` crossed a multiple of `interval` that `before` hadn't yet reached.
fn crossed_multiple(before: u32, after: u32, interval: u32) -> bool {
    interval > 0 && after / interval > before / interval
}

/// Estimate the user's total activity count over the sync history window by
/// extrapolating from the date range covered so far, assuming a roughly
/// uniform activity rate across the window. `0` until both cursor dates are set.
fn estimate_total_activities(cursor: &SyncCursor) -> u32 {
    let (Some(oldest), Some(newest)) = (cursor.oldest_synced_date, cursor.newest_synced_date) else {
        return 0;
    };
    let days_covered = (newest - oldest).num_days().max(1);
    let fraction_covered = (days_covered as f64 / MAX_SYNC_HISTORY_DAYS as f64).min(1.0);
    if fraction_covered <= 0.0 {
        return 0;
    }
    (f64::from(cursor.total_activities_synced) / fraction_covered).round() as u32
}

/// Decide whether this pass should trigger a profile recalculation, advancing
/// `cursor.last_recalc_checkpoint` or `cursor.new_activities_since_recalc` in place.
fn should_recalc(cursor: &mut SyncCursor) -> bool {
    if cursor.initial_sync_complete {
        if cursor.new_activities_since_recalc >= POST_SYNC_RECALC_MIN_NEW_ACTIVITIES {
            cursor.new_activities_since_recalc = 0;
            return true;
        }
        return false;
    }

    if cursor.last_recalc_checkpoint == 0 && cursor.activities_with_splits >= INITIAL_RECALC_AFTER_N_ACTIVITIES {
        cursor.last_recalc_checkpoint = INITIAL_RECALC_AFTER_N_ACTIVITIES;
        return true;
    }

    let estimated_total = estimate_total_activities(cursor);
    if estimated_total == 0 {
        return false;
    }
    let percent = (f64::from(cursor.activities_with_splits) / f64::from(estimated_total) * 100.0) as u32;
    for checkpoint in INITIAL_RECALC_PROGRESS_CHECKPOINTS {
        if percent >= checkpoint && cursor.last_recalc_checkpoint < checkpoint {
            cursor.last_recalc_checkpoint = checkpoint;
            return true;
        }
    }
    false
}

fn truncate(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossed_multiple_detects_the_boundary() {
        assert!(crossed_multiple(8, 11, 10));
        assert!(!crossed_multiple(1, 9, 10));
        assert!(crossed_multiple(0, 10, 10));
    }

    #[test]
    fn should_recalc_fires_once_at_the_five_activity_floor() {
        let mut cursor = SyncCursor::new(Uuid::new_v4());
        cursor.activities_with_splits = 5;
        assert!(should_recalc(&mut cursor));
        assert_eq!(cursor.last_recalc_checkpoint, INITIAL_RECALC_AFTER_N_ACTIVITIES);
        assert!(!should_recalc(&mut cursor));
    }

    #[test]
    fn should_recalc_fires_each_progress_checkpoint_once() {
        let mut cursor = SyncCursor::new(Uuid::new_v4());
        cursor.last_recalc_checkpoint = INITIAL_RECALC_AFTER_N_ACTIVITIES;
        cursor.oldest_synced_date = Some(Utc::now() - chrono::Duration::days(200));
        cursor.newest_synced_date = Some(Utc::now());
        cursor.total_activities_synced = 60;
        cursor.activities_with_splits = 60;

        assert!(should_recalc(&mut cursor));
        assert_eq!(cursor.last_recalc_checkpoint, 30);
        assert!(!should_recalc(&mut cursor));
    }

    #[test]
    fn should_recalc_post_completion_fires_on_the_accumulation_threshold() {
        let mut cursor = SyncCursor::new(Uuid::new_v4());
        cursor.initial_sync_complete = true;
        cursor.new_activities_since_recalc = POST_SYNC_RECALC_MIN_NEW_ACTIVITIES - 1;
        assert!(!should_recalc(&mut cursor));
        cursor.new_activities_since_recalc = POST_SYNC_RECALC_MIN_NEW_ACTIVITIES;
        assert!(should_recalc(&mut cursor));
        assert_eq!(cursor.new_activities_since_recalc, 0);
    }
}
