// ABOUTME: SQLite-backed ActivityStore, also implementing trailtime-providers' TokenStore
// ABOUTME: UUIDs and enums are stored as TEXT; PaceTable is stored as a JSON blob

use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use trailtime_core::model::{
    Activity, ActivityType, HikingProfile, Notification, NotificationType, PaceTable, RunProfile, Split,
    SyncCursor, Token,
};
use trailtime_providers::{ProviderError, TokenStore};

use super::{ActivityStore, ActivityTypeFamily};

/// `SQLite`-backed implementation of `ActivityStore`, embedding its schema
/// migrations at compile time.
#[derive(Clone)]
pub struct SqliteActivityStore {
    pool: SqlitePool,
}

impl SqliteActivityStore {
    /// Connect to `connection_string` (as produced by `config::DatabaseUrl::to_connection_string`)
    /// and run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or a migration fails.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new().max_connections(5).connect(connection_string).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Wrap an already-open pool (used by tests against a shared in-memory database).
    #[must_use]
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn activity_type_str(activity_type: ActivityType) -> &'static str {
    match activity_type {
        ActivityType::Run => "run",
        ActivityType::TrailRun => "trail_run",
        ActivityType::VirtualRun => "virtual_run",
        ActivityType::Hike => "hike",
        ActivityType::Walk => "walk",
        ActivityType::Other => "other",
    }
}

fn parse_activity_type(s: &str) -> ActivityType {
    match s {
        "run" => ActivityType::Run,
        "trail_run" => ActivityType::TrailRun,
        "virtual_run" => ActivityType::VirtualRun,
        "hike" => ActivityType::Hike,
        "walk" => ActivityType::Walk,
        _ => ActivityType::Other,
    }
}

fn notification_type_str(kind: NotificationType) -> &'static str {
    match kind {
        NotificationType::SyncProgress => "sync_progress",
        NotificationType::SyncComplete => "sync_complete",
        NotificationType::ProfileUpdated => "profile_updated",
        NotificationType::ProfileComplete => "profile_complete",
        NotificationType::ProfileIncomplete => "profile_incomplete",
        NotificationType::StravaConnected => "strava_connected",
    }
}

fn parse_notification_type(s: &str) -> NotificationType {
    match s {
        "sync_complete" => NotificationType::SyncComplete,
        "profile_updated" => NotificationType::ProfileUpdated,
        "profile_complete" => NotificationType::ProfileComplete,
        "profile_incomplete" => NotificationType::ProfileIncomplete,
        "strava_connected" => NotificationType::StravaConnected,
        _ => NotificationType::SyncProgress,
    }
}

fn row_to_activity(row: &sqlx::sqlite::SqliteRow) -> Result<Activity> {
    Ok(Activity {
        provider_activity_id: row.try_get("provider_activity_id")?,
        user_id: Uuid::from_str(row.try_get::<String, _>("user_id")?.as_str())?,
        name: row.try_get("name")?,
        activity_type: parse_activity_type(row.try_get::<String, _>("activity_type")?.as_str()),
        start_date: row.try_get("start_date")?,
        distance_m: row.try_get("distance_m")?,
        moving_time_s: row.try_get::<i64, _>("moving_time_s")?.try_into().unwrap_or(0),
        elapsed_time_s: row.try_get::<i64, _>("elapsed_time_s")?.try_into().unwrap_or(0),
        elevation_gain_m: row.try_get("elevation_gain_m")?,
        elevation_loss_m: row.try_get("elevation_loss_m")?,
        average_speed_mps: row.try_get("average_speed_mps")?,
        max_speed_mps: row.try_get("max_speed_mps")?,
        average_heartrate: row.try_get("average_heartrate")?,
        max_heartrate: row.try_get("max_heartrate")?,
        average_cadence: row.try_get("average_cadence")?,
        suffer_score: row.try_get("suffer_score")?,
        splits_synced: row.try_get("splits_synced")?,
    })
}

#[async_trait]
impl ActivityStore for SqliteActivityStore {
    async fn insert_activity_if_absent(&self, activity: &Activity) -> Result<Option<Activity>> {
        let result = sqlx::query(
            r"
            INSERT INTO activities (
                user_id, provider_activity_id, name, activity_type, start_date, distance_m,
                moving_time_s, elapsed_time_s, elevation_gain_m, elevation_loss_m,
                average_speed_mps, max_speed_mps, average_heartrate, max_heartrate,
                average_cadence, suffer_score, splits_synced
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            ON CONFLICT (user_id, provider_activity_id) DO NOTHING
            ",
        )
        .bind(activity.user_id.to_string())
        .bind(activity.provider_activity_id)
        .bind(&activity.name)
        .bind(activity_type_str(activity.activity_type))
        .bind(activity.start_date)
        .bind(activity.distance_m)
        .bind(i64::from(activity.moving_time_s))
        .bind(i64::from(activity.elapsed_time_s))
        .bind(activity.elevation_gain_m)
        .bind(activity.elevation_loss_m)
        .bind(activity.average_speed_mps)
        .bind(activity.max_speed_mps)
        .bind(activity.average_heartrate)
        .bind(activity.max_heartrate)
        .bind(activity.average_cadence)
        .bind(activity.suffer_score)
        .bind(activity.splits_synced)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(activity.clone()))
    }

    async fn find_activity(&self, user_id: Uuid, provider_activity_id: i64) -> Result<Option<Activity>> {
        let row = sqlx::query("SELECT * FROM activities WHERE user_id = ?1 AND provider_activity_id = ?2")
            .bind(user_id.to_string())
            .bind(provider_activity_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_activity).transpose()
    }

    async fn list_activities(
        &self,
        user_id: Uuid,
        activity_type: Option<ActivityType>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Activity>> {
        let rows = if let Some(activity_type) = activity_type {
            sqlx::query(
                "SELECT * FROM activities WHERE user_id = ?1 AND activity_type = ?2 \
                 ORDER BY start_date DESC LIMIT ?3 OFFSET ?4",
            )
            .bind(user_id.to_string())
            .bind(activity_type_str(activity_type))
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query("SELECT * FROM activities WHERE user_id = ?1 ORDER BY start_date DESC LIMIT ?2 OFFSET ?3")
                .bind(user_id.to_string())
                .bind(i64::from(limit))
                .bind(i64::from(offset))
                .fetch_all(&self.pool)
                .await?
        };
        rows.iter().map(row_to_activity).collect()
    }

    async fn mark_splits_synced(&self, user_id: Uuid, provider_activity_id: i64) -> Result<()> {
        sqlx::query("UPDATE activities SET splits_synced = 1 WHERE user_id = ?1 AND provider_activity_id = ?2")
            .bind(user_id.to_string())
            .bind(provider_activity_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_splits(&self, user_id: Uuid, provider_activity_id: i64) -> Result<Vec<Split>> {
        let rows = sqlx::query(
            "SELECT ordinal, distance_m, moving_time_s, elevation_diff_m FROM splits \
             WHERE user_id = ?1 AND provider_activity_id = ?2 ORDER BY ordinal ASC",
        )
        .bind(user_id.to_string())
        .bind(provider_activity_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Split {
                    ordinal: row.try_get::<i64, _>("ordinal")?.try_into().unwrap_or(0),
                    distance_m: row.try_get("distance_m")?,
                    moving_time_s: row.try_get::<i64, _>("moving_time_s")?.try_into().unwrap_or(0),
                    elevation_diff_m: row.try_get("elevation_diff_m")?,
                })
            })
            .collect()
    }

    async fn replace_splits(&self, user_id: Uuid, provider_activity_id: i64, splits: &[Split]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM splits WHERE user_id = ?1 AND provider_activity_id = ?2")
            .bind(user_id.to_string())
            .bind(provider_activity_id)
            .execute(&mut *tx)
            .await?;

        for split in splits {
            sqlx::query(
                "INSERT INTO splits (user_id, provider_activity_id, ordinal, distance_m, moving_time_s, elevation_diff_m) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(user_id.to_string())
            .bind(provider_activity_id)
            .bind(i64::from(split.ordinal))
            .bind(split.distance_m)
            .bind(i64::from(split.moving_time_s))
            .bind(split.elevation_diff_m)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_splits_for_activity_type(
        &self,
        user_id: Uuid,
        activity_type_family: ActivityTypeFamily,
    ) -> Result<Vec<Split>> {
        let types: Vec<ActivityType> = match activity_type_family {
            ActivityTypeFamily::Running => vec![ActivityType::Run, ActivityType::TrailRun, ActivityType::VirtualRun],
            ActivityTypeFamily::Hiking => vec![ActivityType::Hike, ActivityType::Walk],
        };
        let placeholders = types.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT s.ordinal, s.distance_m, s.moving_time_s, s.elevation_diff_m FROM splits s \
             JOIN activities a ON a.user_id = s.user_id AND a.provider_activity_id = s.provider_activity_id \
             WHERE s.user_id = ? AND a.activity_type IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        for activity_type in &types {
            query = query.bind(activity_type_str(*activity_type));
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(Split {
                    ordinal: row.try_get::<i64, _>("ordinal")?.try_into().unwrap_or(0),
                    distance_m: row.try_get("distance_m")?,
                    moving_time_s: row.try_get::<i64, _>("moving_time_s")?.try_into().unwrap_or(0),
                    elevation_diff_m: row.try_get("elevation_diff_m")?,
                })
            })
            .collect()
    }

    async fn get_or_create_cursor(&self, user_id: Uuid) -> Result<SyncCursor> {
        if let Some(row) =
            sqlx::query("SELECT * FROM sync_cursors WHERE user_id = ?1").bind(user_id.to_string()).fetch_optional(&self.pool).await?
        {
            return Ok(SyncCursor {
                user_id,
                oldest_synced_date: row.try_get("oldest_synced_date")?,
                newest_synced_date: row.try_get("newest_synced_date")?,
                total_activities_synced: row.try_get::<i64, _>("total_activities_synced")?.try_into().unwrap_or(0),
                activities_with_splits: row.try_get::<i64, _>("activities_with_splits")?.try_into().unwrap_or(0),
                last_error: row.try_get("last_error")?,
                in_progress: row.try_get("in_progress")?,
                initial_sync_complete: row.try_get("initial_sync_complete")?,
                last_recalc_checkpoint: row.try_get::<i64, _>("last_recalc_checkpoint")?.try_into().unwrap_or(0),
                new_activities_since_recalc: row.try_get::<i64, _>("new_activities_since_recalc")?.try_into().unwrap_or(0),
                last_sync_at: row.try_get("last_sync_at")?,
                sync_started_at: row.try_get("sync_started_at")?,
            });
        }

        let cursor = SyncCursor::new(user_id);
        self.save_cursor(&cursor).await?;
        Ok(cursor)
    }

    async fn save_cursor(&self, cursor: &SyncCursor) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO sync_cursors (
                user_id, oldest_synced_date, newest_synced_date, total_activities_synced,
                activities_with_splits, last_error, in_progress, initial_sync_complete,
                last_recalc_checkpoint, new_activities_since_recalc, last_sync_at, sync_started_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT (user_id) DO UPDATE SET
                oldest_synced_date = excluded.oldest_synced_date,
                newest_synced_date = excluded.newest_synced_date,
                total_activities_synced = excluded.total_activities_synced,
                activities_with_splits = excluded.activities_with_splits,
                last_error = excluded.last_error,
                in_progress = excluded.in_progress,
                initial_sync_complete = excluded.initial_sync_complete,
                last_recalc_checkpoint = excluded.last_recalc_checkpoint,
                new_activities_since_recalc = excluded.new_activities_since_recalc,
                last_sync_at = excluded.last_sync_at,
                sync_started_at = excluded.sync_started_at
            ",
        )
        .bind(cursor.user_id.to_string())
        .bind(cursor.oldest_synced_date)
        .bind(cursor.newest_synced_date)
        .bind(i64::from(cursor.total_activities_synced))
        .bind(i64::from(cursor.activities_with_splits))
        .bind(&cursor.last_error)
        .bind(cursor.in_progress)
        .bind(cursor.initial_sync_complete)
        .bind(i64::from(cursor.last_recalc_checkpoint))
        .bind(i64::from(cursor.new_activities_since_recalc))
        .bind(cursor.last_sync_at)
        .bind(cursor.sync_started_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_hiking_profile(&self, user_id: Uuid) -> Result<Option<HikingProfile>> {
        let Some(row) =
            sqlx::query("SELECT * FROM hiking_profiles WHERE user_id = ?1").bind(user_id.to_string()).fetch_optional(&self.pool).await?
        else {
            return Ok(None);
        };
        let pace_table: PaceTable = serde_json::from_str(&row.try_get::<String, _>("pace_table")?).context("corrupt hiking pace table")?;
        Ok(Some(HikingProfile {
            user_id,
            pace_table,
            total_activities_analyzed: row.try_get::<i64, _>("total_activities_analyzed")?.try_into().unwrap_or(0),
            total_hike_activities: row.try_get::<i64, _>("total_hike_activities")?.try_into().unwrap_or(0),
            total_distance_km: row.try_get("total_distance_km")?,
            total_elevation_m: row.try_get("total_elevation_m")?,
            vertical_ability: row.try_get("vertical_ability")?,
            last_calculated_at: row.try_get("last_calculated_at")?,
        }))
    }

    async fn get_running_profile(&self, user_id: Uuid) -> Result<Option<RunProfile>> {
        let Some(row) =
            sqlx::query("SELECT * FROM run_profiles WHERE user_id = ?1").bind(user_id.to_string()).fetch_optional(&self.pool).await?
        else {
            return Ok(None);
        };
        let pace_table: PaceTable = serde_json::from_str(&row.try_get::<String, _>("pace_table")?).context("corrupt run pace table")?;
        Ok(Some(RunProfile {
            user_id,
            pace_table,
            total_activities_analyzed: row.try_get::<i64, _>("total_activities_analyzed")?.try_into().unwrap_or(0),
            total_run_activities: row.try_get::<i64, _>("total_run_activities")?.try_into().unwrap_or(0),
            total_distance_km: row.try_get("total_distance_km")?,
            total_elevation_m: row.try_get("total_elevation_m")?,
            walk_threshold_percent: row.try_get("walk_threshold_percent")?,
            last_calculated_at: row.try_get("last_calculated_at")?,
        }))
    }

    async fn upsert_hiking_profile(&self, profile: &HikingProfile) -> Result<()> {
        let pace_table = serde_json::to_string(&profile.pace_table)?;
        sqlx::query(
            r"
            INSERT INTO hiking_profiles (
                user_id, pace_table, total_activities_analyzed, total_hike_activities,
                total_distance_km, total_elevation_m, vertical_ability, last_calculated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (user_id) DO UPDATE SET
                pace_table = excluded.pace_table,
                total_activities_analyzed = excluded.total_activities_analyzed,
                total_hike_activities = excluded.total_hike_activities,
                total_distance_km = excluded.total_distance_km,
                total_elevation_m = excluded.total_elevation_m,
                vertical_ability = excluded.vertical_ability,
                last_calculated_at = excluded.last_calculated_at
            ",
        )
        .bind(profile.user_id.to_string())
        .bind(pace_table)
        .bind(i64::from(profile.total_activities_analyzed))
        .bind(i64::from(profile.total_hike_activities))
        .bind(profile.total_distance_km)
        .bind(profile.total_elevation_m)
        .bind(profile.vertical_ability)
        .bind(profile.last_calculated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_running_profile(&self, profile: &RunProfile) -> Result<()> {
        let pace_table = serde_json::to_string(&profile.pace_table)?;
        sqlx::query(
            r"
            INSERT INTO run_profiles (
                user_id, pace_table, total_activities_analyzed, total_run_activities,
                total_distance_km, total_elevation_m, walk_threshold_percent, last_calculated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (user_id) DO UPDATE SET
                pace_table = excluded.pace_table,
                total_activities_analyzed = excluded.total_activities_analyzed,
                total_run_activities = excluded.total_run_activities,
                total_distance_km = excluded.total_distance_km,
                total_elevation_m = excluded.total_elevation_m,
                walk_threshold_percent = excluded.walk_threshold_percent,
                last_calculated_at = excluded.last_calculated_at
            ",
        )
        .bind(profile.user_id.to_string())
        .bind(pace_table)
        .bind(i64::from(profile.total_activities_analyzed))
        .bind(i64::from(profile.total_run_activities))
        .bind(profile.total_distance_km)
        .bind(profile.total_elevation_m)
        .bind(profile.walk_threshold_percent)
        .bind(profile.last_calculated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_token(&self, user_id: Uuid) -> Result<Option<Token>> {
        let Some(row) =
            sqlx::query("SELECT * FROM tokens WHERE user_id = ?1").bind(user_id.to_string()).fetch_optional(&self.pool).await?
        else {
            return Ok(None);
        };
        Ok(Some(Token {
            user_id,
            access_token: row.try_get("access_token")?,
            refresh_token: row.try_get("refresh_token")?,
            expires_at: row.try_get("expires_at")?,
            scope: row.try_get("scope")?,
        }))
    }

    async fn upsert_token(&self, token: &Token) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO tokens (user_id, access_token, refresh_token, expires_at, scope)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                scope = excluded.scope
            ",
        )
        .bind(token.user_id.to_string())
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(token.expires_at)
        .bind(&token.scope)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<i64> {
        let payload = notification.payload.as_ref().map(serde_json::Value::to_string);
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, notification_type, payload, read, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(notification.user_id.to_string())
        .bind(notification_type_str(notification.notification_type))
        .bind(payload)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_notifications(&self, user_id: Uuid, unread_only: bool, limit: u32) -> Result<Vec<Notification>> {
        let rows = if unread_only {
            sqlx::query("SELECT * FROM notifications WHERE user_id = ?1 AND read = 0 ORDER BY created_at DESC LIMIT ?2")
                .bind(user_id.to_string())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query("SELECT * FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2")
                .bind(user_id.to_string())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
        };

        rows.iter()
            .map(|row| {
                let payload: Option<String> = row.try_get("payload")?;
                Ok(Notification {
                    id: Some(row.try_get("id")?),
                    user_id,
                    notification_type: parse_notification_type(row.try_get::<String, _>("notification_type")?.as_str()),
                    payload: payload.map(|p| serde_json::from_str(&p)).transpose()?,
                    read: row.try_get("read")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn mark_notifications_read(&self, user_id: Uuid, ids: &[i64]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!("UPDATE notifications SET read = 1 WHERE user_id = ? AND id IN ({placeholders})");
        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        for id in ids {
            query = query.bind(id);
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    async fn notification_channel_for(&self, user_id: Uuid) -> Result<Option<String>> {
        let row = sqlx::query("SELECT channel_id FROM notification_channels WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get::<String, _>("channel_id")).transpose().map_err(Into::into)
    }

    async fn users_due_for_sync(&self, stale_after: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT user_id FROM sync_cursors WHERE last_sync_at IS NULL OR last_sync_at < ?1",
        )
        .bind(stale_after)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| Uuid::from_str(row.try_get::<String, _>("user_id")?.as_str()).map_err(Into::into))
            .collect()
    }

    async fn recover_stuck_syncs(&self, stuck_before: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT user_id FROM sync_cursors WHERE in_progress = 1 AND sync_started_at IS NOT NULL AND sync_started_at < ?1",
        )
        .bind(stuck_before)
        .fetch_all(&self.pool)
        .await?;
        let user_ids: Vec<Uuid> =
            rows.iter().map(|row| Uuid::from_str(row.try_get::<String, _>("user_id")?.as_str()).map_err(Into::into)).collect::<Result<_>>()?;

        sqlx::query(
            "UPDATE sync_cursors SET in_progress = 0, sync_started_at = NULL \
             WHERE in_progress = 1 AND sync_started_at IS NOT NULL AND sync_started_at < ?1",
        )
        .bind(stuck_before)
        .execute(&self.pool)
        .await?;

        Ok(user_ids)
    }
}

#[async_trait]
impl TokenStore for SqliteActivityStore {
    async fn get_token(&self, user_id: Uuid) -> std::result::Result<Option<Token>, ProviderError> {
        ActivityStore::get_token(self, user_id).await.map_err(|source| ProviderError::RefreshFailed {
            provider: "strava",
            message: source.to_string(),
        })
    }

    async fn put_token(&self, token: &Token) -> std::result::Result<(), ProviderError> {
        self.upsert_token(token).await.map_err(|source| ProviderError::RefreshFailed {
            provider: "strava",
            message: source.to_string(),
        })
    }
}
