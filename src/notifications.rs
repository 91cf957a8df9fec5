// ABOUTME: Notification creation and best-effort push to an external channel
// ABOUTME: The DB row is the source of truth; the push attempt never blocks or propagates failure

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use trailtime_core::constants::NOTIFICATION_PUSH_TIMEOUT_SECS;
use trailtime_core::model::{Notification, NotificationType};
use uuid::Uuid;

use crate::store::ActivityStore;

/// Where a rendered notification is actually delivered — a Telegram bot, in
/// production; an in-memory recorder in tests.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Send `text` to `channel_id`. Errors are logged by the caller and never propagate.
    async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<()>;
}

/// A `reqwest`-backed Telegram bot channel.
pub struct TelegramChannel {
    http: reqwest::Client,
    bot_token: String,
}

impl TelegramChannel {
    /// Build a channel posting through `bot_token`'s `sendMessage` endpoint.
    #[must_use]
    pub fn new(bot_token: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(NOTIFICATION_PUSH_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { http, bot_token }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        self.http.post(&url).json(&serde_json::json!({ "chat_id": channel_id, "text": text })).send().await?;
        Ok(())
    }
}

/// Creates notifications and pushes them to the user's external channel,
/// when one is configured.
pub struct NotificationBus {
    store: Arc<dyn ActivityStore>,
    channel: Option<Arc<dyn NotificationChannel>>,
}

impl NotificationBus {
    /// Build a bus backed by `store`. `channel` is `None` when no
    /// `telegram_bot_token` is configured — pushes are then silently disabled.
    #[must_use]
    pub fn new(store: Arc<dyn ActivityStore>, channel: Option<Arc<dyn NotificationChannel>>) -> Self {
        Self { store, channel }
    }

    /// Insert a notification, then best-effort push it to the user's channel.
    /// The insert always happens first and always commits; the push is
    /// fire-and-forget and its failure is only logged.
    pub async fn create_and_send(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        payload: Option<Value>,
    ) -> anyhow::Result<()> {
        let notification =
            Notification { id: None, user_id, notification_type, payload: payload.clone(), read: false, created_at: Utc::now() };
        self.store.insert_notification(&notification).await?;

        let Some(channel) = &self.channel else { return Ok(()) };
        let Some(channel_id) = self.store.notification_channel_for(user_id).await? else { return Ok(()) };

        let text = render(notification_type, payload.as_ref());
        if let Err(source) = channel.send(&channel_id, &text).await {
            tracing::warn!(%user_id, ?notification_type, %source, "notification push failed");
        }
        Ok(())
    }
}

fn render(notification_type: NotificationType, payload: Option<&Value>) -> String {
    match notification_type {
        NotificationType::SyncProgress => {
            let synced = payload.and_then(|p| p.get("total_activities_synced")).and_then(Value::as_u64).unwrap_or(0);
            format!("Sync progress: {synced} activities synced so far.")
        }
        NotificationType::SyncComplete => "Initial sync complete — your activity history is fully imported.".to_owned(),
        NotificationType::ProfileUpdated => {
            let kind = payload.and_then(|p| p.get("kind")).and_then(Value::as_str).unwrap_or("pace");
            format!("Your {kind} profile has been updated with your latest activities.")
        }
        NotificationType::ProfileComplete => "Your pace profile now has enough data for personalised predictions.".to_owned(),
        NotificationType::ProfileIncomplete => "Not enough activity data yet to build a personalised pace profile.".to_owned(),
        NotificationType::StravaConnected => "Your Strava account is connected — syncing your history now.".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use trailtime_core::model::{Activity, ActivityType, HikingProfile, RunProfile, SyncCursor, Token};

    struct RecordingChannel {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push((channel_id.to_owned(), text.to_owned()));
            Ok(())
        }
    }

    struct FakeStore {
        channel_id: Option<String>,
    }

    #[async_trait]
    impl ActivityStore for FakeStore {
        async fn insert_activity_if_absent(&self, activity: &Activity) -> anyhow::Result<Option<Activity>> {
            Ok(Some(activity.clone()))
        }
        async fn find_activity(&self, _user_id: Uuid, _provider_activity_id: i64) -> anyhow::Result<Option<Activity>> {
            Ok(None)
        }
        async fn list_activities(
            &self,
            _user_id: Uuid,
            _activity_type: Option<ActivityType>,
            _limit: u32,
            _offset: u32,
        ) -> anyhow::Result<Vec<Activity>> {
            Ok(Vec::new())
        }
        async fn mark_splits_synced(&self, _user_id: Uuid, _provider_activity_id: i64) -> anyhow::Result<()> {
            Ok(())
        }
        async fn list_splits(&self, _user_id: Uuid, _provider_activity_id: i64) -> anyhow::Result<Vec<trailtime_core::model::Split>> {
            Ok(Vec::new())
        }
        async fn replace_splits(
            &self,
            _user_id: Uuid,
            _provider_activity_id: i64,
            _splits: &[trailtime_core::model::Split],
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn list_splits_for_activity_type(
            &self,
            _user_id: Uuid,
            _activity_type_family: crate::store::ActivityTypeFamily,
        ) -> anyhow::Result<Vec<trailtime_core::model::Split>> {
            Ok(Vec::new())
        }
        async fn get_or_create_cursor(&self, user_id: Uuid) -> anyhow::Result<SyncCursor> {
            Ok(SyncCursor::new(user_id))
        }
        async fn save_cursor(&self, _cursor: &SyncCursor) -> anyhow::Result<()> {
            Ok(())
        }
        async fn get_hiking_profile(&self, _user_id: Uuid) -> anyhow::Result<Option<HikingProfile>> {
            Ok(None)
        }
        async fn get_running_profile(&self, _user_id: Uuid) -> anyhow::Result<Option<RunProfile>> {
            Ok(None)
        }
        async fn upsert_hiking_profile(&self, _profile: &HikingProfile) -> anyhow::Result<()> {
            Ok(())
        }
        async fn upsert_running_profile(&self, _profile: &RunProfile) -> anyhow::Result<()> {
            Ok(())
        }
        async fn get_token(&self, _user_id: Uuid) -> anyhow::Result<Option<Token>> {
            Ok(None)
        }
        async fn upsert_token(&self, _token: &Token) -> anyhow::Result<()> {
            Ok(())
        }
        async fn insert_notification(&self, _notification: &Notification) -> anyhow::Result<i64> {
            Ok(1)
        }
        async fn list_notifications(&self, _user_id: Uuid, _unread_only: bool, _limit: u32) -> anyhow::Result<Vec<Notification>> {
            Ok(Vec::new())
        }
        async fn mark_notifications_read(&self, _user_id: Uuid, _ids: &[i64]) -> anyhow::Result<()> {
            Ok(())
        }
        async fn notification_channel_for(&self, _user_id: Uuid) -> anyhow::Result<Option<String>> {
            Ok(self.channel_id.clone())
        }
        async fn users_due_for_sync(&self, _stale_after: chrono::DateTime<Utc>) -> anyhow::Result<Vec<Uuid>> {
            Ok(Vec::new())
        }
        async fn recover_stuck_syncs(&self, _stuck_before: chrono::DateTime<Utc>) -> anyhow::Result<Vec<Uuid>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn push_is_skipped_silently_without_a_channel_id() -> anyhow::Result<()> {
        let store = Arc::new(FakeStore { channel_id: None });
        let channel = Arc::new(RecordingChannel { sent: Mutex::new(Vec::new()) });
        let bus = NotificationBus::new(store, Some(channel.clone()));

        bus.create_and_send(Uuid::new_v4(), NotificationType::SyncComplete, None).await?;

        assert!(channel.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn push_fires_when_a_channel_id_is_on_file() -> anyhow::Result<()> {
        let store = Arc::new(FakeStore { channel_id: Some("12345".to_owned()) });
        let channel = Arc::new(RecordingChannel { sent: Mutex::new(Vec::new()) });
        let bus = NotificationBus::new(store, Some(channel.clone()));

        bus.create_and_send(Uuid::new_v4(), NotificationType::SyncComplete, None).await?;

        let sent = channel.sent.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "12345");
        Ok(())
    }
}
