// ABOUTME: Integration coverage for SyncPipeline's lock safety and idempotency
// ABOUTME: Exercises sync_user against an in-memory ActivityStore, no live provider needed

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use trailtime_core::model::{
    Activity, ActivityType, HikingProfile, Notification, NotificationType, RunProfile, Split, SyncCursor, Token,
};
use trailtime_providers::{OAuthClientConfig, ProviderClient, ProviderError, RateLimiter, TokenStore, TokenVault};
use trailtime_sync::notifications::NotificationBus;
use trailtime_sync::store::{ActivityStore, ActivityTypeFamily};
use trailtime_sync::sync_pipeline::{SyncOutcome, SyncPipeline};

/// A minimal in-memory `ActivityStore` + `TokenStore`, mirroring the shape
/// `SqliteActivityStore` exposes to the sync pipeline.
#[derive(Default)]
struct InMemoryStore {
    cursors: Mutex<HashMap<Uuid, SyncCursor>>,
    tokens: Mutex<HashMap<Uuid, Token>>,
}

#[async_trait]
impl ActivityStore for InMemoryStore {
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
    async fn list_splits(&self, _user_id: Uuid, _provider_activity_id: i64) -> anyhow::Result<Vec<Split>> {
        Ok(Vec::new())
    }
    async fn replace_splits(&self, _user_id: Uuid, _provider_activity_id: i64, _splits: &[Split]) -> anyhow::Result<()> {
        Ok(())
    }
    async fn list_splits_for_activity_type(
        &self,
        _user_id: Uuid,
        _activity_type_family: ActivityTypeFamily,
    ) -> anyhow::Result<Vec<Split>> {
        Ok(Vec::new())
    }
    async fn get_or_create_cursor(&self, user_id: Uuid) -> anyhow::Result<SyncCursor> {
        let mut cursors = self.cursors.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(cursors.entry(user_id).or_insert_with(|| SyncCursor::new(user_id)).clone())
    }
    async fn save_cursor(&self, cursor: &SyncCursor) -> anyhow::Result<()> {
        self.cursors.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(cursor.user_id, cursor.clone());
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
    async fn get_token(&self, user_id: Uuid) -> anyhow::Result<Option<Token>> {
        Ok(self.tokens.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(&user_id).cloned())
    }
    async fn upsert_token(&self, token: &Token) -> anyhow::Result<()> {
        self.tokens.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(token.user_id, token.clone());
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
        Ok(None)
    }
    async fn users_due_for_sync(&self, _stale_after: DateTime<Utc>) -> anyhow::Result<Vec<Uuid>> {
        Ok(Vec::new())
    }
    async fn recover_stuck_syncs(&self, _stuck_before: DateTime<Utc>) -> anyhow::Result<Vec<Uuid>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn get_token(&self, user_id: Uuid) -> Result<Option<Token>, ProviderError> {
        Ok(ActivityStore::get_token(self, user_id).await.unwrap_or(None))
    }
    async fn put_token(&self, token: &Token) -> Result<(), ProviderError> {
        ActivityStore::upsert_token(self, token).await.ok();
        Ok(())
    }
}

fn valid_token(user_id: Uuid) -> Token {
    Token {
        user_id,
        access_token: "test-access-token".to_owned(),
        refresh_token: "test-refresh-token".to_owned(),
        expires_at: (Utc::now().timestamp() + 3600),
        scope: "read".to_owned(),
    }
}

/// A `ProviderClient` pointed at an address nothing listens on, so any call
/// that reaches it fails fast with a `Network` error rather than hanging.
fn unreachable_provider(store: Arc<InMemoryStore>) -> Arc<ProviderClient> {
    let oauth = OAuthClientConfig {
        client_id: "test-client".to_owned(),
        client_secret: "test-secret".to_owned(),
        token_url: "http://127.0.0.1:1/oauth/token".to_owned(),
    };
    let tokens = Arc::new(TokenVault::new("strava", store, oauth, reqwest::Client::new()));
    Arc::new(ProviderClient::new("strava", "http://127.0.0.1:1".to_owned(), tokens, Arc::new(RateLimiter::new())))
}

fn pipeline(store: Arc<InMemoryStore>) -> SyncPipeline {
    let provider = unreachable_provider(store.clone());
    let notifications = Arc::new(NotificationBus::new(store.clone(), None));
    SyncPipeline::new(store, provider, notifications)
}

#[tokio::test]
async fn sync_user_errors_when_the_user_has_no_stored_token() {
    let store = Arc::new(InMemoryStore::default());
    let pipeline = pipeline(store);

    let result = pipeline.sync_user(Uuid::new_v4(), 10).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn sync_user_skips_without_touching_the_provider_when_already_in_progress() {
    let store = Arc::new(InMemoryStore::default());
    let user_id = Uuid::new_v4();
    store.upsert_token(&valid_token(user_id)).await.unwrap_or(());

    let mut cursor = SyncCursor::new(user_id);
    cursor.in_progress = true;
    cursor.sync_started_at = Some(Utc::now());
    store.save_cursor(&cursor).await.expect("save cursor");

    let pipeline = pipeline(store.clone());
    let outcome = pipeline.sync_user(user_id, 10).await.expect("sync_user should not error");

    assert_eq!(outcome, SyncOutcome::AlreadyInProgress);
    // The lock was observed, not touched: the cursor is unchanged.
    let stored = store.get_or_create_cursor(user_id).await.expect("cursor");
    assert!(stored.in_progress);
}

#[tokio::test]
async fn a_failed_pass_clears_the_lock_and_records_the_error() {
    let store = Arc::new(InMemoryStore::default());
    let user_id = Uuid::new_v4();
    store.upsert_token(&valid_token(user_id)).await.unwrap_or(());

    let pipeline = pipeline(store.clone());
    let result = pipeline.sync_user(user_id, 10).await;

    assert!(result.is_err(), "an unreachable provider should fail the pass");

    let cursor = store.get_or_create_cursor(user_id).await.expect("cursor");
    assert!(!cursor.in_progress, "the lock must be released even on failure");
    assert!(cursor.sync_started_at.is_none());
    assert!(cursor.last_error.is_some());
}
