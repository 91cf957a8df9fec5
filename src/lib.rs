// ABOUTME: Sync pipeline for personalised hiking/trail-running time predictions
// ABOUTME: Pulls activity history from a provider, builds per-user pace profiles, notifies users

#![deny(unsafe_code)]

//! # trailtime-sync
//!
//! Syncs a user's activity history from an external provider, builds
//! personalised hiking and running pace profiles from it, and notifies the
//! user as progress is made. The route-analysis math (segmentation, fatigue,
//! prediction) lives in [`trailtime_analytics`]; this crate is the service
//! shell around it: storage, outbound HTTP, scheduling and notifications.
//!
//! ## Architecture
//!
//! - [`config`] — environment-derived configuration
//! - [`logging`] — `tracing` initialisation
//! - [`error`] — the top-level [`error::SyncError`]
//! - [`store`] — the [`store::ActivityStore`] trait and its `SQLite` implementation
//! - [`sync_pipeline`] — the per-user [`sync_pipeline::SyncPipeline`] state machine
//! - [`scheduler`] — the bounded worker pool driving sync passes across users
//! - [`notifications`] — the [`notifications::NotificationBus`]

pub mod config;
pub mod error;
pub mod logging;
pub mod notifications;
pub mod scheduler;
pub mod store;
pub mod sync_pipeline;

use std::sync::Arc;

use trailtime_providers::{HttpCrossServiceResolver, OAuthClientConfig, ProviderClient, RateLimiter, TokenVault};

use config::TrailtimeConfig;
use notifications::{NotificationBus, TelegramChannel};
use scheduler::Scheduler;
use store::sqlite::SqliteActivityStore;
use sync_pipeline::SyncPipeline;

/// Strava's own API base URL and OAuth token endpoint.
const STRAVA_API_BASE_URL: &str = "https://www.strava.com/api/v3";
const STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";
const STRAVA_PROVIDER: &str = "strava";

/// The fully wired service: storage, provider client and scheduler, built
/// once at process startup from a [`TrailtimeConfig`].
pub struct TrailtimeService {
    /// The storage layer, shared with anything outside this crate that also
    /// needs to read activities, profiles or notifications (e.g. a REST API).
    pub store: Arc<SqliteActivityStore>,
    /// One user's sync pass, driven directly by callers that don't want to
    /// wait for the scheduler (e.g. a "sync now" endpoint).
    pub pipeline: Arc<SyncPipeline>,
    /// The bounded worker pool; call [`Scheduler::start`] once to run it.
    pub scheduler: Arc<Scheduler>,
}

impl TrailtimeService {
    /// Build the service from `config`, connecting to its configured database
    /// and wiring the provider client, notification bus and scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection or its migrations fail.
    pub async fn build(config: &TrailtimeConfig) -> anyhow::Result<Self> {
        let store = Arc::new(SqliteActivityStore::connect(&config.database_url.to_connection_string()).await?);

        let oauth = OAuthClientConfig {
            client_id: config.provider_client_id.clone(),
            client_secret: config.provider_client_secret.clone(),
            token_url: STRAVA_TOKEN_URL.to_owned(),
        };
        let http = reqwest::Client::new();
        let mut tokens = TokenVault::new(STRAVA_PROVIDER, store.clone(), oauth, http);
        if let (Some(api_key), Some(base_url)) = (&config.cross_service_api_key, &config.cross_service_base_url) {
            let resolver = Arc::new(HttpCrossServiceResolver::new(base_url.clone(), api_key.clone()));
            tokens = tokens.with_cross_service_resolver(resolver);
        }
        let tokens = Arc::new(tokens);
        let rate_limiter = Arc::new(RateLimiter::new());
        let provider =
            Arc::new(ProviderClient::new(STRAVA_PROVIDER, STRAVA_API_BASE_URL.to_owned(), tokens, rate_limiter));

        let channel = config.telegram_bot_token.clone().map(|token| {
            Arc::new(TelegramChannel::new(token)) as Arc<dyn notifications::NotificationChannel>
        });
        let notifications = Arc::new(NotificationBus::new(store.clone(), channel));

        let pipeline = Arc::new(SyncPipeline::new(store.clone(), provider, notifications));
        let scheduler = Arc::new(Scheduler::new(store.clone(), pipeline.clone()));

        Ok(Self { store, pipeline, scheduler })
    }

    /// Start the background scheduler. Idempotent per process; a second call
    /// logs a warning and does nothing.
    pub async fn start_scheduler(&self) {
        self.scheduler.clone().start().await;
    }
}
