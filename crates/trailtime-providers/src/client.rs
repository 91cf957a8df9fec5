// ABOUTME: Thin wrapper over the activity provider's HTTP API: list, fetch detail, deauthorise
// ABOUTME: Every call acquires the shared RateLimiter first and retries once on 401 or 429

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use trailtime_core::constants::{MAX_ACTIVITIES_PER_PAGE, PROVIDER_HTTP_TIMEOUT_SECS};
use trailtime_core::model::{Activity, ActivityType, Split};

use crate::error::ProviderError;
use crate::rate_limiter::RateLimiter;
use crate::token_vault::TokenVault;

/// One page of activities as the wire format reports them, before the
/// caller attaches a `user_id` and inserts them.
#[derive(Debug, Clone, Deserialize)]
pub struct WireActivity {
    id: i64,
    name: String,
    #[serde(rename = "type")]
    sport_type: String,
    start_date: DateTime<Utc>,
    distance: f64,
    moving_time: u32,
    elapsed_time: u32,
    total_elevation_gain: f64,
    average_speed: Option<f64>,
    max_speed: Option<f64>,
    average_heartrate: Option<f64>,
    max_heartrate: Option<f64>,
    average_cadence: Option<f64>,
    suffer_score: Option<i64>,
}

impl WireActivity {
    /// Attach the owning user and project into the persisted `Activity` shape.
    #[must_use]
    pub fn into_activity(self, user_id: Uuid) -> Activity {
        Activity {
            provider_activity_id: self.id,
            user_id,
            name: self.name,
            activity_type: classify_sport_type(&self.sport_type),
            start_date: self.start_date,
            distance_m: self.distance,
            moving_time_s: self.moving_time,
            elapsed_time_s: self.elapsed_time,
            elevation_gain_m: self.total_elevation_gain,
            elevation_loss_m: None,
            average_speed_mps: self.average_speed,
            max_speed_mps: self.max_speed,
            average_heartrate: self.average_heartrate,
            max_heartrate: self.max_heartrate,
            average_cadence: self.average_cadence,
            suffer_score: self.suffer_score,
            splits_synced: false,
        }
    }
}

fn classify_sport_type(sport_type: &str) -> ActivityType {
    match sport_type {
        "Run" => ActivityType::Run,
        "TrailRun" => ActivityType::TrailRun,
        "VirtualRun" => ActivityType::VirtualRun,
        "Hike" => ActivityType::Hike,
        "Walk" => ActivityType::Walk,
        _ => ActivityType::Other,
    }
}

#[derive(Debug, Deserialize)]
struct WireSplit {
    distance: f64,
    moving_time: u32,
    elevation_difference: f64,
}

impl From<WireSplit> for Split {
    fn from(value: WireSplit) -> Self {
        Self { ordinal: 0, distance_m: value.distance, moving_time_s: value.moving_time, elevation_diff_m: value.elevation_difference }
    }
}

#[derive(Debug, Deserialize)]
struct WireActivityDetail {
    splits_metric: Vec<WireSplit>,
}

/// A fetched activity's splits, numbered in provider order.
#[derive(Debug, Clone)]
pub struct ActivityDetail {
    /// Splits, in the order the provider returned them.
    pub splits: Vec<Split>,
}

/// Wraps three calls against the activity provider: listing activities,
/// fetching one in detail, and deauthorising a user's connection. Every call
/// goes through the shared `RateLimiter` and retries at most once on a 401
/// (after a token refresh) or a 429 (after sleeping out the window).
pub struct ProviderClient {
    http: Client,
    base_url: String,
    provider: &'static str,
    tokens: Arc<TokenVault>,
    rate_limiter: Arc<RateLimiter>,
}

impl ProviderClient {
    /// Build a client for `provider` against `base_url`, sharing `tokens` and `rate_limiter`.
    #[must_use]
    pub fn new(provider: &'static str, base_url: String, tokens: Arc<TokenVault>, rate_limiter: Arc<RateLimiter>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(PROVIDER_HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { http, base_url, provider, tokens, rate_limiter }
    }

    /// List activities for `user_id` in `(after, before]`, paginated `per_page`
    /// at a time (clamped to `MAX_ACTIVITIES_PER_PAGE`).
    pub async fn list_activities(
        &self,
        user_id: Uuid,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
        per_page: u32,
    ) -> Result<Vec<WireActivity>, ProviderError> {
        let per_page = per_page.min(MAX_ACTIVITIES_PER_PAGE);
        let url = format!("{}/athlete/activities", self.base_url);
        let query = [
            ("after", after.timestamp().to_string()),
            ("before", before.timestamp().to_string()),
            ("per_page", per_page.to_string()),
        ];
        let request = self.http.get(&url).query(&query);

        self.send_with_retry(user_id, request).await
    }

    /// Fetch one activity in detail, yielding its per-kilometre splits.
    pub async fn fetch_activity_detail(&self, user_id: Uuid, provider_activity_id: i64) -> Result<ActivityDetail, ProviderError> {
        let url = format!("{}/activities/{provider_activity_id}", self.base_url);
        let request = self.http.get(&url).query(&[("include_all_efforts", "false")]);

        let detail: WireActivityDetail = self.send_with_retry(user_id, request).await?;

        let splits = detail
            .splits_metric
            .into_iter()
            .enumerate()
            .map(|(i, split)| Split { ordinal: i as u32 + 1, ..split.into() })
            .collect();

        Ok(ActivityDetail { splits })
    }

    /// Revoke this user's access, on both the provider and (by the caller,
    /// afterward) the local token store.
    pub async fn deauthorize(&self, user_id: Uuid) -> Result<(), ProviderError> {
        let url = format!("{}/oauth/deauthorize", self.base_url);
        let request = self.http.post(&url);
        let _: serde::de::IgnoredAny = self.send_with_retry(user_id, request).await?;
        Ok(())
    }

    /// Send `request` with a fresh bearer token attached, retrying once on
    /// 401 (after a forced token refresh) and once on 429 (after sleeping
    /// out the window the provider reports via `Retry-After`).
    async fn send_with_retry<T: DeserializeOwned>(&self, user_id: Uuid, request: RequestBuilder) -> Result<T, ProviderError> {
        let mut token = self.tokens.ensure_valid(user_id).await?;
        let mut retried_auth = false;
        let mut retried_rate_limit = false;

        loop {
            self.rate_limiter.acquire().await;
            let attempt = request
                .try_clone()
                .ok_or_else(|| ProviderError::Api {
                    provider: self.provider,
                    status_code: 0,
                    message: "request body cannot be retried".to_owned(),
                    retryable: false,
                })?
                .bearer_auth(&token);
            let response = attempt.send().await.map_err(|source| ProviderError::Network { provider: self.provider, source })?;

            match response.status() {
                StatusCode::UNAUTHORIZED if !retried_auth => {
                    retried_auth = true;
                    token = self.tokens.force_refresh(user_id).await?;
                }
                StatusCode::TOO_MANY_REQUESTS if !retried_rate_limit => {
                    retried_rate_limit = true;
                    tokio::time::sleep(Duration::from_secs(retry_after_secs(&response))).await;
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    return Err(ProviderError::RateLimitExceeded {
                        provider: self.provider,
                        retry_after_secs: retry_after_secs(&response),
                        limit_type: "short",
                    });
                }
                status if status.is_success() => {
                    return response.json::<T>().await.map_err(|source| ProviderError::Parse {
                        provider: self.provider,
                        field: "body",
                        source: source_as_json_error(&source),
                    });
                }
                status => {
                    let retryable = status.is_server_error();
                    let message = response.text().await.unwrap_or_default();
                    return Err(ProviderError::Api { provider: self.provider, status_code: status.as_u16(), message, retryable });
                }
            }
        }
    }
}

fn retry_after_secs(response: &reqwest::Response) -> u64 {
    response.headers().get("Retry-After").and_then(|v| v.to_str().ok()).and_then(|v| v.parse().ok()).unwrap_or(60)
}

/// `reqwest::Error` doesn't expose a `serde_json::Error` even when the
/// failure was a body decode error; synthesise one carrying the same message
/// so `ProviderError::Parse` has something to display.
fn source_as_json_error(source: &reqwest::Error) -> serde_json::Error {
    serde::de::Error::custom(source.to_string())
}

/// Convert an activity-provider epoch timestamp, defaulting to the epoch
/// itself if the provider ever sends something out of range.
#[must_use]
pub fn epoch_to_datetime(epoch_secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(epoch_secs, 0).single().unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_sport_types() {
        assert_eq!(classify_sport_type("Run"), ActivityType::Run);
        assert_eq!(classify_sport_type("TrailRun"), ActivityType::TrailRun);
        assert_eq!(classify_sport_type("Swim"), ActivityType::Other);
    }

    #[test]
    fn epoch_round_trips_a_normal_timestamp() {
        let dt = epoch_to_datetime(1_700_000_000);
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }
}
