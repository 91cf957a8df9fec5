// ABOUTME: Outbound integration with the activity provider: HTTP client, token vault, rate limiter
// ABOUTME: Depends only on trailtime-core, never on the sync pipeline or storage layer

pub mod client;
pub mod error;
pub mod rate_limiter;
pub mod token_vault;

pub use client::{ActivityDetail, ProviderClient, WireActivity};
pub use error::ProviderError;
pub use rate_limiter::RateLimiter;
pub use token_vault::{CrossServiceTokenResolver, HttpCrossServiceResolver, OAuthClientConfig, TokenStore, TokenVault};
