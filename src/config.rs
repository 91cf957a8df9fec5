// ABOUTME: Environment-derived configuration for the sync service
// ABOUTME: No config-file parsing here — that mechanism lives outside this crate

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Strongly typed log level, parsed from `LOG_LEVEL` with an `info` fallback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Normal operational messages.
    #[default]
    Info,
    /// Verbose, per-operation detail.
    Debug,
    /// Everything, including per-segment computation.
    Trace,
}

impl LogLevel {
    /// Parse from string, falling back to `Info` on anything unrecognised.
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }

    /// This level's name, as accepted by `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Deployment environment, affecting log format and validation strictness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Production deployment.
    Production,
    /// Automated test runs.
    Testing,
}

impl Environment {
    /// Parse from string, falling back to `Development`.
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Whether this is a production environment.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// A type-safe database target: a `SQLite` file path, an in-memory `SQLite`
/// database, or a bare connection string for anything else `sqlx` accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DatabaseUrl {
    /// `SQLite` database backed by a file on disk.
    Sqlite {
        /// Path to the database file.
        path: PathBuf,
    },
    /// In-memory `SQLite`, used for tests.
    Memory,
    /// Anything else, passed through to `sqlx` verbatim.
    Other {
        /// Raw connection string.
        connection_string: String,
    },
}

impl DatabaseUrl {
    /// Parse a `database_url` value, defaulting unrecognised schemes to a
    /// pass-through connection string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if let Some(path_str) = s.strip_prefix("sqlite:") {
            if path_str == ":memory:" {
                Self::Memory
            } else {
                Self::Sqlite { path: PathBuf::from(path_str) }
            }
        } else {
            Self::Other { connection_string: s.to_owned() }
        }
    }

    /// Render as a connection string `sqlx::SqlitePool::connect` accepts.
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::Sqlite { path } => format!("sqlite:{}?mode=rwc", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
            Self::Other { connection_string } => connection_string.clone(),
        }
    }
}

/// Process-wide configuration, loaded once from environment variables.
#[derive(Debug, Clone)]
pub struct TrailtimeConfig {
    /// Where the `ActivityStore` persists its data.
    pub database_url: DatabaseUrl,
    /// OAuth2 client id for the activity provider.
    pub provider_client_id: String,
    /// OAuth2 client secret for the activity provider.
    pub provider_client_secret: String,
    /// Shared API key for the cross-service token resolver, if configured.
    pub cross_service_api_key: Option<String>,
    /// Base URL of the sibling service that can resolve tokens, if configured.
    pub cross_service_base_url: Option<String>,
    /// Telegram bot token for notification pushes; absence disables pushes silently.
    pub telegram_bot_token: Option<String>,
    /// Minimum log level.
    pub log_level: LogLevel,
    /// Deployment environment.
    pub environment: Environment,
}

impl TrailtimeConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `STRAVA_CLIENT_ID` or `STRAVA_CLIENT_SECRET` is missing.
    pub fn from_env() -> Result<Self> {
        let provider_client_id =
            env::var("STRAVA_CLIENT_ID").context("STRAVA_CLIENT_ID must be set")?;
        let provider_client_secret =
            env::var("STRAVA_CLIENT_SECRET").context("STRAVA_CLIENT_SECRET must be set")?;

        Ok(Self {
            database_url: DatabaseUrl::parse(
                &env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./data/trailtime.db".to_owned()),
            ),
            provider_client_id,
            provider_client_secret,
            cross_service_api_key: env::var("CROSS_SERVICE_API_KEY").ok(),
            cross_service_base_url: env::var("AYDA_RUN_API_URL").ok(),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            log_level: LogLevel::from_str_or_default(&env::var("LOG_LEVEL").unwrap_or_default()),
            environment: Environment::from_str_or_default(&env::var("ENVIRONMENT").unwrap_or_default()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_url_recognises_memory() {
        assert!(matches!(DatabaseUrl::parse("sqlite::memory:"), DatabaseUrl::Memory));
    }

    #[test]
    fn database_url_recognises_sqlite_file() {
        let parsed = DatabaseUrl::parse("sqlite:./data/trailtime.db");
        assert!(matches!(parsed, DatabaseUrl::Sqlite { .. }));
        assert_eq!(parsed.to_connection_string(), "sqlite:./data/trailtime.db?mode=rwc");
    }

    #[test]
    fn log_level_falls_back_to_info() {
        assert_eq!(LogLevel::from_str_or_default("nonsense"), LogLevel::Info);
    }
}
