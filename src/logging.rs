// ABOUTME: tracing subscriber setup for the sync service
// ABOUTME: One EnvFilter-driven fmt layer; format and verbosity follow TrailtimeConfig

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Environment, LogLevel};

/// Initialise the global `tracing` subscriber.
///
/// Production runs get compact, target-free output; development and test
/// runs keep target and span context for local debugging.
///
/// # Errors
///
/// Returns an error if a subscriber has already been installed for this process.
pub fn init(level: LogLevel, environment: Environment) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);

    if environment.is_production() {
        registry.with(fmt::layer().compact().with_target(false)).try_init()?;
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()?;
    }

    Ok(())
}
