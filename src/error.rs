// ABOUTME: Top-level error type for the sync pipeline, wrapping provider and storage failures
// ABOUTME: Unique-constraint violations on activity insert are handled before they reach here

use thiserror::Error;
use trailtime_providers::ProviderError;

/// Everything that can go wrong running one sync pass or serving the store.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A call against the activity provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The user has no connected provider account.
    #[error("user {user_id} is not connected to an activity provider")]
    NotConnected {
        /// The user who lacks a connection.
        user_id: uuid::Uuid,
    },
}
