// ABOUTME: Core data model, error types and shared constants for the trailtime engine
// ABOUTME: Every other workspace crate depends on this one; it depends on nothing in-tree

//! Foundation types for the trailtime prediction platform: geographic primitives,
//! the gradient taxonomy, the persisted data model, and shared error types.

/// Shared numeric constants (thresholds, windows, physiological bands).
pub mod constants;
/// Structured error types shared across the core domain.
pub mod error;
/// Great-circle distance, gradient math and elevation smoothing.
pub mod geo;
/// The canonical 11-bin gradient taxonomy and its legacy 7-bin projection.
pub mod gradient;
/// Persisted and computed domain types (`Point`, `Activity`, profiles, tokens, ...).
pub mod model;

pub use error::CoreError;
pub use gradient::{GradientCategory, LegacyGradientCategory};
pub use model::*;
