// ABOUTME: Structured error type for invalid input and invariant violations in the core domain
// ABOUTME: Mirrors the protocol-error style used elsewhere in the workspace: thiserror + context fields

/// Errors raised by core domain operations: malformed input and broken invariants.
///
/// Programmer-bug-class invariant violations (a segment with negative distance,
/// an empty track reaching the segmenter) are represented here rather than panicking,
/// so callers can fail fast with context instead of unwinding.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A GPX track (or any point sequence) had too few points to be processed.
    #[error("track has {count} points, need at least {minimum}")]
    InsufficientPoints {
        /// Number of points supplied.
        count: usize,
        /// Minimum required.
        minimum: usize,
    },

    /// A distance, elevation or pace value fell outside what is physically possible.
    #[error("invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// The value that failed validation.
        value: f64,
        /// Why it is invalid.
        reason: &'static str,
    },

    /// An internal invariant was violated — a programmer bug, not bad input.
    #[error("invariant violated: {0}")]
    Invariant(String),
}
