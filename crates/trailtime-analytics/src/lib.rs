// ABOUTME: Route analytics engine — segmentation, pace models, thresholds, fatigue, prediction
// ABOUTME: Pure synchronous computation; no async runtime and no I/O anywhere in this crate

//! Turns a GPS track plus an optional personal pace profile into a time estimate.
//!
//! The pipeline: [`segmenter`] splits a track into macro-segments, [`calculators`]
//! scores each segment under one or more pace models, [`threshold`] decides
//! run-vs-hike per segment for trail running, [`fatigue`] degrades base times by
//! elapsed load, [`personaliser`] substitutes a user's own observed paces where
//! enough data exists, and [`predictor`] orchestrates all of the above into the
//! totals a caller actually wants.

/// Per-segment time/speed calculators dispatched over a tagged pace-model variant.
pub mod calculators;
/// Fatigue multiplier model for both hiking and running.
pub mod fatigue;
/// Tobler, Naismith+Langmuir, Minetti and Strava-GAP pace formulas.
pub mod formulas;
/// Looks up a user's observed pace for a segment, falling back to formula.
pub mod personaliser;
/// Orchestrates the full hiking and trail-running prediction pipelines.
pub mod predictor;
/// Builds and updates per-user pace profiles from synced splits.
pub mod profile_builder;
/// Splits a GPS track into direction-coherent macro-segments.
pub mod segmenter;
/// Decides, per segment, whether a runner would run or power-hike.
pub mod threshold;
