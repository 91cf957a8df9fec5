// ABOUTME: Tagged-variant dispatch over pace models, replacing the source's calculator subclassing
// ABOUTME: Every variant yields the same MethodResult record via a single calculate() entry point

use trailtime_core::model::{EffortLevel, MacroSegment, SegmentType};

use crate::formulas::{
    langmuir_correction_hours, minetti_cost_ratio, naismith_base_time_hours, strava_gap_factor,
    tobler_speed_kmh,
};

/// Which empirical grade-adjusted-pace source a `PaceMethod::Gap` variant uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapMode {
    /// Strava's published empirical table on both uphill and downhill.
    Strava,
    /// Minetti's energy-cost polynomial on both uphill and downhill.
    Minetti,
    /// Minetti uphill, Strava downhill — the hybrid the source calls `strava_minetti_gap`.
    StravaMinetti,
}

/// A pace model, tagged by variant rather than by runtime polymorphism.
///
/// `Personalised` variants carry the flat-pace-equivalent (min/km) the
/// Personaliser already resolved for this segment's category and effort;
/// the calculator just turns that pace into a segment time.
#[derive(Debug, Clone, Copy)]
pub enum PaceMethod {
    /// Tobler's hiking function.
    Tobler,
    /// Naismith's rule with Langmuir descent correction.
    Naismith,
    /// Tobler speed personalised by a profile-wide multiplier.
    ToblerPersonalised { multiplier: f64 },
    /// Naismith time personalised by a profile-wide multiplier.
    NaismithPersonalised { multiplier: f64 },
    /// Grade-adjusted pace under one of the three GAP table sources.
    Gap(GapMode),
    /// A runner's personalised pace (minutes/km) for this segment's category and effort.
    PersonalisedRun { pace_min_per_km: f64, effort: EffortLevel },
}

/// The uniform result every `PaceMethod` calculation yields.
#[derive(Debug, Clone)]
pub struct MethodResult {
    /// Human-readable name of the method that produced this result.
    pub method_name: &'static str,
    /// Effective speed over the segment, km/h.
    pub effective_speed_kmh: f64,
    /// Time to cover the segment under this method, hours.
    pub time_hours: f64,
    /// A human-readable description of the formula applied.
    pub formula: String,
}

/// Calculate a segment's time under a given pace method, multiplying the result
/// by `profile_multiplier` at the end (every calculator does this, including `1.0`
/// for none).
#[must_use]
pub fn calculate(segment: &MacroSegment, method: PaceMethod, profile_multiplier: f64) -> MethodResult {
    let raw = match method {
        PaceMethod::Tobler => tobler(segment),
        PaceMethod::Naismith => naismith(segment),
        PaceMethod::ToblerPersonalised { multiplier } => {
            let mut r = tobler(segment);
            r.time_hours *= multiplier;
            r.effective_speed_kmh = speed_from_time(segment.distance_km, r.time_hours);
            r
        }
        PaceMethod::NaismithPersonalised { multiplier } => {
            let mut r = naismith(segment);
            r.time_hours *= multiplier;
            r.effective_speed_kmh = speed_from_time(segment.distance_km, r.time_hours);
            r
        }
        PaceMethod::Gap(mode) => gap(segment, mode),
        PaceMethod::PersonalisedRun { pace_min_per_km, effort } => {
            personalised_run(segment, pace_min_per_km, effort)
        }
    };

    MethodResult {
        time_hours: raw.time_hours * profile_multiplier,
        effective_speed_kmh: if profile_multiplier > 0.0 {
            speed_from_time(segment.distance_km, raw.time_hours * profile_multiplier)
        } else {
            raw.effective_speed_kmh
        },
        ..raw
    }
}

fn speed_from_time(distance_km: f64, time_hours: f64) -> f64 {
    if time_hours <= 0.0 {
        0.0
    } else {
        distance_km / time_hours
    }
}

fn tobler(segment: &MacroSegment) -> MethodResult {
    let gradient_decimal = segment.gradient_percent() / 100.0;
    let speed = tobler_speed_kmh(gradient_decimal);
    let time_hours = if speed > 0.0 {
        segment.distance_km / speed
    } else {
        0.0
    };
    MethodResult {
        method_name: "tobler",
        effective_speed_kmh: speed,
        time_hours,
        formula: format!("6 * exp(-3.5 * |{gradient_decimal:.3} + 0.05|)"),
    }
}

fn naismith(segment: &MacroSegment) -> MethodResult {
    let time_hours = match segment.segment_type {
        SegmentType::Ascent => naismith_base_time_hours(segment.distance_km, segment.elevation_gain_m),
        SegmentType::Flat => naismith_base_time_hours(segment.distance_km, 0.0),
        SegmentType::Descent => {
            let base = naismith_base_time_hours(segment.distance_km, 0.0);
            let correction =
                langmuir_correction_hours(segment.elevation_loss_m, segment.gradient_degrees().abs());
            base + correction
        }
    };
    MethodResult {
        method_name: "naismith",
        effective_speed_kmh: speed_from_time(segment.distance_km, time_hours),
        time_hours,
        formula: "distance/5 + gain/600 with Langmuir descent correction".to_owned(),
    }
}

fn gap(segment: &MacroSegment, mode: GapMode) -> MethodResult {
    let gradient_percent = segment.gradient_percent();
    let flat_run_speed_kmh = 10.0; // base flat running speed equivalent used for GAP normalisation
    let factor = match mode {
        GapMode::Strava => strava_gap_factor(gradient_percent),
        GapMode::Minetti => minetti_cost_ratio(gradient_percent / 100.0),
        GapMode::StravaMinetti => {
            if gradient_percent >= 0.0 {
                minetti_cost_ratio(gradient_percent / 100.0)
            } else {
                strava_gap_factor(gradient_percent)
            }
        }
    };
    let adjusted_speed = if factor > 0.0 {
        flat_run_speed_kmh / factor
    } else {
        flat_run_speed_kmh
    };
    let time_hours = if adjusted_speed > 0.0 {
        segment.distance_km / adjusted_speed
    } else {
        0.0
    };
    let name = match mode {
        GapMode::Strava => "gap_strava",
        GapMode::Minetti => "gap_minetti",
        GapMode::StravaMinetti => "gap_strava_minetti",
    };
    MethodResult {
        method_name: name,
        effective_speed_kmh: adjusted_speed,
        time_hours,
        formula: format!("flat_speed / cost_ratio({gradient_percent:.1}%)"),
    }
}

fn personalised_run(segment: &MacroSegment, pace_min_per_km: f64, effort: EffortLevel) -> MethodResult {
    let speed = if pace_min_per_km > 0.0 {
        60.0 / pace_min_per_km
    } else {
        0.0
    };
    let time_hours = if speed > 0.0 {
        segment.distance_km / speed
    } else {
        0.0
    };
    let name = match effort {
        EffortLevel::Race => "personalised_race",
        EffortLevel::Moderate => "personalised_moderate",
        EffortLevel::Easy => "personalised_easy",
    };
    MethodResult {
        method_name: name,
        effective_speed_kmh: speed,
        time_hours,
        formula: format!("personal pace {pace_min_per_km:.2} min/km"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailtime_core::model::SegmentType;

    fn seg(distance_km: f64, start_elev: f64, end_elev: f64, segment_type: SegmentType) -> MacroSegment {
        let change = end_elev - start_elev;
        MacroSegment {
            ordinal: 1,
            segment_type,
            distance_km,
            elevation_gain_m: change.max(0.0),
            elevation_loss_m: (-change).max(0.0),
            start_elevation_m: start_elev,
            end_elevation_m: end_elev,
        }
    }

    #[test]
    fn s1_tobler_and_naismith_flat_ten_km() {
        let s = seg(10.0, 1000.0, 1000.0, SegmentType::Flat);
        let tobler_result = calculate(&s, PaceMethod::Tobler, 1.0);
        let naismith_result = calculate(&s, PaceMethod::Naismith, 1.0);
        assert!((tobler_result.time_hours - 2.0).abs() < 0.05);
        assert!((naismith_result.time_hours - 2.0).abs() < 1e-9);
    }

    #[test]
    fn s2_naismith_ascent_three_km_six_hundred_gain() {
        let s = seg(3.0, 1000.0, 1600.0, SegmentType::Ascent);
        let r = calculate(&s, PaceMethod::Naismith, 1.0);
        assert!((r.time_hours - 1.60).abs() < 1e-9);
    }

    #[test]
    fn s3_langmuir_steep_descent() {
        let s = seg(2.0, 600.0, 0.0, SegmentType::Descent);
        let r = calculate(&s, PaceMethod::Naismith, 1.0);
        assert!((r.time_hours - 0.733).abs() < 0.01, "got {}", r.time_hours);
    }

    #[test]
    fn profile_multiplier_scales_every_method() {
        let s = seg(10.0, 1000.0, 1000.0, SegmentType::Flat);
        let base = calculate(&s, PaceMethod::Naismith, 1.0);
        let doubled = calculate(&s, PaceMethod::Naismith, 2.0);
        assert!((doubled.time_hours - base.time_hours * 2.0).abs() < 1e-9);
    }
}
