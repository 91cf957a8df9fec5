// ABOUTME: Splits a GPS track into direction-coherent macro-segments
// ABOUTME: Short reversals below MIN_SEGMENT_KM are absorbed into the segment that contains them

use trailtime_core::constants::{
    ELEVATION_SMOOTHING_WINDOW, FLAT_GRADIENT_MAX_PERCENT, FLAT_GRADIENT_MIN_PERCENT,
    MIN_SEGMENT_KM,
};
use trailtime_core::geo::{elevation_changes, gradient_decimal, gradient_to_percent, haversine_km, smooth_elevations};
use trailtime_core::model::{MacroSegment, Point, SegmentType};

#[derive(Clone, Copy, PartialEq, Eq)]
enum StepDirection {
    Up,
    Down,
    Flat,
}

fn classify_step(gradient_percent: f64) -> StepDirection {
    if gradient_percent > FLAT_GRADIENT_MAX_PERCENT {
        StepDirection::Up
    } else if gradient_percent < FLAT_GRADIENT_MIN_PERCENT {
        StepDirection::Down
    } else {
        StepDirection::Flat
    }
}

/// Split a track into an ordered list of macro-segments.
///
/// Returns an empty list for tracks with fewer than two points, matching the
/// edge case the rest of the pipeline expects: nothing to segment, nothing to predict.
#[must_use]
pub fn segment_route(points: &[Point]) -> Vec<MacroSegment> {
    if points.len() < 2 {
        return Vec::new();
    }

    let mut cumulative_km = vec![0.0_f64; points.len()];
    for i in 1..points.len() {
        let prev = &points[i - 1];
        let cur = &points[i];
        let d = haversine_km(
            prev.latitude_deg,
            prev.longitude_deg,
            cur.latitude_deg,
            cur.longitude_deg,
        );
        cumulative_km[i] = cumulative_km[i - 1] + d;
    }

    let raw_elevations: Vec<f64> = points.iter().map(|p| p.elevation_m).collect();
    let smoothed = smooth_elevations(&raw_elevations, ELEVATION_SMOOTHING_WINDOW);

    let mut segments = Vec::new();
    let mut segment_start = 0usize;
    let mut current_direction: Option<StepDirection> = None;

    for i in 1..points.len() {
        let step_dist_km = cumulative_km[i] - cumulative_km[i - 1];
        if step_dist_km < 0.001 {
            continue;
        }

        let elev_diff = smoothed[i] - smoothed[i - 1];
        let gradient_pct = gradient_to_percent(gradient_decimal(step_dist_km, elev_diff));
        let direction = classify_step(gradient_pct);

        let baseline = current_direction.get_or_insert(direction);

        if direction != *baseline && direction != StepDirection::Flat {
            let segment_dist_km = cumulative_km[i - 1] - cumulative_km[segment_start];
            if segment_dist_km >= MIN_SEGMENT_KM {
                segments.push(build_segment(
                    segments.len() as u32 + 1,
                    &cumulative_km,
                    &smoothed,
                    segment_start,
                    i - 1,
                ));
                segment_start = i - 1;
                current_direction = Some(direction);
            }
            // else: short reversal absorbed, current_direction unchanged.
        }
    }

    if segment_start < points.len() - 1 {
        segments.push(build_segment(
            segments.len() as u32 + 1,
            &cumulative_km,
            &smoothed,
            segment_start,
            points.len() - 1,
        ));
    }

    segments
}

fn build_segment(
    ordinal: u32,
    cumulative_km: &[f64],
    smoothed_elevations: &[f64],
    start_idx: usize,
    end_idx: usize,
) -> MacroSegment {
    if start_idx == end_idx {
        let elevation = smoothed_elevations[start_idx];
        return MacroSegment {
            ordinal,
            segment_type: SegmentType::Flat,
            distance_km: 0.0,
            elevation_gain_m: 0.0,
            elevation_loss_m: 0.0,
            start_elevation_m: elevation,
            end_elevation_m: elevation,
        };
    }

    let distance_km = cumulative_km[end_idx] - cumulative_km[start_idx];
    let (gain, loss) = elevation_changes(&smoothed_elevations[start_idx..=end_idx]);
    let start_elevation_m = smoothed_elevations[start_idx];
    let end_elevation_m = smoothed_elevations[end_idx];

    let gradient_percent = if distance_km > 0.0 {
        (end_elevation_m - start_elevation_m) / (distance_km * 1000.0) * 100.0
    } else {
        0.0
    };

    MacroSegment {
        ordinal,
        segment_type: MacroSegment::classify_type(gradient_percent),
        distance_km,
        elevation_gain_m: gain,
        elevation_loss_m: loss,
        start_elevation_m,
        end_elevation_m,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_track(n: usize, km_step: f64) -> Vec<Point> {
        // 1 degree of latitude is about 111.32 km.
        let deg_step = km_step / 111.32;
        (0..n)
            .map(|i| Point::new(i as f64 * deg_step, 0.0, 1000.0))
            .collect()
    }

    #[test]
    fn too_few_points_yields_no_segments() {
        assert!(segment_route(&[Point::new(0.0, 0.0, 0.0)]).is_empty());
    }

    #[test]
    fn s1_tobler_flat_ten_km_is_one_flat_segment() {
        let track = flat_track(11, 1.0);
        let segments = segment_route(&track);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].segment_type, SegmentType::Flat);
        assert!((segments[0].distance_km - 10.0).abs() < 0.05);
    }

    #[test]
    fn s2_uniform_ascent_is_one_ascent_segment() {
        let n = 31;
        let deg_step = (3.0 / (n as f64 - 1.0)) / 111.32;
        let track: Vec<Point> = (0..n)
            .map(|i| {
                let elev = 1000.0 + 600.0 * (i as f64 / (n as f64 - 1.0));
                Point::new(i as f64 * deg_step, 0.0, elev)
            })
            .collect();
        let segments = segment_route(&track);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].segment_type, SegmentType::Ascent);
        assert!((segments[0].distance_km - 3.0).abs() < 0.05);
        assert!((segments[0].elevation_gain_m - 600.0).abs() < 1.0);
    }

    #[test]
    fn coverage_invariant_sums_to_track_length() {
        let n = 41;
        let deg_step = (8.0 / (n as f64 - 1.0)) / 111.32;
        let track: Vec<Point> = (0..n)
            .map(|i| {
                let t = i as f64 / (n as f64 - 1.0);
                let elev = 1000.0 + 200.0 * (t * std::f64::consts::TAU).sin();
                Point::new(i as f64 * deg_step, 0.0, elev)
            })
            .collect();
        let total_length: f64 = track
            .windows(2)
            .map(|w| haversine_km(w[0].latitude_deg, w[0].longitude_deg, w[1].latitude_deg, w[1].longitude_deg))
            .sum();
        let segments = segment_route(&track);
        let summed: f64 = segments.iter().map(|s| s.distance_km).sum();
        assert!((summed - total_length).abs() < 0.01, "summed={summed} total={total_length}");
    }

    #[test]
    fn segment_typing_matches_its_own_gradient() {
        let track = flat_track(11, 1.0);
        for seg in segment_route(&track) {
            let g = seg.gradient_percent();
            match seg.segment_type {
                SegmentType::Flat => assert!(g.abs() <= 3.0),
                SegmentType::Ascent => assert!(g > 3.0),
                SegmentType::Descent => assert!(g < -3.0),
            }
        }
    }

    #[test]
    fn short_reversal_is_absorbed_not_split() {
        // Mostly ascending, one tiny descending step too short to count as a segment.
        let points = vec![
            Point::new(0.0, 0.0, 1000.0),
            Point::new(0.001, 0.0, 1010.0),
            Point::new(0.002, 0.0, 1008.0), // small reversal
            Point::new(0.003, 0.0, 1030.0),
            Point::new(0.004, 0.0, 1050.0),
        ];
        let segments = segment_route(&points);
        assert_eq!(segments.len(), 1);
    }
}
