//! Continuous level estimation from raw segment readings
//!
//! The sensor reports one 8-bit value per segment, but the range of
//! readings varies with installation and nearby electric fields, and
//! each segment is influenced by its proximity to the air/liquid
//! boundary. A plain threshold scan would therefore step in whole
//! segments and jitter around each boundary.
//!
//! The estimator here is the boundary-detection model: scan segments
//! from the tank bottom upwards with a moving threshold. Fully wet
//! segments read strongly and monotonically push the threshold up
//! (signal strength grows toward the boundary); the first segment that
//! falls short of the threshold is the boundary segment, and its value
//! is interpolated linearly between a noise floor and the threshold to
//! give a fractional contribution. The result is a fractional count of
//! filled segments that moves smoothly as the liquid crosses segment
//! boundaries, despite the coarse per-segment granularity.
//!
//! This is an empirically tuned heuristic, not a model of the true
//! sensor response curve. One consequence of the moving threshold:
//! the estimate is monotonic in the boundary segment's value, but not
//! in every segment independently — raising an already-wet segment
//! raises the threshold and can shave a tenth or two off the boundary
//! interpolation. That trade is deliberate: rescaling the boundary by
//! the strength of the wet segments below it is what absorbs
//! per-installation signal variance.

use crate::constants::{BOUNDARY_THRESHOLD, MAX_SEGMENTS, NOISE_FLOOR_DIVISOR};
use crate::reading::SegmentReading;

/// Estimates the fill level as a fractional count of wet segments,
/// measured from the tank bottom.
///
/// `segments` is the number of interpreted segments (clamped to
/// 1..=10); sensors installed on short tanks only use the lower part
/// of the strip. The result is always within `0.0..=segments as f32`;
/// an all-dry reading gives exactly 0.0. A failed decode never reaches
/// this function — "no reading" is represented upstream, distinct from
/// "dry".
pub fn estimate_level(reading: &SegmentReading, segments: usize) -> f32 {
    let segments = segments.clamp(1, MAX_SEGMENTS);

    let mut threshold = BOUNDARY_THRESHOLD;
    for (i, value) in reading.bottom_to_top(segments).enumerate() {
        let value = u16::from(value);
        if value < threshold {
            // Boundary segment: interpolate between the noise floor
            // and the running threshold, quantized to one decimal.
            let floor = threshold / NOISE_FLOOR_DIVISOR;
            if value < floor {
                return i as f32;
            }
            let fraction = f32::from(value - floor) / f32::from(threshold - floor);
            return round_tenths(fraction) + i as f32;
        }
        // Wet segments read stronger the closer they sit to the
        // boundary; let them raise the bar for the ones above.
        threshold = threshold.max(value * 9 / 10);
    }
    segments as f32
}

fn round_tenths(value: f32) -> f32 {
    libm::roundf(value * 10.0) / 10.0
}
