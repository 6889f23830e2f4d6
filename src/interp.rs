//! Shared interpolation primitives: the cubic B-spline kernel, edge-clamped
//! index lookup, and banker's rounding for target-shape computation.
//!
//! These are the leaves of the dependency graph (§2): `resample` is the only
//! consumer, but the weight function and rounding rule are pulled out on
//! their own so both the dense and separable resampling paths (§4.3.3,
//! §4.3.4) share one definition — divergence here is exactly the kind of
//! few-ULPs drift §1 calls out as unacceptable.

/// Cubic B-spline (skimage `order=3`) weight at offset `t`, valid for `t` in `[-2, 2]`.
///
/// ```text
/// |t| < 1:    (1.5|t| - 2.5)*t^2 + 1
/// 1<=|t|<2:   ((-0.5|t| + 2.5)*|t| - 4)*|t| + 2
/// else:       0
/// ```
#[inline]
pub fn cubic_weight(t: f32) -> f32 {
    let a = t.abs();
    if a < 1.0 {
        (1.5 * a - 2.5) * a * a + 1.0
    } else if a < 2.0 {
        ((-0.5 * a + 2.5) * a - 4.0) * a + 2.0
    } else {
        0.0
    }
}

/// The four weights for the stencil offsets `{-1, 0, 1, 2}` relative to `floor(coord)`,
/// given the fractional part `frac = coord - floor(coord)`.
#[inline]
pub fn cubic_weights4(frac: f32) -> [f32; 4] {
    [
        cubic_weight(frac + 1.0),
        cubic_weight(frac),
        cubic_weight(1.0 - frac),
        cubic_weight(2.0 - frac),
    ]
}

/// Clamp a possibly out-of-range stencil index into `[0, len - 1]`.
#[inline]
pub fn clamp_index(i: isize, len: usize) -> usize {
    if i < 0 {
        0
    } else if i as usize >= len {
        len - 1
    } else {
        i as usize
    }
}

/// Round half to even ("banker's rounding"), matching the reference's target-shape
/// arithmetic (§4.3.1). `f64::round` is half-away-from-zero, so this is implemented
/// directly rather than reused.
#[inline]
pub fn round_half_even(x: f64) -> f64 {
    let floor = x.floor();
    let diff = x - floor;
    if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else {
        // Exactly .5: round to the even neighbor.
        if (floor as i64) % 2 == 0 {
            floor
        } else {
            floor + 1.0
        }
    }
}

/// Maps a destination index to a source-space coordinate with aligned endpoints:
/// destination 0 -> source 0, destination `dst_len - 1` -> source `src_len - 1`.
#[inline]
pub fn endpoint_aligned_coord(dst_index: usize, src_len: usize, dst_len: usize) -> f64 {
    let scale = (src_len.max(1) - 1) as f64 / (dst_len.max(1) - 1).max(1) as f64;
    dst_index as f64 * scale
}

/// Target shape component per §4.3.1: `max(1, round_half_even(size * scale))`.
#[inline]
pub fn target_len(src_len: usize, scale: f64) -> usize {
    let rounded = round_half_even(src_len as f64 * scale);
    (rounded.max(1.0)) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_weight_is_one_at_zero() {
        assert!((cubic_weight(0.0) - 1.0).abs() < 1e-7);
    }

    #[test]
    fn cubic_weight_is_zero_at_two() {
        assert!(cubic_weight(2.0).abs() < 1e-7);
        assert!(cubic_weight(-2.0).abs() < 1e-7);
    }

    #[test]
    fn cubic_weight_is_symmetric() {
        for t in [0.1, 0.5, 0.9, 1.0, 1.5, 1.9] {
            assert!((cubic_weight(t) - cubic_weight(-t)).abs() < 1e-7);
        }
    }

    #[test]
    fn cubic_weights4_sum_to_one_for_any_fraction() {
        for i in 0..=10 {
            let frac = i as f32 / 10.0;
            let w = cubic_weights4(frac);
            let sum: f32 = w.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "frac={frac} sum={sum}");
        }
    }

    #[test]
    fn clamp_index_clamps_below_zero() {
        assert_eq!(clamp_index(-3, 10), 0);
    }

    #[test]
    fn clamp_index_clamps_above_len() {
        assert_eq!(clamp_index(15, 10), 9);
    }

    #[test]
    fn clamp_index_passes_through_in_range() {
        assert_eq!(clamp_index(4, 10), 4);
    }

    #[test]
    fn round_half_even_rounds_ties_to_even() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(3.5), 4.0);
    }

    #[test]
    fn round_half_even_rounds_non_ties_normally() {
        assert_eq!(round_half_even(1.4), 1.0);
        assert_eq!(round_half_even(1.6), 2.0);
    }

    #[test]
    fn round_half_even_handles_negative_ties() {
        assert_eq!(round_half_even(-0.5), 0.0);
        assert_eq!(round_half_even(-1.5), -2.0);
    }

    #[test]
    fn endpoint_aligned_coord_maps_endpoints_exactly() {
        assert_eq!(endpoint_aligned_coord(0, 32, 16), 0.0);
        let last = endpoint_aligned_coord(15, 32, 16);
        assert!((last - 31.0).abs() < 1e-9);
    }

    #[test]
    fn endpoint_aligned_coord_single_destination_voxel_maps_to_zero() {
        assert_eq!(endpoint_aligned_coord(0, 32, 1), 0.0);
    }

    #[test]
    fn target_len_s4_scenario() {
        // spec S4: shape 32 with spacing 1.0 -> target spacing 2.0, scale 0.5.
        // 32 * 0.5 = 16.0 -> round_half_even -> 16
        assert_eq!(target_len(32, 0.5), 16);
    }

    #[test]
    fn target_len_clamps_to_minimum_one() {
        assert_eq!(target_len(1, 0.0001), 1);
    }
}
