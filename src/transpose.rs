//! Axis transpose (§4.2): permute the three spatial axes and reorder
//! spacing in lockstep.

use crate::error::{Error, Result};
use crate::volume::Volume;

/// Permute `volume`'s axes and spacing by `permutation`, a permutation of `[0, 1, 2]`.
///
/// Output shape is `(shape[p0], shape[p1], shape[p2])`. Voxel at output index
/// `(d, h, w)` equals voxel at input index `(d, h, w)` permuted by `permutation`'s
/// inverse. Spacing is reordered by the *same* `permutation` array applied
/// positionally to the (z, y, x) tuple — this is the Open Question pinned by
/// seed scenario S6 (see DESIGN.md): the reference's transpose reorders spacing
/// as if it shared indices with the array layout, not with a separately-tracked
/// physical axis label.
pub fn transpose(volume: &Volume, permutation: [usize; 3]) -> Result<Volume> {
    if !is_permutation(permutation) {
        return Err(Error::InvalidPermutation(permutation));
    }

    if permutation == [0, 1, 2] {
        // Identity: no voxel remapping needed.
        let mut out = volume.clone();
        out.bbox = volume.bbox;
        return Ok(out);
    }

    let shape = [volume.shape().0, volume.shape().1, volume.shape().2];
    let out_shape = (
        shape[permutation[0]],
        shape[permutation[1]],
        shape[permutation[2]],
    );

    let spacing = [volume.spacing.0, volume.spacing.1, volume.spacing.2];
    let out_spacing = (
        spacing[permutation[0]],
        spacing[permutation[1]],
        spacing[permutation[2]],
    );

    // inverse[permutation[i]] = i, so that for an output index `out_idx`,
    // `in_idx[permutation[k]] = out_idx[k]` gives the source index.
    let mut inverse = [0usize; 3];
    for (k, &p) in permutation.iter().enumerate() {
        inverse[p] = k;
    }

    let data = volume.data();
    let mut out_data = vec![0.0f32; out_shape.0 * out_shape.1 * out_shape.2];

    let (src_h, src_w) = (shape[1], shape[2]);
    let (out_h, out_w) = (out_shape.1, out_shape.2);

    for od in 0..out_shape.0 {
        for oh in 0..out_shape.1 {
            for ow in 0..out_shape.2 {
                let out_idx_arr = [od, oh, ow];
                let src = [
                    out_idx_arr[inverse[0]],
                    out_idx_arr[inverse[1]],
                    out_idx_arr[inverse[2]],
                ];
                let src_flat = (src[0] * src_h + src[1]) * src_w + src[2];
                let out_flat = (od * out_h + oh) * out_w + ow;
                out_data[out_flat] = data[src_flat];
            }
        }
    }

    let mut out = Volume::with_metadata_from(out_data, out_shape, out_spacing, volume, None)
        .expect("transpose preserves a valid shape/spacing combination");
    out.bbox = volume.bbox;
    Ok(out)
}

fn is_permutation(p: [usize; 3]) -> bool {
    let mut seen = [false; 3];
    for &v in &p {
        if v > 2 || seen[v] {
            return false;
        }
        seen[v] = true;
    }
    true
}
