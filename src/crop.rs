//! Crop-to-nonzero (§4.1): shrink a volume to the tight bounding box of
//! non-zero voxels, bit-identical to the source sub-volume.

use crate::volume::{BoundingBox, Volume};

/// Scan `volume` once for the smallest axis-aligned box containing every
/// voxel with value `!= 0.0` (exact equality — §9 open question #3 is
/// intentional, background HU is clamped to 0 upstream, not a
/// floating-point tolerance). Returns the cropped volume and the box; if
/// the volume is entirely zero, returns the input unchanged with
/// `bbox = {start: (0,0,0), end: shape}`.
pub fn crop_to_nonzero(volume: &Volume) -> (Volume, BoundingBox) {
    let (d, h, w) = volume.shape();
    let data = volume.data();

    let mut min_d = usize::MAX;
    let mut max_d = 0usize;
    let mut min_h = usize::MAX;
    let mut max_h = 0usize;
    let mut min_w = usize::MAX;
    let mut max_w = 0usize;
    let mut found = false;

    for dd in 0..d {
        for hh in 0..h {
            let row_base = (dd * h + hh) * w;
            for ww in 0..w {
                if data[row_base + ww] != 0.0 {
                    found = true;
                    min_d = min_d.min(dd);
                    max_d = max_d.max(dd);
                    min_h = min_h.min(hh);
                    max_h = max_h.max(hh);
                    min_w = min_w.min(ww);
                    max_w = max_w.max(ww);
                }
            }
        }
    }

    if !found {
        let bbox = BoundingBox::new((0, 0, 0), (d, h, w));
        return (volume.clone(), bbox);
    }

    let start = (min_d, min_h, min_w);
    let end = (max_d + 1, max_h + 1, max_w + 1);
    let bbox = BoundingBox::new(start, end);
    let (nd, nh, nw) = bbox.size();

    let mut cropped = Vec::with_capacity(nd * nh * nw);
    for dd in start.0..end.0 {
        for hh in start.1..end.1 {
            let row_base = (dd * h + hh) * w;
            cropped.extend_from_slice(&data[row_base + start.2..row_base + end.2]);
        }
    }

    let new_volume = Volume::with_metadata_from(cropped, (nd, nh, nw), volume.spacing, volume, Some(bbox))
        .expect("crop preserves valid shape and spacing");

    (new_volume, bbox)
}
