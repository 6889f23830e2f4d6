//! The `Volume` value type that flows through every preprocessing stage.
//!
//! Modeled the way `dcm-toolbox`'s `convert::stl::VolumeData` packs a stack
//! of DICOM slices into a flat buffer plus spacing (see
//! `src/convert/stl.rs::build_volume` in that crate), generalized from a
//! single-purpose mesh-extraction input into the immutable-by-convention
//! record §3 of the spec describes: every stage takes a `Volume` by
//! reference (or value) and returns a freshly allocated one.

use crate::error::{Error, Result};

/// Axis-aligned bounding box over voxel indices: `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub start: (usize, usize, usize),
    pub end: (usize, usize, usize),
}

impl BoundingBox {
    pub fn new(start: (usize, usize, usize), end: (usize, usize, usize)) -> Self {
        debug_assert!(start.0 <= end.0 && start.1 <= end.1 && start.2 <= end.2);
        Self { start, end }
    }

    /// `end - start`, componentwise.
    pub fn size(&self) -> (usize, usize, usize) {
        (
            self.end.0 - self.start.0,
            self.end.1 - self.start.1,
            self.end.2 - self.start.2,
        )
    }
}

/// Mean/std/clip-window parameters for CT intensity normalization (§4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CTNormalizationProperties {
    pub mean: f32,
    pub std: f32,
    pub lower: f32,
    pub upper: f32,
}

impl CTNormalizationProperties {
    /// Standard deviation clamped away from zero, matching the reference's
    /// `max(std, 1e-8)` guard applied at the point of use in §4.4.
    pub fn effective_std(&self) -> f32 {
        self.std.max(1e-8)
    }
}

/// An immutable-by-convention 3D voxel volume in row-major (D, H, W) order.
///
/// `data.len() == shape.0 * shape.1 * shape.2` always holds; `shape.2` (W)
/// is the fastest-varying stride per §3.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Vec<f32>,
    shape: (usize, usize, usize),
    /// Physical voxel size in mm, ordered (z, y, x).
    pub spacing: (f64, f64, f64),
    /// World coordinates of voxel (0, 0, 0), in mm.
    pub origin: (f64, f64, f64),
    /// Direction cosines from DICOM `ImageOrientationPatient`.
    pub orientation: [[f64; 3]; 3],
    /// Set once a prior `crop_to_nonzero` has recorded its inverse box.
    pub bbox: Option<BoundingBox>,
}

impl Volume {
    /// Build a `Volume`, validating the invariants from spec §3.
    pub fn new(
        data: Vec<f32>,
        shape: (usize, usize, usize),
        spacing: (f64, f64, f64),
        origin: (f64, f64, f64),
        orientation: [[f64; 3]; 3],
    ) -> Result<Self> {
        let expected = shape.0 * shape.1 * shape.2;
        if data.len() != expected || shape.0 == 0 || shape.1 == 0 || shape.2 == 0 {
            return Err(Error::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        if !spacing_is_valid(spacing) {
            return Err(Error::InvalidSpacing { spacing });
        }
        Ok(Self {
            data,
            shape,
            spacing,
            origin,
            orientation,
            bbox: None,
        })
    }

    /// Construct without re-deriving origin/orientation, carrying them over from a
    /// prior stage. Used internally by stages that preserve metadata unchanged.
    pub(crate) fn with_metadata_from(
        data: Vec<f32>,
        shape: (usize, usize, usize),
        spacing: (f64, f64, f64),
        source: &Volume,
        bbox: Option<BoundingBox>,
    ) -> Result<Self> {
        let mut v = Volume::new(data, shape, spacing, source.origin, source.orientation)?;
        v.bbox = bbox;
        Ok(v)
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat index for voxel (d, h, w); `w` is fastest-varying (§3).
    #[inline]
    pub fn index(&self, d: usize, h: usize, w: usize) -> usize {
        let (_, h_dim, w_dim) = self.shape;
        (d * h_dim + h) * w_dim + w
    }

    #[inline]
    pub fn get(&self, d: usize, h: usize, w: usize) -> f32 {
        self.data[self.index(d, h, w)]
    }

    pub fn validate(&self) -> Result<()> {
        let expected = self.shape.0 * self.shape.1 * self.shape.2;
        if self.data.len() != expected {
            return Err(Error::ShapeMismatch {
                shape: self.shape,
                expected,
                actual: self.data.len(),
            });
        }
        if !spacing_is_valid(self.spacing) {
            return Err(Error::InvalidSpacing {
                spacing: self.spacing,
            });
        }
        Ok(())
    }
}

fn spacing_is_valid(spacing: (f64, f64, f64)) -> bool {
    let (z, y, x) = spacing;
    [z, y, x].into_iter().all(|v| v.is_finite() && v > 0.0)
}
