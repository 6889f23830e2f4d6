//! The preprocessing driver (§5): crop, transpose, resample, normalize, in
//! that fixed order, behind a pluggable [`Backend`] chosen once at
//! construction — never per-voxel — per the dispatch pattern §9 calls for.

use crate::crop::crop_to_nonzero;
use crate::error::Result;
use crate::normalize::ct_normalize;
use crate::plan::PreprocessingParameters;
use crate::resample::resample;
use crate::transpose::transpose;
use crate::volume::{CTNormalizationProperties, Volume};

/// The four stage operations a `Pipeline` dispatches to. `CpuBackend` is the
/// only implementation built into this crate's default feature set; the
/// `gpu` feature adds `crate::gpu::GpuBackend` as a drop-in alternative with
/// the same contract.
pub trait Backend {
    fn crop(&self, volume: &Volume) -> (Volume, crate::volume::BoundingBox) {
        crop_to_nonzero(volume)
    }

    fn transpose(&self, volume: &Volume, permutation: [usize; 3]) -> Result<Volume> {
        transpose(volume, permutation)
    }

    fn resample(
        &self,
        volume: &Volume,
        target_spacing: (f64, f64, f64),
        order: usize,
        order_z: usize,
        force_separate_z: Option<bool>,
        anisotropy_threshold: f64,
    ) -> Volume {
        resample(volume, target_spacing, order, order_z, force_separate_z, anisotropy_threshold)
    }

    fn normalize(&self, volume: &Volume, props: &CTNormalizationProperties) -> Volume {
        ct_normalize(volume, props)
    }
}

/// The default backend: every stage runs on the CPU, parallelized over
/// z-slices when the `parallel` feature is enabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl Backend for CpuBackend {}

/// Runs the full preprocessing sequence — crop, transpose (forward), resample,
/// normalize — against a chosen [`Backend`]. Defaults to [`CpuBackend`].
pub struct Pipeline<B: Backend = CpuBackend> {
    backend: B,
}

impl Default for Pipeline<CpuBackend> {
    fn default() -> Self {
        Pipeline { backend: CpuBackend }
    }
}

impl<B: Backend> Pipeline<B> {
    pub fn new(backend: B) -> Self {
        Pipeline { backend }
    }

    /// Run crop -> transpose(forward) -> resample(data kwargs) -> normalize
    /// against channel 0 of `params`, matching §5's fixed stage order.
    pub fn run(&self, volume: Volume, params: &PreprocessingParameters) -> Result<Volume> {
        let (cropped, _bbox) = self.backend.crop(&volume);

        let transposed = self.backend.transpose(&cropped, params.transpose_forward)?;

        let kwargs = &params.resampling_fn_data_kwargs;
        let resampled = self.backend.resample(
            &transposed,
            params.target_spacing,
            kwargs.order,
            kwargs.order_z,
            kwargs.force_separate_z,
            params.anisotropy_threshold,
        );

        let props = params.ct_normalization_properties(0)?;
        let normalized = self.backend.normalize(&resampled, &props);

        Ok(normalized)
    }
}
