//! Error taxonomy for the preprocessing core.
//!
//! The CPU stages treat violations of the [`Volume`](crate::volume::Volume)
//! invariants as programmer errors: they are returned as `Err` rather than
//! panicking directly, so a caller at the boundary (a CLI, a test, an FFI
//! shim) can decide how loudly to fail, but nothing in this crate retries
//! or silently recovers from one.

use thiserror::Error;

#[cfg(feature = "gpu")]
pub use crate::gpu::GpuError;

/// Errors produced by the preprocessing core.
#[derive(Error, Debug)]
pub enum Error {
    /// A `Volume`'s `data` length does not match `shape.0 * shape.1 * shape.2`.
    #[error("shape mismatch: data has {actual} elements, shape {shape:?} implies {expected}")]
    ShapeMismatch {
        shape: (usize, usize, usize),
        expected: usize,
        actual: usize,
    },

    /// A `Volume`'s spacing component is not finite and strictly positive.
    #[error("invalid spacing {spacing:?}: components must be finite and > 0")]
    InvalidSpacing { spacing: (f64, f64, f64) },

    /// `transpose` was called with something other than a permutation of `[0, 1, 2]`.
    #[error("invalid transpose permutation: {0:?}")]
    InvalidPermutation([usize; 3]),

    /// The plan requested a normalization scheme this core does not implement.
    #[error("unsupported normalization scheme: {0}")]
    UnsupportedNormalizationScheme(String),

    /// The plan's `foreground_intensity_properties` map has no entry for channel "0".
    #[error("plan is missing foreground intensity properties for channel 0")]
    MissingIntensityProperties,

    /// A DICOM series could not be read into a [`Volume`](crate::volume::Volume):
    /// missing geometry tags, inconsistent slice shapes, or a decode failure.
    #[error("DICOM ingest failed: {0}")]
    Ingest(String),

    /// GPU backend failure (device, queue, shader, buffer, or dispatch). CPU path never
    /// produces this variant.
    #[cfg(feature = "gpu")]
    #[error("GPU backend error: {0}")]
    GpuBackend(#[from] GpuError),
}

pub type Result<T> = std::result::Result<T, Error>;
