//! Volumetric preprocessing core for nnU-Net-style CT inference.
//!
//! A `Volume` flows through four stages in a fixed order — crop-to-nonzero,
//! axis transpose, spacing resample, CT intensity normalization — driven by
//! [`pipeline::Pipeline`] against a [`plan::PreprocessingParameters`]. DICOM
//! decoding ([`ingest`]) and plan persistence are kept at the edges: the
//! stages themselves only ever see [`volume::Volume`].

pub mod crop;
pub mod error;
pub mod ingest;
pub mod interp;
pub mod normalize;
pub mod pipeline;
pub mod plan;
pub mod resample;
pub mod transpose;
pub mod volume;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use crop::crop_to_nonzero;
pub use error::{Error, Result};
pub use normalize::ct_normalize;
pub use pipeline::{Backend, CpuBackend, Pipeline};
pub use plan::PreprocessingParameters;
pub use resample::resample;
pub use transpose::transpose;
pub use volume::{BoundingBox, CTNormalizationProperties, Volume};
