//! Preprocessing plan (§6): the wire-shaped structs a caller deserializes
//! from its own configuration store and hands to [`crate::pipeline::Pipeline`].
//!
//! Loading the plan from disk or a CLI argument is explicitly out of scope
//! (§1, §6 — "no CLI or on-disk persistence is part of the core") — this
//! module only defines the shape so a caller's `serde_json::from_str` has
//! somewhere to land, plus the extraction helpers the pipeline needs.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::volume::CTNormalizationProperties;

/// Per-channel intensity statistics, as recorded in the dataset fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ForegroundIntensityProperties {
    pub mean: f64,
    pub std: f64,
    #[serde(rename = "percentile_00_5")]
    pub percentile_00_5: f64,
    #[serde(rename = "percentile_99_5")]
    pub percentile_99_5: f64,
}

/// Keyword arguments threaded into [`crate::resample::resample`] for either the
/// data or the segmentation resampling call (§6's `resampling_fn_*_kwargs`).
/// `anisotropy_threshold` is *not* part of this shape — §6 lists it as a
/// top-level `PreprocessingParameters` field, shared by both kwargs blocks.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResamplingFnKwargs {
    #[serde(default)]
    pub is_seg: bool,
    #[serde(default = "default_order")]
    pub order: usize,
    #[serde(default)]
    pub order_z: usize,
    #[serde(default)]
    pub force_separate_z: Option<bool>,
}

fn default_order() -> usize {
    3
}

fn default_anisotropy_threshold() -> f64 {
    3.0
}

impl Default for ResamplingFnKwargs {
    fn default() -> Self {
        ResamplingFnKwargs {
            is_seg: false,
            order: default_order(),
            order_z: 0,
            force_separate_z: None,
        }
    }
}

/// A full preprocessing configuration for one nnU-Net "configuration", as
/// produced by the reference's plans file (§6's field table).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PreprocessingParameters {
    pub configuration_name: String,
    pub target_spacing: (f64, f64, f64),
    pub patch_size: (usize, usize, usize),
    pub transpose_forward: [usize; 3],
    pub transpose_backward: [usize; 3],
    pub normalization_schemes: Vec<String>,
    #[serde(default)]
    pub use_mask_for_norm: Vec<bool>,
    pub foreground_intensity_properties: HashMap<String, ForegroundIntensityProperties>,
    pub resampling_fn_data_kwargs: ResamplingFnKwargs,
    pub resampling_fn_seg_kwargs: ResamplingFnKwargs,
    #[serde(default = "default_anisotropy_threshold")]
    pub anisotropy_threshold: f64,
    pub original_spacing: (f64, f64, f64),
    pub original_median_shape: (usize, usize, usize),
}

impl PreprocessingParameters {
    /// Extracts the `CTNormalize` inputs for channel `channel_index`, validating
    /// the configured scheme along the way (§4.4, §6).
    pub fn ct_normalization_properties(&self, channel_index: usize) -> Result<CTNormalizationProperties> {
        match self.normalization_schemes.get(channel_index).map(String::as_str) {
            Some("CTNormalization") => {}
            Some(other) => return Err(Error::UnsupportedNormalizationScheme(other.to_string())),
            None => {
                return Err(Error::UnsupportedNormalizationScheme(format!(
                    "no normalization scheme configured for channel {channel_index}"
                )))
            }
        }

        let props = self
            .foreground_intensity_properties
            .get(&channel_index.to_string())
            .ok_or(Error::MissingIntensityProperties)?;

        Ok(CTNormalizationProperties {
            mean: props.mean as f32,
            std: props.std as f32,
            lower: props.percentile_00_5 as f32,
            upper: props.percentile_99_5 as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"
        {
            "configuration_name": "3d_fullres",
            "target_spacing": [2.0, 0.8, 0.8],
            "patch_size": [28, 256, 256],
            "transpose_forward": [0, 1, 2],
            "transpose_backward": [0, 1, 2],
            "normalization_schemes": ["CTNormalization"],
            "use_mask_for_norm": [false],
            "foreground_intensity_properties": {
                "0": {
                    "mean": 102.3,
                    "std": 211.5,
                    "percentile_00_5": -958.0,
                    "percentile_99_5": 1523.0
                }
            },
            "resampling_fn_data_kwargs": {"is_seg": false, "order": 3, "order_z": 0},
            "resampling_fn_seg_kwargs": {"is_seg": true, "order": 1, "order_z": 0},
            "anisotropy_threshold": 3.0,
            "original_spacing": [2.5, 0.8, 0.8],
            "original_median_shape": [100, 512, 512]
        }
        "#
    }

    #[test]
    fn deserializes_full_plan_from_json() {
        let plan: PreprocessingParameters = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(plan.configuration_name, "3d_fullres");
        assert_eq!(plan.target_spacing, (2.0, 0.8, 0.8));
        assert_eq!(plan.patch_size, (28, 256, 256));
        assert_eq!(plan.resampling_fn_data_kwargs.order, 3);
        assert!(!plan.resampling_fn_data_kwargs.is_seg);
        assert_eq!(plan.resampling_fn_seg_kwargs.order, 1);
        assert!(plan.resampling_fn_seg_kwargs.is_seg);
        assert_eq!(plan.anisotropy_threshold, 3.0);
    }

    #[test]
    fn extracts_ct_normalization_properties_for_channel() {
        let plan: PreprocessingParameters = serde_json::from_str(sample_json()).unwrap();
        let props = plan.ct_normalization_properties(0).unwrap();
        assert_eq!(props.mean, 102.3);
        assert_eq!(props.lower, -958.0);
        assert_eq!(props.upper, 1523.0);
    }

    #[test]
    fn missing_channel_properties_errors() {
        let plan: PreprocessingParameters = serde_json::from_str(sample_json()).unwrap();
        let err = plan.ct_normalization_properties(1);
        assert!(matches!(err, Err(Error::MissingIntensityProperties)));
    }

    #[test]
    fn unsupported_scheme_errors() {
        let mut plan: PreprocessingParameters = serde_json::from_str(sample_json()).unwrap();
        plan.normalization_schemes[0] = "NoNormalization".to_string();
        let err = plan.ct_normalization_properties(0);
        assert!(matches!(err, Err(Error::UnsupportedNormalizationScheme(_))));
    }

    #[test]
    fn resampling_kwargs_default_order_is_cubic() {
        let kwargs = ResamplingFnKwargs::default();
        assert_eq!(kwargs.order, 3);
        assert!(!kwargs.is_seg);
    }

    #[test]
    fn anisotropy_threshold_defaults_when_absent() {
        let json = sample_json().replace(r#""anisotropy_threshold": 3.0,"#, "");
        let plan: PreprocessingParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(plan.anisotropy_threshold, 3.0);
    }
}
