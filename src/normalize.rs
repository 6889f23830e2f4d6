//! CT intensity normalization (§4.4): clip to the fingerprint's percentile
//! window, then z-score.

use crate::volume::{CTNormalizationProperties, Volume};

/// For every voxel, in one linear pass: `v = clamp(v, lower, upper)`, then
/// `v = (v - mean) / max(std, 1e-8)`. All arithmetic in float32, in this exact
/// order — the output must be bit-exact given identical operands (§8 tolerance).
pub fn ct_normalize(volume: &Volume, props: &CTNormalizationProperties) -> Volume {
    let std = props.effective_std();
    let data: Vec<f32> = volume
        .data()
        .iter()
        .map(|&v| {
            let clipped = v.clamp(props.lower, props.upper);
            (clipped - props.mean) / std
        })
        .collect();

    let mut out = Volume::with_metadata_from(data, volume.shape(), volume.spacing, volume, volume.bbox)
        .expect("normalize preserves shape and spacing");
    out.bbox = volume.bbox;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume_with(values: &[f32]) -> Volume {
        Volume::new(
            values.to_vec(),
            (1, 1, values.len()),
            (1.0, 1.0, 1.0),
            (0.0, 0.0, 0.0),
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn s5_clip_and_zscore_matches_seed_scenario() {
        // spec S5: mean=0, std=1, lower=-1024, upper=3071.
        let props = CTNormalizationProperties {
            mean: 0.0,
            std: 1.0,
            lower: -1024.0,
            upper: 3071.0,
        };
        let v = volume_with(&[4000.0, -2000.0, 100.0]);
        let out = ct_normalize(&v, &props);

        assert_eq!(out.get(0, 0, 0), 3071.0);
        assert_eq!(out.get(0, 0, 1), -1024.0);
        assert_eq!(out.get(0, 0, 2), 100.0);
    }

    #[test]
    fn applies_mean_and_std_after_clipping() {
        let props = CTNormalizationProperties {
            mean: 50.0,
            std: 25.0,
            lower: -100.0,
            upper: 100.0,
        };
        let v = volume_with(&[50.0, 75.0, 200.0, -200.0]);
        let out = ct_normalize(&v, &props);

        assert_eq!(out.get(0, 0, 0), 0.0); // (50-50)/25
        assert_eq!(out.get(0, 0, 1), 1.0); // (75-50)/25
        assert_eq!(out.get(0, 0, 2), 2.0); // clipped to 100 -> (100-50)/25
        assert_eq!(out.get(0, 0, 3), -6.0); // clipped to -100 -> (-100-50)/25
    }

    #[test]
    fn zero_std_is_clamped_to_epsilon_not_div_by_zero() {
        let props = CTNormalizationProperties {
            mean: 0.0,
            std: 0.0,
            lower: -10.0,
            upper: 10.0,
        };
        let v = volume_with(&[5.0]);
        let out = ct_normalize(&v, &props);
        assert!(out.get(0, 0, 0).is_finite());
        assert_eq!(out.get(0, 0, 0), 5.0 / 1e-8);
    }

    #[test]
    fn preserves_shape_and_spacing() {
        let props = CTNormalizationProperties {
            mean: 0.0,
            std: 1.0,
            lower: -1.0,
            upper: 1.0,
        };
        let mut v = volume_with(&[0.0, 0.5, -0.5]);
        v.spacing = (2.0, 3.0, 4.0);
        let out = ct_normalize(&v, &props);
        assert_eq!(out.shape(), v.shape());
        assert_eq!(out.spacing, v.spacing);
    }

    #[test]
    fn mean_of_clipped_distribution_is_approximately_zero() {
        // Property 5: normalizing with the true mean/std of a clipped
        // distribution should center it near zero.
        let raw: Vec<f32> = (0..1000).map(|i| i as f32 - 500.0).collect();
        let lower = -300.0f32;
        let upper = 300.0f32;
        let clipped: Vec<f32> = raw.iter().map(|&v| v.clamp(lower, upper)).collect();
        let n = clipped.len() as f32;
        let mean = clipped.iter().sum::<f32>() / n;
        let variance = clipped.iter().map(|&v| (v - mean).powi(2)).sum::<f32>() / n;
        let std = variance.sqrt();

        let props = CTNormalizationProperties {
            mean,
            std,
            lower,
            upper,
        };
        let v = volume_with(&raw);
        let out = ct_normalize(&v, &props);

        let out_mean = out.data().iter().sum::<f32>() / out.len() as f32;
        assert!(out_mean.abs() < 1e-3, "mean was {out_mean}");
    }
}
