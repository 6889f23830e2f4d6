//! DICOM series ingest: decode a stack of same-series DICOM slices into a
//! Hounsfield-unit [`Volume`].
//!
//! This is the bridge described in §6 as an external collaborator — the core
//! pipeline only ever sees a `Volume`, so this module's job ends once one has
//! been assembled. Grounded in the teacher's `convert::stl::build_volume`,
//! which stacked slices into a flat buffer and pulled spacing out of
//! `PixelSpacing` / `ImagePositionPatient` / `SliceThickness`; generalized
//! here to produce the row-major `(D, H, W)` layout and full 3x3 orientation
//! matrix the rest of this crate expects.

use std::path::Path;

use dicom::object::{open_file, InMemDicomObject};
use dicom_pixeldata::PixelDecoder;

use crate::error::{Error, Result};
use crate::volume::Volume;

/// Decode every file in `paths` as one DICOM series and assemble a `Volume`.
///
/// Slices are sorted by `ImagePositionPatient`'s through-plane component
/// before stacking, so the caller may pass files in arbitrary order. Returns
/// `Error::Ingest` for missing geometry tags, a decode failure, or
/// inconsistent slice dimensions within the series.
pub fn load_series<P: AsRef<Path>>(paths: &[P]) -> Result<Volume> {
    if paths.is_empty() {
        return Err(Error::Ingest("no DICOM files supplied".to_string()));
    }

    let mut slices = Vec::with_capacity(paths.len());
    for path in paths {
        let obj = open_file(path.as_ref())
            .map_err(|e| Error::Ingest(format!("{}: {e}", path.as_ref().display())))?;
        slices.push(decode_slice(&obj)?);
    }

    slices.sort_by(|a, b| {
        a.position_z
            .partial_cmp(&b.position_z)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let (rows, cols) = (slices[0].rows, slices[0].cols);
    if slices.iter().any(|s| s.rows != rows || s.cols != cols) {
        return Err(Error::Ingest(
            "series has slices with inconsistent row/column counts".to_string(),
        ));
    }

    let spacing_z = estimate_slice_spacing(&slices);
    let (spacing_y, spacing_x) = slices[0].pixel_spacing;

    let mut data = Vec::with_capacity(slices.len() * rows * cols);
    for slice in &slices {
        data.extend_from_slice(&slice.hu_values);
    }

    let shape = (slices.len(), rows, cols);
    let origin = slices[0].position;
    let orientation = orientation_matrix_from_cosines(slices[0].orientation_cosines);

    Volume::new(data, shape, (spacing_z, spacing_y, spacing_x), origin, orientation)
}

struct DecodedSlice {
    rows: usize,
    cols: usize,
    pixel_spacing: (f64, f64),
    position: (f64, f64, f64),
    position_z: f64,
    orientation_cosines: [f64; 6],
    hu_values: Vec<f32>,
}

fn decode_slice(obj: &InMemDicomObject) -> Result<DecodedSlice> {
    let pixel_data = obj
        .decode_pixel_data()
        .map_err(|e| Error::Ingest(format!("pixel data decode failed: {e}")))?;

    let rows = pixel_data.rows() as usize;
    let cols = pixel_data.columns() as usize;

    let raw: Vec<f64> = pixel_data
        .to_vec::<f64>()
        .map_err(|e| Error::Ingest(format!("pixel data conversion failed: {e}")))?;

    let slope = read_f64(obj, "RescaleSlope").unwrap_or(1.0);
    let intercept = read_f64(obj, "RescaleIntercept").unwrap_or(0.0);
    let hu_values: Vec<f32> = raw.iter().map(|&v| (v * slope + intercept) as f32).collect();

    let pixel_spacing = read_pair(obj, "PixelSpacing")?;
    let position = read_triple(obj, "ImagePositionPatient")?;
    let orientation_cosines = read_six(obj, "ImageOrientationPatient")?;

    Ok(DecodedSlice {
        rows,
        cols,
        pixel_spacing,
        position,
        position_z: position.2,
        orientation_cosines,
        hu_values,
    })
}

/// Prefers the declared `SliceThickness`'s consistency with consecutive
/// `ImagePositionPatient` deltas is not checked here — we trust the computed
/// center-to-center spacing between the first two sorted slices, falling
/// back to 1.0 for a single-slice series.
fn estimate_slice_spacing(slices: &[DecodedSlice]) -> f64 {
    if slices.len() < 2 {
        return 1.0;
    }
    let delta = (slices[1].position_z - slices[0].position_z).abs();
    if delta > 0.0 {
        delta
    } else {
        1.0
    }
}

/// Third row of the orientation matrix is the cross product of the declared
/// row/column direction cosines, matching the reference's convention for a
/// right-handed patient coordinate frame.
fn orientation_matrix_from_cosines(cosines: [f64; 6]) -> [[f64; 3]; 3] {
    let row = [cosines[0], cosines[1], cosines[2]];
    let col = [cosines[3], cosines[4], cosines[5]];
    let normal = [
        row[1] * col[2] - row[2] * col[1],
        row[2] * col[0] - row[0] * col[2],
        row[0] * col[1] - row[1] * col[0],
    ];
    [row, col, normal]
}

fn read_f64(obj: &InMemDicomObject, name: &str) -> Option<f64> {
    obj.element_by_name(name).ok()?.to_float64().ok()
}

fn read_pair(obj: &InMemDicomObject, name: &str) -> Result<(f64, f64)> {
    let values = obj
        .element_by_name(name)
        .map_err(|_| Error::Ingest(format!("missing tag {name}")))?
        .to_multi_float64()
        .map_err(|e| Error::Ingest(format!("{name}: {e}")))?;
    match values.as_slice() {
        [a, b] => Ok((*a, *b)),
        _ => Err(Error::Ingest(format!("{name} did not decode to 2 components"))),
    }
}

fn read_triple(obj: &InMemDicomObject, name: &str) -> Result<(f64, f64, f64)> {
    let values = obj
        .element_by_name(name)
        .map_err(|_| Error::Ingest(format!("missing tag {name}")))?
        .to_multi_float64()
        .map_err(|e| Error::Ingest(format!("{name}: {e}")))?;
    match values.as_slice() {
        [a, b, c] => Ok((*a, *b, *c)),
        _ => Err(Error::Ingest(format!("{name} did not decode to 3 components"))),
    }
}

fn read_six(obj: &InMemDicomObject, name: &str) -> Result<[f64; 6]> {
    let values = obj
        .element_by_name(name)
        .map_err(|_| Error::Ingest(format!("missing tag {name}")))?
        .to_multi_float64()
        .map_err(|e| Error::Ingest(format!("{name}: {e}")))?;
    match values.as_slice() {
        [a, b, c, d, e, f] => Ok([*a, *b, *c, *d, *e, *f]),
        _ => Err(Error::Ingest(format!("{name} did not decode to 6 components"))),
    }
}
