//! Thin demo binary: loads a DICOM series and a plan file, runs the
//! preprocessing pipeline, and reports the resulting shape. Not itself part
//! of the preprocessing core — it exists to exercise the library end to end,
//! the way the teacher's `main.rs` dispatched into `convert`/`analyze`.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use nnunet_preprocess_core::ingest::load_series;
use nnunet_preprocess_core::plan::PreprocessingParameters;
use nnunet_preprocess_core::pipeline::Pipeline;

/// Preprocess a DICOM series for nnU-Net-style CT inference.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory containing the DICOM series to preprocess.
    #[arg(long)]
    input: PathBuf,

    /// Path to a JSON preprocessing plan matching `PreprocessingParameters`.
    #[arg(long)]
    plan: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let dicom_files: Vec<PathBuf> = fs::read_dir(&args.input)
        .with_context(|| format!("reading input directory {}", args.input.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();

    println!("found {} DICOM file(s) in {}", dicom_files.len(), args.input.display());

    let volume = load_series(&dicom_files).context("decoding DICOM series")?;
    println!("ingested volume: shape={:?} spacing={:?}", volume.shape(), volume.spacing);

    let plan_json = fs::read_to_string(&args.plan)
        .with_context(|| format!("reading plan file {}", args.plan.display()))?;
    let params: PreprocessingParameters =
        serde_json::from_str(&plan_json).context("parsing preprocessing plan")?;

    let pipeline = Pipeline::default();
    let out = pipeline.run(volume, &params).context("running preprocessing pipeline")?;

    println!(
        "preprocessed volume: shape={:?} spacing={:?}",
        out.shape(),
        params.target_spacing
    );

    Ok(())
}
