//! `process`: offline batch over a directory of recorded sessions.

use std::path::PathBuf;

use eyre::{Result, WrapErr};
use steer_analysis::{
    BatchReport, MetadataIndex, OutputLayout, PipelineCfg, discover_raw_files, run_batch,
};
use steer_config::Config;

pub struct ProcessArgs {
    pub input: PathBuf,
    pub metadata: Option<PathBuf>,
    pub out: PathBuf,
    pub workers: Option<usize>,
}

pub fn process(cfg: &Config, args: ProcessArgs) -> Result<BatchReport> {
    let mut pipeline = PipelineCfg::from(cfg);
    if let Some(w) = args.workers {
        pipeline.workers = w;
    }

    // An unreadable table leaves every participant in the Unknown group.
    let meta = match &args.metadata {
        Some(path) => MetadataIndex::load(path).unwrap_or_else(|e| {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{e:#}"),
                "participant metadata not loaded; groups will be Unknown"
            );
            MetadataIndex::default()
        }),
        None => MetadataIndex::default(),
    };
    tracing::debug!(participants = meta.len(), "metadata loaded");

    let files = discover_raw_files(&args.input)
        .wrap_err_with(|| format!("listing {}", args.input.display()))?;
    if files.is_empty() {
        tracing::warn!(dir = %args.input.display(), "no *_RAW.csv files found");
    }

    let layout = OutputLayout::under(&args.out);
    run_batch(&files, &layout, &pipeline, &meta).wrap_err("feature extraction")
}
