#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
//! Offline processing of recorded sessions.
//!
//! `pipeline` drives the batch; the other modules are pure functions over
//! sample slices so they can be tested and benchmarked in isolation.

pub mod error;
pub mod filter;
pub mod kinematics;
pub mod metadata;
pub mod metrics;
pub mod pipeline;
pub mod segment;
pub mod spectrum;

pub use error::AnalysisError;
pub use metadata::MetadataIndex;
pub use metrics::TrialFeatures;
pub use pipeline::{
    BatchReport, CleanStream, FeatureRow, FileOutcome, OutputLayout, PipelineCfg, clean_stream,
    discover_raw_files, extract_features, process_file, run_batch,
};
