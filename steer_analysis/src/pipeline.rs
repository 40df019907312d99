//! Offline batch: filter each participant stream, write the cleaned copy,
//! segment it into trials and build the feature table.
//!
//! Files are independent, so a bounded pool of scoped workers pulls paths
//! from a shared job channel and reports each outcome back on a result
//! channel. A failing file is logged and counted; it never stops the batch.

use std::fs;
use std::path::{Path, PathBuf};

use crossbeam_channel as xch;
use serde::{Deserialize, Serialize};
use steer_core::{RawRow, TunnelGeometry};

use crate::error::{AnalysisError, Result};
use crate::filter::{lowpass, sampling_rate};
use crate::metadata::{MetadataIndex, normalize_id};
use crate::metrics::{compute, target_for};
use crate::segment::segment;

/// File name of the aggregated feature table.
pub const FEATURES_FILE: &str = "dataset_features.csv";
const RAW_SUFFIX: &str = "_RAW.csv";

/// Block label reported for trials without one.
const DEFAULT_CONDITION: &str = "VP";

/// Runtime settings of the offline pipeline.
#[derive(Debug, Clone)]
pub struct PipelineCfg {
    pub cutoff_hz: f64,
    pub default_fs_hz: f64,
    pub min_filter_len: usize,
    pub min_trial_samples: usize,
    pub boundary_drop_s: f64,
    pub workers: usize,
    /// Difficulty table used to resolve `DifficultyLevel`.
    pub levels: Vec<TunnelGeometry>,
}

impl Default for PipelineCfg {
    fn default() -> Self {
        Self::from(&steer_config::Config::default())
    }
}

impl From<&steer_config::Config> for PipelineCfg {
    fn from(c: &steer_config::Config) -> Self {
        let a = &c.analysis;
        Self {
            cutoff_hz: a.cutoff_hz,
            default_fs_hz: a.default_fs_hz,
            min_filter_len: a.min_filter_len,
            min_trial_samples: a.min_trial_samples,
            boundary_drop_s: a.boundary_drop_s,
            workers: a.workers,
            levels: c
                .tunnel
                .levels
                .iter()
                .map(|l| TunnelGeometry::new(l.radius, l.width))
                .collect(),
        }
    }
}

/// One row of `dataset_features.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "ProficiencyScore")]
    pub proficiency_score: Option<f64>,
    #[serde(rename = "Condition")]
    pub condition: String,
    #[serde(rename = "TrialIndex")]
    pub trial_index: u32,
    #[serde(rename = "MeanJerk")]
    pub mean_jerk: f64,
    #[serde(rename = "LDLJ")]
    pub ldlj: f64,
    #[serde(rename = "F95")]
    pub f95: f64,
    #[serde(rename = "ThroughputISO")]
    pub throughput_iso: f64,
    #[serde(rename = "ErrorRate")]
    pub error_rate: f64,
    #[serde(rename = "Te")]
    pub te: f64,
    #[serde(rename = "Duration")]
    pub duration: f64,
    #[serde(rename = "PathLength")]
    pub path_length: f64,
    #[serde(rename = "MeanVelocity")]
    pub mean_velocity: f64,
    #[serde(rename = "ForceSD")]
    pub force_sd: f64,
}

/// A participant stream with filtered X, Y and pressure.
#[derive(Debug, Clone)]
pub struct CleanStream {
    pub participant: String,
    pub fs_hz: f64,
    pub rows: Vec<RawRow>,
}

/// Low-pass X, Y and pressure over the whole stream; row count is unchanged.
pub fn clean_stream(participant: String, mut rows: Vec<RawRow>, cfg: &PipelineCfg) -> CleanStream {
    let times: Vec<f64> = rows.iter().map(|r| r.time_abs).collect();
    let fs_hz = sampling_rate(&times, cfg.default_fs_hz);
    let filt = |f: fn(&RawRow) -> f64| {
        let ch: Vec<f64> = rows.iter().map(f).collect();
        lowpass(&ch, cfg.cutoff_hz, fs_hz, cfg.min_filter_len)
    };
    let (x, y, p) = (filt(|r| r.x), filt(|r| r.y), filt(|r| r.pressure_raw));
    for (i, row) in rows.iter_mut().enumerate() {
        row.x = x[i];
        row.y = y[i];
        row.pressure_raw = p[i];
    }
    CleanStream {
        participant,
        fs_hz,
        rows,
    }
}

/// Feature rows of every long-enough trial, plus the number skipped.
pub fn extract_features(
    stream: &CleanStream,
    cfg: &PipelineCfg,
    meta: &MetadataIndex,
) -> (Vec<FeatureRow>, usize) {
    let (kind, segments) = segment(&stream.rows, cfg.boundary_drop_s);
    let (group, score) = meta.lookup(&stream.participant);
    let mut skipped = 0;
    let mut out = Vec::with_capacity(segments.len());

    for (ordinal, range) in segments.into_iter().enumerate() {
        let trial = &stream.rows[range];
        if trial.len() < cfg.min_trial_samples {
            skipped += 1;
            tracing::debug!(
                participant = %stream.participant,
                trial = ordinal + 1,
                samples = trial.len(),
                "trial too short; skipped"
            );
            continue;
        }
        let first = &trial[0];
        let target = target_for(first.difficulty_level, &cfg.levels);
        let f = compute(trial, target, cfg.default_fs_hz);
        out.push(FeatureRow {
            id: stream.participant.clone(),
            group: group.clone(),
            proficiency_score: score,
            condition: first
                .block_label
                .clone()
                .unwrap_or_else(|| DEFAULT_CONDITION.to_string()),
            trial_index: first.order_in_block.unwrap_or(ordinal as u32 + 1),
            mean_jerk: f.mean_jerk,
            ldlj: f.ldlj,
            f95: f.f95,
            throughput_iso: f.throughput,
            error_rate: f.error_rate,
            te: f.te,
            duration: f.duration,
            path_length: f.path_length,
            mean_velocity: f.mean_velocity,
            force_sd: f.force_sd,
        });
    }
    tracing::debug!(
        participant = %stream.participant,
        segmentation = ?kind,
        trials = out.len(),
        skipped,
        "features extracted"
    );
    (out, skipped)
}

pub fn read_raw(path: &Path) -> Result<Vec<RawRow>> {
    let read_err = |source| AnalysisError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(read_err)?;
    rdr.deserialize()
        .collect::<std::result::Result<Vec<RawRow>, _>>()
        .map_err(read_err)
}

/// Write rows with a header, replacing any existing file.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let write_err = |source| AnalysisError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut w = csv::Writer::from_path(path).map_err(write_err)?;
    for row in rows {
        w.serialize(row).map_err(write_err)?;
    }
    w.flush()?;
    Ok(())
}

/// What one participant file produced.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub participant: String,
    pub samples: usize,
    pub skipped: usize,
    pub clean_path: PathBuf,
    pub features: Vec<FeatureRow>,
}

/// Clean, persist and extract features for one `<ID>_RAW.csv`.
pub fn process_file(
    path: &Path,
    clean_dir: &Path,
    cfg: &PipelineCfg,
    meta: &MetadataIndex,
) -> Result<FileOutcome> {
    let rows = read_raw(path)?;
    let Some(first) = rows.first() else {
        return Err(AnalysisError::EmptyStream(path.to_path_buf()));
    };
    let participant = normalize_id(&first.id);
    let samples = rows.len();

    let stream = clean_stream(participant, rows, cfg);
    let clean_path = clean_dir.join(format!("{}_CLEAN.csv", stream.participant));
    write_csv(&clean_path, &stream.rows)?;

    let (features, skipped) = extract_features(&stream, cfg, meta);
    tracing::info!(
        participant = %stream.participant,
        samples,
        fs_hz = stream.fs_hz,
        trials = features.len(),
        skipped,
        "participant processed"
    );
    Ok(FileOutcome {
        participant: stream.participant,
        samples,
        skipped,
        clean_path,
        features,
    })
}

/// `*_RAW.csv` files directly under `dir`, sorted by name.
pub fn discover_raw_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(RAW_SUFFIX))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Output locations of a batch run.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub clean_dir: PathBuf,
    pub features_path: PathBuf,
}

impl OutputLayout {
    /// `<out>/clean/` and `<out>/features/dataset_features.csv`.
    pub fn under(out: &Path) -> Self {
        Self {
            clean_dir: out.join("clean"),
            features_path: out.join("features").join(FEATURES_FILE),
        }
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub files: usize,
    pub processed: usize,
    pub failed: Vec<(PathBuf, String)>,
    pub trials: usize,
    pub skipped: usize,
    /// Set when at least one feature row was written.
    pub features_path: Option<PathBuf>,
}

/// Process `files` on up to `cfg.workers` threads and write the feature table
/// sorted by participant, then trial order within the participant.
pub fn run_batch(
    files: &[PathBuf],
    layout: &OutputLayout,
    cfg: &PipelineCfg,
    meta: &MetadataIndex,
) -> Result<BatchReport> {
    fs::create_dir_all(&layout.clean_dir)?;
    let workers = cfg.workers.clamp(1, files.len().max(1));
    tracing::info!(files = files.len(), workers, "batch start");

    let (job_tx, job_rx) = xch::unbounded::<&Path>();
    for f in files {
        // receiver is alive until the scope below ends
        let _ = job_tx.send(f.as_path());
    }
    drop(job_tx);

    let (res_tx, res_rx) = xch::unbounded::<(PathBuf, Result<FileOutcome>)>();
    let mut outcomes = Vec::with_capacity(files.len());
    let mut report = BatchReport {
        files: files.len(),
        ..BatchReport::default()
    };

    std::thread::scope(|s| {
        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let res_tx = res_tx.clone();
            let clean_dir = layout.clean_dir.as_path();
            s.spawn(move || {
                for path in job_rx.iter() {
                    let outcome = process_file(path, clean_dir, cfg, meta);
                    if res_tx.send((path.to_path_buf(), outcome)).is_err() {
                        break;
                    }
                }
                tracing::trace!(worker, "analysis worker exiting");
            });
        }
        drop(res_tx);

        for (path, outcome) in res_rx.iter() {
            match outcome {
                Ok(o) => outcomes.push(o),
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "file skipped");
                    report.failed.push((path, e.to_string()));
                }
            }
        }
    });

    outcomes.sort_by(|a, b| a.participant.cmp(&b.participant));
    report.processed = outcomes.len();
    report.skipped = outcomes.iter().map(|o| o.skipped).sum();
    let features: Vec<FeatureRow> = outcomes.into_iter().flat_map(|o| o.features).collect();
    report.trials = features.len();

    if features.is_empty() {
        tracing::warn!("no trial produced features; feature table not written");
    } else {
        if let Some(parent) = layout.features_path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_csv(&layout.features_path, &features)?;
        report.features_path = Some(layout.features_path.clone());
    }
    tracing::info!(
        processed = report.processed,
        failed = report.failed.len(),
        trials = report.trials,
        skipped = report.skipped,
        "batch finished"
    );
    Ok(report)
}
