//! Durable, append-only storage of finished trials.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::record::{RawRow, ScoreRow, TrialRecord, TrialSummary};
use crate::types::TrialSpec;

/// Destination of finished trials. Called exactly once per non-empty trial.
pub trait TrialSink {
    fn persist(
        &mut self,
        spec: &TrialSpec,
        record: &TrialRecord,
        summary: &TrialSummary,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Writes `<ID>_RAW.csv` (every sample) and `<ID>_SCORES.csv` (one row per
/// trial) under a directory, creating it on first use. The header is written
/// only when a file is new or empty.
#[derive(Debug, Clone)]
pub struct CsvTrialSink {
    dir: PathBuf,
    participant: String,
}

impl CsvTrialSink {
    pub fn new(dir: impl Into<PathBuf>, participant: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            participant: participant.into(),
        }
    }

    pub fn participant(&self) -> &str {
        &self.participant
    }

    pub fn raw_path(&self) -> PathBuf {
        self.dir.join(format!("{}_RAW.csv", self.participant))
    }

    pub fn scores_path(&self) -> PathBuf {
        self.dir.join(format!("{}_SCORES.csv", self.participant))
    }
}

/// Append serializable rows to `path`, writing the header only for a new file.
pub fn append_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> csv::Result<()> {
    let file: File = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;
    let mut w = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(())
}

impl TrialSink for CsvTrialSink {
    fn persist(
        &mut self,
        spec: &TrialSpec,
        record: &TrialRecord,
        summary: &TrialSummary,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        fs::create_dir_all(&self.dir)?;
        let id = self.participant.as_str();
        append_rows(
            &self.raw_path(),
            record
                .samples()
                .iter()
                .map(|s| RawRow::from_sample(id, spec, s)),
        )?;
        append_rows(
            &self.scores_path(),
            std::iter::once(ScoreRow::new(id, spec, summary)),
        )?;
        tracing::debug!(
            participant = id,
            samples = record.len(),
            path = %self.raw_path().display(),
            "trial appended"
        );
        Ok(())
    }
}
