//! Test and helper mocks for steer_core

use std::cell::RefCell;
use std::rc::Rc;

use steer_traits::{Cue, Digitizer, StylusReading};

use crate::persist::TrialSink;
use crate::record::{TrialRecord, TrialSummary};
use crate::types::TrialSpec;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A digitizer that always errors on read; useful when driving the engine
/// with externally sampled readings via `step_with`.
pub struct NoopDigitizer;

impl Digitizer for NoopDigitizer {
    fn read(&mut self) -> Result<StylusReading, BoxError> {
        Err(Box::new(std::io::Error::other("noop digitizer")))
    }
}

/// A cue that plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCue;

impl Cue for SilentCue {
    fn play(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// One persisted trial as seen by [`MemorySink`].
#[derive(Debug, Clone)]
pub struct StoredTrial {
    pub spec: TrialSpec,
    pub samples: usize,
    pub summary: TrialSummary,
}

/// Sink that keeps trials in memory; clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    trials: Rc<RefCell<Vec<StoredTrial>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trials(&self) -> Vec<StoredTrial> {
        self.trials.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.trials.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.borrow().is_empty()
    }
}

impl TrialSink for MemorySink {
    fn persist(
        &mut self,
        spec: &TrialSpec,
        record: &TrialRecord,
        summary: &TrialSummary,
    ) -> Result<(), BoxError> {
        self.trials.borrow_mut().push(StoredTrial {
            spec: *spec,
            samples: record.len(),
            summary: *summary,
        });
        Ok(())
    }
}

/// Sink whose writes always fail, e.g. a file locked by another program.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSink;

impl TrialSink for FailingSink {
    fn persist(
        &mut self,
        _spec: &TrialSpec,
        _record: &TrialRecord,
        _summary: &TrialSummary,
    ) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "file is locked",
        )))
    }
}
