//! Session status returned from each engine step.

use crate::error::SteerError;

/// Public status of a single step of the session loop.
#[derive(Debug)]
pub enum SessionStatus {
    /// Keep going; the plan is not exhausted.
    Running,
    /// Every trial of the plan has been run.
    Complete,
    /// Stopped with a typed error; any in-progress trial was discarded.
    Aborted(SteerError),
}
