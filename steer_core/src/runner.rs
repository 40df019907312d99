use steer_traits::{Cue, Digitizer};

use crate::engine::TrialEngine;
use crate::error::{Report, Result as CoreResult};
use crate::status::SessionStatus;

/// Outcome of a session that ran to the end of its plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionReport {
    pub trials_planned: usize,
    pub completed: usize,
    pub timed_out: usize,
    /// Trials that ended before movement onset.
    pub empty: usize,
    /// Trials the sink failed to store.
    pub dropped: usize,
    /// Session wall time on the engine clock, seconds.
    pub elapsed_s: f64,
}

/// Run the engine until the plan is exhausted or the session aborts.
pub fn run_session<D, C>(engine: &mut TrialEngine<D, C>) -> CoreResult<SessionReport>
where
    D: Digitizer,
    C: Cue,
{
    engine.begin();
    tracing::info!(trials = engine.plan().len(), "session start");

    loop {
        match engine.step()? {
            SessionStatus::Running => continue,
            SessionStatus::Complete => {
                let t = engine.tally();
                let report = SessionReport {
                    trials_planned: engine.plan().len(),
                    completed: t.completed,
                    timed_out: t.timed_out,
                    empty: t.empty,
                    dropped: t.dropped,
                    elapsed_s: engine.elapsed_s(),
                };
                tracing::info!(
                    completed = report.completed,
                    timed_out = report.timed_out,
                    elapsed_s = report.elapsed_s,
                    "session finished"
                );
                return Ok(report);
            }
            SessionStatus::Aborted(e) => {
                tracing::error!(error = %e, "session aborted");
                return Err(Report::new(e));
            }
        }
    }
}
