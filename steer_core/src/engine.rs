//! The trial state machine (`TrialEngine`).
//!
//! One `step` reads the digitizer, advances the current phase with the
//! engine clock and sleeps one tick. Phases carry their own timers, so a
//! transition is a plain assignment of the next `Phase` value:
//!
//! `Intro → WaitPosition → Countdown → Recording → Rest →
//! (WaitPosition | LongBreak → Intro | End)`

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use steer_traits::clock::Clock;
use steer_traits::{Cue, Digitizer, StylusReading};

use crate::collector::{Collected, CollectorCfg, SampleCollector};
use crate::config::{EngineSettings, PauseMode, PersistPolicy};
use crate::error::{AbortReason, Result, SteerError};
use crate::feedback::{FeedbackInput, FeedbackState, ForceBand, classify, trace_thickness};
use crate::hw_error::map_hw_error;
use crate::persist::TrialSink;
use crate::status::SessionStatus;
use crate::types::{Point, TrialSpec};

/// Current phase with the timers it needs; times are seconds since `begin()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Intro { since: f64 },
    /// `steady_since` is set on the first tick with the start posture held
    /// and cleared on any tick where it is lost.
    WaitPosition { steady_since: Option<f64> },
    Countdown { remaining: u8, last_tick: f64 },
    Recording { started: f64 },
    Rest { since: f64 },
    LongBreak { since: f64 },
    End,
}

impl Phase {
    pub const fn name(&self) -> &'static str {
        match self {
            Phase::Intro { .. } => "intro",
            Phase::WaitPosition { .. } => "wait_position",
            Phase::Countdown { .. } => "countdown",
            Phase::Recording { .. } => "recording",
            Phase::Rest { .. } => "rest",
            Phase::LongBreak { .. } => "long_break",
            Phase::End => "end",
        }
    }
}

/// Running counts of trial outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTally {
    /// Finished with a full lap.
    pub completed: usize,
    /// Finished by the recording time limit.
    pub timed_out: usize,
    /// Ended before movement onset; nothing persisted.
    pub empty: usize,
    /// Finished but the sink rejected the write.
    pub dropped: usize,
}

/// Live pointer state for presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerFeedback {
    pub state: FeedbackState,
    pub thickness: f64,
    pub radial_error: f64,
}

pub struct TrialEngine<D: Digitizer, C: Cue> {
    pub(crate) digitizer: D,
    pub(crate) cue: C,
    pub(crate) sink: Box<dyn TrialSink>,
    pub(crate) settings: EngineSettings,
    pub(crate) plan: Vec<TrialSpec>,
    pub(crate) band: ForceBand,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) tick: Duration,

    pub(crate) index: usize,
    pub(crate) phase: Phase,
    pub(crate) collector: Option<SampleCollector>,
    pub(crate) last_reading: StylusReading,
    pub(crate) abort_check: Option<Box<dyn Fn() -> bool>>,
    pub(crate) halted: Option<SteerError>,
    pub(crate) tally: SessionTally,
}

impl<D: Digitizer, C: Cue> core::fmt::Debug for TrialEngine<D, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TrialEngine")
            .field("trial", &self.index)
            .field("of", &self.plan.len())
            .field("phase", &self.phase)
            .field("tally", &self.tally)
            .finish()
    }
}

impl<D: Digitizer, C: Cue> TrialEngine<D, C> {
    /// Reset per-session state and restart the plan at its first trial.
    pub fn begin(&mut self) {
        self.epoch = self.clock.now();
        self.index = 0;
        self.phase = Phase::Intro { since: 0.0 };
        self.collector = None;
        self.last_reading = StylusReading::default();
        self.halted = None;
        self.tally = SessionTally::default();
    }

    /// One iteration of the session loop (reads the digitizer internally).
    pub fn step(&mut self) -> Result<SessionStatus> {
        if let Some(status) = self.check_halt() {
            return Ok(status);
        }
        let reading = self
            .digitizer
            .read()
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("reading digitizer")?;
        self.advance(reading)
    }

    /// Process an externally sampled reading.
    pub fn step_with(&mut self, reading: StylusReading) -> Result<SessionStatus> {
        if let Some(status) = self.check_halt() {
            return Ok(status);
        }
        self.advance(reading)
    }

    /// Operator confirmation: leaves an intro or long-break screen immediately.
    pub fn confirm(&mut self) {
        if let Phase::Intro { .. } | Phase::LongBreak { .. } = self.phase {
            tracing::debug!(from = self.phase.name(), "operator confirm");
            self.phase = Phase::WaitPosition { steady_since: None };
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn plan(&self) -> &[TrialSpec] {
        &self.plan
    }

    /// Zero-based index of the current trial in the plan.
    pub fn trial_index(&self) -> usize {
        self.index
    }

    pub fn current_trial(&self) -> Option<&TrialSpec> {
        match self.phase {
            Phase::End => None,
            _ => self.plan.get(self.index),
        }
    }

    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Seconds since `begin()`.
    pub fn elapsed_s(&self) -> f64 {
        self.clock.secs_since(self.epoch)
    }

    /// Samples held by the trial being recorded.
    pub fn recorded_samples(&self) -> usize {
        self.collector.as_ref().map_or(0, SampleCollector::len)
    }

    /// Start marker of the current trial.
    pub fn start_marker(&self) -> Option<Point> {
        self.current_trial()
            .map(|s| s.start_marker(self.settings.center))
    }

    /// Feedback color and trace thickness for the last reading.
    pub fn pointer_feedback(&self) -> Option<PointerFeedback> {
        let spec = self.current_trial()?;
        let caps = &self.settings.capabilities;
        let shown = spec.condition.feedback
            || (matches!(self.phase, Phase::WaitPosition { .. })
                && caps.wait_feedback_override
                && spec.task().is_force());
        let r = self.last_reading;
        let radial_error = (Point::new(r.x, r.y).distance_to(self.settings.center)
            - spec.geometry.radius)
            .abs();
        let thickness = trace_thickness(r.pressure, shown, &self.settings.trace);
        let input = FeedbackInput {
            radial_error,
            thickness,
            width: spec.geometry.width,
            pressure_raw: r.pressure * self.settings.engagement.raw_max,
            task: spec.task(),
            shown,
        };
        Some(PointerFeedback {
            state: classify(&input, &self.band, caps.exit_rule),
            thickness,
            radial_error,
        })
    }

    // ── Private: state machine ───────────────────────────────────────────────

    fn check_halt(&mut self) -> Option<SessionStatus> {
        if let Some(e) = &self.halted {
            return Some(SessionStatus::Aborted(e.clone()));
        }
        let requested = self.abort_check.as_ref().is_some_and(|check| check());
        if !requested {
            return None;
        }
        let discarded = self.collector.take().map_or(0, |c| c.len());
        if discarded > 0 {
            tracing::warn!(
                trial = self.index + 1,
                discarded,
                "abort requested; in-progress trial discarded"
            );
        } else {
            tracing::warn!(phase = self.phase.name(), "abort requested");
        }
        let err = SteerError::Abort {
            reason: AbortReason::UserAbort,
            discarded_samples: discarded,
        };
        self.halted = Some(err.clone());
        Some(SessionStatus::Aborted(err))
    }

    fn advance(&mut self, reading: StylusReading) -> Result<SessionStatus> {
        let now = self.clock.secs_since(self.epoch);
        self.last_reading = reading;
        let Some(spec) = self.plan.get(self.index).copied() else {
            self.phase = Phase::End;
            return Ok(SessionStatus::Complete);
        };
        let timing = self.settings.timing;

        match self.phase {
            Phase::End => return Ok(SessionStatus::Complete),
            Phase::Intro { since } => {
                if self.settings.capabilities.pause == PauseMode::Timed
                    && now - since >= timing.intro_s
                {
                    self.enter(Phase::WaitPosition { steady_since: None });
                }
            }
            Phase::WaitPosition { steady_since } => {
                if self.is_engaged(&spec, reading) {
                    let since = steady_since.unwrap_or(now);
                    if now - since >= timing.stationary_delay_s {
                        self.enter(Phase::Countdown {
                            remaining: timing.countdown_from,
                            last_tick: now,
                        });
                    } else {
                        self.phase = Phase::WaitPosition {
                            steady_since: Some(since),
                        };
                    }
                } else {
                    self.phase = Phase::WaitPosition { steady_since: None };
                }
            }
            Phase::Countdown {
                remaining,
                last_tick,
            } => {
                if now - last_tick >= timing.countdown_step_s {
                    let remaining = remaining.saturating_sub(1);
                    if remaining == 0 {
                        self.start_recording(spec, now);
                    } else {
                        tracing::trace!(remaining, "countdown");
                        self.phase = Phase::Countdown {
                            remaining,
                            last_tick: now,
                        };
                    }
                }
            }
            Phase::Recording { started } => {
                if now - started > timing.max_trial_s {
                    if let Some(status) = self.finish_trial(now, true)? {
                        return Ok(status);
                    }
                } else {
                    let collected = match self.collector.as_mut() {
                        Some(c) => c.push(now, reading),
                        None => {
                            return Err(eyre::Report::new(SteerError::State(
                                "recording without a collector".into(),
                            )));
                        }
                    };
                    if collected == Collected::LapComplete
                        && let Some(status) = self.finish_trial(now, false)?
                    {
                        return Ok(status);
                    }
                }
            }
            Phase::Rest { since } => {
                if now - since >= timing.rest_s {
                    let next = self.index + 1;
                    let Some(next_spec) = self.plan.get(next).copied() else {
                        self.enter(Phase::End);
                        tracing::info!(
                            completed = self.tally.completed,
                            timed_out = self.tally.timed_out,
                            empty = self.tally.empty,
                            dropped = self.tally.dropped,
                            "session complete"
                        );
                        return Ok(SessionStatus::Complete);
                    };
                    self.index = next;
                    if next_spec.condition != spec.condition {
                        tracing::info!(block = %next_spec.condition, "block change");
                        self.enter(Phase::LongBreak { since: now });
                    } else {
                        self.enter(Phase::WaitPosition { steady_since: None });
                    }
                }
            }
            Phase::LongBreak { since } => {
                if now - since >= timing.long_break_s {
                    self.enter(Phase::Intro { since: now });
                }
            }
        }

        self.clock.sleep(self.tick);
        Ok(SessionStatus::Running)
    }

    fn enter(&mut self, next: Phase) {
        tracing::debug!(
            from = self.phase.name(),
            to = next.name(),
            trial = self.index + 1,
            "phase change"
        );
        self.phase = next;
    }

    /// Start posture: inside the capture radius and pressing correctly.
    fn is_engaged(&self, spec: &TrialSpec, r: StylusReading) -> bool {
        let eng = &self.settings.engagement;
        let marker = spec.start_marker(self.settings.center);
        if Point::new(r.x, r.y).distance_to(marker) >= eng.capture_radius_px {
            return false;
        }
        if spec.task().is_force() {
            self.band.contains(r.pressure * eng.raw_max)
        } else {
            r.pressure > eng.touch_threshold
        }
    }

    fn start_recording(&mut self, spec: TrialSpec, now: f64) {
        if let Err(e) = self.cue.play() {
            tracing::warn!(error = %e, "cue failed; recording anyway");
        }
        self.collector = Some(SampleCollector::new(
            spec,
            CollectorCfg {
                center: self.settings.center,
                trace: self.settings.trace,
                velocity_threshold: self.settings.velocity_threshold,
                raw_max: self.settings.engagement.raw_max,
            },
        ));
        tracing::info!(
            trial = self.index + 1,
            block = %spec.condition,
            level = spec.level,
            rep = spec.repetition,
            "trial start"
        );
        self.enter(Phase::Recording { started: now });
    }

    /// Close the active trial, persist it when non-empty and enter `Rest`.
    /// Returns a status only when the session must stop.
    fn finish_trial(&mut self, now: f64, timeout: bool) -> Result<Option<SessionStatus>> {
        let collector = self.collector.take().ok_or_else(|| {
            eyre::Report::new(SteerError::State("no trial to finish".into()))
        })?;
        let spec = *collector.spec();
        let record = collector.into_record();

        match record.summarize(timeout) {
            None => {
                self.tally.empty += 1;
                tracing::info!(
                    trial = self.index + 1,
                    timeout,
                    "trial ended before movement onset; nothing persisted"
                );
            }
            Some(summary) => {
                if timeout {
                    self.tally.timed_out += 1;
                } else {
                    self.tally.completed += 1;
                }
                tracing::info!(
                    trial = self.index + 1,
                    block = %spec.condition,
                    level = spec.level,
                    movement_time = summary.movement_time,
                    pct_in_tunnel = summary.pct_in_tunnel,
                    timeout,
                    "trial finished"
                );
                if let Err(e) = self.sink.persist(&spec, &record, &summary) {
                    self.tally.dropped += 1;
                    match self.settings.capabilities.persist_policy {
                        PersistPolicy::Ignore => {}
                        PersistPolicy::Warn => {
                            tracing::warn!(
                                error = %e,
                                trial = self.index + 1,
                                samples = record.len(),
                                "trial not persisted"
                            );
                        }
                        PersistPolicy::Abort => {
                            tracing::error!(error = %e, "trial not persisted; stopping session");
                            let err = SteerError::Abort {
                                reason: AbortReason::PersistFailure,
                                discarded_samples: record.len(),
                            };
                            self.halted = Some(err.clone());
                            return Ok(Some(SessionStatus::Aborted(err)));
                        }
                    }
                }
            }
        }
        self.enter(Phase::Rest { since: now });
        Ok(None)
    }
}
