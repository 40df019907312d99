//! Type-state builder for `Session` and the generic `build_engine` constructor.
//!
//! The builder enforces at compile time that a digitizer, a cue and a trial
//! sink are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use steer_traits::clock::{Clock, MonotonicClock};
use steer_traits::{Cue, Digitizer, StylusReading};

use crate::config::{EngineSettings, SequenceCfg};
use crate::engine::{Phase, SessionTally, TrialEngine};
use crate::error::{BuildError, Result};
use crate::persist::TrialSink;
use crate::sequence::{blocks, generate_plan};
use crate::types::TrialSpec;

/// Dynamically dispatched engine produced by [`SessionBuilder`].
pub type Session = TrialEngine<Box<dyn Digitizer>, Box<dyn Cue>>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Session`. All fields are validated on `build()`.
pub struct SessionBuilder<D, C, K> {
    digitizer: Option<Box<dyn Digitizer>>,
    cue: Option<Box<dyn Cue>>,
    sink: Option<Box<dyn TrialSink>>,
    settings: Option<EngineSettings>,
    sequence: Option<SequenceCfg>,
    plan: Option<Vec<TrialSpec>>,
    abort_check: Option<Box<dyn Fn() -> bool>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _d: PhantomData<D>,
    _c: PhantomData<C>,
    _k: PhantomData<K>,
}

impl Default for SessionBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            digitizer: None,
            cue: None,
            sink: None,
            settings: None,
            sequence: None,
            plan: None,
            abort_check: None,
            clock: None,
            _d: PhantomData,
            _c: PhantomData,
            _k: PhantomData,
        }
    }
}

impl Session {
    /// Start building a Session.
    pub fn builder() -> SessionBuilder<Missing, Missing, Missing> {
        SessionBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(settings: &EngineSettings, plan: &[TrialSpec]) -> Result<()> {
    let t = &settings.timing;
    if plan.is_empty() {
        return Err(invalid("trial plan is empty"));
    }
    if !(t.max_trial_s.is_finite() && t.max_trial_s > 0.0) {
        return Err(invalid("max_trial_s must be > 0"));
    }
    for v in [
        t.rest_s,
        t.long_break_s,
        t.intro_s,
        t.stationary_delay_s,
        t.countdown_step_s,
    ] {
        if !(v.is_finite() && v >= 0.0) {
            return Err(invalid("phase durations must be finite and >= 0"));
        }
    }
    if t.countdown_from == 0 {
        return Err(invalid("countdown_from must be >= 1"));
    }
    if t.tick_ms == 0 {
        return Err(invalid("tick_ms must be >= 1"));
    }
    let e = &settings.engagement;
    if !(e.capture_radius_px.is_finite() && e.capture_radius_px > 0.0) {
        return Err(invalid("capture_radius_px must be > 0"));
    }
    if !(e.raw_max.is_finite() && e.raw_max > 0.0) {
        return Err(invalid("raw_max must be > 0"));
    }
    if !(settings.velocity_threshold.is_finite() && settings.velocity_threshold >= 0.0) {
        return Err(invalid("velocity_threshold must be >= 0"));
    }
    if plan
        .iter()
        .any(|s| !(s.geometry.radius > 0.0 && s.geometry.width > 0.0))
    {
        return Err(invalid("tunnel radius and width must be > 0"));
    }
    Ok(())
}

/// Validate configuration and construct a `TrialEngine`.
///
/// Single source of truth for validation and construction, used by both
/// `SessionBuilder::try_build()` and `build_engine()`.
fn validate_and_build<D: Digitizer, C: Cue>(
    digitizer: D,
    cue: C,
    sink: Box<dyn TrialSink>,
    settings: EngineSettings,
    plan: Vec<TrialSpec>,
    abort_check: Option<Box<dyn Fn() -> bool>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<TrialEngine<D, C>> {
    validate(&settings, &plan)?;

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();
    let band = settings.engagement.force_band();
    let tick = crate::util::tick_period(settings.timing.tick_ms);

    tracing::debug!(
        trials = plan.len(),
        blocks = blocks(&plan).len(),
        rate_hz = crate::util::tick_rate_hz(settings.timing.tick_ms),
        force_min = band.min,
        force_max = band.max,
        "session built"
    );

    Ok(TrialEngine {
        digitizer,
        cue,
        sink,
        settings,
        plan,
        band,
        clock,
        epoch,
        tick,
        index: 0,
        phase: Phase::Intro { since: 0.0 },
        collector: None,
        last_reading: StylusReading::default(),
        abort_check,
        halted: None,
        tally: SessionTally::default(),
    })
}

fn resolve_plan(plan: Option<Vec<TrialSpec>>, sequence: Option<SequenceCfg>) -> Result<Vec<TrialSpec>> {
    match plan {
        Some(p) => Ok(p),
        None => generate_plan(&sequence.unwrap_or_default()),
    }
}

impl<D, C, K> SessionBuilder<D, C, K> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Session> {
        let digitizer = self
            .digitizer
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDigitizer))?;
        let cue = self
            .cue
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCue))?;
        let sink = self
            .sink
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSink))?;
        let plan = resolve_plan(self.plan, self.sequence)?;

        validate_and_build(
            digitizer,
            cue,
            sink,
            self.settings.unwrap_or_default(),
            plan,
            self.abort_check,
            self.clock,
        )
    }
}

/// Chainable setters that do not affect type-state.
impl<D, C, K> SessionBuilder<D, C, K> {
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Some(settings);
        self
    }
    /// Generate the plan from this table; ignored when `with_plan` is used.
    pub fn with_sequence(mut self, sequence: SequenceCfg) -> Self {
        self.sequence = Some(sequence);
        self
    }
    /// Run exactly this plan.
    pub fn with_plan(mut self, plan: Vec<TrialSpec>) -> Self {
        self.plan = Some(plan);
        self
    }
    /// Polled at the start of every step; `true` aborts the session.
    pub fn with_abort_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.abort_check = Some(Box::new(f));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<C, K> SessionBuilder<Missing, C, K> {
    pub fn with_digitizer(self, digitizer: impl Digitizer + 'static) -> SessionBuilder<Set, C, K> {
        SessionBuilder {
            digitizer: Some(Box::new(digitizer)),
            cue: self.cue,
            sink: self.sink,
            settings: self.settings,
            sequence: self.sequence,
            plan: self.plan,
            abort_check: self.abort_check,
            clock: self.clock,
            _d: PhantomData,
            _c: PhantomData,
            _k: PhantomData,
        }
    }
}

impl<D, K> SessionBuilder<D, Missing, K> {
    pub fn with_cue(self, cue: impl Cue + 'static) -> SessionBuilder<D, Set, K> {
        SessionBuilder {
            digitizer: self.digitizer,
            cue: Some(Box::new(cue)),
            sink: self.sink,
            settings: self.settings,
            sequence: self.sequence,
            plan: self.plan,
            abort_check: self.abort_check,
            clock: self.clock,
            _d: PhantomData,
            _c: PhantomData,
            _k: PhantomData,
        }
    }
}

impl<D, C> SessionBuilder<D, C, Missing> {
    pub fn with_sink(self, sink: impl TrialSink + 'static) -> SessionBuilder<D, C, Set> {
        SessionBuilder {
            digitizer: self.digitizer,
            cue: self.cue,
            sink: Some(Box::new(sink)),
            settings: self.settings,
            sequence: self.sequence,
            plan: self.plan,
            abort_check: self.abort_check,
            clock: self.clock,
            _d: PhantomData,
            _c: PhantomData,
            _k: PhantomData,
        }
    }
}

impl SessionBuilder<Set, Set, Set> {
    /// Validate and build the Session. Only available when all devices are set.
    pub fn build(self) -> Result<Session> {
        self.try_build()
    }
}

/// Build a statically dispatched engine from concrete devices.
///
/// Delegates to the shared `validate_and_build`; `plan = None` generates one
/// from `sequence` (or the default table).
#[allow(clippy::too_many_arguments)]
pub fn build_engine<D, C>(
    digitizer: D,
    cue: C,
    sink: Box<dyn TrialSink>,
    settings: EngineSettings,
    plan: Option<Vec<TrialSpec>>,
    sequence: Option<SequenceCfg>,
    abort_check: Option<Box<dyn Fn() -> bool>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<TrialEngine<D, C>>
where
    D: Digitizer,
    C: Cue,
{
    let plan = resolve_plan(plan, sequence)?;
    validate_and_build(digitizer, cue, sink, settings, plan, abort_check, clock)
}
