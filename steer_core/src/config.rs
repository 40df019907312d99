//! Configuration types for the trial engine.
//!
//! These are the runtime configuration structs used by `TrialEngine`.
//! They are separate from the TOML-deserialized config in `steer_config`.

use crate::feedback::ForceBand;
use crate::types::{Point, TunnelGeometry};

/// Phase durations and the loop period.
#[derive(Debug, Clone, Copy)]
pub struct TimingCfg {
    /// Recording stops with a timeout once strictly more than this has elapsed.
    pub max_trial_s: f64,
    pub rest_s: f64,
    pub long_break_s: f64,
    /// Intro auto-advance delay in `PauseMode::Timed`.
    pub intro_s: f64,
    /// Engagement must hold continuously for this long.
    pub stationary_delay_s: f64,
    /// First countdown value shown.
    pub countdown_from: u8,
    /// Minimum spacing between two countdown decrements.
    pub countdown_step_s: f64,
    /// Loop period; `step` sleeps this long on the engine clock.
    pub tick_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            max_trial_s: 15.0,
            rest_s: 5.0,
            long_break_s: 30.0,
            intro_s: 0.0,
            stationary_delay_s: 0.5,
            countdown_from: 3,
            countdown_step_s: 1.0,
            tick_ms: 8,
        }
    }
}

/// Start-posture requirements.
#[derive(Debug, Clone)]
pub struct EngagementCfg {
    /// Strict upper bound on pointer distance to the start marker.
    pub capture_radius_px: f64,
    /// Normalized pressure that counts as touching (speed-accuracy task).
    pub touch_threshold: f64,
    pub target_force_raw: f64,
    pub force_tolerance_pct: f64,
    /// Raw units at a normalized pressure of 1.0.
    pub raw_max: f64,
}

impl EngagementCfg {
    pub fn force_band(&self) -> ForceBand {
        ForceBand::around(self.target_force_raw, self.force_tolerance_pct)
    }
}

impl Default for EngagementCfg {
    fn default() -> Self {
        Self {
            capture_radius_px: 30.0,
            touch_threshold: 0.05,
            target_force_raw: 3200.0,
            force_tolerance_pct: 5.0,
            raw_max: 8192.0,
        }
    }
}

/// Trace rendering parameters that also drive the in-tunnel test.
#[derive(Debug, Clone, Copy)]
pub struct TraceCfg {
    pub base_thickness: f64,
    pub max_thickness: f64,
}

impl Default for TraceCfg {
    fn default() -> Self {
        Self {
            base_thickness: 4.0,
            max_thickness: 40.0,
        }
    }
}

/// Spatial test used for the live feedback color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitRule {
    #[default]
    HalfThickness,
    Centerline,
}

/// How intro screens are left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PauseMode {
    #[default]
    Timed,
    Interactive,
}

/// What to do when a finished trial cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistPolicy {
    Ignore,
    #[default]
    Warn,
    Abort,
}

/// Behavioral switches of the state machine.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub exit_rule: ExitRule,
    pub pause: PauseMode,
    /// Show force feedback at the start marker in the force task.
    pub wait_feedback_override: bool,
    pub persist_policy: PersistPolicy,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            exit_rule: ExitRule::HalfThickness,
            pause: PauseMode::Timed,
            wait_feedback_override: true,
            persist_policy: PersistPolicy::Warn,
        }
    }
}

/// Everything the engine needs besides its devices and the trial plan.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub timing: TimingCfg,
    pub engagement: EngagementCfg,
    pub trace: TraceCfg,
    pub capabilities: Capabilities,
    /// Movement onset speed, px/s.
    pub velocity_threshold: f64,
    /// Tunnel center (screen center).
    pub center: Point,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timing: TimingCfg::default(),
            engagement: EngagementCfg::default(),
            trace: TraceCfg::default(),
            capabilities: Capabilities::default(),
            velocity_threshold: 10.0,
            center: Point::new(960.0, 540.0),
        }
    }
}

/// Inputs of the sequence generator.
#[derive(Debug, Clone)]
pub struct SequenceCfg {
    /// Difficulty table; level `n` is `levels[n - 1]`.
    pub levels: Vec<TunnelGeometry>,
    pub reps_per_level: u32,
    /// Fixed seed for a reproducible order; `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for SequenceCfg {
    fn default() -> Self {
        Self {
            levels: steer_config::DEFAULT_LEVELS
                .iter()
                .map(|l| TunnelGeometry::new(l.radius, l.width))
                .collect(),
            reps_per_level: 2,
            seed: None,
        }
    }
}
