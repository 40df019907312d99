//! `From` implementations bridging `steer_config` types to `steer_core` types.

use crate::config::{
    Capabilities, EngagementCfg, EngineSettings, ExitRule, PauseMode, PersistPolicy, SequenceCfg,
    TimingCfg, TraceCfg,
};
use crate::types::{Point, TunnelGeometry};

// ── Enums ────────────────────────────────────────────────────────────────────

impl From<steer_config::ExitRule> for ExitRule {
    fn from(r: steer_config::ExitRule) -> Self {
        match r {
            steer_config::ExitRule::HalfThickness => ExitRule::HalfThickness,
            steer_config::ExitRule::Centerline => ExitRule::Centerline,
        }
    }
}

impl From<steer_config::PauseMode> for PauseMode {
    fn from(p: steer_config::PauseMode) -> Self {
        match p {
            steer_config::PauseMode::Timed => PauseMode::Timed,
            steer_config::PauseMode::Interactive => PauseMode::Interactive,
        }
    }
}

impl From<steer_config::WriteErrorPolicy> for PersistPolicy {
    fn from(p: steer_config::WriteErrorPolicy) -> Self {
        match p {
            steer_config::WriteErrorPolicy::Ignore => PersistPolicy::Ignore,
            steer_config::WriteErrorPolicy::Warn => PersistPolicy::Warn,
            steer_config::WriteErrorPolicy::Abort => PersistPolicy::Abort,
        }
    }
}

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&steer_config::SessionCfg> for TimingCfg {
    fn from(c: &steer_config::SessionCfg) -> Self {
        Self {
            max_trial_s: c.max_trial_s,
            rest_s: c.rest_s,
            long_break_s: c.long_break_s,
            intro_s: c.intro_s,
            stationary_delay_s: c.stationary_delay_s,
            tick_ms: c.tick_ms,
            ..TimingCfg::default()
        }
    }
}

// ── EngagementCfg ────────────────────────────────────────────────────────────

impl From<&steer_config::Config> for EngagementCfg {
    fn from(c: &steer_config::Config) -> Self {
        Self {
            capture_radius_px: c.start.capture_radius_px,
            touch_threshold: c.start.touch_threshold,
            target_force_raw: c.session.target_force_raw,
            force_tolerance_pct: c.session.force_tolerance_pct,
            raw_max: c.session.raw_max,
        }
    }
}

// ── TraceCfg ─────────────────────────────────────────────────────────────────

impl From<&steer_config::TraceCfg> for TraceCfg {
    fn from(c: &steer_config::TraceCfg) -> Self {
        Self {
            base_thickness: c.base_thickness,
            max_thickness: c.max_thickness,
        }
    }
}

// ── Capabilities ─────────────────────────────────────────────────────────────

impl From<&steer_config::Config> for Capabilities {
    fn from(c: &steer_config::Config) -> Self {
        Self {
            exit_rule: c.feedback.exit_rule.into(),
            pause: c.feedback.pause.into(),
            wait_feedback_override: c.feedback.wait_override,
            persist_policy: c.storage.on_write_error.into(),
        }
    }
}

// ── EngineSettings ───────────────────────────────────────────────────────────

impl From<&steer_config::Config> for EngineSettings {
    fn from(c: &steer_config::Config) -> Self {
        Self {
            timing: (&c.session).into(),
            engagement: c.into(),
            trace: (&c.trace).into(),
            capabilities: c.into(),
            velocity_threshold: c.session.velocity_threshold,
            center: Point::new(
                f64::from(c.display.width) / 2.0,
                f64::from(c.display.height) / 2.0,
            ),
        }
    }
}

// ── SequenceCfg ──────────────────────────────────────────────────────────────

impl From<&steer_config::TunnelLevel> for TunnelGeometry {
    fn from(l: &steer_config::TunnelLevel) -> Self {
        TunnelGeometry::new(l.radius, l.width)
    }
}

impl From<&steer_config::Config> for SequenceCfg {
    fn from(c: &steer_config::Config) -> Self {
        Self {
            levels: c.tunnel.levels.iter().map(TunnelGeometry::from).collect(),
            reps_per_level: c.session.reps_per_level,
            seed: c.session.seed,
        }
    }
}
