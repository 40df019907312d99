//! Live pointer feedback: trace thickness, in-tunnel test and color state.
//!
//! Classification is a pure function of the current radial error, trace
//! thickness and raw pressure. It drives presentation only; the recorded
//! in-tunnel flag always uses the half-thickness rule.

use crate::config::{ExitRule, TraceCfg};
use crate::types::Task;

/// Inclusive accepted force range in raw units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceBand {
    pub min: f64,
    pub max: f64,
}

impl ForceBand {
    /// Band of `target ± tolerance_pct %`.
    pub fn around(target: f64, tolerance_pct: f64) -> Self {
        let frac = tolerance_pct / 100.0;
        Self {
            min: target * (1.0 - frac),
            max: target * (1.0 + frac),
        }
    }

    #[inline]
    pub fn contains(&self, raw: f64) -> bool {
        (self.min..=self.max).contains(&raw)
    }
}

/// Presentation state of the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackState {
    /// Feedback disabled for this trial (white).
    Hidden,
    /// Inside the tunnel and, for the force task, inside the band (green).
    Nominal,
    /// Trace leaves the tunnel (red).
    OutOfTunnel,
    /// Force task, pressing too lightly (blue).
    ForceLow,
    /// Force task, pressing too hard (orange).
    ForceHigh,
}

impl FeedbackState {
    pub const fn color_name(self) -> &'static str {
        match self {
            FeedbackState::Hidden => "white",
            FeedbackState::Nominal => "green",
            FeedbackState::OutOfTunnel => "red",
            FeedbackState::ForceLow => "blue",
            FeedbackState::ForceHigh => "orange",
        }
    }
}

/// Trace thickness for a normalized pressure.
#[inline]
pub fn trace_thickness(pressure: f64, feedback_shown: bool, trace: &TraceCfg) -> f64 {
    if feedback_shown {
        trace.base_thickness + pressure * trace.max_thickness
    } else {
        trace.base_thickness
    }
}

/// Recorded in-tunnel flag: the trace edge stays within the half-width.
#[inline]
pub fn in_tunnel(radial_error: f64, thickness: f64, width: f64) -> bool {
    radial_error + thickness / 2.0 <= width / 2.0
}

/// Inputs of [`classify`].
#[derive(Debug, Clone, Copy)]
pub struct FeedbackInput {
    pub radial_error: f64,
    pub thickness: f64,
    pub width: f64,
    pub pressure_raw: f64,
    pub task: Task,
    pub shown: bool,
}

/// Color rule. Spatial violation wins over force violation.
pub fn classify(input: &FeedbackInput, band: &ForceBand, rule: ExitRule) -> FeedbackState {
    if !input.shown {
        return FeedbackState::Hidden;
    }
    let half = input.width / 2.0;
    let outside = match rule {
        ExitRule::HalfThickness => input.radial_error + input.thickness / 2.0 > half,
        ExitRule::Centerline => input.radial_error > half,
    };
    if outside {
        return FeedbackState::OutOfTunnel;
    }
    if input.task.is_force() {
        if input.pressure_raw < band.min {
            return FeedbackState::ForceLow;
        }
        if input.pressure_raw > band.max {
            return FeedbackState::ForceHigh;
        }
    }
    FeedbackState::Nominal
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn band() -> ForceBand {
        ForceBand::around(3200.0, 5.0)
    }

    fn input(err: f64, th: f64, raw: f64, task: Task) -> FeedbackInput {
        FeedbackInput {
            radial_error: err,
            thickness: th,
            width: 100.0,
            pressure_raw: raw,
            task,
            shown: true,
        }
    }

    #[test]
    fn band_is_inclusive() {
        let b = band();
        assert!((b.min - 3040.0).abs() < 1e-9);
        assert!((b.max - 3360.0).abs() < 1e-9);
        assert!(b.contains(3040.0));
        assert!(b.contains(3360.0));
        assert!(!b.contains(3360.1));
    }

    #[rstest]
    #[case(0.0, 4.0, 3200.0, Task::SpeedAccuracy, FeedbackState::Nominal)]
    #[case(49.0, 4.0, 3200.0, Task::SpeedAccuracy, FeedbackState::OutOfTunnel)]
    #[case(10.0, 4.0, 1000.0, Task::SpeedAccuracy, FeedbackState::Nominal)]
    #[case(10.0, 4.0, 1000.0, Task::ForceSpeedAccuracy, FeedbackState::ForceLow)]
    #[case(10.0, 4.0, 5000.0, Task::ForceSpeedAccuracy, FeedbackState::ForceHigh)]
    #[case(60.0, 4.0, 5000.0, Task::ForceSpeedAccuracy, FeedbackState::OutOfTunnel)]
    fn precedence(
        #[case] err: f64,
        #[case] th: f64,
        #[case] raw: f64,
        #[case] task: Task,
        #[case] want: FeedbackState,
    ) {
        let got = classify(&input(err, th, raw, task), &band(), ExitRule::HalfThickness);
        assert_eq!(got, want);
    }

    #[test]
    fn centerline_rule_ignores_thickness() {
        let i = input(49.0, 20.0, 3200.0, Task::SpeedAccuracy);
        assert_eq!(
            classify(&i, &band(), ExitRule::HalfThickness),
            FeedbackState::OutOfTunnel
        );
        assert_eq!(
            classify(&i, &band(), ExitRule::Centerline),
            FeedbackState::Nominal
        );
    }

    #[test]
    fn hidden_when_not_shown() {
        let mut i = input(99.0, 4.0, 0.0, Task::ForceSpeedAccuracy);
        i.shown = false;
        assert_eq!(
            classify(&i, &band(), ExitRule::HalfThickness),
            FeedbackState::Hidden
        );
    }

    #[test]
    fn thickness_grows_with_pressure_only_when_shown() {
        let t = TraceCfg::default();
        assert_eq!(trace_thickness(0.5, true, &t), 24.0);
        assert_eq!(trace_thickness(0.5, false, &t), 4.0);
    }

    #[test]
    fn in_tunnel_edge_is_inclusive() {
        assert!(in_tunnel(48.0, 4.0, 100.0));
        assert!(!in_tunnel(48.5, 4.0, 100.0));
    }
}
