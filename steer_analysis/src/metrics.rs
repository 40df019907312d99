//! Per-trial smoothness, spectral and ISO 9241-9 accuracy metrics.

use std::f64::consts::TAU;

use steer_core::util::{mean, pop_std};
use steer_core::{RawRow, TunnelGeometry};

use crate::filter::mean_interval;
use crate::kinematics::{Kinematics, path_length};
use crate::spectrum::f95;

/// Effective target width constant for a normal spread (ISO 9241-9).
pub const TE_FACTOR: f64 = 4.133;

/// Smallest LDLJ log argument that is not treated as degenerate.
const LDLJ_MIN_ARG: f64 = 1e-9;

/// Ring assumed when a trial's difficulty level is unknown.
pub const FALLBACK_TARGET: TunnelGeometry = TunnelGeometry::new(250.0, 100.0);

/// Trace thickness assumed when a trial has none recorded.
const FALLBACK_THICKNESS: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrialFeatures {
    pub mean_jerk: f64,
    pub ldlj: f64,
    pub f95: f64,
    /// Effective throughput `IDe / duration`, bits/s.
    pub throughput: f64,
    pub error_rate: f64,
    pub te: f64,
    pub duration: f64,
    pub path_length: f64,
    pub mean_velocity: f64,
    pub force_sd: f64,
}

/// Target ring of a 1-based difficulty level, clamped to the table.
pub fn target_for(level: Option<u32>, levels: &[TunnelGeometry]) -> TunnelGeometry {
    match (level, levels.len()) {
        (Some(l), len) if len > 0 => {
            let idx = (l as usize).saturating_sub(1).min(len - 1);
            levels[idx]
        }
        _ => FALLBACK_TARGET,
    }
}

/// `ln((D^5 / L^2) * integral)`, 0 when degenerate.
pub fn ldlj(duration: f64, path_length: f64, jerk_sq_integral: f64) -> f64 {
    if path_length <= 0.0 || duration <= 0.0 {
        return 0.0;
    }
    let arg = duration.powi(5) / path_length.powi(2) * jerk_sq_integral;
    if arg > LDLJ_MIN_ARG { arg.ln() } else { 0.0 }
}

/// Metrics of one cleaned trial. `rows` must be non-empty.
pub fn compute(rows: &[RawRow], target: TunnelGeometry, default_fs_hz: f64) -> TrialFeatures {
    let col = |f: fn(&RawRow) -> f64| rows.iter().map(f).collect::<Vec<f64>>();
    let (t_abs, t_rel) = (col(|r| r.time_abs), col(|r| r.time_rel));
    let (x, y, pressure) = (col(|r| r.x), col(|r| r.y), col(|r| r.pressure_raw));

    let interval = mean_interval(&t_abs);
    let (dt, fs) = if interval > 0.0 && interval.is_finite() {
        (interval, 1.0 / interval)
    } else {
        (1.0 / default_fs_hz, default_fs_hz)
    };

    let k = Kinematics::from_xy(&x, &y, dt);
    let (t_min, t_max) = min_max(&t_rel);
    let duration = t_max - t_min;
    let path = path_length(&x, &y);
    let jerk_sq: f64 = k.jerk.iter().map(|j| j * j).sum::<f64>() * dt;

    let (x_min, x_max) = min_max(&x);
    let (y_min, y_max) = min_max(&y);
    let (cx, cy) = ((x_min + x_max) / 2.0, (y_min + y_max) / 2.0);
    let ri: Vec<f64> = x
        .iter()
        .zip(&y)
        .map(|(px, py)| (px - cx).hypot(py - cy))
        .collect();

    let re = mean(&ri).unwrap_or(0.0);
    let te = TE_FACTOR * pop_std(&ri).unwrap_or(0.0);
    let ide = if te > 0.0 { (TAU * re / te).log2() } else { 0.0 };
    let throughput = if duration > 0.0 { ide / duration } else { 0.0 };

    let thickness = mean(&col(|r| r.trace_thickness)).unwrap_or(FALLBACK_THICKNESS);
    let half = target.half_width();
    let out = ri
        .iter()
        .filter(|r| (*r - target.radius).abs() + thickness / 2.0 > half)
        .count();
    let error_rate = out as f64 / ri.len().max(1) as f64 * 100.0;

    TrialFeatures {
        mean_jerk: mean(&k.jerk).unwrap_or(0.0),
        ldlj: ldlj(duration, path, jerk_sq),
        f95: f95(&ri, fs),
        throughput,
        error_rate,
        te,
        duration,
        path_length: path,
        mean_velocity: mean(&k.velocity).unwrap_or(0.0),
        force_sd: pop_std(&pressure).unwrap_or(0.0),
    }
}

fn min_max(xs: &[f64]) -> (f64, f64) {
    xs.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}
