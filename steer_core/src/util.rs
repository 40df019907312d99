//! Common numeric and timing helpers for steer_core.

use std::f64::consts::{PI, TAU};
use std::time::Duration;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Loop period for a tick length in milliseconds, at least 1 ms.
#[inline]
pub fn tick_period(tick_ms: u64) -> Duration {
    Duration::from_millis(tick_ms.max(1))
}

/// Nominal loop rate for a tick length in milliseconds.
#[inline]
pub fn tick_rate_hz(tick_ms: u64) -> f64 {
    MILLIS_PER_SEC as f64 / tick_ms.max(1) as f64
}

/// Round to `decimals` places, half away from zero. Non-finite values pass through.
#[inline]
pub fn round_dp(v: f64, decimals: i32) -> f64 {
    if !v.is_finite() {
        return v;
    }
    let k = 10f64.powi(decimals);
    (v * k).round() / k
}

/// Wrap an angle difference into `(-π, π]`.
#[inline]
pub fn wrap_angle(d: f64) -> f64 {
    let mut w = d.rem_euclid(TAU);
    if w > PI {
        w -= TAU;
    }
    w
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        None
    } else {
        Some(xs.iter().sum::<f64>() / xs.len() as f64)
    }
}

/// Population standard deviation (divides by `n`); `None` for an empty slice.
pub fn pop_std(xs: &[f64]) -> Option<f64> {
    let m = mean(xs)?;
    let var = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.23456, 3, 1.235)]
    #[case(2.5, 0, 3.0)]
    #[case(-2.5, 0, -3.0)]
    #[case(99.94, 1, 99.9)]
    fn rounds_half_away(#[case] v: f64, #[case] dp: i32, #[case] want: f64) {
        assert!((round_dp(v, dp) - want).abs() < 1e-12);
    }

    #[rstest]
    #[case(0.1, 0.1)]
    #[case(PI, PI)]
    #[case(-PI, PI)]
    #[case(1.5 * PI, -0.5 * PI)]
    #[case(-1.5 * PI, 0.5 * PI)]
    fn wraps_into_half_open_range(#[case] d: f64, #[case] want: f64) {
        assert!((wrap_angle(d) - want).abs() < 1e-12);
    }

    #[test]
    fn population_std_divides_by_n() {
        let s = pop_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((s - 2.0).abs() < 1e-12);
        assert!(pop_std(&[]).is_none());
    }

    #[test]
    fn tick_helpers_clamp_zero() {
        assert_eq!(tick_period(0), Duration::from_millis(1));
        assert_eq!(tick_rate_hz(8), 125.0);
    }
}
