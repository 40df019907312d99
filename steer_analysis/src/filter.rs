//! Zero-phase low-pass filtering of sample channels.
//!
//! Second-order Butterworth section from the bilinear transform with
//! prewarping, run forward then backward over an odd extension of the signal.
//! Each pass starts from the steady-state filter state scaled by the first
//! input, so a constant channel comes out unchanged.

use std::f64::consts::{PI, SQRT_2};

/// Samples mirrored on each side before filtering (three times the filter order + 1).
pub const PAD_LEN: usize = 9;

/// Normalized biquad coefficients (`a0 = 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Biquad {
    /// Second-order Butterworth low-pass, or `None` unless `0 < cutoff < fs/2`.
    pub fn butter_lowpass(cutoff_hz: f64, fs_hz: f64) -> Option<Self> {
        let wn = cutoff_hz / (0.5 * fs_hz);
        if !(wn.is_finite() && wn > 0.0 && wn < 1.0) {
            return None;
        }
        let k = (PI * wn / 2.0).tan();
        let k2 = k * k;
        let norm = 1.0 + SQRT_2 * k + k2;
        Some(Self {
            b: [k2 / norm, 2.0 * k2 / norm, k2 / norm],
            a: [1.0, 2.0 * (k2 - 1.0) / norm, (1.0 - SQRT_2 * k + k2) / norm],
        })
    }

    /// Steady-state state for a unit step input.
    fn zi(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let r0 = b1 - a1 * b0;
        let r1 = b2 - a2 * b0;
        let z0 = (r0 + r1) / (1.0 + a1 + a2);
        [z0, r1 - a2 * z0]
    }

    /// One causal pass (transposed direct form II) from initial state `z`.
    fn run(&self, x: &[f64], mut z: [f64; 2]) -> Vec<f64> {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        x.iter()
            .map(|&xn| {
                let y = b0 * xn + z[0];
                z[0] = b1 * xn - a1 * y + z[1];
                z[1] = b2 * xn - a2 * y;
                y
            })
            .collect()
    }

    /// Forward-backward filtering; returns the input unchanged when it is
    /// too short to pad.
    pub fn filtfilt(&self, x: &[f64]) -> Vec<f64> {
        let n = x.len();
        if n <= PAD_LEN {
            return x.to_vec();
        }
        let (first, last) = (x[0], x[n - 1]);
        let mut ext = Vec::with_capacity(n + 2 * PAD_LEN);
        ext.extend((1..=PAD_LEN).rev().map(|i| 2.0 * first - x[i]));
        ext.extend_from_slice(x);
        ext.extend((1..=PAD_LEN).map(|i| 2.0 * last - x[n - 1 - i]));

        let zi = self.zi();
        let scaled = |s: f64| [zi[0] * s, zi[1] * s];

        let mut y = self.run(&ext, scaled(ext[0]));
        y.reverse();
        let mut y = self.run(&y, scaled(y[0]));
        y.reverse();
        y[PAD_LEN..PAD_LEN + n].to_vec()
    }
}

/// Low-pass one channel; passes it through when shorter than `min_len` or
/// when the cutoff is not below Nyquist.
pub fn lowpass(x: &[f64], cutoff_hz: f64, fs_hz: f64, min_len: usize) -> Vec<f64> {
    if x.len() < min_len {
        return x.to_vec();
    }
    match Biquad::butter_lowpass(cutoff_hz, fs_hz) {
        Some(f) => f.filtfilt(x),
        None => {
            tracing::debug!(cutoff_hz, fs_hz, "cutoff not below Nyquist; channel left unfiltered");
            x.to_vec()
        }
    }
}

/// `1 / mean(diff(t))` for more than two timestamps with a positive mean
/// interval, else `default_hz`.
pub fn sampling_rate(times: &[f64], default_hz: f64) -> f64 {
    if times.len() <= 2 {
        return default_hz;
    }
    let dt = mean_interval(times);
    if dt > 0.0 && dt.is_finite() {
        1.0 / dt
    } else {
        default_hz
    }
}

/// Mean of consecutive differences; 0 for fewer than two values.
pub fn mean_interval(times: &[f64]) -> f64 {
    match times {
        [first, .., last] => (last - first) / (times.len() - 1) as f64,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_match_reference_design() {
        // butter(2, 10 / 60)
        let f = Biquad::butter_lowpass(10.0, 120.0).unwrap();
        let want_b = [0.049_489_956_268_677, 0.098_979_912_537_354, 0.049_489_956_268_677];
        let want_a = [1.0, -1.279_632_424_997_809, 0.477_592_250_072_517];
        for (got, want) in f.b.iter().zip(want_b).chain(f.a.iter().zip(want_a)) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
        // unity DC gain
        let dc = f.b.iter().sum::<f64>() / f.a.iter().sum::<f64>();
        assert!((dc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cutoff_at_or_above_nyquist_is_rejected() {
        assert!(Biquad::butter_lowpass(60.0, 120.0).is_none());
        assert!(Biquad::butter_lowpass(0.0, 120.0).is_none());
        assert!(Biquad::butter_lowpass(10.0, f64::NAN).is_none());
    }

    #[test]
    fn steady_state_is_a_fixed_point() {
        let f = Biquad::butter_lowpass(10.0, 120.0).unwrap();
        let y = f.run(&[1.0; 20], f.zi());
        assert!(y.iter().all(|v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn constant_channel_is_unchanged() {
        let x = vec![812.5; 40];
        let y = lowpass(&x, 10.0, 120.0, 15);
        assert_eq!(y.len(), 40);
        assert!(y.iter().all(|v| (v - 812.5).abs() < 1e-9));
    }

    #[test]
    fn ramp_has_no_lag() {
        let x: Vec<f64> = (0..60).map(|i| 3.0 * i as f64 - 7.0).collect();
        let y = lowpass(&x, 10.0, 120.0, 15);
        // forward-backward filtering bends a ramp slightly at both ends
        for (i, (a, b)) in x.iter().zip(&y).enumerate() {
            let tol = if (15..45).contains(&i) { 0.01 } else { 0.3 };
            assert!((a - b).abs() < tol, "{i}: {a} vs {b}");
        }
        assert!((y[58] - 167.146_012_66).abs() < 1e-6, "{}", y[58]);
    }

    #[test]
    fn short_channel_passes_through() {
        let x: Vec<f64> = (0..14).map(|i| (i * i) as f64).collect();
        assert_eq!(lowpass(&x, 10.0, 120.0, 15), x);
    }

    #[test]
    fn high_frequency_is_attenuated() {
        let fs = 120.0;
        let x: Vec<f64> = (0..600)
            .map(|i| (2.0 * PI * 40.0 * i as f64 / fs).sin())
            .collect();
        let y = lowpass(&x, 10.0, fs, 15);
        let peak = y[100..500].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak < 0.05, "peak {peak}");
    }

    #[test]
    fn sampling_rate_from_timestamps() {
        let t: Vec<f64> = (0..10).map(|i| i as f64 * 0.008).collect();
        assert!((sampling_rate(&t, 120.0) - 125.0).abs() < 1e-9);
        assert_eq!(sampling_rate(&t[..2], 120.0), 120.0);
        assert_eq!(sampling_rate(&[1.0, 1.0, 1.0], 120.0), 120.0);
    }
}
