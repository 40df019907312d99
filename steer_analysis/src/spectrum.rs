//! Frequency containing 95 % of a signal's spectral power.

use std::f64::consts::TAU;

/// Power `|X_k|^2` of the discrete Fourier transform at bin `k`.
fn dft_power(x: &[f64], k: usize) -> f64 {
    let n = x.len() as f64;
    let w = TAU * k as f64 / n;
    let (re, im) = x.iter().enumerate().fold((0.0, 0.0), |(re, im), (t, v)| {
        let (s, c) = (w * t as f64).sin_cos();
        (re + v * c, im - v * s)
    });
    re * re + im * im
}

/// Lowest positive frequency at which the cumulative power reaches 95 % of
/// the positive-frequency total; the highest positive frequency when rounding
/// keeps it short; 0 for fewer than two samples.
///
/// Positive bins are `k = 1 ..= ceil(n/2) - 1` at `k * fs / n`.
pub fn f95(x: &[f64], fs: f64) -> f64 {
    let n = x.len();
    if n < 2 {
        return 0.0;
    }
    let bins = n.div_ceil(2) - 1;
    if bins == 0 {
        return 0.0;
    }
    let power: Vec<f64> = (1..=bins).map(|k| dft_power(x, k)).collect();
    let total: f64 = power.iter().sum();
    let target = 0.95 * total;
    let freq = |k: usize| k as f64 * fs / n as f64;

    let mut acc = 0.0;
    for (i, p) in power.iter().enumerate() {
        acc += p;
        if acc >= target {
            return freq(i + 1);
        }
    }
    freq(bins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn pure_tone_lands_on_its_bin() {
        let fs = 100.0;
        let x: Vec<f64> = (0..200)
            .map(|i| 5.0 + (TAU * 7.0 * i as f64 / fs).sin())
            .collect();
        assert!((f95(&x, fs) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn two_equal_tones_report_the_higher() {
        let fs = 100.0;
        let x: Vec<f64> = (0..200)
            .map(|i| {
                let t = i as f64 / fs;
                (TAU * 5.0 * t).sin() + (TAU * 20.0 * t).cos()
            })
            .collect();
        assert!((f95(&x, fs) - 20.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(2)]
    fn too_short_for_positive_bins(#[case] n: usize) {
        assert_eq!(f95(&vec![1.0; n], 120.0), 0.0);
    }

    #[test]
    fn three_samples_have_one_bin() {
        assert!((f95(&[0.0, 1.0, 0.0], 120.0) - 40.0).abs() < 1e-9);
    }
}
