use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use steer_analysis::filter::{Biquad, lowpass};
use steer_analysis::spectrum::f95;

// Circular trace sampled at 125 Hz with deterministic jitter
fn synth_trace(n: usize, seed: u32) -> Vec<f64> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    (0..n)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / 375.0;
            960.0 + 250.0 * theta.cos() + (next() * 2.0 - 1.0) * 1.5
        })
        .collect()
}

pub fn bench_filtfilt(c: &mut Criterion) {
    let trace = synth_trace(40 * 400, 0xBEEF);
    let f = Biquad::butter_lowpass(10.0, 125.0);
    c.bench_function("filtfilt_session_channel", |b| {
        b.iter_batched(
            || trace.clone(),
            |x| match f {
                Some(f) => black_box(f.filtfilt(&x)),
                None => x,
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("lowpass_short_passthrough", |b| {
        b.iter(|| black_box(lowpass(black_box(&trace[..14]), 10.0, 125.0, 15)))
    });
}

pub fn bench_f95(c: &mut Criterion) {
    let trial = synth_trace(400, 7);
    c.bench_function("f95_one_trial", |b| b.iter(|| black_box(f95(black_box(&trial), 125.0))));
}

criterion_group!(benches, bench_filtfilt, bench_f95);
criterion_main!(benches);
