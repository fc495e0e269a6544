//! Per-stage benchmarks for the block-rate DSP hot path

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mpx_dsp::{MpxMixer, Nco, PolyphaseUpsampler, StereoMatrix};

const FRAMES_IN: usize = 64;
const FRAMES_OUT: usize = FRAMES_IN * 4;

fn bench_upsampler(c: &mut Criterion) {
    let mut up = PolyphaseUpsampler::new(192_000.0);
    let input: Vec<f32> = (0..FRAMES_IN * 2).map(|i| (i as f32 * 0.01).sin()).collect();
    let mut output = vec![0.0f32; FRAMES_OUT * 2];

    c.bench_function("upsample_4x_64f", |b| {
        b.iter(|| {
            up.process(black_box(&input), black_box(&mut output), FRAMES_IN);
        })
    });
}

fn bench_nco_harmonics(c: &mut Criterion) {
    let mut nco = Nco::new(19_000.0, 192_000.0);
    let mut pilot = vec![0.0f32; FRAMES_OUT];
    let mut sub = vec![0.0f32; FRAMES_OUT];
    let mut rds = vec![0.0f32; FRAMES_OUT];

    c.bench_function("nco_harmonics_256", |b| {
        b.iter(|| {
            nco.generate_harmonics(
                black_box(&mut pilot),
                black_box(&mut sub),
                black_box(&mut rds),
                FRAMES_OUT,
            );
        })
    });
}

fn bench_matrix_and_mix(c: &mut Criterion) {
    let interleaved: Vec<f32> = (0..FRAMES_OUT * 2).map(|i| (i as f32 * 0.02).sin()).collect();
    let mut mono = vec![0.0f32; FRAMES_OUT];
    let mut diff = vec![0.0f32; FRAMES_OUT];
    let pilot = vec![0.5f32; FRAMES_OUT];
    let sub = vec![0.5f32; FRAMES_OUT];
    let mut mpx = vec![0.0f32; FRAMES_OUT];
    let mixer = MpxMixer::new(0.09, 0.5);

    c.bench_function("matrix_plus_mix_256", |b| {
        b.iter(|| {
            StereoMatrix.process(black_box(&interleaved), &mut mono, &mut diff, FRAMES_OUT);
            mixer.process(&mono, &diff, &pilot, &sub, black_box(&mut mpx), FRAMES_OUT);
        })
    });
}

criterion_group!(benches, bench_upsampler, bench_nco_harmonics, bench_matrix_and_mix);
criterion_main!(benches);
