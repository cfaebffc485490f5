use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voiceprint_audio::dsp::{compute_lufs, PitchAnalyzer};
use voiceprint_audio::{compute_fbank, FbankConfig};

fn make_sine_pcm(freq_hz: f64, n_samples: usize, sample_rate: usize) -> Vec<f32> {
    (0..n_samples)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            ((freq_hz * 2.0 * std::f64::consts::PI * t).sin() * 0.5) as f32
        })
        .collect()
}

fn bench_fbank_1s(c: &mut Criterion) {
    let cfg = FbankConfig::default();
    let pcm = make_sine_pcm(440.0, 16000, 16000);

    c.bench_function("fbank_1s", |b| {
        b.iter(|| {
            let _ = black_box(compute_fbank(black_box(&pcm), &cfg));
        });
    });
}

fn bench_yin_1s(c: &mut Criterion) {
    let pa = PitchAnalyzer::default();
    let pcm = make_sine_pcm(220.0, 16000, 16000);

    c.bench_function("yin_1s", |b| {
        b.iter(|| {
            let _ = black_box(pa.analyze(black_box(&pcm)));
        });
    });
}

fn bench_lufs_3s(c: &mut Criterion) {
    let pcm = make_sine_pcm(440.0, 48000, 16000);

    c.bench_function("lufs_3s", |b| {
        b.iter(|| {
            let _ = black_box(compute_lufs(black_box(&pcm), 16000));
        });
    });
}

criterion_group!(benches, bench_fbank_1s, bench_yin_1s, bench_lufs_3s);
criterion_main!(benches);
