//! Log mel filterbank feature extraction.
//!
//! Produces the `num_frames x num_bins` feature matrix consumed by every
//! neural model in the engine: 25ms Hamming-windowed frames on a 10ms hop,
//! per-frame DC removal, pre-emphasis, power-of-two FFT, triangular mel bank
//! covering 20 Hz to Nyquist, natural log, then per-utterance CMVN.

mod fft;
mod mel;

use std::f64::consts::PI;

pub(crate) use fft::fft;
use mel::mel_filterbank;

/// Configures mel filterbank feature extraction.
///
/// Defaults match the speaker embedding models: 80 bins, 25ms/10ms framing
/// at 16 kHz, Hamming window, no dither, DC removal on.
#[derive(Debug, Clone)]
pub struct FbankConfig {
    /// Input sample rate in Hz (default: 16000).
    pub sample_rate: usize,
    /// Number of mel filterbank channels (default: 80).
    pub num_bins: usize,
    /// Frame length in samples (default: 400 = 25ms @ 16kHz).
    pub frame_length: usize,
    /// Frame shift in samples (default: 160 = 10ms @ 16kHz).
    pub frame_shift: usize,
    /// Pre-emphasis coefficient (default: 0.97).
    pub pre_emphasis: f64,
    /// Floor for mel energies before the log (default: 1e-10).
    pub energy_floor: f64,
    /// Low cutoff frequency for mel bins (default: 20 Hz).
    pub low_freq: f64,
    /// High cutoff frequency, 0 or negative = offset from Nyquist
    /// (default: 0 = Nyquist).
    pub high_freq: f64,
    /// Remove DC offset per frame (default: true).
    pub remove_dc: bool,
}

impl Default for FbankConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            num_bins: 80,
            frame_length: 400,
            frame_shift: 160,
            pre_emphasis: 0.97,
            energy_floor: 1e-10,
            low_freq: 20.0,
            high_freq: 0.0,
            remove_dc: true,
        }
    }
}

/// Row-major `num_frames x num_bins` feature matrix.
#[derive(Debug, Clone, Default)]
pub struct Fbank {
    pub num_frames: usize,
    pub num_bins: usize,
    pub data: Vec<f32>,
}

impl Fbank {
    pub fn is_empty(&self) -> bool {
        self.num_frames == 0
    }

    /// One frame's bins.
    pub fn frame(&self, f: usize) -> &[f32] {
        &self.data[f * self.num_bins..(f + 1) * self.num_bins]
    }
}

/// Number of frames produced for `num_samples` of input: zero below one
/// frame length, otherwise `1 + (n - frame_length) / frame_shift`.
pub fn num_frames(num_samples: usize, cfg: &FbankConfig) -> usize {
    if num_samples < cfg.frame_length {
        0
    } else {
        1 + (num_samples - cfg.frame_length) / cfg.frame_shift
    }
}

/// Extracts log mel filterbank features from f32 PCM samples.
///
/// Returns an empty matrix when the audio is shorter than one frame.
/// CMVN is NOT applied here; call [`cmvn`] on the result.
pub fn compute_fbank(samples: &[f32], cfg: &FbankConfig) -> Fbank {
    let frames = num_frames(samples.len(), cfg);
    if frames == 0 || cfg.num_bins == 0 || cfg.frame_shift == 0 {
        return Fbank::default();
    }

    let fft_size = next_pow2(cfg.frame_length);
    let half_fft = fft_size / 2 + 1;
    let window = hamming_window(cfg.frame_length);

    let high_freq = if cfg.high_freq <= 0.0 {
        cfg.sample_rate as f64 / 2.0 + cfg.high_freq
    } else {
        cfg.high_freq
    };
    let filterbank = mel_filterbank(cfg.num_bins, fft_size, cfg.sample_rate, cfg.low_freq, high_freq);

    let mut data = Vec::with_capacity(frames * cfg.num_bins);
    let mut fft_buf = vec![(0.0f64, 0.0f64); fft_size];
    let mut frame_buf = vec![0.0f64; cfg.frame_length];
    let mut power_spec = vec![0.0f64; half_fft];

    for f in 0..frames {
        let offset = f * cfg.frame_shift;
        for (i, v) in frame_buf.iter_mut().enumerate() {
            *v = samples[offset + i] as f64;
        }

        if cfg.remove_dc {
            let mean: f64 = frame_buf.iter().sum::<f64>() / cfg.frame_length as f64;
            for v in &mut frame_buf {
                *v -= mean;
            }
        }

        if cfg.pre_emphasis > 0.0 {
            for i in (1..cfg.frame_length).rev() {
                frame_buf[i] -= cfg.pre_emphasis * frame_buf[i - 1];
            }
            frame_buf[0] *= 1.0 - cfg.pre_emphasis;
        }

        for v in &mut fft_buf {
            *v = (0.0, 0.0);
        }
        for i in 0..cfg.frame_length {
            fft_buf[i] = (frame_buf[i] * window[i], 0.0);
        }

        fft(&mut fft_buf);

        for (k, p) in power_spec.iter_mut().enumerate() {
            let (re, im) = fft_buf[k];
            *p = re * re + im * im;
        }

        for filter in &filterbank {
            let mut energy: f64 = 0.0;
            for &(k, w) in filter {
                energy += w * power_spec[k];
            }
            if energy < cfg.energy_floor {
                energy = cfg.energy_floor;
            }
            data.push(energy.ln() as f32);
        }
    }

    Fbank {
        num_frames: frames,
        num_bins: cfg.num_bins,
        data,
    }
}

/// Per-utterance cepstral mean and variance normalisation:
/// `(x - mean) / sqrt(var + 1e-10)` per mel bin across frames.
pub fn cmvn(fbank: &mut Fbank) {
    if fbank.num_frames == 0 {
        return;
    }
    let t = fbank.num_frames as f64;
    let bins = fbank.num_bins;

    for b in 0..bins {
        let mut sum: f64 = 0.0;
        for f in 0..fbank.num_frames {
            sum += fbank.data[f * bins + b] as f64;
        }
        let mean = sum / t;

        let mut var_sum: f64 = 0.0;
        for f in 0..fbank.num_frames {
            let d = fbank.data[f * bins + b] as f64 - mean;
            var_sum += d * d;
        }
        let std = (var_sum / t + 1e-10).sqrt();

        for f in 0..fbank.num_frames {
            let v = &mut fbank.data[f * bins + b];
            *v = ((*v as f64 - mean) / std) as f32;
        }
    }
}

/// L2-normalizes a vector to unit length in-place.
/// Vectors with norm below 1e-10 are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let mut norm: f64 = 0.0;
    for &x in v.iter() {
        norm += (x as f64) * (x as f64);
    }
    norm = norm.sqrt();
    if norm > 1e-10 {
        let scale = (1.0 / norm) as f32;
        for x in v.iter_mut() {
            *x *= scale;
        }
    }
}

fn next_pow2(n: usize) -> usize {
    let mut p = 1;
    while p < n {
        p <<= 1;
    }
    p
}

fn hamming_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f64 / 16000.0;
                ((freq * 2.0 * PI * t).sin() * 0.5) as f32
            })
            .collect()
    }

    #[test]
    fn config_default() {
        let cfg = FbankConfig::default();
        assert_eq!(cfg.sample_rate, 16000);
        assert_eq!(cfg.num_bins, 80);
        assert_eq!(cfg.frame_length, 400);
        assert_eq!(cfg.frame_shift, 160);
    }

    #[test]
    fn too_short_is_empty() {
        let cfg = FbankConfig::default();
        let out = compute_fbank(&vec![0.0; 399], &cfg);
        assert!(out.is_empty());
        assert_eq!(num_frames(399, &cfg), 0);
    }

    #[test]
    fn frame_count_formula() {
        let cfg = FbankConfig::default();
        assert_eq!(num_frames(400, &cfg), 1);
        assert_eq!(num_frames(16000, &cfg), 98);
        let out = compute_fbank(&sine(440.0, 16000), &cfg);
        assert_eq!(out.num_frames, 98);
        assert_eq!(out.num_bins, 80);
        assert_eq!(out.data.len(), 98 * 80);
    }

    #[test]
    fn tone_produces_varied_bins() {
        let cfg = FbankConfig::default();
        let out = compute_fbank(&sine(440.0, 16000), &cfg);
        let first = out.frame(0);
        assert!(
            first.windows(2).any(|w| (w[0] - w[1]).abs() > 0.01),
            "tone should produce varied mel energies"
        );
    }

    #[test]
    fn cmvn_zero_mean_unit_var() {
        // Modulated two-tone input so every mel bin varies across frames.
        let pcm: Vec<f32> = (0..32000)
            .map(|i| {
                let t = i as f64 / 16000.0;
                let env = 0.5 + 0.4 * (3.0 * 2.0 * PI * t).sin();
                (((300.0 * 2.0 * PI * t).sin() + 0.3 * (2000.0 * 2.0 * PI * t).sin()) * env * 0.5)
                    as f32
            })
            .collect();
        let cfg = FbankConfig::default();
        let mut out = compute_fbank(&pcm, &cfg);
        cmvn(&mut out);

        let bins = out.num_bins;
        let t = out.num_frames as f64;
        for b in 0..bins {
            let mut sum = 0.0f64;
            let mut sq = 0.0f64;
            for f in 0..out.num_frames {
                let v = out.data[f * bins + b] as f64;
                sum += v;
                sq += v * v;
            }
            let mean = sum / t;
            let var = sq / t - mean * mean;
            assert!(mean.abs() < 1e-4, "bin {b} mean {mean}");
            assert!((var - 1.0).abs() < 1e-2, "bin {b} var {var}");
        }
    }

    #[test]
    fn l2_normalize_unit() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize(&mut v);
        let norm: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_near_zero_untouched() {
        let mut v = vec![0.0f32, 0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }
}
