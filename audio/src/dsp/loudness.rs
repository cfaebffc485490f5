//! Loudness, SNR, HNR and related energy measurements.
//!
//! Integrated loudness follows ITU-R BS.1770-4 with K-weighting coefficients
//! computed for the engine's fixed 16 kHz rate.

/// Direct Form I biquad state.
#[derive(Default, Clone, Copy)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    #[inline]
    fn tick(&mut self, x: f64, b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> f64 {
        let y = b0 * x + b1 * self.x1 + b2 * self.x2 - a1 * self.y1 - a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

// Stage-1 high shelf (head acoustics) at 16 kHz.
const HS_B0: f64 = 1.5303;
const HS_B1: f64 = -2.6906;
const HS_B2: f64 = 1.1983;
const HS_A1: f64 = -1.6636;
const HS_A2: f64 = 0.7134;

// Stage-2 high pass (100 Hz) at 16 kHz.
const HP_B0: f64 = 0.9961;
const HP_B1: f64 = -1.9922;
const HP_B2: f64 = 0.9961;
const HP_A1: f64 = -1.9921;
const HP_A2: f64 = 0.9924;

/// Integrated loudness in LUFS per BS.1770-4.
///
/// 400ms blocks with 75% overlap, absolute gate at -70 LUFS, relative gate
/// at mean - 10 LU. Empty or all-gated audio returns -70.
pub fn compute_lufs(pcm: &[f32], sample_rate: usize) -> f32 {
    if pcm.is_empty() {
        return -70.0;
    }

    // K-weighting filter chain.
    let mut hs = BiquadState::default();
    let mut hp = BiquadState::default();
    let filtered: Vec<f64> = pcm
        .iter()
        .map(|&s| {
            let y = hs.tick(s as f64, HS_B0, HS_B1, HS_B2, HS_A1, HS_A2);
            hp.tick(y, HP_B0, HP_B1, HP_B2, HP_A1, HP_A2)
        })
        .collect();

    let block_size = (0.4 * sample_rate as f64) as usize;
    let hop_size = (0.1 * sample_rate as f64) as usize;

    let mut block_ms = Vec::new();
    let mut start = 0;
    while start + block_size <= filtered.len() {
        let sum: f64 = filtered[start..start + block_size].iter().map(|v| v * v).sum();
        block_ms.push(sum / block_size as f64);
        start += hop_size;
    }

    if block_ms.is_empty() {
        // Short audio: single mean-square over whatever we have.
        let sum: f64 = filtered.iter().map(|v| v * v).sum();
        let ms = sum / filtered.len() as f64;
        return if ms > 1e-10 {
            (10.0 * ms.log10() - 0.691) as f32
        } else {
            -70.0
        };
    }

    // Absolute gate at -70 LUFS.
    let abs_threshold = 10.0f64.powf((-70.0 - 0.691) / 10.0);
    let above_abs: Vec<f64> = block_ms.iter().copied().filter(|&ms| ms >= abs_threshold).collect();
    if above_abs.is_empty() {
        return -70.0;
    }

    // Relative gate at mean - 10 LU.
    let mean_abs: f64 = above_abs.iter().sum::<f64>() / above_abs.len() as f64;
    let rel_threshold = mean_abs * 0.1;

    let mut final_sum = 0.0f64;
    let mut count = 0usize;
    for &ms in &block_ms {
        if ms >= rel_threshold {
            final_sum += ms;
            count += 1;
        }
    }
    if count == 0 {
        return -70.0;
    }
    let final_mean = final_sum / count as f64;
    if final_mean > 1e-10 {
        (10.0 * final_mean.log10() - 0.691) as f32
    } else {
        -70.0
    }
}

/// SNR in dB from separate speech and noise buffers.
pub fn compute_snr_db(speech_pcm: &[f32], noise_pcm: &[f32]) -> f32 {
    let rms = |v: &[f32]| -> f64 {
        if v.is_empty() {
            return 1e-12;
        }
        let s: f64 = v.iter().map(|&x| x as f64 * x as f64).sum();
        (s / v.len() as f64).sqrt()
    };
    let s = rms(speech_pcm);
    let n = rms(noise_pcm).max(1e-12);
    (20.0 * (s / n).log10()) as f32
}

/// Single-buffer SNR estimate: mean frame energy over the quietest 20%
/// of 10ms frame energies.
pub fn compute_snr_db_simple(pcm: &[f32], sample_rate: usize) -> f32 {
    let frame_size = sample_rate / 100;
    if pcm.len() < frame_size {
        return 20.0;
    }

    let mut frame_energy = Vec::new();
    let mut i = 0;
    while i + frame_size <= pcm.len() {
        let e: f64 = pcm[i..i + frame_size]
            .iter()
            .map(|&s| s as f64 * s as f64)
            .sum();
        frame_energy.push(e / frame_size as f64);
        i += frame_size;
    }

    frame_energy.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let noise_end = (frame_energy.len() / 5).max(1);
    let noise_e: f64 =
        frame_energy[..noise_end].iter().sum::<f64>() / noise_end as f64;
    let sig_e: f64 = frame_energy.iter().sum::<f64>() / frame_energy.len() as f64;

    (10.0 * (sig_e / noise_e.max(1e-12)).log10()) as f32
}

/// Harmonics-to-noise ratio in dB via autocorrelation at the pitch period.
///
/// Pitch outside 50-600 Hz (or degenerate input) returns the 15 dB fallback.
pub fn compute_hnr_db(pcm: &[f32], pitch_hz: f32, sample_rate: usize) -> f32 {
    if !(50.0..=600.0).contains(&pitch_hz) || pcm.is_empty() {
        return 15.0;
    }
    let t0 = (sample_rate as f64 / pitch_hz as f64).round() as usize;
    if t0 == 0 || t0 >= pcm.len() {
        return 15.0;
    }

    let n = pcm.len() - t0;
    let mut r0 = 0.0f64;
    let mut rt = 0.0f64;
    for i in 0..n {
        r0 += pcm[i] as f64 * pcm[i] as f64;
        rt += pcm[i] as f64 * pcm[i + t0] as f64;
    }
    if r0 < 1e-12 {
        return 15.0;
    }
    let ratio = (rt / r0).clamp(0.0, 0.9999);
    (10.0 * (ratio / (1.0 - ratio)).log10()) as f32
}

/// RMS energy of the buffer.
pub fn compute_rms(pcm: &[f32]) -> f32 {
    if pcm.is_empty() {
        return 0.0;
    }
    let s: f64 = pcm.iter().map(|&x| x as f64 * x as f64).sum();
    (s / pcm.len() as f64).sqrt() as f32
}

/// Standard deviation of 10ms frame RMS, a dynamic-range indicator.
pub fn compute_energy_variability(pcm: &[f32], sample_rate: usize) -> f32 {
    let frame_size = sample_rate / 100;
    if pcm.len() < frame_size {
        return 0.0;
    }
    let mut energies = Vec::new();
    let mut i = 0;
    while i + frame_size <= pcm.len() {
        let e: f64 = pcm[i..i + frame_size]
            .iter()
            .map(|&s| s as f64 * s as f64)
            .sum();
        energies.push((e / frame_size as f64).sqrt());
        i += frame_size;
    }
    let mean: f64 = energies.iter().sum::<f64>() / energies.len() as f64;
    let var: f64 =
        energies.iter().map(|e| (e - mean) * (e - mean)).sum::<f64>() / energies.len() as f64;
    var.sqrt() as f32
}

/// Clarity proxy in [0, 1]: spectral centroid of the mean linear mel
/// spectrum, normalised against 60% of the bin range.
pub fn compute_clarity(fbank_data: &[f32], num_bins: usize, num_frames: usize) -> f32 {
    if num_frames == 0 || num_bins == 0 {
        return 0.5;
    }

    let mut mean_spec = vec![0.0f64; num_bins];
    for f in 0..num_frames {
        for b in 0..num_bins {
            mean_spec[b] += fbank_data[f * num_bins + b] as f64;
        }
    }
    for v in &mut mean_spec {
        *v /= num_frames as f64;
    }

    let mut total = 0.0f64;
    let mut weighted = 0.0f64;
    for (b, &v) in mean_spec.iter().enumerate() {
        let lin = v.exp();
        total += lin;
        weighted += lin * b as f64;
    }
    if total < 1e-12 {
        return 0.5;
    }
    let centroid_bin = weighted / total;
    (centroid_bin / (num_bins as f64 * 0.6)).min(1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, seconds: f64, amp: f64) -> Vec<f32> {
        let n = (seconds * 16000.0) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / 16000.0;
                ((freq * 2.0 * PI * t).sin() * amp) as f32
            })
            .collect()
    }

    #[test]
    fn lufs_silence_floor() {
        assert!(compute_lufs(&vec![0.0f32; 16000], 16000) <= -60.0);
        assert!(compute_lufs(&[], 16000) <= -60.0);
    }

    #[test]
    fn lufs_tone_in_sane_range() {
        let lufs = compute_lufs(&sine(440.0, 2.0, 0.25), 16000);
        assert!(lufs > -40.0 && lufs < 0.0, "got {lufs}");
    }

    #[test]
    fn lufs_louder_is_higher() {
        let quiet = compute_lufs(&sine(440.0, 1.0, 0.05), 16000);
        let loud = compute_lufs(&sine(440.0, 1.0, 0.5), 16000);
        assert!(loud > quiet + 10.0, "quiet={quiet} loud={loud}");
    }

    #[test]
    fn snr_speech_vs_noise() {
        let speech = sine(300.0, 1.0, 0.5);
        let noise = sine(300.0, 1.0, 0.05);
        let snr = compute_snr_db(&speech, &noise);
        assert!((snr - 20.0).abs() < 1.0, "got {snr}");
    }

    #[test]
    fn snr_simple_flat_signal_is_low() {
        // Constant-energy signal: noise floor equals signal level.
        let snr = compute_snr_db_simple(&sine(300.0, 1.0, 0.4), 16000);
        assert!(snr < 3.0, "got {snr}");
    }

    #[test]
    fn hnr_pure_sine_is_high() {
        let hnr = compute_hnr_db(&sine(200.0, 1.0, 0.5), 200.0, 16000);
        assert!(hnr > 15.0, "got {hnr}");
    }

    #[test]
    fn hnr_out_of_range_pitch_falls_back() {
        let pcm = sine(200.0, 1.0, 0.5);
        assert_eq!(compute_hnr_db(&pcm, 0.0, 16000), 15.0);
        assert_eq!(compute_hnr_db(&pcm, 900.0, 16000), 15.0);
        assert_eq!(compute_hnr_db(&[], 200.0, 16000), 15.0);
    }

    #[test]
    fn rms_of_unit_sine() {
        let rms = compute_rms(&sine(440.0, 1.0, 1.0));
        assert!((rms - 0.707).abs() < 0.01, "got {rms}");
    }

    #[test]
    fn energy_variability_zero_for_steady_tone() {
        let v = compute_energy_variability(&sine(440.0, 1.0, 0.5), 16000);
        assert!(v < 0.02, "got {v}");
    }

    #[test]
    fn clarity_defaults_on_empty() {
        assert_eq!(compute_clarity(&[], 80, 0), 0.5);
    }
}
