//! Breathiness and resonance estimates over the log-mel matrix.

/// Breathiness index in [0, 1] from high-band frame-to-frame variability.
///
/// Looks at the top mel bins (roughly 3-8 kHz at 16 kHz / 80 bins) and
/// relates frame-to-frame irregularity to total high-band energy. Matrices
/// too small to judge return the 0.3 neutral value.
pub fn compute_breathiness(fbank_data: &[f32], num_bins: usize, num_frames: usize) -> f32 {
    if num_frames == 0 || num_bins < 40 {
        return 0.3;
    }
    let hf_start = num_bins * 65 / 80;

    let mut hf_total = 0.0f64;
    let mut hf_irregular = 0.0f64;
    for f in 1..num_frames {
        for b in hf_start..num_bins {
            let cur = fbank_data[f * num_bins + b] as f64;
            let prev = fbank_data[(f - 1) * num_bins + b] as f64;
            hf_total += cur.abs();
            hf_irregular += (cur - prev).abs();
        }
    }
    if hf_total < 1e-10 {
        return 0.3;
    }
    ((hf_irregular / (hf_total * 2.0)) as f32).min(1.0)
}

/// Resonance score in [0, 1]: fraction of linear-domain energy in the
/// 1-4 kHz mel band (bins 40-65 of 80), scaled by 2.5. Matrices too small
/// to judge return the 0.4 neutral value.
pub fn compute_resonance_score(fbank_data: &[f32], num_bins: usize, num_frames: usize) -> f32 {
    if num_frames == 0 || num_bins < 40 {
        return 0.4;
    }
    let mid_start = num_bins * 40 / 80;
    let mid_end = num_bins * 65 / 80;

    let mut mid = 0.0f64;
    let mut total = 0.0f64;
    for f in 0..num_frames {
        for b in 0..num_bins {
            let v = (fbank_data[f * num_bins + b] as f64).exp();
            total += v;
            if (mid_start..mid_end).contains(&b) {
                mid += v;
            }
        }
    }
    if total < 1e-12 {
        return 0.4;
    }
    ((mid / total * 2.5) as f32).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fbank::{compute_fbank, FbankConfig};
    use std::f64::consts::PI;

    fn sine_fbank(freq: f64) -> crate::fbank::Fbank {
        let pcm: Vec<f32> = (0..16000)
            .map(|i| {
                let t = i as f64 / 16000.0;
                ((freq * 2.0 * PI * t).sin() * 0.5) as f32
            })
            .collect();
        compute_fbank(&pcm, &FbankConfig::default())
    }

    #[test]
    fn neutral_values_on_degenerate_input() {
        assert_eq!(compute_breathiness(&[], 80, 0), 0.3);
        assert_eq!(compute_resonance_score(&[], 80, 0), 0.4);
        assert_eq!(compute_breathiness(&[], 20, 5), 0.3);
        assert_eq!(compute_resonance_score(&[], 20, 5), 0.4);
    }

    #[test]
    fn steady_tone_has_low_breathiness() {
        let fb = sine_fbank(300.0);
        let b = compute_breathiness(&fb.data, fb.num_bins, fb.num_frames);
        assert!(b < 0.5, "got {b}");
    }

    #[test]
    fn midband_tone_scores_resonant() {
        // 2 kHz sits inside the 1-4 kHz resonance band.
        let mid = sine_fbank(2000.0);
        let low = sine_fbank(150.0);
        let r_mid = compute_resonance_score(&mid.data, mid.num_bins, mid.num_frames);
        let r_low = compute_resonance_score(&low.data, low.num_bins, low.num_frames);
        assert!(r_mid > r_low, "mid {r_mid} vs low {r_low}");
    }

    #[test]
    fn scores_stay_in_unit_range() {
        let fb = sine_fbank(1000.0);
        let b = compute_breathiness(&fb.data, fb.num_bins, fb.num_frames);
        let r = compute_resonance_score(&fb.data, fb.num_bins, fb.num_frames);
        assert!((0.0..=1.0).contains(&b));
        assert!((0.0..=1.0).contains(&r));
    }
}
