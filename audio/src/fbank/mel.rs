//! Triangular mel filterbank construction.

pub(crate) fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub(crate) fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10.0_f64.powf(mel / 2595.0) - 1.0)
}

/// Computes triangular mel filter weights as sparse `(fft_bin, weight)`
/// lists, one list per mel channel.
pub(crate) fn mel_filterbank(
    num_bins: usize,
    fft_size: usize,
    sample_rate: usize,
    low_freq: f64,
    high_freq: f64,
) -> Vec<Vec<(usize, f64)>> {
    let half_fft = fft_size / 2 + 1;
    let mel_low = hz_to_mel(low_freq);
    let mel_high = hz_to_mel(high_freq);

    // Equally spaced mel points, converted back to FFT bin indices.
    let bin_indices: Vec<usize> = (0..num_bins + 2)
        .map(|i| {
            let mel = mel_low + i as f64 * (mel_high - mel_low) / (num_bins + 1) as f64;
            let hz = mel_to_hz(mel);
            let bin = (hz * fft_size as f64 / sample_rate as f64).floor() as isize;
            bin.clamp(0, half_fft as isize - 1) as usize
        })
        .collect();

    let mut fb = Vec::with_capacity(num_bins);
    for m in 0..num_bins {
        let left = bin_indices[m];
        let center = bin_indices[m + 1];
        let right = bin_indices[m + 2];
        let mut filter = Vec::new();

        if center > left {
            for k in left..=center {
                filter.push((k, (k - left) as f64 / (center - left) as f64));
            }
        }
        if right > center {
            // Skip k == center when the rising slope already emitted it.
            let start = if center > left { center + 1 } else { center };
            for k in start..=right {
                filter.push((k, (right - k) as f64 / (right - center) as f64));
            }
        }
        fb.push(filter);
    }
    fb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mel_hz_roundtrip() {
        for &hz in &[0.0, 100.0, 440.0, 1000.0, 8000.0] {
            let back = mel_to_hz(hz_to_mel(hz));
            assert!((hz - back).abs() < 1e-6, "roundtrip failed for {hz}: {back}");
        }
    }

    #[test]
    fn filters_cover_expected_range() {
        let fb = mel_filterbank(80, 512, 16000, 20.0, 8000.0);
        assert_eq!(fb.len(), 80);
        // Every filter has weights in [0, 1] and stays within the half-FFT.
        for filter in &fb {
            for &(k, w) in filter {
                assert!(k < 257);
                assert!((0.0..=1.0).contains(&w));
            }
        }
        // Last filter should reach toward Nyquist.
        let max_bin = fb.last().unwrap().iter().map(|&(k, _)| k).max().unwrap();
        assert!(max_bin > 240);
    }
}
