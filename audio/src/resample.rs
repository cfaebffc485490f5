//! Linear-interpolation sample rate conversion.

/// Resamples `input` from `src_rate` to `dst_rate` by linear interpolation.
/// Same-rate input is returned unchanged.
pub fn resample(input: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || input.is_empty() {
        return input.to_vec();
    }

    let ratio = dst_rate as f64 / src_rate as f64;
    let out_len = (input.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < input.len() {
            input[idx] as f64 * (1.0 - frac) + input[idx + 1] as f64 * frac
        } else if idx < input.len() {
            input[idx] as f64
        } else {
            0.0
        };
        output.push(sample as f32);
    }

    output
}

/// Resamples to the engine's 16 kHz working rate.
pub fn to_engine_rate(input: &[f32], src_rate: u32) -> Vec<f32> {
    resample(input, src_rate, crate::SAMPLE_RATE as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_passthrough() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&input, 16000, 16000), input);
    }

    #[test]
    fn downsample_halves_length() {
        let input: Vec<f32> = (0..32000).map(|i| (i % 100) as f32 * 0.01).collect();
        let out = resample(&input, 32000, 16000);
        assert_eq!(out.len(), 16000);
    }

    #[test]
    fn upsample_doubles_length() {
        let input: Vec<f32> = (0..8000).map(|i| (i % 7) as f32 * 0.1).collect();
        let out = resample(&input, 8000, 16000);
        assert_eq!(out.len(), 16000);
    }

    #[test]
    fn interpolation_is_monotone_on_ramp() {
        let input: Vec<f32> = (0..100).map(|i| i as f32).collect();
        let out = resample(&input, 100, 200);
        for pair in out.windows(2).take(out.len() - 3) {
            assert!(pair[1] >= pair[0], "ramp must stay monotone");
        }
    }

    #[test]
    fn preserves_sine_frequency() {
        // A 440Hz tone at 48kHz resampled to 16kHz should still cross zero
        // ~880 times per second.
        let src_rate = 48000u32;
        let input: Vec<f32> = (0..src_rate)
            .map(|i| {
                let t = i as f64 / src_rate as f64;
                (440.0 * 2.0 * std::f64::consts::PI * t).sin() as f32
            })
            .collect();
        let out = to_engine_rate(&input, src_rate);
        let crossings = out
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        assert!((crossings as i64 - 880).abs() <= 4, "got {crossings} crossings");
    }
}
