//! F0 estimation (YIN), syllable rate and jitter/shimmer stability.
//!
//! YIN reference: de Cheveigne & Kawahara (2002), JASA 111(4).

/// One 10ms analysis frame: fundamental frequency and voicing probability.
#[derive(Debug, Clone, Copy)]
pub struct PitchFrame {
    /// Fundamental frequency in Hz, 0 = unvoiced.
    pub f0_hz: f32,
    /// Voicing probability in [0, 1].
    pub probability: f32,
}

/// Utterance-level pitch statistics over voiced frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct PitchSummary {
    pub mean_f0_hz: f32,
    pub std_f0_hz: f32,
    /// Fraction of frames that were voiced, in [0, 1].
    pub voiced_fraction: f32,
}

/// YIN pitch detector over full utterances.
#[derive(Debug, Clone)]
pub struct PitchAnalyzer {
    sample_rate: usize,
    min_period: usize,
    max_period: usize,
    frame_size: usize,
    threshold: f64,
}

impl Default for PitchAnalyzer {
    fn default() -> Self {
        Self::new(16000, 60.0, 600.0, 0.15)
    }
}

impl PitchAnalyzer {
    pub fn new(sample_rate: usize, min_f0: f64, max_f0: f64, threshold: f64) -> Self {
        let min_period = (sample_rate as f64 / max_f0) as usize;
        let max_period = (sample_rate as f64 / min_f0) as usize;
        Self {
            sample_rate,
            min_period,
            max_period,
            frame_size: max_period * 2,
            threshold,
        }
    }

    /// Analyzes a full utterance, producing one [`PitchFrame`] per 10ms hop.
    pub fn analyze(&self, pcm: &[f32]) -> Vec<PitchFrame> {
        let hop = self.sample_rate / 100;
        let mut result = Vec::new();
        if pcm.len() < self.frame_size {
            return result;
        }
        let mut start = 0;
        while start + self.frame_size <= pcm.len() {
            result.push(self.estimate_frame(&pcm[start..start + self.frame_size]));
            start += hop;
        }
        result
    }

    /// Mean/std F0 over voiced frames plus the voiced fraction.
    pub fn summarize(frames: &[PitchFrame]) -> PitchSummary {
        let mut s = PitchSummary::default();
        if frames.is_empty() {
            return s;
        }
        let voiced: Vec<f64> = frames
            .iter()
            .filter(|f| f.f0_hz > 0.0)
            .map(|f| f.f0_hz as f64)
            .collect();
        s.voiced_fraction = voiced.len() as f32 / frames.len() as f32;
        if voiced.is_empty() {
            return s;
        }
        let mean: f64 = voiced.iter().sum::<f64>() / voiced.len() as f64;
        let var: f64 =
            voiced.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / voiced.len() as f64;
        s.mean_f0_hz = mean as f32;
        s.std_f0_hz = var.sqrt() as f32;
        s
    }

    fn estimate_frame(&self, frame: &[f32]) -> PitchFrame {
        let n = frame.len();
        let tau_max = self.max_period.min(n / 2);

        // Difference function d(tau).
        let mut df = vec![0.0f64; tau_max + 1];
        for (tau, d) in df.iter_mut().enumerate().skip(1) {
            let limit = (n - tau).min(tau_max * 2);
            let mut acc = 0.0f64;
            for j in 0..limit {
                let diff = frame[j] as f64 - frame[j + tau] as f64;
                acc += diff * diff;
            }
            *d = acc;
        }

        // Cumulative mean normalized difference function.
        let mut cmndf = vec![1.0f64; tau_max + 1];
        let mut running_sum = 0.0f64;
        for tau in 1..=tau_max {
            running_sum += df[tau];
            cmndf[tau] = if running_sum > 0.0 {
                df[tau] * tau as f64 / running_sum
            } else {
                1.0
            };
        }

        // First dip below the threshold wins.
        let mut best_tau: Option<usize> = None;
        for tau in self.min_period..=tau_max {
            if cmndf[tau] < self.threshold {
                best_tau = Some(tau);
                break;
            }
        }

        // Fallback: global minimum, accepted only when reasonably deep.
        if best_tau.is_none() {
            let mut min_val = f64::MAX;
            let mut min_tau = 0;
            for tau in self.min_period..=tau_max {
                if cmndf[tau] < min_val {
                    min_val = cmndf[tau];
                    min_tau = tau;
                }
            }
            if min_val < 0.35 && min_tau > 0 {
                best_tau = Some(min_tau);
            }
        }

        match best_tau {
            Some(tau) if tau > 0 => PitchFrame {
                f0_hz: self.sample_rate as f32 / tau as f32,
                probability: (1.0 - cmndf[tau]).max(0.0) as f32,
            },
            _ => PitchFrame {
                f0_hz: 0.0,
                probability: 0.0,
            },
        }
    }
}

/// Estimates syllables per second from energy-envelope peaks.
///
/// 10ms RMS envelope, 5-frame moving average, then local maxima at least
/// 20% above the mean with a 50ms minimum gap count as syllable nuclei.
pub fn estimate_speaking_rate(pcm: &[f32], sample_rate: usize) -> f32 {
    let frame_size = sample_rate / 100;
    if pcm.len() < frame_size {
        return 0.0;
    }

    let mut energy = Vec::new();
    let mut i = 0;
    while i + frame_size <= pcm.len() {
        let mut e = 0.0f64;
        for &s in &pcm[i..i + frame_size] {
            e += s as f64 * s as f64;
        }
        energy.push((e / frame_size as f64).sqrt() as f32);
        i += frame_size;
    }

    let mut smooth = vec![0.0f32; energy.len()];
    for i in 0..energy.len() {
        let lo = i.saturating_sub(2);
        let hi = (i + 2).min(energy.len() - 1);
        let mut s = 0.0f32;
        for &e in &energy[lo..=hi] {
            s += e;
        }
        smooth[i] = s / (hi - lo + 1) as f32;
    }

    let mean_e: f32 = smooth.iter().sum::<f32>() / smooth.len() as f32;

    let min_gap = 5usize;
    let mut peaks = 0;
    let mut last_peak = -(min_gap as isize);
    for i in 1..smooth.len().saturating_sub(1) {
        if smooth[i] > smooth[i - 1]
            && smooth[i] > smooth[i + 1]
            && smooth[i] > mean_e * 1.2
            && i as isize - last_peak >= min_gap as isize
        {
            peaks += 1;
            last_peak = i as isize;
        }
    }

    let duration_sec = pcm.len() as f32 / sample_rate as f32;
    if duration_sec > 0.1 {
        peaks as f32 / duration_sec
    } else {
        0.0
    }
}

/// Combined jitter+shimmer stability score in [0, 1] (1 = very stable).
///
/// Jitter is the relative frame-to-frame F0 delta over voiced frames,
/// shimmer the relative frame-to-frame RMS delta; typical speech sits around
/// 0.5-2% jitter and 3-8% shimmer, hence the x10 / x5 mapping.
pub fn compute_voice_stability(
    f0_frames: &[PitchFrame],
    pcm: &[f32],
    sample_rate: usize,
) -> f32 {
    let voiced: Vec<f64> = f0_frames
        .iter()
        .filter(|f| f.f0_hz > 0.0)
        .map(|f| f.f0_hz as f64)
        .collect();

    let mut jitter = 1.0f64;
    if voiced.len() > 2 {
        let sum_diff: f64 = voiced.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
        let mean_f0: f64 = voiced.iter().sum::<f64>() / voiced.len() as f64;
        jitter = sum_diff / ((voiced.len() - 1) as f64 * mean_f0);
    }

    let hop = sample_rate / 100;
    let mut frame_rms = Vec::new();
    let mut i = 0;
    while i + hop <= pcm.len() {
        let mut e = 0.0f64;
        for &s in &pcm[i..i + hop] {
            e += s as f64 * s as f64;
        }
        frame_rms.push((e / hop as f64).sqrt());
        i += hop;
    }

    let mut shimmer = 1.0f64;
    if frame_rms.len() > 2 {
        let sum_diff: f64 = frame_rms.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
        let mean_amp: f64 = frame_rms.iter().sum::<f64>() / frame_rms.len() as f64;
        if mean_amp > 1e-6 {
            shimmer = sum_diff / ((frame_rms.len() - 1) as f64 * mean_amp);
        }
    }

    let jitter_score = (1.0 - (jitter * 10.0).min(1.0)).max(0.0);
    let shimmer_score = (1.0 - (shimmer * 5.0).min(1.0)).max(0.0);
    (0.5 * jitter_score + 0.5 * shimmer_score) as f32
}
