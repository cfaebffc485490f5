//! Flag-driven voice analysis.
//!
//! One call fans out over up to nine feature blocks. Neural blocks
//! (gender/age, emotion, anti-spoof, DNSMOS, language) run only when their
//! model was found at init; DSP blocks always run. VAD output and one
//! filterbank pass are shared by every block that wants them, and each block
//! flips its bit in `features_computed` only when it actually produced a
//! result.

mod language;
mod results;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use voiceprint_audio::dsp;
use voiceprint_audio::fbank::{cmvn, compute_fbank, Fbank, FbankConfig};
use voiceprint_onnx::{ModelSession, SessionConfig};

pub use language::{language_name, language_table};
pub use results::*;

use crate::vad::VoiceActivityDetector;
use crate::{model_files, VoiceprintError};

/// Fixed anti-spoof input length: 4s at 16 kHz.
const ANTISPOOF_SAMPLES: usize = 64000;

/// Whisper-style mel geometry for the language and DNSMOS models.
const MEL_BINS: usize = 80;
const MEL_FRAMES: usize = 3000;

const SAMPLE_RATE: usize = 16000;

/// Multi-feature voice analyzer.
pub struct VoiceAnalyzer {
    vad: Option<VoiceActivityDetector>,
    gender_age: Option<ModelSession>,
    emotion: Option<ModelSession>,
    antispoof: Option<ModelSession>,
    dnsmos: Option<ModelSession>,
    language: Option<ModelSession>,
    loaded_features: u32,
    antispoof_enabled: AtomicBool,
    fbank_cfg: FbankConfig,
}

impl VoiceAnalyzer {
    /// Opens the models in `model_dir` that `feature_flags` would use.
    ///
    /// Missing optional models disable their feature and are logged; a
    /// missing VAD degrades the speech/noise split but never fails init.
    pub fn new(model_dir: impl AsRef<Path>, feature_flags: u32, cfg: &SessionConfig) -> Self {
        let model_dir = model_dir.as_ref();

        let vad = match VoiceActivityDetector::load(model_dir.join(model_files::VAD)) {
            Ok(vad) => Some(vad),
            Err(e) => {
                warn!(error = %e, "VAD unavailable for analysis, continuing without");
                None
            }
        };

        let mut loaded = 0u32;
        let mut try_load = |wanted: u32, file: &str| -> Option<ModelSession> {
            if feature_flags & wanted == 0 {
                return None;
            }
            let path = model_dir.join(file);
            if !path.exists() {
                warn!(path = %path.display(), "optional model not found (feature disabled)");
                return None;
            }
            match ModelSession::load(&path, cfg) {
                Ok(session) => {
                    loaded |= wanted;
                    Some(session)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load model");
                    None
                }
            }
        };

        let gender_age = try_load(flags::GENDER | flags::AGE, model_files::GENDER_AGE);
        let emotion = try_load(flags::EMOTION, model_files::EMOTION);
        let antispoof = try_load(flags::ANTISPOOF, model_files::ANTISPOOF);
        let dnsmos = try_load(flags::QUALITY, model_files::DNSMOS);
        let language = try_load(flags::LANGUAGE, model_files::LANGUAGE);

        // Quality DSP works without DNSMOS (MOS gets estimated), and the
        // pure-DSP features have no model to miss.
        if feature_flags & flags::QUALITY != 0 {
            loaded |= flags::QUALITY;
        }
        if feature_flags & flags::VOICE_FEATS != 0 {
            loaded |= flags::VOICE_FEATS;
        }
        if feature_flags & flags::PLEASANTNESS != 0 {
            loaded |= flags::PLEASANTNESS;
        }
        if feature_flags & flags::VOICE_STATE != 0 {
            loaded |= flags::VOICE_STATE;
        }

        info!("voice analyzer initialized, loaded_features={loaded:#05x}");

        Self {
            vad,
            gender_age,
            emotion,
            antispoof,
            dnsmos,
            language,
            loaded_features: loaded,
            antispoof_enabled: AtomicBool::new(true),
            fbank_cfg: FbankConfig::default(),
        }
    }

    /// Bitmask of features whose backing (model or DSP) is available.
    pub fn loaded_features(&self) -> u32 {
        self.loaded_features
    }

    /// Runtime gate for the anti-spoof block.
    pub fn set_antispoof_enabled(&self, enabled: bool) {
        self.antispoof_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Analyzes 16 kHz mono PCM for every requested feature.
    ///
    /// Derived features pull in their prerequisites transparently:
    /// PLEASANTNESS and VOICE_STATE add QUALITY and VOICE_FEATS. Features
    /// whose model is missing (or whose inference failed) are skipped with
    /// their bit cleared; the call itself still succeeds.
    pub fn analyze(&self, pcm: &[f32], feature_flags: u32) -> Result<AnalysisResult, VoiceprintError> {
        if pcm.is_empty() {
            return Err(VoiceprintError::InvalidParam("empty audio".into()));
        }

        let mut requested = feature_flags & flags::ALL;
        if requested & (flags::PLEASANTNESS | flags::VOICE_STATE) != 0 {
            requested |= flags::QUALITY | flags::VOICE_FEATS;
        }

        let mut out = AnalysisResult::default();

        // Speech/noise split. VAD trouble degrades to "everything is
        // speech" rather than failing the call.
        let (speech_pcm, noise_pcm) = self.split_speech_noise(pcm);

        // One filterbank pass shared by every block that consumes [1,T,80].
        const FBANK_USERS: u32 = flags::GENDER
            | flags::AGE
            | flags::EMOTION
            | flags::QUALITY
            | flags::VOICE_FEATS
            | flags::PLEASANTNESS
            | flags::VOICE_STATE;
        let fbank = if requested & FBANK_USERS != 0 {
            let mut fb = compute_fbank(&speech_pcm, &self.fbank_cfg);
            cmvn(&mut fb);
            fb
        } else {
            Fbank::default()
        };
        let fbank_ok = !fbank.is_empty();

        let mut computed = 0u32;

        if requested & (flags::GENDER | flags::AGE) != 0 && fbank_ok && self.gender_age.is_some() {
            match self.analyze_gender_age(&fbank) {
                Ok((gender, age)) => {
                    out.gender = gender;
                    out.age = age;
                    computed |= flags::GENDER | flags::AGE;
                }
                Err(e) => warn!(error = %e, "gender/age analysis skipped"),
            }
        }

        if requested & flags::EMOTION != 0 && fbank_ok && self.emotion.is_some() {
            match self.analyze_emotion(&fbank) {
                Ok(emotion) => {
                    out.emotion = emotion;
                    computed |= flags::EMOTION;
                }
                Err(e) => warn!(error = %e, "emotion analysis skipped"),
            }
        }

        if requested & flags::ANTISPOOF != 0
            && self.antispoof.is_some()
            && self.antispoof_enabled.load(Ordering::Relaxed)
        {
            match self.analyze_antispoof(pcm) {
                Ok(antispoof) => {
                    out.antispoof = antispoof;
                    computed |= flags::ANTISPOOF;
                }
                Err(e) => warn!(error = %e, "anti-spoof analysis skipped"),
            }
        }

        if requested & flags::VOICE_FEATS != 0 && fbank_ok {
            out.voice_features = analyze_voice_features(&speech_pcm, &fbank);
            computed |= flags::VOICE_FEATS;
        }

        if requested & flags::QUALITY != 0 && fbank_ok {
            out.quality = self.analyze_quality(
                &speech_pcm,
                &noise_pcm,
                &fbank,
                out.voice_features.pitch_hz,
            );
            computed |= flags::QUALITY;
        }

        if requested & flags::PLEASANTNESS != 0 && fbank_ok {
            let emo = (computed & flags::EMOTION != 0).then_some(&out.emotion);
            out.pleasantness = analyze_pleasantness(&out.quality, &out.voice_features, emo);
            computed |= flags::PLEASANTNESS;
        }

        if requested & flags::VOICE_STATE != 0 && fbank_ok {
            let emo = (computed & flags::EMOTION != 0).then_some(&out.emotion);
            out.voice_state = analyze_voice_state(&out.quality, &out.voice_features, emo);
            computed |= flags::VOICE_STATE;
        }

        if requested & flags::LANGUAGE != 0 && self.language.is_some() {
            match self.analyze_language(pcm) {
                Ok(language) => {
                    out.language = language;
                    computed |= flags::LANGUAGE;
                }
                Err(e) => warn!(error = %e, "language analysis skipped"),
            }
        }

        out.features_computed = computed;
        Ok(out)
    }

    /// Splits the buffer into concatenated speech and residual noise using
    /// VAD segments. No VAD, VAD failure or zero detected speech all fall
    /// back to "the whole buffer is speech".
    fn split_speech_noise(&self, pcm: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let segments = match &self.vad {
            Some(vad) => match vad.detect(pcm) {
                Ok(segments) => segments,
                Err(e) => {
                    warn!(error = %e, "VAD failed, analyzing full buffer");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if segments.is_empty() {
            return (pcm.to_vec(), Vec::new());
        }

        let mut is_speech = vec![false; pcm.len()];
        let mut speech = Vec::new();
        for seg in &segments {
            let end = seg.end_sample.min(pcm.len());
            speech.extend_from_slice(&pcm[seg.start_sample..end]);
            for flag in &mut is_speech[seg.start_sample..end] {
                *flag = true;
            }
        }
        let noise: Vec<f32> = pcm
            .iter()
            .zip(is_speech.iter())
            .filter(|&(_, &s)| !s)
            .map(|(&v, _)| v)
            .collect();

        if speech.is_empty() {
            (pcm.to_vec(), noise)
        } else {
            (speech, noise)
        }
    }

    /// gender_age.onnx: `[1,T,80]` -> 3 gender logits + 4 age-group logits
    /// + optional age-regression scalar.
    fn analyze_gender_age(&self, fbank: &Fbank) -> Result<(GenderResult, AgeResult), VoiceprintError> {
        let model = self.gender_age.as_ref().unwrap();
        let shape = [1i64, fbank.num_frames as i64, fbank.num_bins as i64];
        let raw = model.run(&fbank.data, &shape)?;
        if raw.len() < 7 {
            return Err(VoiceprintError::Inference(format!(
                "gender_age model returned {} values, need 7",
                raw.len()
            )));
        }

        let mut g_scores = [raw[0], raw[1], raw[2]];
        softmax(&mut g_scores);
        let g_idx = argmax(&g_scores);
        let gender = GenderResult {
            gender: match g_idx {
                1 => Gender::Male,
                2 => Gender::Child,
                _ => Gender::Female,
            },
            scores: g_scores,
        };

        let mut a_scores = [raw[3], raw[4], raw[5], raw[6]];
        softmax(&mut a_scores);
        let a_idx = argmax(&a_scores);
        let age_group = AgeGroup::from_index(a_idx);
        let age_years = if raw.len() >= 8 {
            (raw[7].round() as i32).clamp(0, 100)
        } else {
            age_group.midpoint_years()
        };

        let age = AgeResult {
            age_years,
            age_group,
            confidence: a_scores[a_idx],
            group_scores: a_scores,
        };
        Ok((gender, age))
    }

    /// emotion.onnx: `[1,T,80]` -> 8 emotion logits + optional valence and
    /// arousal.
    fn analyze_emotion(&self, fbank: &Fbank) -> Result<EmotionResult, VoiceprintError> {
        let model = self.emotion.as_ref().unwrap();
        let shape = [1i64, fbank.num_frames as i64, fbank.num_bins as i64];
        let raw = model.run(&fbank.data, &shape)?;
        if raw.len() < EMOTION_COUNT {
            return Err(VoiceprintError::Inference(format!(
                "emotion model returned {} values, need {EMOTION_COUNT}",
                raw.len()
            )));
        }

        let mut scores = [0.0f32; EMOTION_COUNT];
        scores.copy_from_slice(&raw[..EMOTION_COUNT]);
        softmax(&mut scores);
        let idx = argmax(&scores);
        let emotion = Emotion::from_index(idx);

        // Dimensional head when present, per-class lookup otherwise.
        let (valence, arousal) = if raw.len() > EMOTION_COUNT + 1 {
            (
                raw[EMOTION_COUNT].tanh().clamp(-1.0, 1.0),
                raw[EMOTION_COUNT + 1].tanh().clamp(-1.0, 1.0),
            )
        } else {
            emotion.valence_arousal()
        };

        Ok(EmotionResult {
            emotion,
            scores,
            valence,
            arousal,
        })
    }

    /// antispoof.onnx: raw waveform `[1,64000]` (truncated or right-padded)
    /// -> `[spoof_logit, genuine_logit]`.
    fn analyze_antispoof(&self, pcm: &[f32]) -> Result<AntiSpoofResult, VoiceprintError> {
        let model = self.antispoof.as_ref().unwrap();

        let mut input = vec![0.0f32; ANTISPOOF_SAMPLES];
        let copy_len = pcm.len().min(ANTISPOOF_SAMPLES);
        input[..copy_len].copy_from_slice(&pcm[..copy_len]);

        let raw = model.run(&input, &[1, ANTISPOOF_SAMPLES as i64])?;
        if raw.len() < 2 {
            return Err(VoiceprintError::Inference(
                "antispoof model returned fewer than 2 values".into(),
            ));
        }

        let mut scores = [raw[0], raw[1]];
        softmax(&mut scores);
        Ok(AntiSpoofResult {
            is_genuine: scores[1] >= 0.5,
            genuine_score: scores[1],
            spoof_score: scores[0],
        })
    }

    /// Quality block: DSP metrics plus DNSMOS when the model is loaded.
    fn analyze_quality(
        &self,
        speech_pcm: &[f32],
        noise_pcm: &[f32],
        fbank: &Fbank,
        pitch_hz: f32,
    ) -> QualityResult {
        let snr_db = if noise_pcm.is_empty() {
            dsp::compute_snr_db_simple(speech_pcm, SAMPLE_RATE)
        } else {
            dsp::compute_snr_db(speech_pcm, noise_pcm)
        };

        let loudness_lufs = dsp::compute_lufs(speech_pcm, SAMPLE_RATE);
        let hnr_db = dsp::compute_hnr_db(speech_pcm, pitch_hz, SAMPLE_RATE);
        let clarity = dsp::compute_clarity(&fbank.data, fbank.num_bins, fbank.num_frames);
        let noise_level = (1.0 - (snr_db.clamp(-10.0, 40.0) + 10.0) / 50.0).clamp(0.0, 1.0);

        let mos_score = match &self.dnsmos {
            Some(model) => {
                let input = transpose_pad(fbank, MEL_FRAMES);
                match model.run(&input, &[1, MEL_BINS as i64, MEL_FRAMES as i64]) {
                    // [SIG, BAK, OVR]: take the overall score when present.
                    Ok(raw) if raw.len() >= 3 => raw[2].clamp(1.0, 5.0),
                    Ok(raw) if !raw.is_empty() => raw[0].clamp(1.0, 5.0),
                    Ok(_) => estimate_mos(snr_db, hnr_db),
                    Err(e) => {
                        warn!(error = %e, "DNSMOS inference failed, estimating MOS");
                        estimate_mos(snr_db, hnr_db)
                    }
                }
            }
            None => estimate_mos(snr_db, hnr_db),
        };

        QualityResult {
            mos_score,
            snr_db,
            clarity,
            noise_level,
            loudness_lufs,
            hnr_db,
        }
    }

    /// language.onnx: Whisper-style mel `[1,80,3000]` of the raw PCM ->
    /// language logits.
    fn analyze_language(&self, pcm: &[f32]) -> Result<LanguageResult, VoiceprintError> {
        let model = self.language.as_ref().unwrap();

        let mut fbank = compute_fbank(pcm, &self.fbank_cfg);
        cmvn(&mut fbank);
        let input = transpose_pad(&fbank, MEL_FRAMES);

        let raw = model.run(&input, &[1, MEL_BINS as i64, MEL_FRAMES as i64])?;
        if raw.is_empty() {
            return Err(VoiceprintError::Inference(
                "language model returned empty output".into(),
            ));
        }

        let idx = argmax(&raw);
        let mut probs = raw;
        softmax(&mut probs);

        let (code, name) = language::language_for_index(idx);
        let accent_region = language::accent_region_for(&code, &name);
        Ok(LanguageResult {
            language: code,
            language_name: name,
            confidence: probs[idx],
            accent_score: 0.0,
            accent_region,
        })
    }
}

/// Pure-DSP acoustic features over the speech PCM and shared filterbank.
fn analyze_voice_features(speech_pcm: &[f32], fbank: &Fbank) -> VoiceFeatures {
    let analyzer = dsp::PitchAnalyzer::default();
    let f0_frames = analyzer.analyze(speech_pcm);
    let summary = dsp::PitchAnalyzer::summarize(&f0_frames);

    VoiceFeatures {
        pitch_hz: summary.mean_f0_hz,
        pitch_variability: summary.std_f0_hz,
        speaking_rate: dsp::estimate_speaking_rate(speech_pcm, SAMPLE_RATE),
        voice_stability: dsp::compute_voice_stability(&f0_frames, speech_pcm, SAMPLE_RATE),
        breathiness: dsp::compute_breathiness(&fbank.data, fbank.num_bins, fbank.num_frames),
        resonance_score: dsp::compute_resonance_score(&fbank.data, fbank.num_bins, fbank.num_frames),
        energy_mean: dsp::compute_rms(speech_pcm),
        energy_variability: dsp::compute_energy_variability(speech_pcm, SAMPLE_RATE),
    }
}

/// Weighted combination of quality and voice features into pleasantness
/// scores on a 0-100 scale.
fn analyze_pleasantness(
    q: &QualityResult,
    vf: &VoiceFeatures,
    emo: Option<&EmotionResult>,
) -> PleasantnessResult {
    // Magnetism: pitch near a typical male (130 Hz) or female (210 Hz)
    // center, stability, resonance.
    let pitch_score = if vf.pitch_hz > 0.0 {
        let male = (1.0 - (vf.pitch_hz - 130.0).abs() / 100.0).clamp(0.0, 1.0);
        let female = (1.0 - (vf.pitch_hz - 210.0).abs() / 100.0).clamp(0.0, 1.0);
        male.max(female)
    } else {
        0.5
    };
    let magnetism = ((0.40 * pitch_score + 0.35 * vf.voice_stability + 0.25 * vf.resonance_score)
        * 100.0)
        .clamp(0.0, 100.0);

    // Warmth: positive valence, moderate rate, low breathiness.
    let valence_norm = emo
        .map(|e| ((e.valence + 1.0) / 2.0).clamp(0.0, 1.0))
        .unwrap_or(0.5);
    let rate_score = (1.0 - (vf.speaking_rate - 4.0).abs() / 4.0).clamp(0.0, 1.0);
    let warmth = ((0.50 * valence_norm + 0.30 * rate_score + 0.20 * (1.0 - vf.breathiness))
        * 100.0)
        .clamp(0.0, 100.0);

    let authority = ((0.40 * vf.voice_stability
        + 0.35 * vf.resonance_score
        + 0.25 * (1.0 - vf.breathiness))
        * 100.0)
        .clamp(0.0, 100.0);

    let mos_norm = ((q.mos_score - 1.0) / 4.0).clamp(0.0, 1.0);
    let snr_norm = ((q.snr_db + 5.0) / 40.0).clamp(0.0, 1.0);
    let clarity_score =
        ((0.50 * mos_norm + 0.30 * snr_norm + 0.20 * q.clarity) * 100.0).clamp(0.0, 100.0);

    let overall_score = (0.30 * magnetism + 0.25 * warmth + 0.20 * authority
        + 0.25 * clarity_score)
        .clamp(0.0, 100.0);

    PleasantnessResult {
        overall_score,
        magnetism,
        warmth,
        authority,
        clarity_score,
    }
}

/// Rule-based fatigue / vocal-health / stress assessment.
fn analyze_voice_state(
    q: &QualityResult,
    vf: &VoiceFeatures,
    emo: Option<&EmotionResult>,
) -> VoiceStateResult {
    let mut fatigue = 0.0f32;
    if vf.pitch_hz > 0.0 && vf.pitch_hz < 100.0 {
        fatigue += 0.25;
    }
    if vf.speaking_rate < 2.5 {
        fatigue += 0.25;
    }
    if vf.energy_mean < 0.02 {
        fatigue += 0.25;
    }
    if vf.voice_stability < 0.4 {
        fatigue += 0.25;
    }
    let fatigue_score = fatigue.clamp(0.0, 1.0);
    let fatigue_level = if fatigue > 0.70 {
        FatigueLevel::High
    } else if fatigue > 0.35 {
        FatigueLevel::Moderate
    } else {
        FatigueLevel::Normal
    };

    let health_state = if vf.breathiness > 0.7 && q.hnr_db < 5.0 {
        HealthState::Hoarse
    } else if vf.breathiness > 0.65 {
        HealthState::Breathy
    } else if vf.resonance_score > 0.75 && vf.pitch_variability < 20.0 {
        HealthState::Nasal
    } else {
        HealthState::Normal
    };
    let health_score = (0.5 * (1.0 - vf.breathiness)
        + 0.5 * ((q.hnr_db + 5.0) / 30.0).clamp(0.0, 1.0))
    .clamp(0.0, 1.0);

    let mut stress = 0.0f32;
    if vf.pitch_hz > 220.0 && vf.pitch_variability > 40.0 {
        stress += 0.30;
    }
    if vf.speaking_rate > 6.0 {
        stress += 0.25;
    }
    if emo.map(|e| e.arousal > 0.5).unwrap_or(false) {
        stress += 0.25;
    }
    if vf.energy_variability > 0.1 {
        stress += 0.20;
    }
    let stress_score = stress.clamp(0.0, 1.0);
    let stress_level = if stress > 0.65 {
        StressLevel::High
    } else if stress > 0.30 {
        StressLevel::Medium
    } else {
        StressLevel::Low
    };

    VoiceStateResult {
        fatigue_level,
        health_state,
        stress_level,
        fatigue_score,
        stress_score,
        health_score,
    }
}

/// MOS estimate from SNR and HNR when DNSMOS is unavailable: good SNR
/// (30+) lands near 4.5, poor (<5) near 2.
fn estimate_mos(snr_db: f32, hnr_db: f32) -> f32 {
    let snr_score = ((snr_db + 5.0) / 40.0).clamp(0.0, 1.0);
    let hnr_score = ((hnr_db + 5.0) / 30.0).clamp(0.0, 1.0);
    1.0 + 3.5 * (0.6 * snr_score + 0.4 * hnr_score)
}

/// Repacks a row-major `[T,bins]` matrix as `[bins,target_frames]`,
/// truncating or zero-padding the frame axis.
fn transpose_pad(fbank: &Fbank, target_frames: usize) -> Vec<f32> {
    let bins = if fbank.num_bins > 0 { fbank.num_bins } else { MEL_BINS };
    let mut out = vec![0.0f32; bins * target_frames];
    let copy_frames = fbank.num_frames.min(target_frames);
    for t in 0..copy_frames {
        for b in 0..bins {
            out[b * target_frames + t] = fbank.data[t * bins + b];
        }
    }
    out
}

fn softmax(x: &mut [f32]) {
    if x.is_empty() {
        return;
    }
    let max = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for v in x.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 1e-8 {
        for v in x.iter_mut() {
            *v /= sum;
        }
    }
}

fn argmax(x: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in x.iter().enumerate() {
        if v > x[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality(mos: f32, snr: f32, hnr: f32, clarity: f32) -> QualityResult {
        QualityResult {
            mos_score: mos,
            snr_db: snr,
            clarity,
            noise_level: 0.0,
            loudness_lufs: -20.0,
            hnr_db: hnr,
        }
    }

    fn features(pitch: f32, rate: f32, stability: f32, breathiness: f32) -> VoiceFeatures {
        VoiceFeatures {
            pitch_hz: pitch,
            pitch_variability: 10.0,
            speaking_rate: rate,
            voice_stability: stability,
            resonance_score: 0.5,
            breathiness,
            energy_mean: 0.1,
            energy_variability: 0.02,
        }
    }

    #[test]
    fn softmax_sums_to_one() {
        let mut x = [1.0f32, 2.0, 3.0];
        softmax(&mut x);
        let sum: f32 = x.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(x[2] > x[1] && x[1] > x[0]);
    }

    #[test]
    fn softmax_is_shift_invariant() {
        let mut a = [100.0f32, 101.0];
        let mut b = [0.0f32, 1.0];
        softmax(&mut a);
        softmax(&mut b);
        assert!((a[0] - b[0]).abs() < 1e-6);
    }

    #[test]
    fn argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.5, 0.5, 0.1]), 0);
        assert_eq!(argmax(&[0.1, 0.9, 0.3]), 1);
    }

    #[test]
    fn mos_estimate_tracks_snr() {
        let poor = estimate_mos(0.0, 5.0);
        let good = estimate_mos(35.0, 25.0);
        assert!(poor < good);
        assert!((1.0..=4.5).contains(&poor));
        assert!(good <= 4.5);
    }

    #[test]
    fn transpose_pad_layout() {
        let fbank = Fbank {
            num_frames: 2,
            num_bins: 3,
            // frame 0: [1,2,3], frame 1: [4,5,6]
            data: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        };
        let out = transpose_pad(&fbank, 4);
        assert_eq!(out.len(), 3 * 4);
        // bin 0 row: frames [1,4,0,0]
        assert_eq!(&out[0..4], &[1.0, 4.0, 0.0, 0.0]);
        // bin 2 row: frames [3,6,0,0]
        assert_eq!(&out[8..12], &[3.0, 6.0, 0.0, 0.0]);
    }

    #[test]
    fn transpose_pad_truncates() {
        let fbank = Fbank {
            num_frames: 3,
            num_bins: 1,
            data: vec![1.0, 2.0, 3.0],
        };
        let out = transpose_pad(&fbank, 2);
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn pleasantness_prefers_stable_typical_pitch() {
        let q = quality(4.0, 25.0, 20.0, 0.7);
        let good = analyze_pleasantness(&q, &features(130.0, 4.0, 0.9, 0.1), None);
        let bad = analyze_pleasantness(&q, &features(400.0, 9.0, 0.2, 0.9), None);
        assert!(good.overall_score > bad.overall_score);
        assert!(good.magnetism > bad.magnetism);
        assert!((0.0..=100.0).contains(&good.overall_score));
    }

    #[test]
    fn pleasantness_neutral_valence_without_emotion() {
        let q = quality(3.0, 15.0, 10.0, 0.5);
        let vf = features(200.0, 4.0, 0.7, 0.3);
        let without = analyze_pleasantness(&q, &vf, None);
        let with_pos = analyze_pleasantness(
            &q,
            &vf,
            Some(&EmotionResult {
                valence: 1.0,
                ..Default::default()
            }),
        );
        assert!(with_pos.warmth > without.warmth);
    }

    #[test]
    fn voice_state_flags_fatigue() {
        let q = quality(3.0, 15.0, 10.0, 0.5);
        // Low pitch, slow rate, quiet, unstable: all four fatigue cues.
        let tired = VoiceFeatures {
            pitch_hz: 90.0,
            speaking_rate: 1.5,
            energy_mean: 0.01,
            voice_stability: 0.2,
            ..features(90.0, 1.5, 0.2, 0.3)
        };
        let state = analyze_voice_state(&q, &tired, None);
        assert_eq!(state.fatigue_level, FatigueLevel::High);
        assert!((state.fatigue_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn voice_state_hoarse_needs_low_hnr() {
        let vf = features(150.0, 4.0, 0.8, 0.8);
        let hoarse = analyze_voice_state(&quality(3.0, 15.0, 2.0, 0.5), &vf, None);
        assert_eq!(hoarse.health_state, HealthState::Hoarse);
        let breathy = analyze_voice_state(&quality(3.0, 15.0, 20.0, 0.5), &vf, None);
        assert_eq!(breathy.health_state, HealthState::Breathy);
    }

    #[test]
    fn voice_state_stress_uses_arousal() {
        let q = quality(3.0, 15.0, 10.0, 0.5);
        let vf = VoiceFeatures {
            pitch_hz: 260.0,
            pitch_variability: 60.0,
            speaking_rate: 7.0,
            energy_variability: 0.2,
            ..features(260.0, 7.0, 0.7, 0.3)
        };
        let excited = EmotionResult {
            arousal: 0.9,
            ..Default::default()
        };
        let state = analyze_voice_state(&q, &vf, Some(&excited));
        assert_eq!(state.stress_level, StressLevel::High);
        assert!((state.stress_score - 1.0).abs() < 1e-6);
    }
}
