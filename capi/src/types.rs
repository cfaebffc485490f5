//! POD result records, feature flags and return codes of the C surface.
//!
//! Every struct is `#[repr(C)]`, fixed-size and free of indirections, with
//! reserved tail fields for ABI headroom. Strings are NUL-terminated char
//! arrays; copies that do not fit are truncated but always keep the NUL.

use std::os::raw::{c_char, c_int, c_uint};

use voiceprint::analyzer as core;
use voiceprint::DiarizeSegment;

// Feature flags for vp_analyze() / vp_init_analyzer().
pub const VP_FEATURE_GENDER: c_uint = 0x001;
pub const VP_FEATURE_AGE: c_uint = 0x002;
pub const VP_FEATURE_EMOTION: c_uint = 0x004;
pub const VP_FEATURE_ANTISPOOF: c_uint = 0x008;
pub const VP_FEATURE_QUALITY: c_uint = 0x010;
pub const VP_FEATURE_VOICE_FEATS: c_uint = 0x020;
pub const VP_FEATURE_PLEASANTNESS: c_uint = 0x040;
pub const VP_FEATURE_VOICE_STATE: c_uint = 0x080;
pub const VP_FEATURE_LANGUAGE: c_uint = 0x100;
pub const VP_FEATURE_ALL: c_uint = 0x1FF;

// Return codes. 0 = success, the rest are negative.
pub const VP_OK: c_int = 0;
pub const VP_ERROR_UNKNOWN: c_int = -1;
pub const VP_ERROR_INVALID_PARAM: c_int = -2;
pub const VP_ERROR_NOT_INIT: c_int = -3;
pub const VP_ERROR_ALREADY_INIT: c_int = -4;
pub const VP_ERROR_MODEL_LOAD: c_int = -5;
pub const VP_ERROR_AUDIO_TOO_SHORT: c_int = -6;
pub const VP_ERROR_AUDIO_INVALID: c_int = -7;
pub const VP_ERROR_SPEAKER_EXISTS: c_int = -8;
pub const VP_ERROR_SPEAKER_NOT_FOUND: c_int = -9;
pub const VP_ERROR_DB_ERROR: c_int = -10;
pub const VP_ERROR_FILE_NOT_FOUND: c_int = -11;
pub const VP_ERROR_BUFFER_TOO_SMALL: c_int = -12;
pub const VP_ERROR_NO_MATCH: c_int = -13;
pub const VP_ERROR_WAV_FORMAT: c_int = -14;
pub const VP_ERROR_INFERENCE: c_int = -15;
pub const VP_ERROR_MODEL_NOT_AVAILABLE: c_int = -16;
pub const VP_ERROR_ANALYSIS_FAILED: c_int = -17;
pub const VP_ERROR_DIARIZE_FAILED: c_int = -18;

/// Gender recognition result.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpGenderResult {
    /// 0 = female, 1 = male, 2 = child.
    pub gender: c_int,
    /// Softmax scores: [female, male, child].
    pub scores: [f32; 3],
    pub reserved: [c_int; 2],
}

/// Age estimation result.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpAgeResult {
    pub age_years: c_int,
    /// 0 = child, 1 = teen, 2 = adult, 3 = elder.
    pub age_group: c_int,
    pub confidence: f32,
    pub group_scores: [f32; 4],
    pub reserved: [c_int; 2],
}

/// Emotion recognition result.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpEmotionResult {
    /// Dominant emotion id, see vp_emotion_name().
    pub emotion_id: c_int,
    pub scores: [f32; 8],
    /// [-1, 1] negative -> positive.
    pub valence: f32,
    /// [-1, 1] calm -> excited.
    pub arousal: f32,
    pub reserved: [c_int; 2],
}

/// Anti-spoofing / liveness result.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpAntiSpoofResult {
    /// 1 = real speaker, 0 = spoof (recording/TTS).
    pub is_genuine: c_int,
    pub genuine_score: f32,
    pub spoof_score: f32,
    pub reserved: [c_int; 2],
}

/// Voice quality assessment.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpQualityResult {
    /// Mean opinion score [1, 5].
    pub mos_score: f32,
    pub snr_db: f32,
    pub clarity: f32,
    pub noise_level: f32,
    /// Integrated loudness (ITU-R BS.1770-4) in LUFS.
    pub loudness_lufs: f32,
    pub hnr_db: f32,
    pub reserved: [c_int; 2],
}

/// Acoustic voice features.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpVoiceFeatures {
    pub pitch_hz: f32,
    pub pitch_variability: f32,
    pub speaking_rate: f32,
    pub voice_stability: f32,
    pub resonance_score: f32,
    pub breathiness: f32,
    pub energy_mean: f32,
    pub energy_variability: f32,
    pub reserved: [c_int; 2],
}

/// Voice pleasantness evaluation, all scores [0, 100].
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpPleasantnessResult {
    pub overall_score: f32,
    pub magnetism: f32,
    pub warmth: f32,
    pub authority: f32,
    pub clarity_score: f32,
    pub reserved: [c_int; 2],
}

/// Voice state / condition detection.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpVoiceState {
    /// 0 = normal, 1 = moderate, 2 = high.
    pub fatigue_level: c_int,
    /// 0 = normal, 1 = hoarse, 2 = nasal, 3 = breathy.
    pub health_state: c_int,
    /// 0 = low, 1 = medium, 2 = high.
    pub stress_level: c_int,
    pub fatigue_score: f32,
    pub stress_score: f32,
    pub health_score: f32,
    pub reserved: [c_int; 2],
}

/// Language / accent identification.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpLanguageResult {
    /// ISO 639-1 code, e.g. "en".
    pub language: [c_char; 16],
    pub language_name: [c_char; 64],
    pub confidence: f32,
    /// [0, 1] accent strength (0 = standard).
    pub accent_score: f32,
    pub accent_region: [c_char; 64],
    pub reserved: [c_int; 2],
}

/// One diarization segment.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpDiarizeSegment {
    pub start_sec: f32,
    pub end_sec: f32,
    /// Auto-assigned label, e.g. "SPEAKER_0".
    pub speaker_label: [c_char; 64],
    /// Matched enrolled speaker id (empty if unknown).
    pub speaker_id: [c_char; 128],
    pub confidence: f32,
    pub reserved: [c_int; 2],
}

/// Aggregated result of vp_analyze(). `features_computed` holds a
/// VP_FEATURE_* bit for every sub-result that is valid.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VpAnalysisResult {
    pub features_computed: c_uint,
    pub gender: VpGenderResult,
    pub age: VpAgeResult,
    pub emotion: VpEmotionResult,
    pub antispoof: VpAntiSpoofResult,
    pub quality: VpQualityResult,
    pub voice_features: VpVoiceFeatures,
    pub pleasantness: VpPleasantnessResult,
    pub voice_state: VpVoiceState,
    pub language: VpLanguageResult,
    pub reserved: [c_int; 4],
}

impl VpAnalysisResult {
    pub fn zeroed() -> Self {
        // Every field is POD; all-zero bytes are a valid value.
        unsafe { std::mem::zeroed() }
    }
}

impl VpDiarizeSegment {
    pub fn zeroed() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

/// Copies `src` into a fixed char array, truncating if needed and always
/// terminating with NUL.
pub(crate) fn copy_str(dst: &mut [c_char], src: &str) {
    if dst.is_empty() {
        return;
    }
    let max = dst.len() - 1;
    let mut n = 0;
    for &b in src.as_bytes().iter().take(max) {
        dst[n] = b as c_char;
        n += 1;
    }
    dst[n] = 0;
}

pub(crate) fn fill_analysis(out: &mut VpAnalysisResult, r: &core::AnalysisResult) {
    *out = VpAnalysisResult::zeroed();
    out.features_computed = r.features_computed;

    out.gender.gender = r.gender.gender as c_int;
    out.gender.scores = r.gender.scores;

    out.age.age_years = r.age.age_years;
    out.age.age_group = r.age.age_group as c_int;
    out.age.confidence = r.age.confidence;
    out.age.group_scores = r.age.group_scores;

    out.emotion.emotion_id = r.emotion.emotion as c_int;
    out.emotion.scores = r.emotion.scores;
    out.emotion.valence = r.emotion.valence;
    out.emotion.arousal = r.emotion.arousal;

    out.antispoof.is_genuine = r.antispoof.is_genuine as c_int;
    out.antispoof.genuine_score = r.antispoof.genuine_score;
    out.antispoof.spoof_score = r.antispoof.spoof_score;

    out.quality.mos_score = r.quality.mos_score;
    out.quality.snr_db = r.quality.snr_db;
    out.quality.clarity = r.quality.clarity;
    out.quality.noise_level = r.quality.noise_level;
    out.quality.loudness_lufs = r.quality.loudness_lufs;
    out.quality.hnr_db = r.quality.hnr_db;

    out.voice_features.pitch_hz = r.voice_features.pitch_hz;
    out.voice_features.pitch_variability = r.voice_features.pitch_variability;
    out.voice_features.speaking_rate = r.voice_features.speaking_rate;
    out.voice_features.voice_stability = r.voice_features.voice_stability;
    out.voice_features.resonance_score = r.voice_features.resonance_score;
    out.voice_features.breathiness = r.voice_features.breathiness;
    out.voice_features.energy_mean = r.voice_features.energy_mean;
    out.voice_features.energy_variability = r.voice_features.energy_variability;

    out.pleasantness.overall_score = r.pleasantness.overall_score;
    out.pleasantness.magnetism = r.pleasantness.magnetism;
    out.pleasantness.warmth = r.pleasantness.warmth;
    out.pleasantness.authority = r.pleasantness.authority;
    out.pleasantness.clarity_score = r.pleasantness.clarity_score;

    out.voice_state.fatigue_level = r.voice_state.fatigue_level as c_int;
    out.voice_state.health_state = r.voice_state.health_state as c_int;
    out.voice_state.stress_level = r.voice_state.stress_level as c_int;
    out.voice_state.fatigue_score = r.voice_state.fatigue_score;
    out.voice_state.stress_score = r.voice_state.stress_score;
    out.voice_state.health_score = r.voice_state.health_score;

    copy_str(&mut out.language.language, &r.language.language);
    copy_str(&mut out.language.language_name, &r.language.language_name);
    out.language.confidence = r.language.confidence;
    out.language.accent_score = r.language.accent_score;
    copy_str(&mut out.language.accent_region, &r.language.accent_region);
}

pub(crate) fn fill_segment(out: &mut VpDiarizeSegment, seg: &DiarizeSegment) {
    *out = VpDiarizeSegment::zeroed();
    out.start_sec = seg.start_sec;
    out.end_sec = seg.end_sec;
    out.confidence = seg.confidence;
    copy_str(&mut out.speaker_label, &seg.speaker_label);
    copy_str(&mut out.speaker_id, &seg.speaker_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_array_to_string(arr: &[c_char]) -> String {
        let bytes: Vec<u8> = arr
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn copy_str_terminates() {
        let mut buf = [1 as c_char; 8];
        copy_str(&mut buf, "abc");
        assert_eq!(char_array_to_string(&buf), "abc");
        assert_eq!(buf[3], 0);
    }

    #[test]
    fn copy_str_truncates_keeping_nul() {
        let mut buf = [0 as c_char; 4];
        copy_str(&mut buf, "abcdefgh");
        assert_eq!(char_array_to_string(&buf), "abc");
        assert_eq!(buf[3], 0);
    }

    #[test]
    fn zeroed_result_has_no_features() {
        let r = VpAnalysisResult::zeroed();
        assert_eq!(r.features_computed, 0);
        assert_eq!(r.quality.mos_score, 0.0);
        assert_eq!(r.language.language[0], 0);
    }

    #[test]
    fn fill_analysis_copies_fields() {
        let mut core_result = core::AnalysisResult::default();
        core_result.features_computed = VP_FEATURE_QUALITY;
        core_result.quality.mos_score = 4.2;
        core_result.language.language = "en".into();
        core_result.language.language_name = "English".into();

        let mut out = VpAnalysisResult::zeroed();
        fill_analysis(&mut out, &core_result);
        assert_eq!(out.features_computed, VP_FEATURE_QUALITY);
        assert!((out.quality.mos_score - 4.2).abs() < 1e-6);
        assert_eq!(char_array_to_string(&out.language.language), "en");
        assert_eq!(char_array_to_string(&out.language.language_name), "English");
    }

    #[test]
    fn fill_segment_copies_label() {
        let seg = DiarizeSegment {
            start_sec: 1.0,
            end_sec: 2.5,
            speaker_label: "SPEAKER_0".into(),
            speaker_id: "alice".into(),
            confidence: 0.9,
        };
        let mut out = VpDiarizeSegment::zeroed();
        fill_segment(&mut out, &seg);
        assert_eq!(out.start_sec, 1.0);
        assert_eq!(char_array_to_string(&out.speaker_label), "SPEAKER_0");
        assert_eq!(char_array_to_string(&out.speaker_id), "alice");
    }

    #[test]
    fn feature_flags_match_core() {
        assert_eq!(VP_FEATURE_ALL, voiceprint::flags::ALL);
        assert_eq!(VP_FEATURE_GENDER, voiceprint::flags::GENDER);
        assert_eq!(VP_FEATURE_LANGUAGE, voiceprint::flags::LANGUAGE);
    }
}
