//! Analysis result records and the feature-flag bitmask.

/// Feature request/availability bits for [`super::VoiceAnalyzer`].
pub mod flags {
    pub const GENDER: u32 = 0x001;
    pub const AGE: u32 = 0x002;
    pub const EMOTION: u32 = 0x004;
    pub const ANTISPOOF: u32 = 0x008;
    pub const QUALITY: u32 = 0x010;
    pub const VOICE_FEATS: u32 = 0x020;
    pub const PLEASANTNESS: u32 = 0x040;
    pub const VOICE_STATE: u32 = 0x080;
    pub const LANGUAGE: u32 = 0x100;
    pub const ALL: u32 = 0x1FF;
}

pub const EMOTION_COUNT: usize = 8;

/// Recognised gender classes, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum Gender {
    #[default]
    Female = 0,
    Male = 1,
    Child = 2,
}

/// Age brackets, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum AgeGroup {
    #[default]
    Child = 0,
    Teen = 1,
    Adult = 2,
    Elder = 3,
}

impl AgeGroup {
    pub(crate) fn from_index(idx: usize) -> Self {
        match idx {
            1 => Self::Teen,
            2 => Self::Adult,
            3 => Self::Elder,
            _ => Self::Child,
        }
    }

    /// Midpoint age used when the model has no regression head.
    pub(crate) fn midpoint_years(self) -> i32 {
        match self {
            Self::Child => 8,
            Self::Teen => 15,
            Self::Adult => 35,
            Self::Elder => 68,
        }
    }
}

/// Emotion classes, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum Emotion {
    #[default]
    Neutral = 0,
    Happy = 1,
    Sad = 2,
    Angry = 3,
    Fearful = 4,
    Disgusted = 5,
    Surprised = 6,
    Calm = 7,
}

impl Emotion {
    pub(crate) fn from_index(idx: usize) -> Self {
        match idx {
            1 => Self::Happy,
            2 => Self::Sad,
            3 => Self::Angry,
            4 => Self::Fearful,
            5 => Self::Disgusted,
            6 => Self::Surprised,
            7 => Self::Calm,
            _ => Self::Neutral,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fearful => "fearful",
            Self::Disgusted => "disgusted",
            Self::Surprised => "surprised",
            Self::Calm => "calm",
        }
    }

    /// Per-class (valence, arousal) used when the model has no dimensional
    /// head.
    pub(crate) fn valence_arousal(self) -> (f32, f32) {
        match self {
            Self::Neutral => (0.0, 0.0),
            Self::Happy => (0.8, 0.7),
            Self::Sad => (-0.7, -0.4),
            Self::Angry => (-0.8, 0.9),
            Self::Fearful => (-0.7, 0.8),
            Self::Disgusted => (-0.5, 0.1),
            Self::Surprised => (0.3, 0.9),
            Self::Calm => (0.2, -0.3),
        }
    }
}

/// Name for an emotion id, `"unknown"` out of range.
pub fn emotion_name(id: i32) -> &'static str {
    if (0..EMOTION_COUNT as i32).contains(&id) {
        Emotion::from_index(id as usize).name()
    } else {
        "unknown"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum FatigueLevel {
    #[default]
    Normal = 0,
    Moderate = 1,
    High = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum HealthState {
    #[default]
    Normal = 0,
    Hoarse = 1,
    Nasal = 2,
    Breathy = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum StressLevel {
    #[default]
    Low = 0,
    Medium = 1,
    High = 2,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenderResult {
    pub gender: Gender,
    /// Softmax scores: [female, male, child].
    pub scores: [f32; 3],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AgeResult {
    pub age_years: i32,
    pub age_group: AgeGroup,
    /// Confidence of the winning age group.
    pub confidence: f32,
    pub group_scores: [f32; 4],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmotionResult {
    pub emotion: Emotion,
    pub scores: [f32; EMOTION_COUNT],
    /// Negative-to-positive affect, [-1, 1].
    pub valence: f32,
    /// Calm-to-excited, [-1, 1].
    pub arousal: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AntiSpoofResult {
    pub is_genuine: bool,
    pub genuine_score: f32,
    pub spoof_score: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QualityResult {
    /// Mean opinion score, [1, 5].
    pub mos_score: f32,
    pub snr_db: f32,
    /// Intelligibility proxy, [0, 1].
    pub clarity: f32,
    /// Background noise level, [0, 1].
    pub noise_level: f32,
    /// Integrated loudness (BS.1770-4).
    pub loudness_lufs: f32,
    pub hnr_db: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceFeatures {
    /// Mean F0 in Hz, 0 when unvoiced.
    pub pitch_hz: f32,
    /// F0 standard deviation in Hz.
    pub pitch_variability: f32,
    /// Estimated syllables per second.
    pub speaking_rate: f32,
    /// Jitter/shimmer stability, [0, 1].
    pub voice_stability: f32,
    /// 1-4 kHz energy fraction, [0, 1].
    pub resonance_score: f32,
    pub breathiness: f32,
    pub energy_mean: f32,
    pub energy_variability: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PleasantnessResult {
    pub overall_score: f32,
    pub magnetism: f32,
    pub warmth: f32,
    pub authority: f32,
    pub clarity_score: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceStateResult {
    pub fatigue_level: FatigueLevel,
    pub health_state: HealthState,
    pub stress_level: StressLevel,
    pub fatigue_score: f32,
    pub stress_score: f32,
    pub health_score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct LanguageResult {
    /// ISO 639-1 code, e.g. "en"; `lang<idx>` for indices past the table.
    pub language: String,
    pub language_name: String,
    pub confidence: f32,
    /// Accent strength, [0, 1] (0 = standard).
    pub accent_score: f32,
    pub accent_region: String,
}

/// Aggregated output of one analysis call. `features_computed` holds a bit
/// for every sub-result that was actually produced; the rest stay at their
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResult {
    pub features_computed: u32,
    pub gender: GenderResult,
    pub age: AgeResult,
    pub emotion: EmotionResult,
    pub antispoof: AntiSpoofResult,
    pub quality: QualityResult,
    pub voice_features: VoiceFeatures,
    pub pleasantness: PleasantnessResult,
    pub voice_state: VoiceStateResult,
    pub language: LanguageResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_names() {
        assert_eq!(emotion_name(0), "neutral");
        assert_eq!(emotion_name(7), "calm");
        assert_eq!(emotion_name(-1), "unknown");
        assert_eq!(emotion_name(8), "unknown");
    }

    #[test]
    fn age_midpoints() {
        assert_eq!(AgeGroup::Child.midpoint_years(), 8);
        assert_eq!(AgeGroup::Teen.midpoint_years(), 15);
        assert_eq!(AgeGroup::Adult.midpoint_years(), 35);
        assert_eq!(AgeGroup::Elder.midpoint_years(), 68);
    }

    #[test]
    fn flag_space_is_nine_bits() {
        assert_eq!(flags::ALL, 0x1FF);
        let sum = flags::GENDER
            | flags::AGE
            | flags::EMOTION
            | flags::ANTISPOOF
            | flags::QUALITY
            | flags::VOICE_FEATS
            | flags::PLEASANTNESS
            | flags::VOICE_STATE
            | flags::LANGUAGE;
        assert_eq!(sum, flags::ALL);
    }

    #[test]
    fn default_result_is_zeroed() {
        let r = AnalysisResult::default();
        assert_eq!(r.features_computed, 0);
        assert_eq!(r.gender.gender, Gender::Female);
        assert_eq!(r.quality.mos_score, 0.0);
        assert!(r.language.language.is_empty());
    }
}
