use thiserror::Error;

use voiceprint_audio::AudioError;
use voiceprint_onnx::OnnxError;

/// Errors returned by engine operations.
///
/// Each variant maps 1:1 to one of the integer return codes exposed at the
/// C ABI; the mapping lives in the capi crate.
#[derive(Debug, Error)]
pub enum VoiceprintError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("not initialized")]
    NotInit,

    #[error("already initialized")]
    AlreadyInit,

    #[error("model load: {0}")]
    ModelLoad(String),

    #[error("speech too short: {got:.2}s (minimum {min:.2}s)")]
    AudioTooShort { got: f32, min: f32 },

    #[error("invalid audio: {0}")]
    AudioInvalid(String),

    #[error("speaker already exists: {0}")]
    SpeakerExists(String),

    #[error("speaker not found: {0}")]
    SpeakerNotFound(String),

    #[error("store: {0}")]
    Db(String),

    #[error("cannot open file: {0}")]
    FileNotFound(String),

    #[error("output buffer too small")]
    BufferTooSmall,

    #[error("no matching speaker (best score: {best_score:.4})")]
    NoMatch { best_score: f32 },

    #[error("wav format: {0}")]
    WavFormat(String),

    #[error("inference: {0}")]
    Inference(String),

    #[error("model not available: {0}")]
    ModelNotAvailable(&'static str),

    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("diarization failed: {0}")]
    DiarizeFailed(String),
}

impl From<AudioError> for VoiceprintError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::FileNotFound(p) => Self::FileNotFound(p),
            AudioError::WavFormat(m) => Self::WavFormat(m),
            AudioError::Io(e) => Self::AudioInvalid(e.to_string()),
        }
    }
}

impl From<OnnxError> for VoiceprintError {
    fn from(e: OnnxError) -> Self {
        match e {
            OnnxError::Load { .. } => Self::ModelLoad(e.to_string()),
            other => Self::Inference(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_error_mapping() {
        let e: VoiceprintError = AudioError::FileNotFound("x.wav".into()).into();
        assert!(matches!(e, VoiceprintError::FileNotFound(_)));

        let e: VoiceprintError = AudioError::WavFormat("bad".into()).into();
        assert!(matches!(e, VoiceprintError::WavFormat(_)));
    }

    #[test]
    fn display_carries_context() {
        let e = VoiceprintError::AudioTooShort { got: 0.8, min: 1.5 };
        assert!(e.to_string().contains("0.80"));
        assert!(e.to_string().contains("1.50"));
    }
}
