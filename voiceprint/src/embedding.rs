//! Speaker embedding extraction.
//!
//! Pipeline: resample to 16 kHz -> VAD silence filtering (falling back to
//! the whole buffer when no speech is found) -> minimum-duration gate ->
//! log-mel filterbank with CMVN -> speaker network -> L2 normalisation.

use std::path::Path;

use tracing::{debug, info, warn};

use voiceprint_audio::fbank::{cmvn, compute_fbank, l2_normalize, FbankConfig};
use voiceprint_audio::{resample, wav};
use voiceprint_onnx::{ModelSession, SessionConfig};

use crate::vad::VoiceActivityDetector;
use crate::{model_files, VoiceprintError};

/// Minimum speech duration accepted for embedding extraction, in seconds.
pub const MIN_SPEECH_DURATION: f32 = 1.5;

/// Embedding dimension assumed when the model's output shape is symbolic.
const DEFAULT_DIM: usize = 192;

const SAMPLE_RATE: u32 = 16000;

/// Turns speech audio into fixed-dimension L2-normalised speaker vectors.
///
/// Deterministic for a given input and model. Safe for concurrent use.
pub struct EmbeddingExtractor {
    vad: VoiceActivityDetector,
    model: ModelSession,
    fbank_cfg: FbankConfig,
    dim: usize,
}

impl EmbeddingExtractor {
    /// Loads the speaker network and VAD from `model_dir`.
    pub fn load(model_dir: impl AsRef<Path>, cfg: &SessionConfig) -> Result<Self, VoiceprintError> {
        let model_dir = model_dir.as_ref();

        let vad = VoiceActivityDetector::load(model_dir.join(model_files::VAD))?;
        let model = ModelSession::load(model_dir.join(model_files::SPEAKER_EMBEDDING), cfg)
            .map_err(|e| VoiceprintError::ModelLoad(e.to_string()))?;

        // The embedding dimension is the last static output dimension.
        let dim = model
            .output_shape(0)
            .iter()
            .rev()
            .find(|&&d| d > 0)
            .map(|&d| d as usize)
            .unwrap_or(DEFAULT_DIM);

        info!(dim, "embedding extractor initialized");
        Ok(Self {
            vad,
            model,
            fbank_cfg: FbankConfig::default(),
            dim,
        })
    }

    /// The dimensionality of extracted embeddings.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// The VAD shared with the diarizer.
    pub fn vad(&self) -> &VoiceActivityDetector {
        &self.vad
    }

    /// Extracts an L2-normalised embedding from mono f32 PCM.
    pub fn extract(&self, audio: &[f32], sample_rate: u32) -> Result<Vec<f32>, VoiceprintError> {
        if audio.is_empty() {
            return Err(VoiceprintError::InvalidParam("empty audio".into()));
        }

        let resampled;
        let audio_16k: &[f32] = if sample_rate != SAMPLE_RATE {
            resampled = resample::resample(audio, sample_rate, SAMPLE_RATE);
            &resampled
        } else {
            audio
        };

        // Best-effort VAD; an utterance with no detected speech still gets a
        // chance through the duration gate below.
        let mut speech = self.vad.filter_silence(audio_16k)?;
        if speech.is_empty() {
            warn!("VAD detected no speech, using full audio as fallback");
            speech = audio_16k.to_vec();
        }

        let speech_secs = speech.len() as f32 / SAMPLE_RATE as f32;
        if speech_secs < MIN_SPEECH_DURATION {
            return Err(VoiceprintError::AudioTooShort {
                got: speech_secs,
                min: MIN_SPEECH_DURATION,
            });
        }

        let mut fbank = compute_fbank(&speech, &self.fbank_cfg);
        if fbank.is_empty() {
            return Err(VoiceprintError::AudioInvalid(
                "filterbank extraction produced no frames".into(),
            ));
        }
        cmvn(&mut fbank);

        let shape = [1i64, fbank.num_frames as i64, fbank.num_bins as i64];
        let mut embedding = self.model.run(&fbank.data, &shape)?;

        l2_normalize(&mut embedding);
        debug!(
            dim = embedding.len(),
            speech_secs, "embedding extracted"
        );
        Ok(embedding)
    }

    /// Reads a WAV file, normalises it to 16 kHz mono and extracts an
    /// embedding.
    pub fn extract_from_file(&self, wav_path: impl AsRef<Path>) -> Result<Vec<f32>, VoiceprintError> {
        let decoded = wav::read_wav_file(wav_path)?;
        self.extract(&decoded.samples, decoded.sample_rate)
    }
}
