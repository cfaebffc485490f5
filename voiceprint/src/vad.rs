//! Voice activity detection with the Silero v5 model.
//!
//! The model scores fixed 512-sample windows (32ms at 16 kHz), carrying a
//! `[2, 1, 128]` hidden state across windows within one utterance. The
//! window probabilities feed a small hangover state machine that emits
//! merged speech segments.

use std::path::Path;
use std::sync::Mutex;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info, warn};

use crate::VoiceprintError;

/// Samples per inference window (32ms at 16 kHz).
pub const WINDOW_SIZE: usize = 512;
/// Speech probability threshold for entering the speech state.
pub const SPEECH_THRESHOLD: f32 = 0.5;
/// Silence needed to close a segment, in milliseconds.
pub const MIN_SILENCE_MS: usize = 300;
/// Minimum length of an emitted segment, in milliseconds.
pub const MIN_SPEECH_MS: usize = 250;

// Combined Silero v5 hidden state: [2, 1, 128].
const STATE_LEN: usize = 2 * 128;
const SAMPLE_RATE: usize = 16000;

/// A detected span of speech, in samples of the analysed buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechSegment {
    pub start_sample: usize,
    pub end_sample: usize,
    /// Mean speech probability over the segment's above-threshold windows.
    pub confidence: f32,
}

impl SpeechSegment {
    pub fn duration_secs(&self) -> f32 {
        (self.end_sample - self.start_sample) as f32 / SAMPLE_RATE as f32
    }
}

/// Streaming Silero VAD over whole utterances.
pub struct VoiceActivityDetector {
    session: Mutex<Session>,
}

impl VoiceActivityDetector {
    /// Loads the Silero VAD model from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VoiceprintError> {
        let path = path.as_ref();
        let session = (|| {
            Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(1)?
                .commit_from_file(path)
        })()
        .map_err(|e| VoiceprintError::ModelLoad(format!("VAD model {}: {e}", path.display())))?;
        info!(path = %path.display(), "VAD model loaded");
        Ok(Self {
            session: Mutex::new(session),
        })
    }

    /// Runs detection over a 16 kHz mono buffer and returns merged speech
    /// segments. The hidden state starts zeroed for every call.
    pub fn detect(&self, audio: &[f32]) -> Result<Vec<SpeechSegment>, VoiceprintError> {
        let probs = self.window_probs(audio)?;
        let segments = segments_from_probs(&probs, audio.len());
        debug!(segments = segments.len(), "VAD detection complete");
        Ok(segments)
    }

    /// Concatenates the audio covered by detected speech segments, in order.
    /// Returns an empty vector when no speech was detected.
    pub fn filter_silence(&self, audio: &[f32]) -> Result<Vec<f32>, VoiceprintError> {
        let segments = self.detect(audio)?;
        if segments.is_empty() {
            return Ok(Vec::new());
        }
        let mut filtered = Vec::new();
        for seg in &segments {
            let end = seg.end_sample.min(audio.len());
            filtered.extend_from_slice(&audio[seg.start_sample..end]);
        }
        debug!(
            input = audio.len(),
            output = filtered.len(),
            "silence filtered"
        );
        Ok(filtered)
    }

    /// One speech probability per full 512-sample window.
    fn window_probs(&self, audio: &[f32]) -> Result<Vec<f32>, VoiceprintError> {
        let infer_err = |e: ort::Error| VoiceprintError::Inference(e.to_string());

        let mut probs = Vec::with_capacity(audio.len() / WINDOW_SIZE);
        let mut state = vec![0.0f32; STATE_LEN];
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());

        let mut offset = 0;
        while offset + WINDOW_SIZE <= audio.len() {
            let input = Tensor::from_array((
                vec![1i64, WINDOW_SIZE as i64],
                audio[offset..offset + WINDOW_SIZE].to_vec(),
            ))
            .map_err(infer_err)?;
            let state_in = Tensor::from_array((vec![2i64, 1, 128], state.clone()))
                .map_err(infer_err)?;
            let sr = Tensor::from_array((vec![1i64], vec![SAMPLE_RATE as i64]))
                .map_err(infer_err)?;

            let outputs = session
                .run(ort::inputs![
                    "input" => input,
                    "state" => state_in,
                    "sr" => sr,
                ])
                .map_err(infer_err)?;

            let (_, prob_data) = outputs["output"]
                .try_extract_tensor::<f32>()
                .map_err(infer_err)?;
            probs.push(prob_data.first().copied().unwrap_or(0.0));

            let (_, new_state) = outputs["stateN"]
                .try_extract_tensor::<f32>()
                .map_err(infer_err)?;
            if new_state.len() == state.len() {
                state.copy_from_slice(new_state);
            }

            offset += WINDOW_SIZE;
        }

        if probs.is_empty() {
            warn!(samples = audio.len(), "audio shorter than one VAD window");
        }
        Ok(probs)
    }
}

/// Total speech time covered by `segments`, in seconds.
pub fn speech_duration(segments: &[SpeechSegment]) -> f32 {
    segments.iter().map(SpeechSegment::duration_secs).sum()
}

/// The segmentation state machine, separated from inference so it can be
/// exercised without a model. `probs[i]` scores the window starting at
/// sample `i * WINDOW_SIZE`; `total_samples` closes a trailing open segment.
pub(crate) fn segments_from_probs(probs: &[f32], total_samples: usize) -> Vec<SpeechSegment> {
    let min_silence_samples = MIN_SILENCE_MS * SAMPLE_RATE / 1000;
    let min_speech_samples = MIN_SPEECH_MS * SAMPLE_RATE / 1000;

    let mut segments = Vec::new();
    let mut in_speech = false;
    let mut speech_start = 0usize;
    let mut silence_counter = 0usize;
    let mut conf_sum = 0.0f32;
    let mut conf_count = 0usize;

    for (w, &prob) in probs.iter().enumerate() {
        let current_sample = w * WINDOW_SIZE;

        if prob >= SPEECH_THRESHOLD {
            if !in_speech {
                speech_start = current_sample;
                in_speech = true;
                conf_sum = 0.0;
                conf_count = 0;
            }
            silence_counter = 0;
            conf_sum += prob;
            conf_count += 1;
        } else if in_speech {
            silence_counter += WINDOW_SIZE;
            if silence_counter >= min_silence_samples {
                let speech_end = current_sample - silence_counter + WINDOW_SIZE;
                if speech_end.saturating_sub(speech_start) >= min_speech_samples {
                    segments.push(SpeechSegment {
                        start_sample: speech_start,
                        end_sample: speech_end,
                        confidence: mean_conf(conf_sum, conf_count),
                    });
                }
                in_speech = false;
                silence_counter = 0;
            }
        }
    }

    // Close a segment still open at the end of the audio.
    if in_speech {
        let speech_end = total_samples;
        if speech_end.saturating_sub(speech_start) >= min_speech_samples {
            segments.push(SpeechSegment {
                start_sample: speech_start,
                end_sample: speech_end,
                confidence: mean_conf(conf_sum, conf_count),
            });
        }
    }

    merge_segments(segments, min_silence_samples)
}

fn mean_conf(sum: f32, count: usize) -> f32 {
    if count > 0 {
        sum / count as f32
    } else {
        0.0
    }
}

/// Merges adjacent segments whose gap is below the silence threshold; the
/// merged segment takes the later end and the mean of the two confidences.
fn merge_segments(segments: Vec<SpeechSegment>, min_gap: usize) -> Vec<SpeechSegment> {
    if segments.len() < 2 {
        return segments;
    }
    let mut merged: Vec<SpeechSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        match merged.last_mut() {
            Some(last) if seg.start_sample.saturating_sub(last.end_sample) < min_gap => {
                last.end_sample = seg.end_sample;
                last.confidence = (last.confidence + seg.confidence) / 2.0;
            }
            _ => merged.push(seg),
        }
    }
    merged
}
