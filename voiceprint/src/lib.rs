//! Speaker recognition, voice analysis and diarization.
//!
//! # Architecture
//!
//! The engine is three pipelines sharing one audio front end:
//!
//! 1. **Recognition** — [`EmbeddingExtractor`] turns speech into L2-normalised
//!    vectors; [`SpeakerManager`] keeps them in a durable, RwLock-guarded
//!    store and answers 1:1 verify and 1:N identify queries by cosine
//!    similarity.
//! 2. **Analysis** — [`VoiceAnalyzer`] fans a feature-flag bitmask out over
//!    optional neural models and pure-DSP estimators, sharing VAD output and
//!    one filterbank pass across all of them.
//! 3. **Diarization** — [`Diarizer`] embeds VAD segments, clusters them under
//!    cosine distance and optionally matches cluster centroids against the
//!    enrolled speaker set.
//!
//! All public calls are synchronous and blocking; concurrency is the
//! caller's business. The engine is `Sync` throughout.

pub mod analyzer;
mod clustering;
mod diarizer;
mod embedding;
mod error;
mod manager;
mod similarity;
mod store;
mod vad;

pub use analyzer::{flags, AnalysisResult, VoiceAnalyzer};
pub use clustering::{agglomerative_cluster, ClusterResult};
pub use diarizer::{Diarizer, DiarizeSegment};
pub use embedding::EmbeddingExtractor;
pub use error::VoiceprintError;
pub use manager::SpeakerManager;
pub use similarity::{cosine_distance, cosine_similarity, find_best_match};
pub use store::{SpeakerProfile, SpeakerStore};
pub use vad::{speech_duration, SpeechSegment, VoiceActivityDetector};

/// File names the engine expects inside a model directory.
pub mod model_files {
    /// Speaker embedding network (required).
    pub const SPEAKER_EMBEDDING: &str = "ecapa_tdnn.onnx";
    /// Silero voice activity detection (required for recognition/diarization).
    pub const VAD: &str = "silero_vad.onnx";
    /// Optional analyzer models.
    pub const GENDER_AGE: &str = "gender_age.onnx";
    pub const EMOTION: &str = "emotion.onnx";
    pub const ANTISPOOF: &str = "antispoof.onnx";
    pub const DNSMOS: &str = "dnsmos.onnx";
    pub const LANGUAGE: &str = "language.onnx";
}
