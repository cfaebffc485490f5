//! Pure-DSP voice measurements.
//!
//! Everything here runs on 16 kHz mono f32 PCM (and, for the spectral
//! features, on the log-mel matrix from [`crate::fbank`]). No models, no
//! I/O; all sums use f64 accumulators.

mod loudness;
mod pitch;
mod spectral;

pub use loudness::{
    compute_clarity, compute_energy_variability, compute_hnr_db, compute_lufs, compute_rms,
    compute_snr_db, compute_snr_db_simple,
};
pub use pitch::{
    compute_voice_stability, estimate_speaking_rate, PitchAnalyzer, PitchFrame, PitchSummary,
};
pub use spectral::{compute_breathiness, compute_resonance_score};
