//! Audio front end for the voiceprint engine.
//!
//! Everything downstream of this crate assumes 16 kHz mono f32 PCM in
//! [-1, 1]. The modules here get arbitrary input into that shape and
//! measure what came in:
//!
//! 1. [`wav`]: RIFF/WAVE decoding (PCM16, PCM8, IEEE float32, mono/stereo).
//! 2. [`resample`]: linear-interpolation sample rate conversion.
//! 3. [`fbank`]: 80-bin log mel filterbank with per-utterance CMVN, the
//!    feature format every neural model in the engine consumes.
//! 4. [`dsp`]: pure-DSP estimators (YIN pitch, BS.1770-4 loudness, SNR, HNR,
//!    spectral features) used by the voice analyzer.

mod error;

pub mod dsp;
pub mod fbank;
pub mod resample;
pub mod wav;

pub use error::AudioError;
pub use fbank::{cmvn, compute_fbank, l2_normalize, Fbank, FbankConfig};

/// Sample rate all internal processing runs at.
pub const SAMPLE_RATE: usize = 16000;
