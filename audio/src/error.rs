use thiserror::Error;

/// Errors returned by audio decoding and conversion.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("cannot open file: {0}")]
    FileNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wav format: {0}")]
    WavFormat(String),
}
