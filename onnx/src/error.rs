use thiserror::Error;

/// Errors returned by ONNX Runtime operations.
#[derive(Debug, Error)]
pub enum OnnxError {
    #[error("onnx: failed to load model {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: ort::Error,
    },

    #[error("onnx: inference failed: {0}")]
    Inference(String),

    #[error("onnx: empty input")]
    EmptyInput,

    #[error("onnx: input data too short: got {got}, need {need}")]
    InputTooShort { got: usize, need: usize },

    #[error("onnx: model produced no outputs")]
    NoOutput,
}

impl From<ort::Error> for OnnxError {
    fn from(e: ort::Error) -> Self {
        Self::Inference(e.to_string())
    }
}
