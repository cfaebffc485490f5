//! Single-tensor inference sessions.

use std::path::Path;
use std::sync::Mutex;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, ValueType};
use tracing::{debug, info};

use crate::OnnxError;

/// Session construction options.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Intra-op thread count handed to the runtime (default: 2).
    pub intra_threads: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { intra_threads: 2 }
    }
}

/// A loaded neural model with a single-tensor-in, single-tensor-out surface.
///
/// The underlying runtime session needs `&mut` to run, so it sits behind a
/// `Mutex`; the wrapper itself is `Send + Sync` and all methods take `&self`.
pub struct ModelSession {
    session: Mutex<Session>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    input_shapes: Vec<Vec<i64>>,
    output_shapes: Vec<Vec<i64>>,
}

impl ModelSession {
    /// Loads a model from `path` with full graph optimisation, inter-op
    /// parallelism 1 and the configured intra-op thread count.
    pub fn load(path: impl AsRef<Path>, cfg: &SessionConfig) -> Result<Self, OnnxError> {
        let path = path.as_ref();
        let session = (|| {
            Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(cfg.intra_threads)?
                .with_inter_threads(1)?
                .commit_from_file(path)
        })()
        .map_err(|source| OnnxError::Load {
            path: path.display().to_string(),
            source,
        })?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|i| i.name().to_string())
            .collect();
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        let input_shapes: Vec<Vec<i64>> = session
            .inputs()
            .iter()
            .map(|i| tensor_dims(i.dtype()))
            .collect();
        let output_shapes: Vec<Vec<i64>> = session
            .outputs()
            .iter()
            .map(|o| tensor_dims(o.dtype()))
            .collect();

        info!(
            path = %path.display(),
            inputs = ?input_names,
            outputs = ?output_names,
            "model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            output_names,
            input_shapes,
            output_shapes,
        })
    }

    /// Input tensor names in model order.
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    /// Output tensor names in model order.
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// Declared shape of input `idx`; symbolic dimensions are -1.
    pub fn input_shape(&self, idx: usize) -> &[i64] {
        self.input_shapes.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Declared shape of output `idx`; symbolic dimensions are -1.
    pub fn output_shape(&self, idx: usize) -> &[i64] {
        self.output_shapes.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Runs a single-input inference and returns the first output as a flat
    /// vector, sized by the product of the output's dimensions.
    pub fn run(&self, data: &[f32], shape: &[i64]) -> Result<Vec<f32>, OnnxError> {
        if data.is_empty() {
            return Err(OnnxError::EmptyInput);
        }
        let need: usize = shape.iter().filter(|&&d| d > 0).map(|&d| d as usize).product();
        if data.len() < need {
            return Err(OnnxError::InputTooShort {
                got: data.len(),
                need,
            });
        }

        let tensor = Tensor::from_array((shape.to_vec(), data[..need].to_vec()))?;
        let input_name = self
            .input_names
            .first()
            .cloned()
            .ok_or(OnnxError::NoOutput)?;

        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        let outputs = session.run(ort::inputs![input_name.as_str() => tensor])?;
        if outputs.len() == 0 {
            return Err(OnnxError::NoOutput);
        }

        let (_, out) = outputs[0].try_extract_tensor::<f32>()?;
        debug!(len = out.len(), "inference complete");
        Ok(out.to_vec())
    }
}

/// Extracts the dimension list from a tensor-valued I/O slot; non-tensor
/// slots report an empty shape.
fn tensor_dims(vt: &ValueType) -> Vec<i64> {
    match vt {
        ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_load_error() {
        let err = ModelSession::load("/nonexistent/model.onnx", &SessionConfig::default());
        assert!(matches!(err, Err(OnnxError::Load { .. })));
    }

    #[test]
    fn session_config_default() {
        assert_eq!(SessionConfig::default().intra_threads, 2);
    }
}
