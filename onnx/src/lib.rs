//! Safe wrapper around ONNX Runtime sessions.
//!
//! Every neural model in the engine is used the same way: load from a file,
//! ask for its I/O names and shapes, feed one float tensor, get one flat
//! float vector back. [`ModelSession`] captures exactly that capability and
//! nothing more.

mod error;
mod session;

pub use error::OnnxError;
pub use session::{ModelSession, SessionConfig};
