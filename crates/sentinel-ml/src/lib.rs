//! Classification pipeline: text → bag-of-words features → logits →
//! calibrated decision.
//!
//! The pipeline is deterministic end to end apart from the inference
//! backend itself, which sits behind [`backend::InferenceBackend`]. The
//! real ONNX Runtime adapter is gated behind the `onnx` feature.

pub mod backend;
pub mod handler;
pub mod pipeline;
pub mod postprocess;
pub mod preprocess;
pub mod session;
pub mod vocab;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::OnnxBackend;

pub use backend::{InferenceBackend, IoSpec, Tensor, TensorSpec};
pub use handler::{HandlerConfig, PredictionHandler};
pub use pipeline::{MlPipeline, PipelineConfig, Predictor};
pub use session::{BackendFactory, SessionManager};
pub use vocab::{Vocabulary, VocabularyRegistry};

#[cfg(test)]
pub(crate) mod fixtures;
