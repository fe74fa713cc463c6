//! The capability boundary between the pipeline and the numeric engine.
//!
//! The core treats inference as `{load(model) → session; run(tensor) →
//! tensor}` and nothing more. Concrete engines (ONNX Runtime behind the
//! `onnx` feature, deterministic fixtures in tests) implement
//! [`InferenceBackend`].

use std::collections::HashMap;

use async_trait::async_trait;

use sentinel_core::MlError;

/// A named dense f32 tensor crossing the backend boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub data: Vec<f32>,
    pub dims: Vec<i64>,
}

impl Tensor {
    /// A `[1, len]` row vector, the shape bag-of-words features ship in.
    pub fn row(data: Vec<f32>) -> Self {
        let len = data.len() as i64;
        Self {
            data,
            dims: vec![1, len],
        }
    }
}

/// Static shape description of one input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<i64>,
}

/// Expected input/output names and dimensions for a loaded model.
#[derive(Debug, Clone, Default)]
pub struct IoSpec {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

/// An inference engine bound 1:1 to a model artifact.
///
/// Implementations must tolerate concurrent `run` calls from independent
/// requests: any per-call state lives in the call's own inputs/outputs.
/// A failed `run` fails the request, never the process.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Load the model. Idempotent: repeated calls after success are no-ops.
    async fn initialize(&self) -> Result<(), MlError>;

    /// Execute the model on named input tensors, returning named outputs.
    async fn run(&self, inputs: HashMap<String, Tensor>) -> Result<HashMap<String, Tensor>, MlError>;

    /// Static shape description of the expected inputs and outputs.
    fn metadata(&self) -> IoSpec;

    /// Release native resources. Called on shutdown only.
    async fn dispose(&self);
}
