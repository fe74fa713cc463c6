//! ONNX Runtime backend.
//!
//! Wraps an `ort` session behind a lock so concurrent requests can share
//! the one live session per model. The session is created lazily on
//! [`initialize`](InferenceBackend::initialize) and survives for the
//! process lifetime unless disposed.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;

use ort::session::{Session, SessionInputValue, SessionInputs};
use ort::value::ValueType;
use tokio::sync::Mutex;
use tracing::info;

use sentinel_core::MlError;

use crate::backend::{InferenceBackend, IoSpec, Tensor, TensorSpec};

/// ONNX Runtime inference session for one model artifact.
pub struct OnnxBackend {
    model_path: PathBuf,
    session: Mutex<Option<Session>>,
}

impl OnnxBackend {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            session: Mutex::new(None),
        }
    }
}

fn tensor_spec(name: &str, dtype: &ValueType) -> TensorSpec {
    TensorSpec {
        name: name.to_string(),
        shape: match dtype {
            ValueType::Tensor { shape, .. } => shape.to_vec(),
            _ => Vec::new(),
        },
    }
}

#[async_trait::async_trait]
impl InferenceBackend for OnnxBackend {
    async fn initialize(&self) -> Result<(), MlError> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let session = Session::builder()
            .and_then(|b| b.commit_from_file(&self.model_path))
            .map_err(|e| {
                MlError::Backend(format!(
                    "failed to load ONNX session from {}: {e}",
                    self.model_path.display()
                ))
            })?;

        info!(model = %self.model_path.display(), "initialized ONNX session");
        *guard = Some(session);
        Ok(())
    }

    async fn run(
        &self,
        inputs: HashMap<String, Tensor>,
    ) -> Result<HashMap<String, Tensor>, MlError> {
        let mut guard = self.session.lock().await;
        let session = guard
            .as_mut()
            .ok_or_else(|| MlError::Backend("ONNX session not initialized".into()))?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|o| o.name().to_string())
            .collect();

        let mut feeds: Vec<(Cow<'_, str>, SessionInputValue<'_>)> = Vec::with_capacity(inputs.len());
        for (name, tensor) in inputs {
            let value = ort::value::Tensor::from_array((
                tensor.dims.clone(),
                tensor.data.into_boxed_slice(),
            ))
            .map_err(|e| MlError::Backend(format!("build input tensor {name}: {e}")))?;
            feeds.push((Cow::Owned(name), value.into()));
        }

        let outputs = session
            .run(SessionInputs::ValueMap(feeds))
            .map_err(|e| MlError::Backend(format!("ONNX inference failed: {e}")))?;

        let mut result = HashMap::with_capacity(output_names.len());
        for name in output_names {
            let (shape, data) = outputs[name.as_str()]
                .try_extract_tensor::<f32>()
                .map_err(|e| MlError::Backend(format!("extract output {name}: {e}")))?;
            let dims: &[i64] = shape;
            result.insert(
                name,
                Tensor {
                    data: data.to_vec(),
                    dims: dims.to_vec(),
                },
            );
        }
        Ok(result)
    }

    fn metadata(&self) -> IoSpec {
        // Shape description is only available once the session exists.
        let Ok(guard) = self.session.try_lock() else {
            return IoSpec::default();
        };
        let Some(session) = guard.as_ref() else {
            return IoSpec::default();
        };

        IoSpec {
            inputs: session
                .inputs()
                .iter()
                .map(|i| tensor_spec(i.name(), i.dtype()))
                .collect(),
            outputs: session
                .outputs()
                .iter()
                .map(|o| tensor_spec(o.name(), o.dtype()))
                .collect(),
        }
    }

    async fn dispose(&self) {
        let mut guard = self.session.lock().await;
        if guard.take().is_some() {
            info!(model = %self.model_path.display(), "released ONNX session");
        }
    }
}
