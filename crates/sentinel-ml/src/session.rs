//! Session manager: the sole owner of inference backends.
//!
//! Backends are expensive (they hold native runtime state), so the manager
//! keeps at most one per model id for the process lifetime, created on
//! first access. Creation is single-flight: concurrent first-accesses for
//! the same model id share one initialization instead of racing into
//! duplicates. The manager is an explicitly constructed, injected object,
//! not a global — its lifecycle belongs to the hosting service.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use sentinel_core::MlError;

use crate::backend::InferenceBackend;

/// Constructs a backend for a (model id, artifact path) pair. Injected so
/// tests can substitute deterministic fixtures for the ONNX engine.
pub type BackendFactory =
    Box<dyn Fn(&str, &str) -> Arc<dyn InferenceBackend> + Send + Sync>;

type BackendCell = Arc<OnceCell<Arc<dyn InferenceBackend>>>;

/// Keyed pool of lazily created inference backends, one per model id.
pub struct SessionManager {
    factory: BackendFactory,
    cells: Mutex<HashMap<String, BackendCell>>,
}

impl SessionManager {
    pub fn new(factory: BackendFactory) -> Self {
        Self {
            factory,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Session manager producing ONNX Runtime backends.
    #[cfg(feature = "onnx")]
    pub fn onnx() -> Self {
        Self::new(Box::new(|_, path| {
            Arc::new(crate::OnnxBackend::new(path)) as Arc<dyn InferenceBackend>
        }))
    }

    /// Get the backend for `model_id`, creating and initializing it on
    /// first access.
    ///
    /// Repeated calls return the identical instance without
    /// reinitializing. A failed initialization is not cached: the next
    /// call retries from scratch.
    pub async fn backend(
        &self,
        model_id: &str,
        model_path: &str,
    ) -> Result<Arc<dyn InferenceBackend>, MlError> {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(model_id.to_string()).or_default().clone()
        };

        // OnceCell makes initialization single-flight per key: concurrent
        // first-accesses await the same in-flight init.
        let backend = cell
            .get_or_try_init(|| async {
                info!(model = model_id, path = model_path, "creating inference session");
                let backend = (self.factory)(model_id, model_path);
                backend.initialize().await?;
                Ok::<_, MlError>(backend)
            })
            .await?;

        debug!(model = model_id, "inference session acquired");
        Ok(backend.clone())
    }

    /// Release every backend and clear the pool. Shutdown only — never
    /// safe to call mid-request.
    pub async fn dispose(&self) {
        let cells = {
            let mut map = self.cells.lock().await;
            std::mem::take(&mut *map)
        };
        for (model_id, cell) in cells {
            if let Some(backend) = cell.get() {
                backend.dispose().await;
                info!(model = %model_id, "disposed inference session");
            }
        }
    }
}
