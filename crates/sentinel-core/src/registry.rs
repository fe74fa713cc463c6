//! Static model registry: descriptors for every deployable classifier.
//!
//! Entries are loaded once from a JSON file at startup and are immutable
//! afterwards. The registry is the single source of truth for a model's
//! class labels, input shape, and artifact paths.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::MlError;

/// Artifact format a model ships in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Onnx,
    Tfjs,
    Both,
}

/// Offline evaluation metrics recorded at export time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: Option<f64>,
    pub f1: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
}

/// Artifact paths per format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelPaths {
    pub onnx: Option<String>,
    pub tfjs: Option<String>,
}

/// Expected input shape for the preprocessor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputShape {
    /// Token budget: later tokens are silently dropped by the preprocessor.
    pub max_tokens: usize,
    pub encoding: String,
}

/// Static descriptor for one deployed model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRegistryEntry {
    pub id: String,
    pub task: String,
    pub framework: String,
    pub format: ModelFormat,
    #[serde(default)]
    pub metrics: ModelMetrics,
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub path: ModelPaths,
    pub input_shape: InputShape,
    /// Ordered class labels; the order defines the logit index mapping.
    pub classes: Vec<String>,
}

/// Lookup table of model descriptors, keyed by model id.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    entries: HashMap<String, ModelRegistryEntry>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of entries. Duplicate ids are a
    /// configuration error.
    pub fn from_entries(entries: Vec<ModelRegistryEntry>) -> Result<Self, MlError> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            let id = entry.id.clone();
            if map.insert(id.clone(), entry).is_some() {
                return Err(MlError::Configuration(format!(
                    "duplicate model id {id} in registry"
                )));
            }
        }
        Ok(Self { entries: map })
    }

    /// Load the registry from a JSON file containing an array of entries.
    pub fn load(path: &Path) -> Result<Self, MlError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| MlError::Configuration(format!("read registry {path:?}: {e}")))?;
        let entries: Vec<ModelRegistryEntry> = serde_json::from_str(&raw)
            .map_err(|e| MlError::Configuration(format!("parse registry {path:?}: {e}")))?;
        let registry = Self::from_entries(entries)?;
        tracing::info!(models = registry.len(), path = %path.display(), "loaded model registry");
        Ok(registry)
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelRegistryEntry> {
        self.entries.get(model_id)
    }

    /// All registered entries, in arbitrary order.
    pub fn list(&self) -> Vec<&ModelRegistryEntry> {
        self.entries.values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
