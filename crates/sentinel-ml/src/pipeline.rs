//! Pipeline adapter: a uniform predict surface over one or more handlers.
//!
//! Callers never receive a bare error from this layer — only a well-formed
//! response, with `error` populated when every configured backend failed.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use sentinel_core::registry::ModelRegistryEntry;
use sentinel_core::{PredictRequest, PredictResponse};

use crate::handler::PredictionHandler;

/// The narrow capability a pipeline needs from a backend: one request in,
/// one well-formed response out.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, request: &PredictRequest) -> PredictResponse;

    fn model_info(&self, _model_id: &str) -> Option<&ModelRegistryEntry> {
        None
    }

    fn list_models(&self) -> Vec<&ModelRegistryEntry> {
        Vec::new()
    }
}

#[async_trait]
impl Predictor for PredictionHandler {
    async fn predict(&self, request: &PredictRequest) -> PredictResponse {
        PredictionHandler::predict(self, request).await
    }

    fn model_info(&self, model_id: &str) -> Option<&ModelRegistryEntry> {
        PredictionHandler::model_info(self, model_id)
    }

    fn list_models(&self) -> Vec<&ModelRegistryEntry> {
        PredictionHandler::list_models(self)
    }
}

/// Pipeline tuning.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Try the fallback handler when the primary returns an error-shaped
    /// response.
    pub prefer_fallback: bool,
    /// Default confidence gate for [`MlPipeline::is_confident`].
    pub confidence_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prefer_fallback: false,
            confidence_threshold: 0.5,
        }
    }
}

/// Wraps a primary handler and an optional fallback behind one contract.
pub struct MlPipeline {
    primary: Option<Arc<dyn Predictor>>,
    fallback: Option<Arc<dyn Predictor>>,
    config: PipelineConfig,
}

impl MlPipeline {
    pub fn new(primary: Arc<dyn Predictor>, config: PipelineConfig) -> Self {
        Self {
            primary: Some(primary),
            fallback: None,
            config,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Predictor>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// A pipeline with no configured backends; every predict call yields
    /// an error-shaped response.
    pub fn empty(config: PipelineConfig) -> Self {
        Self {
            primary: None,
            fallback: None,
            config,
        }
    }

    /// Predict via the primary handler, falling back when configured.
    /// Never returns a bare error.
    pub async fn predict(&self, request: &PredictRequest) -> PredictResponse {
        if let Some(primary) = &self.primary {
            let response = primary.predict(request).await;
            if !response.is_error() {
                return response;
            }
            if let (Some(fallback), true) = (&self.fallback, self.config.prefer_fallback) {
                info!(model = %request.model_id, "primary handler failed, trying fallback");
                return fallback.predict(request).await;
            }
            return response;
        }

        warn!("no prediction handler available");
        PredictResponse::error_shaped(
            request.model_id.clone(),
            0,
            "No ML handler available".into(),
        )
    }

    /// Independent parallel fan-out over a batch.
    pub async fn predict_batch(&self, requests: &[PredictRequest]) -> Vec<PredictResponse> {
        futures::future::join_all(requests.iter().map(|r| self.predict(r))).await
    }

    /// True iff the response carries no error and its confidence meets the
    /// effective threshold. An explicit override takes precedence over the
    /// configured default.
    pub fn is_confident(&self, response: &PredictResponse, threshold: Option<f32>) -> bool {
        let effective = threshold.unwrap_or(self.config.confidence_threshold);
        !response.is_error() && response.confidence >= effective
    }

    pub fn model_info(&self, model_id: &str) -> Option<&ModelRegistryEntry> {
        self.primary.as_ref().and_then(|p| p.model_info(model_id))
    }

    pub fn list_models(&self) -> Vec<&ModelRegistryEntry> {
        self.primary
            .as_ref()
            .map(|p| p.list_models())
            .unwrap_or_default()
    }
}
