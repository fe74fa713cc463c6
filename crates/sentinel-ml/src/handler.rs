//! Prediction handler: validation → preprocessing → inference →
//! postprocessing, as a single logical transaction per request.
//!
//! No partial results: a failure at any stage converts the whole call into
//! an error-shaped response. Nothing escapes `predict` as a raw error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{error, info, warn};

use sentinel_core::registry::ModelRegistryEntry;
use sentinel_core::{DEFAULT_MODEL_ID, Explainability, MlError, ModelRegistry, PredictRequest, PredictResponse};

use crate::backend::Tensor;
use crate::postprocess::{extract_top_tokens, probs_dict, softmax, top_prediction};
use crate::preprocess::{PreprocessConfig, preprocess};
use crate::session::SessionManager;
use crate::vocab::VocabularyRegistry;

/// Name of the input tensor the classifier models expect.
const INPUT_NAME: &str = "input";
/// Name of the output tensor carrying raw logits. Its absence is a
/// backend contract violation.
const LOGITS_NAME: &str = "logits";

/// Handler tuning.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Model used when a request does not name one.
    pub default_model_id: String,
    /// Hard deadline for one inference call.
    pub inference_timeout: Duration,
    /// How many explainability tokens to report.
    pub top_k_tokens: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            default_model_id: DEFAULT_MODEL_ID.to_string(),
            inference_timeout: Duration::from_secs(5),
            top_k_tokens: 5,
        }
    }
}

/// Orchestrates one prediction end to end against the shared registry,
/// vocabulary set, and session pool.
pub struct PredictionHandler {
    registry: Arc<ModelRegistry>,
    vocabs: Arc<VocabularyRegistry>,
    sessions: Arc<SessionManager>,
    config: HandlerConfig,
}

impl PredictionHandler {
    pub fn new(
        registry: Arc<ModelRegistry>,
        vocabs: Arc<VocabularyRegistry>,
        sessions: Arc<SessionManager>,
        config: HandlerConfig,
    ) -> Self {
        Self {
            registry,
            vocabs,
            sessions,
            config,
        }
    }

    /// Run one prediction. Always returns a well-formed response; failures
    /// are reported in its `error` field with elapsed time up to the
    /// failure point.
    pub async fn predict(&self, request: &PredictRequest) -> PredictResponse {
        let start = Instant::now();
        let model_id = if request.model_id.is_empty() {
            self.config.default_model_id.clone()
        } else {
            request.model_id.clone()
        };

        match self.try_predict(&model_id, &request.input.text, start).await {
            Ok(response) => {
                info!(
                    model = %model_id,
                    result = %response.result,
                    confidence = response.confidence,
                    ms = response.inference_ms,
                    "prediction complete"
                );
                response
            }
            Err(err) => {
                let elapsed = start.elapsed().as_millis() as u64;
                match &err {
                    MlError::NotFound(_) => warn!(model = %model_id, "{err}"),
                    // A registry/vocabulary mismatch is a deployment bug.
                    MlError::Configuration(msg) => {
                        error!(model = %model_id, "configuration error: {msg}")
                    }
                    _ => warn!(model = %model_id, "prediction failed: {err}"),
                }
                let message = match err {
                    MlError::NotFound(_) => err.to_string(),
                    _ => format!("Inference failed: {err}"),
                };
                PredictResponse::error_shaped(model_id, elapsed, message)
            }
        }
    }

    async fn try_predict(
        &self,
        model_id: &str,
        text: &str,
        start: Instant,
    ) -> Result<PredictResponse, MlError> {
        let entry = self
            .registry
            .get(model_id)
            .ok_or_else(|| MlError::NotFound(model_id.to_string()))?;

        // Registry entry without a vocabulary: a deployment bug, distinct
        // from an unknown model id.
        let vocab = self.vocabs.get(model_id).ok_or_else(|| {
            MlError::Configuration(format!("vocabulary not found for model {model_id}"))
        })?;

        // Fixed policy: stopwords stay in. Function words carry signal for
        // phishing/intent detection.
        let preprocess_config = PreprocessConfig {
            lowercase: true,
            strip_punctuation: true,
            remove_stopwords: false,
            max_tokens: entry.input_shape.max_tokens,
        };
        let features = preprocess(text, vocab, &preprocess_config);

        let model_path = entry.path.onnx.as_deref().unwrap_or_default();
        let backend = self.sessions.backend(model_id, model_path).await?;

        let inputs = std::collections::HashMap::from([(
            INPUT_NAME.to_string(),
            Tensor::row(features.clone()),
        )]);

        let deadline = self.config.inference_timeout;
        let outputs = match timeout(deadline, backend.run(inputs)).await {
            Ok(result) => result?,
            Err(_) => return Err(MlError::Timeout(deadline.as_millis() as u64)),
        };

        let logits = outputs
            .get(LOGITS_NAME)
            .ok_or_else(|| MlError::Contract("no logits output from model".into()))?;

        let probs = softmax(&logits.data);
        let prediction = top_prediction(&probs, &entry.classes);
        let probs_map = probs_dict(&probs, &entry.classes);
        let top_tokens = extract_top_tokens(&features, vocab, self.config.top_k_tokens);

        Ok(PredictResponse {
            model_id: model_id.to_string(),
            model_version: entry.version.clone(),
            inference_ms: start.elapsed().as_millis() as u64,
            result: prediction.class,
            confidence: prediction.confidence,
            probs: probs_map,
            explainability: Some(Explainability {
                top_tokens: Some(top_tokens),
                attention: None,
            }),
            error: None,
        })
    }

    /// Fan `predict` out over independent requests in parallel. One
    /// request's failure never affects another's result.
    pub async fn predict_batch(&self, requests: &[PredictRequest]) -> Vec<PredictResponse> {
        futures::future::join_all(requests.iter().map(|r| self.predict(r))).await
    }

    pub fn model_info(&self, model_id: &str) -> Option<&ModelRegistryEntry> {
        self.registry.get(model_id)
    }

    pub fn list_models(&self) -> Vec<&ModelRegistryEntry> {
        self.registry.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InferenceBackend;
    use crate::fixtures::FixtureBackend;
    use crate::vocab::Vocabulary;
    use sentinel_core::registry::{InputShape, ModelMetrics, ModelPaths};
    use sentinel_core::ModelFormat;
    use std::collections::HashMap;

    fn registry_entry(id: &str, classes: &[&str]) -> ModelRegistryEntry {
        ModelRegistryEntry {
            id: id.into(),
            task: "classification".into(),
            framework: "pytorch".into(),
            format: ModelFormat::Onnx,
            metrics: ModelMetrics::default(),
            version: "1.0.0".into(),
            exported_at: "2026-01-15T12:00:00Z".parse().unwrap(),
            path: ModelPaths {
                onnx: Some(format!("models/{id}/model.onnx")),
                tfjs: None,
            },
            input_shape: InputShape {
                max_tokens: 128,
                encoding: "utf-8".into(),
            },
            classes: classes.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn test_vocab() -> Vocabulary {
        Vocabulary::build(&["verify your account now click the link"], 100)
    }

    fn handler_with_backend(
        backend: Arc<dyn InferenceBackend>,
    ) -> PredictionHandler {
        let registry = Arc::new(
            ModelRegistry::from_entries(vec![registry_entry(
                "classifier-v1",
                &["benign", "phishing"],
            )])
            .unwrap(),
        );
        let mut vocabs = VocabularyRegistry::new();
        vocabs.insert("classifier-v1", test_vocab());

        let sessions = Arc::new(SessionManager::new(Box::new(move |_, _| backend.clone())));
        PredictionHandler::new(
            registry,
            Arc::new(vocabs),
            sessions,
            HandlerConfig::default(),
        )
    }

    fn phishing_backend() -> Arc<dyn InferenceBackend> {
        // logit[1] dominates → phishing wins.
        Arc::new(FixtureBackend::with_logits(vec![-2.0, 2.0]))
    }

    #[tokio::test]
    async fn successful_prediction_is_fully_assembled() {
        let handler = handler_with_backend(phishing_backend());
        let request = PredictRequest::new("classifier-v1", "Verify your account now!");

        let response = handler.predict(&request).await;

        assert!(!response.is_error());
        assert_eq!(response.result, "phishing");
        assert_eq!(response.model_version, "1.0.0");
        assert!(response.confidence > 0.9);
        let total: f32 = response.probs.values().sum();
        assert!((total - 1.0).abs() < 1e-5);

        let tokens = response
            .explainability
            .unwrap()
            .top_tokens
            .unwrap();
        assert!(!tokens.is_empty());
        assert!(tokens.contains(&"verify".to_string()));
    }

    #[tokio::test]
    async fn unknown_model_is_request_error() {
        let handler = handler_with_backend(phishing_backend());
        let request = PredictRequest::new("nonexistent-v9", "some text");

        let response = handler.predict(&request).await;

        assert_eq!(response.result, "error");
        assert_eq!(response.confidence, 0.0);
        assert!(response.probs.is_empty());
        assert_eq!(
            response.error.as_deref(),
            Some("Model nonexistent-v9 not found")
        );
    }

    #[tokio::test]
    async fn missing_vocabulary_is_configuration_error() {
        let registry = Arc::new(
            ModelRegistry::from_entries(vec![registry_entry("classifier-v1", &["a", "b"])])
                .unwrap(),
        );
        // Registry knows the model; vocab registry does not.
        let vocabs = Arc::new(VocabularyRegistry::new());
        let backend = phishing_backend();
        let sessions = Arc::new(SessionManager::new(Box::new(move |_, _| backend.clone())));
        let handler =
            PredictionHandler::new(registry, vocabs, sessions, HandlerConfig::default());

        let response = handler
            .predict(&PredictRequest::new("classifier-v1", "text"))
            .await;

        assert!(response.is_error());
        assert!(response.error.unwrap().contains("vocabulary not found"));
    }

    #[tokio::test]
    async fn empty_model_id_uses_default() {
        let handler = handler_with_backend(phishing_backend());
        let request = PredictRequest::new("", "hello");

        let response = handler.predict(&request).await;
        assert_eq!(response.model_id, "classifier-v1");
        assert!(!response.is_error());
    }

    #[tokio::test]
    async fn missing_logits_output_is_contract_error() {
        let backend =
            Arc::new(FixtureBackend::with_logits(vec![0.0, 1.0]).with_output_name("scores"));
        let handler = handler_with_backend(backend);

        let response = handler
            .predict(&PredictRequest::new("classifier-v1", "text"))
            .await;

        assert!(response.is_error());
        assert!(response.error.unwrap().contains("no logits output"));
    }

    #[tokio::test]
    async fn backend_failure_becomes_error_response() {
        let backend = Arc::new(FixtureBackend::with_logits(vec![0.0]).failing_run());
        let handler = handler_with_backend(backend);

        let response = handler
            .predict(&PredictRequest::new("classifier-v1", "text"))
            .await;

        assert!(response.is_error());
        assert_eq!(response.result, "error");
        assert!(response.error.unwrap().starts_with("Inference failed:"));
    }

    #[tokio::test]
    async fn slow_backend_hits_deadline() {
        let backend = Arc::new(
            FixtureBackend::with_logits(vec![0.0, 1.0])
                .with_delay(Duration::from_secs(60)),
        );
        let registry = Arc::new(
            ModelRegistry::from_entries(vec![registry_entry("classifier-v1", &["a", "b"])])
                .unwrap(),
        );
        let mut vocabs = VocabularyRegistry::new();
        vocabs.insert("classifier-v1", test_vocab());
        let sessions = Arc::new(SessionManager::new(Box::new(move |_, _| backend.clone())));
        let handler = PredictionHandler::new(
            registry,
            Arc::new(vocabs),
            sessions,
            HandlerConfig {
                inference_timeout: Duration::from_millis(20),
                ..Default::default()
            },
        );

        let response = handler
            .predict(&PredictRequest::new("classifier-v1", "text"))
            .await;

        assert!(response.is_error());
        assert!(response.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn empty_text_still_yields_well_formed_result() {
        // All-zero features are a valid model input; the handler does not
        // reject them.
        let handler = handler_with_backend(phishing_backend());
        let response = handler
            .predict(&PredictRequest::new("classifier-v1", ""))
            .await;

        assert!(!response.is_error());
        let tokens = response.explainability.unwrap().top_tokens.unwrap();
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn batch_failures_are_isolated() {
        let handler = handler_with_backend(phishing_backend());
        let requests = vec![
            PredictRequest::new("classifier-v1", "verify account"),
            PredictRequest::new("nonexistent-v9", "whatever"),
            PredictRequest::new("classifier-v1", "click the link"),
        ];

        let responses = handler.predict_batch(&requests).await;

        assert_eq!(responses.len(), 3);
        assert!(!responses[0].is_error());
        assert!(responses[1].is_error());
        assert!(!responses[2].is_error());
    }

    #[tokio::test]
    async fn model_info_and_listing() {
        let handler = handler_with_backend(phishing_backend());
        assert!(handler.model_info("classifier-v1").is_some());
        assert!(handler.model_info("other").is_none());
        assert_eq!(handler.list_models().len(), 1);
    }

    #[tokio::test]
    async fn backend_reused_across_requests() {
        let backend = Arc::new(FixtureBackend::with_logits(vec![0.0, 1.0]));
        let backend_for_factory = backend.clone();
        let registry = Arc::new(
            ModelRegistry::from_entries(vec![registry_entry("classifier-v1", &["a", "b"])])
                .unwrap(),
        );
        let mut vocabs = VocabularyRegistry::new();
        vocabs.insert("classifier-v1", test_vocab());
        let sessions = Arc::new(SessionManager::new(Box::new(move |_, _| {
            backend_for_factory.clone() as Arc<dyn InferenceBackend>
        })));
        let handler = PredictionHandler::new(
            registry,
            Arc::new(vocabs),
            sessions,
            HandlerConfig::default(),
        );

        for _ in 0..3 {
            handler
                .predict(&PredictRequest::new("classifier-v1", "text"))
                .await;
        }

        assert_eq!(backend.init_count(), 1);
        assert_eq!(backend.run_count(), 3);
    }
}
