//! Prediction request/response contracts and boundary validation.
//!
//! Validation happens before the core is reached: a request that fails
//! validation never touches the handler. The response is the single shape
//! callers ever see — success and failure differ only in whether `error`
//! is populated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Longest text accepted at the boundary.
pub const MAX_TEXT_LEN: usize = 10_000;

/// Default model when the request does not name one.
pub const DEFAULT_MODEL_ID: &str = "classifier-v1";

/// Language hint for the input text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Auto,
}

/// The text payload of a prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictInput {
    pub text: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, serde_json::Value>>,
}

/// A prediction request as received at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default = "default_model_id")]
    pub model_id: String,
    pub input: PredictInput,
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

impl PredictRequest {
    /// Convenience constructor for the common text-only case.
    pub fn new(model_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            input: PredictInput {
                text: text.into(),
                language: Language::Auto,
                meta: None,
            },
        }
    }

    /// Validate the request, returning every issue found rather than just
    /// the first.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.input.text.is_empty() {
            issues.push(ValidationIssue {
                field: "input.text".into(),
                message: "Text cannot be empty".into(),
            });
        }
        if self.input.text.chars().count() > MAX_TEXT_LEN {
            issues.push(ValidationIssue {
                field: "input.text".into(),
                message: format!("Text exceeds max length of {MAX_TEXT_LEN} chars"),
            });
        }
        issues
    }
}

/// One boundary validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

/// Explainability payload: which tokens the bag-of-words representation
/// weighted most heavily. Not a causal attribution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Explainability {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_tokens: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention: Option<HashMap<String, f32>>,
}

/// The prediction result. Immutable once built; serialized directly as the
/// API response. Presence of `error` means the whole prediction failed,
/// with `confidence = 0` and empty `probs` as the no-prediction sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub model_id: String,
    pub model_version: String,
    pub inference_ms: u64,
    pub result: String,
    pub confidence: f32,
    pub probs: HashMap<String, f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explainability: Option<Explainability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictResponse {
    /// The canonical error shape: `result = "error"`, zero confidence,
    /// empty probability map.
    pub fn error_shaped(model_id: impl Into<String>, inference_ms: u64, error: String) -> Self {
        Self {
            model_id: model_id.into(),
            model_version: "unknown".into(),
            inference_ms,
            result: "error".into(),
            confidence: 0.0,
            probs: HashMap::new(),
            explainability: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_id_applied_on_deserialize() {
        let json = r#"{"input": {"text": "hello"}}"#;
        let req: PredictRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.model_id, "classifier-v1");
        assert_eq!(req.input.language, Language::Auto);
    }

    #[test]
    fn empty_text_rejected() {
        let req = PredictRequest::new("classifier-v1", "");
        let issues = req.validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "input.text");
        assert_eq!(issues[0].message, "Text cannot be empty");
    }

    #[test]
    fn oversized_text_rejected() {
        let req = PredictRequest::new("classifier-v1", "x".repeat(MAX_TEXT_LEN + 1));
        let issues = req.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("10000"));
    }

    #[test]
    fn valid_text_passes() {
        let req = PredictRequest::new("classifier-v1", "verify your account now");
        assert!(req.validate().is_empty());
    }

    #[test]
    fn invalid_language_rejected_by_serde() {
        let json = r#"{"input": {"text": "hi", "language": "fr"}}"#;
        assert!(serde_json::from_str::<PredictRequest>(json).is_err());
    }

    #[test]
    fn error_shape_is_canonical() {
        let resp = PredictResponse::error_shaped("m1", 12, "Model m1 not found".into());
        assert!(resp.is_error());
        assert_eq!(resp.result, "error");
        assert_eq!(resp.confidence, 0.0);
        assert!(resp.probs.is_empty());
        assert_eq!(resp.inference_ms, 12);
    }

    #[test]
    fn success_response_omits_error_field() {
        let resp = PredictResponse {
            model_id: "classifier-v1".into(),
            model_version: "1.0.0".into(),
            inference_ms: 3,
            result: "benign".into(),
            confidence: 0.93,
            probs: HashMap::from([("benign".into(), 0.93), ("phishing".into(), 0.07)]),
            explainability: None,
            error: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("\"explainability\""));
    }
}
