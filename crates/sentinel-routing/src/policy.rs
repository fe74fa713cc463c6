//! Intent-driven routing: risk scoring, cached answers, and prompt
//! augmentation.
//!
//! The policy fails open: when classification is down, chat keeps working.
//! An error-shaped prediction is expected input here, not an exceptional
//! case.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use sentinel_core::PredictResponse;

/// Coarse three-tier risk classification derived from the intent score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            Self::High
        } else if score >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Message role in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// One turn in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// The routing outcome for one chat turn. Derived from a prediction,
/// consumed immediately by the chat pipeline, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Answer from cache instead of calling the generative model.
    pub should_skip_generation: bool,
    pub risk_level: RiskLevel,
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_response: Option<String>,
    /// Auxiliary data for downstream prompt augmentation.
    pub context: serde_json::Value,
}

/// Static intent → risk score table. Unknown intents score 0.5: treat
/// unknown as medium risk.
fn risk_score(intent: &str) -> f32 {
    match intent {
        "phishing" => 0.95,
        "malware" => 0.90,
        "credential_request" => 0.85,
        "urgent_action" => 0.70,
        "benign" => 0.05,
        "faq" => 0.00,
        _ => 0.5,
    }
}

/// Static intent → cached answer table.
fn cached_answer(intent: &str) -> Option<&'static str> {
    match intent {
        "faq_credentials" => {
            Some("Your credentials are encrypted with AES-256. Never share them publicly.")
        }
        "faq_security" => {
            Some("Enable 2FA for better security. Always verify URLs before entering credentials.")
        }
        "faq_portfolio" => {
            Some("This portfolio showcases AI & Cybersecurity expertise with Azure integration.")
        }
        "greeting" => Some("Hello! How can I assist you today?"),
        _ => None,
    }
}

/// Confidence a prediction must exceed before a cached answer may replace
/// generation. A cached answer alone is not sufficient.
const SKIP_CONFIDENCE: f32 = 0.7;

/// Derive the routing decision for one chat turn from a prediction.
pub fn route_chat(user_message: &str, prediction: &PredictResponse) -> RoutingDecision {
    if let Some(error) = &prediction.error {
        warn!(error = %error, "classifier unavailable, routing fail-open");
        return RoutingDecision {
            should_skip_generation: false,
            risk_level: RiskLevel::Medium,
            intent: "unknown".into(),
            cached_response: None,
            context: json!({ "ml_error": error }),
        };
    }

    let intent = prediction.result.as_str();
    let confidence = prediction.confidence;
    let score = risk_score(intent);
    let risk_level = RiskLevel::from_score(score);

    let cached = cached_answer(intent);
    let should_skip_generation = cached.is_some() && confidence > SKIP_CONFIDENCE;

    info!(
        intent = intent,
        confidence = confidence,
        risk = ?risk_level,
        skip = should_skip_generation,
        "routed chat turn"
    );

    RoutingDecision {
        should_skip_generation,
        risk_level,
        intent: intent.to_string(),
        cached_response: cached.map(str::to_string),
        context: json!({
            "ml_prediction": prediction,
            "user_message": user_message,
            "risk_annotation": { "level": risk_level, "score": score },
        }),
    }
}

/// Prepend a system-role caution when the turn is high risk; otherwise
/// pass the conversation through unchanged. Purely additive — existing
/// messages are never mutated.
pub fn augment_chat_context(
    messages: &[ChatMessage],
    routing: &RoutingDecision,
) -> Vec<ChatMessage> {
    if routing.risk_level != RiskLevel::High {
        return messages.to_vec();
    }

    let mut augmented = Vec::with_capacity(messages.len() + 1);
    augmented.push(ChatMessage {
        role: ChatRole::System,
        content: format!(
            "ALERT: User message flagged as high-risk ({}). \
             Respond cautiously and never ask for credentials.",
            routing.intent
        ),
        metadata: Some(json!({ "source": "ml_routing", "type": "risk_annotation" })),
    });
    augmented.extend_from_slice(messages);
    augmented
}
