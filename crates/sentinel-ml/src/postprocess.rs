//! Postprocessing: raw logits → probabilities → class decision →
//! explainability tokens.

use std::collections::HashMap;

use crate::vocab::Vocabulary;

/// The calibrated class decision extracted from a probability vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class: String,
    /// Probability mass assigned to the predicted class.
    pub confidence: f32,
    pub class_index: usize,
}

/// A prediction annotated with a threshold check.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdedPrediction {
    pub class: String,
    pub confidence: f32,
    pub is_confident: bool,
}

/// Numerically stable softmax: the maximum logit is subtracted before
/// exponentiating, so logits differing by large magnitudes do not overflow.
///
/// Outputs are in (0, 1], sum to 1 within floating tolerance, and preserve
/// the ordering of the input.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Pick the winning class: linear scan for the maximum probability, first
/// index wins ties. When `classes` is shorter than `probs` at the winning
/// index, the class falls back to `"unknown"` rather than failing.
pub fn top_prediction(probs: &[f32], classes: &[String]) -> Prediction {
    let mut max_prob = f32::NEG_INFINITY;
    let mut max_idx = 0usize;

    for (i, &p) in probs.iter().enumerate() {
        if p > max_prob {
            max_prob = p;
            max_idx = i;
        }
    }

    Prediction {
        class: classes
            .get(max_idx)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
        confidence: if probs.is_empty() { 0.0 } else { max_prob },
        class_index: max_idx,
    }
}

/// Zip probabilities with class labels by position, truncated to the
/// shorter of the two.
pub fn probs_dict(probs: &[f32], classes: &[String]) -> HashMap<String, f32> {
    classes
        .iter()
        .zip(probs.iter())
        .map(|(c, &p)| (c.clone(), p))
        .collect()
}

/// Extract the ≤ `top_k` tokens with the largest positive feature values.
///
/// This is the explainability signal: which tokens the bag-of-words
/// representation weighted most heavily, not a causal attribution. Ties in
/// magnitude are broken by vocabulary index ascending so the output is
/// stable across runs.
pub fn extract_top_tokens(features: &[f32], vocab: &Vocabulary, top_k: usize) -> Vec<String> {
    let inverted = vocab.inverted();

    let mut scored: Vec<(usize, f32)> = features
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v > 0.0)
        .map(|(i, &v)| (i, v))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    scored
        .into_iter()
        .take(top_k)
        .filter_map(|(i, _)| inverted.get(&i).map(|t| t.to_string()))
        .collect()
}

/// Annotate a prediction with an inclusive confidence threshold check.
pub fn apply_threshold(prediction: &Prediction, threshold: f32) -> ThresholdedPrediction {
    ThresholdedPrediction {
        class: prediction.class.clone(),
        confidence: prediction.confidence,
        is_confident: prediction.confidence >= threshold,
    }
}
