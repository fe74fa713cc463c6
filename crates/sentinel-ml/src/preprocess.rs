//! Text preprocessing: raw text → fixed-length bag-of-words feature vector.
//!
//! The pipeline is `clean → tokenize → features`. Every step is
//! independently toggleable and the whole function is pure: the same
//! (text, vocabulary, config) always produces a bit-identical vector,
//! which is what makes caching and reproducible tests possible.

use std::collections::HashMap;

use crate::vocab::Vocabulary;

/// Fixed closed set of common function words, removed only when
/// `remove_stopwords` is enabled. Deliberately off for phishing/intent
/// models: function words carry urgency/social-engineering signal.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "am", "be", "been", "being", "have", "has",
    "had", "do", "does", "did", "will", "would", "could", "should", "can", "may", "might", "must",
    "in", "on", "at", "to", "for", "of", "with", "from", "by", "up", "about", "into", "as",
];

/// Preprocessing policy. Each step can be toggled independently.
#[derive(Debug, Clone, Copy)]
pub struct PreprocessConfig {
    pub lowercase: bool,
    pub strip_punctuation: bool,
    pub remove_stopwords: bool,
    /// Token budget: tokens past this point are silently dropped. A cost
    /// cap and a documented precision/recall tradeoff, not a bug.
    pub max_tokens: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            strip_punctuation: true,
            remove_stopwords: false,
            max_tokens: 128,
        }
    }
}

/// Basic text cleaning: lowercase, strip punctuation, remove stopwords.
///
/// Punctuation stripping replaces any character outside `[A-Za-z0-9_\s]`
/// with a space, so token boundaries survive.
pub fn clean_text(text: &str, config: &PreprocessConfig) -> String {
    let mut cleaned = if config.lowercase {
        text.to_lowercase()
    } else {
        text.to_string()
    };

    if config.strip_punctuation {
        cleaned = cleaned
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();
    }

    if config.remove_stopwords {
        cleaned = cleaned
            .split_whitespace()
            .filter(|token| !STOPWORDS.contains(token))
            .collect::<Vec<_>>()
            .join(" ");
    }

    cleaned.trim().to_string()
}

/// Split on runs of whitespace, discarding empty tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Map tokens onto a bag-of-words count vector.
///
/// Only the first `max_tokens` tokens contribute. Unknown tokens contribute
/// nothing (no UNK bucket). The output length is always exactly the
/// vocabulary size, however short the input — including empty input, which
/// yields the all-zero vector rather than an error.
pub fn tokens_to_features(tokens: &[&str], vocab: &Vocabulary, max_tokens: usize) -> Vec<f32> {
    let mut features = vec![0.0f32; vocab.len()];
    for token in tokens.iter().take(max_tokens) {
        if let Some(idx) = vocab.get(token) {
            features[idx] += 1.0;
        }
    }
    features
}

/// Full preprocessing pipeline: text → clean → tokenize → features.
pub fn preprocess(text: &str, vocab: &Vocabulary, config: &PreprocessConfig) -> Vec<f32> {
    let cleaned = clean_text(text, config);
    let tokens = tokenize(&cleaned);
    tokens_to_features(&tokens, vocab, config.max_tokens)
}

/// TF-IDF weighted features. Tokens missing from `idf_weights` fall back
/// to an IDF of 1 (plain normalized term frequency).
pub fn tf_idf(tokens: &[&str], vocab: &Vocabulary, idf_weights: &HashMap<String, f32>) -> Vec<f32> {
    let mut features = vec![0.0f32; vocab.len()];
    if tokens.is_empty() {
        return features;
    }

    let mut term_freq: HashMap<&str, f32> = HashMap::new();
    for token in tokens {
        *term_freq.entry(token).or_insert(0.0) += 1.0;
    }

    let total = tokens.len() as f32;
    for (token, tf) in term_freq {
        if let Some(idx) = vocab.get(token) {
            let idf = idf_weights.get(token).copied().unwrap_or(1.0);
            features[idx] = (tf / total) * idf;
        }
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(tokens: &[&str]) -> Vocabulary {
        Vocabulary::from_index(
            tokens
                .iter()
                .enumerate()
                .map(|(i, t)| (t.to_string(), i))
                .collect(),
        )
    }

    #[test]
    fn clean_lowercases_and_strips_punctuation() {
        let config = PreprocessConfig::default();
        assert_eq!(
            clean_text("Verify your ACCOUNT, now!", &config),
            "verify your account  now"
        );
    }

    #[test]
    fn clean_preserves_underscores_and_digits() {
        let config = PreprocessConfig::default();
        assert_eq!(clean_text("user_id 42", &config), "user_id 42");
    }

    #[test]
    fn clean_can_skip_lowercasing() {
        let config = PreprocessConfig {
            lowercase: false,
            ..Default::default()
        };
        assert_eq!(clean_text("Hello World", &config), "Hello World");
    }

    #[test]
    fn clean_removes_stopwords_when_enabled() {
        let config = PreprocessConfig {
            remove_stopwords: true,
            ..Default::default()
        };
        assert_eq!(
            clean_text("click on the link to win", &config),
            "click link win"
        );
    }

    #[test]
    fn stopwords_kept_by_default() {
        let config = PreprocessConfig::default();
        assert_eq!(clean_text("the link", &config), "the link");
    }

    #[test]
    fn tokenize_splits_on_whitespace_runs() {
        assert_eq!(tokenize("a  b\t c\n"), vec!["a", "b", "c"]);
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn features_count_known_tokens() {
        let vocab = vocab(&["click", "link", "free"]);
        let features = tokens_to_features(&["click", "link", "click"], &vocab, 128);
        assert_eq!(features, vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn unknown_tokens_contribute_nothing() {
        let vocab = vocab(&["click"]);
        let features = tokens_to_features(&["mystery", "words"], &vocab, 128);
        assert_eq!(features, vec![0.0]);
    }

    #[test]
    fn truncation_drops_later_tokens() {
        let vocab = vocab(&["a", "b"]);
        let features = tokens_to_features(&["a", "a", "b"], &vocab, 2);
        // Only the first two tokens count.
        assert_eq!(features, vec![2.0, 0.0]);
    }

    #[test]
    fn vector_length_always_equals_vocab_size() {
        let vocab = vocab(&["a", "b", "c", "d"]);
        let config = PreprocessConfig::default();
        assert_eq!(preprocess("", &vocab, &config).len(), 4);
        assert_eq!(preprocess("a", &vocab, &config).len(), 4);
        assert_eq!(preprocess("a b c d a b c d", &vocab, &config).len(), 4);
    }

    #[test]
    fn empty_input_yields_all_zero_vector() {
        let vocab = vocab(&["a", "b"]);
        let features = preprocess("", &vocab, &PreprocessConfig::default());
        assert!(features.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn punctuation_only_input_yields_all_zero_vector() {
        let vocab = vocab(&["a", "b"]);
        let features = preprocess("!!! ???", &vocab, &PreprocessConfig::default());
        assert!(features.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn preprocess_is_deterministic() {
        let vocab = vocab(&["verify", "account", "now"]);
        let config = PreprocessConfig::default();
        let text = "Verify your account NOW!";
        let a = preprocess(text, &vocab, &config);
        let b = preprocess(text, &vocab, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn tf_idf_weights_by_inverse_frequency() {
        let vocab = vocab(&["common", "rare"]);
        let idf = HashMap::from([("common".to_string(), 1.0), ("rare".to_string(), 3.0)]);
        let features = tf_idf(&["common", "rare"], &vocab, &idf);
        // tf is 0.5 each; rare is weighted 3x.
        assert!((features[0] - 0.5).abs() < 1e-6);
        assert!((features[1] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn tf_idf_empty_tokens() {
        let vocab = vocab(&["a"]);
        let features = tf_idf(&[], &vocab, &HashMap::new());
        assert_eq!(features, vec![0.0]);
    }
}
