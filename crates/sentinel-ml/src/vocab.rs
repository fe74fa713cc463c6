//! Token vocabulary: the mapping that gives every feature index its meaning.
//!
//! A vocabulary is built offline from a corpus, shipped as a JSON artifact
//! next to the model it was built for, and loaded read-only at startup.
//! Index assignment is frequency-ranked with first-seen tie-breaking, so a
//! rebuild over the same corpus reproduces the identical mapping.

use std::collections::HashMap;
use std::path::Path;

use sentinel_core::MlError;

use crate::preprocess::tokenize;

/// Token → dense index in `[0, len)`. One per model.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build a vocabulary from raw corpus texts.
    ///
    /// Tokens are counted across the whole corpus, sorted descending by
    /// frequency (ties broken by first-seen order), and the top `max_size`
    /// get indices in that order starting at 0.
    pub fn build<S: AsRef<str>>(corpus: &[S], max_size: usize) -> Self {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        let mut order = 0usize;

        for text in corpus {
            for token in tokenize(text.as_ref()) {
                *counts.entry(token).or_insert(0) += 1;
                first_seen.entry(token).or_insert_with(|| {
                    order += 1;
                    order
                });
            }
        }

        let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(first_seen[a.0].cmp(&first_seen[b.0])));
        ranked.truncate(max_size);

        let index = ranked
            .into_iter()
            .enumerate()
            .map(|(idx, (token, _))| (token.to_string(), idx))
            .collect();

        Self { index }
    }

    /// Construct from an existing token → index mapping.
    pub fn from_index(index: HashMap<String, usize>) -> Self {
        Self { index }
    }

    /// Load from a JSON object of token → index.
    pub fn load(path: &Path) -> Result<Self, MlError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| MlError::Configuration(format!("read vocabulary {path:?}: {e}")))?;
        let index: HashMap<String, usize> = serde_json::from_str(&raw)
            .map_err(|e| MlError::Configuration(format!("parse vocabulary {path:?}: {e}")))?;
        tracing::info!(tokens = index.len(), path = %path.display(), "loaded vocabulary");
        Ok(Self { index })
    }

    /// Serialize to the JSON artifact format.
    pub fn save(&self, path: &Path) -> Result<(), MlError> {
        let json = serde_json::to_string_pretty(&self.index)
            .map_err(|e| MlError::Configuration(format!("serialize vocabulary: {e}")))?;
        std::fs::write(path, json)
            .map_err(|e| MlError::Configuration(format!("write vocabulary {path:?}: {e}")))?;
        Ok(())
    }

    pub fn get(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Vocabulary size == feature vector length.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Invert the mapping (index → token) for explainability output.
    pub fn inverted(&self) -> HashMap<usize, &str> {
        self.index.iter().map(|(t, &i)| (i, t.as_str())).collect()
    }
}

/// Vocabularies keyed by the model id they were built for.
///
/// A model present in the registry without a matching vocabulary is a
/// deployment bug, surfaced as [`MlError::Configuration`] by the handler.
#[derive(Debug, Default)]
pub struct VocabularyRegistry {
    vocabs: HashMap<String, Vocabulary>,
}

impl VocabularyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, model_id: impl Into<String>, vocab: Vocabulary) {
        self.vocabs.insert(model_id.into(), vocab);
    }

    pub fn get(&self, model_id: &str) -> Option<&Vocabulary> {
        self.vocabs.get(model_id)
    }
}
