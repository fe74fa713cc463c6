//! Command implementations: wire the registry, vocabularies, session pool,
//! and pipeline together for one-shot CLI runs.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use sentinel_core::{ModelRegistry, PredictRequest};
use sentinel_ml::{
    HandlerConfig, MlPipeline, PipelineConfig, PredictionHandler, SessionManager, Vocabulary,
    VocabularyRegistry,
};
use sentinel_routing::{TokenMetrics, route_chat};

/// Load the registry plus one vocabulary per registered model from
/// `vocab_dir/<model-id>.vocab.json`.
fn load_stack(
    registry_path: &Path,
    vocab_dir: &Path,
) -> anyhow::Result<(Arc<ModelRegistry>, Arc<VocabularyRegistry>)> {
    let registry = ModelRegistry::load(registry_path).context("loading model registry")?;

    let mut vocabs = VocabularyRegistry::new();
    for entry in registry.list() {
        let vocab_path = vocab_dir.join(format!("{}.vocab.json", entry.id));
        let vocab = Vocabulary::load(&vocab_path)
            .with_context(|| format!("loading vocabulary for {}", entry.id))?;
        vocabs.insert(entry.id.clone(), vocab);
    }

    Ok((Arc::new(registry), Arc::new(vocabs)))
}

fn build_pipeline(
    registry: Arc<ModelRegistry>,
    vocabs: Arc<VocabularyRegistry>,
) -> MlPipeline {
    let sessions = Arc::new(SessionManager::onnx());
    let handler = Arc::new(PredictionHandler::new(
        registry,
        vocabs,
        sessions,
        HandlerConfig::default(),
    ));
    MlPipeline::new(handler, PipelineConfig::default())
}

fn request_for(text: &str, model: Option<&str>) -> PredictRequest {
    PredictRequest::new(model.unwrap_or(sentinel_core::DEFAULT_MODEL_ID), text)
}

pub async fn predict(
    text: &str,
    model: Option<&str>,
    registry_path: &Path,
    vocab_dir: &Path,
) -> anyhow::Result<()> {
    let request = request_for(text, model);
    let issues = request.validate();
    if !issues.is_empty() {
        anyhow::bail!("invalid request: {}", serde_json::to_string(&issues)?);
    }

    let (registry, vocabs) = load_stack(registry_path, vocab_dir)?;
    let pipeline = build_pipeline(registry, vocabs);

    let response = pipeline.predict(&request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub async fn route(
    text: &str,
    model: Option<&str>,
    registry_path: &Path,
    vocab_dir: &Path,
) -> anyhow::Result<()> {
    let request = request_for(text, model);
    let issues = request.validate();
    if !issues.is_empty() {
        anyhow::bail!("invalid request: {}", serde_json::to_string(&issues)?);
    }

    let (registry, vocabs) = load_stack(registry_path, vocab_dir)?;
    let pipeline = build_pipeline(registry, vocabs);
    let metrics = TokenMetrics::default();

    let prediction = pipeline.predict(&request).await;
    let routing = route_chat(text, &prediction);
    metrics.record(&routing);

    println!("{}", serde_json::to_string_pretty(&routing)?);
    eprintln!(
        "savings: {}",
        serde_json::to_string(&metrics.snapshot())?
    );
    Ok(())
}

pub fn models(registry_path: &Path) -> anyhow::Result<()> {
    let registry = ModelRegistry::load(registry_path).context("loading model registry")?;
    let mut entries = registry.list();
    entries.sort_by(|a, b| a.id.cmp(&b.id));
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

pub fn build_vocab(corpus_path: &Path, max_size: usize, out: &Path) -> anyhow::Result<()> {
    let corpus = std::fs::read_to_string(corpus_path)
        .with_context(|| format!("reading corpus {}", corpus_path.display()))?;
    let lines: Vec<&str> = corpus.lines().filter(|l| !l.trim().is_empty()).collect();

    let vocab = Vocabulary::build(&lines, max_size);
    vocab.save(out).context("writing vocabulary")?;

    eprintln!(
        "built vocabulary: {} tokens from {} documents -> {}",
        vocab.len(),
        lines.len(),
        out.display()
    );
    Ok(())
}
