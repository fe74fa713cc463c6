mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sentinel", version, about = "Text classification and chat routing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a piece of text and print the prediction
    Predict {
        /// Text to classify
        #[arg(long)]
        text: String,
        /// Model id (defaults to classifier-v1)
        #[arg(long)]
        model: Option<String>,
        /// Path to the model registry JSON file
        #[arg(long, env = "SENTINEL_REGISTRY", default_value = "models/registry.json")]
        registry: PathBuf,
        /// Directory holding `<model-id>.vocab.json` files
        #[arg(long, env = "SENTINEL_VOCAB_DIR", default_value = "models")]
        vocab_dir: PathBuf,
    },
    /// Classify a chat message and print the routing decision
    Route {
        #[arg(long)]
        text: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, env = "SENTINEL_REGISTRY", default_value = "models/registry.json")]
        registry: PathBuf,
        #[arg(long, env = "SENTINEL_VOCAB_DIR", default_value = "models")]
        vocab_dir: PathBuf,
    },
    /// List models in the registry
    Models {
        #[arg(long, env = "SENTINEL_REGISTRY", default_value = "models/registry.json")]
        registry: PathBuf,
    },
    /// Build a vocabulary from a corpus file (one document per line)
    BuildVocab {
        #[arg(long)]
        corpus: PathBuf,
        #[arg(long, default_value_t = 5000)]
        max_size: usize,
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::debug!("sentinel v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Predict {
            text,
            model,
            registry,
            vocab_dir,
        } => commands::predict(&text, model.as_deref(), &registry, &vocab_dir).await,
        Command::Route {
            text,
            model,
            registry,
            vocab_dir,
        } => commands::route(&text, model.as_deref(), &registry, &vocab_dir).await,
        Command::Models { registry } => commands::models(&registry),
        Command::BuildVocab {
            corpus,
            max_size,
            out,
        } => commands::build_vocab(&corpus, max_size, &out),
    }
}
