//! RAGCHAT Server Binary
//!
//! Retrieval-augmented chatbot over HTTP.

use clap::{Parser, ValueEnum};
use ragchat::storage::EmbeddingStore;
use ragchat::{
    AofConfig, AofSyncMode, AppState, FileEmbeddingStore, MemoryEmbeddingStore, ModelConfig, OllamaClient,
    RagConfig, RagOrchestrator, Server, ServerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SyncMode {
    /// fsync after every append
    Always,
    /// Flush to the OS only
    Flush,
}

/// RAGCHAT Server - Retrieval-Augmented Chatbot
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Bind address
    #[arg(short, long, env = "RAGCHAT_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Port number
    #[arg(short, long, env = "RAGCHAT_PORT", default_value_t = 8080)]
    port: u16,

    /// Base URL of the Ollama-compatible model service
    #[arg(long, env = "RAGCHAT_OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Model used to embed messages and questions
    #[arg(long, env = "RAGCHAT_EMBEDDING_MODEL", default_value = "nomic-embed-text")]
    embedding_model: String,

    /// Model used to generate answers
    #[arg(long, env = "RAGCHAT_GENERATION_MODEL", default_value = "llama3")]
    generation_model: String,

    /// Embedding log file
    #[arg(long, env = "RAGCHAT_DATA_FILE", default_value = "./data/embeddings.aof")]
    data_file: PathBuf,

    /// Keep records in memory only
    #[arg(long, env = "RAGCHAT_IN_MEMORY", default_value_t = false)]
    in_memory: bool,

    /// Log sync policy
    #[arg(long, value_enum, env = "RAGCHAT_SYNC", default_value_t = SyncMode::Always)]
    sync: SyncMode,

    /// Keep only the best N matches as context (0 = all)
    #[arg(long, env = "RAGCHAT_TOP_K", default_value_t = 0)]
    top_k: usize,

    /// Deadline for one ask in seconds (0 = none)
    #[arg(long, env = "RAGCHAT_ASK_TIMEOUT", default_value_t = 0)]
    ask_timeout: u64,

    /// Model service request timeout in seconds (0 = none)
    #[arg(long, env = "RAGCHAT_MODEL_TIMEOUT", default_value_t = 300)]
    model_timeout: u64,
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ragchat=info".parse()?))
        .init();

    let args = Args::parse();

    let model_config = ModelConfig::default()
        .with_base_url(&args.ollama_url)
        .with_embedding_model(&args.embedding_model)
        .with_generation_model(&args.generation_model)
        .with_request_timeout(seconds(args.model_timeout));
    let client = Arc::new(OllamaClient::new(model_config)?);

    let store: Arc<dyn EmbeddingStore> = if args.in_memory {
        info!("Using in-memory store, records are lost on exit");
        Arc::new(MemoryEmbeddingStore::new())
    } else {
        let sync_mode = match args.sync {
            SyncMode::Always => AofSyncMode::Always,
            SyncMode::Flush => AofSyncMode::OnFlush,
        };
        let aof = AofConfig::default()
            .with_path(&args.data_file)
            .with_sync_mode(sync_mode);
        Arc::new(FileEmbeddingStore::with_config(aof)?)
    };

    let rag_config = RagConfig::default()
        .with_top_k((args.top_k > 0).then_some(args.top_k))
        .with_request_timeout(seconds(args.ask_timeout));

    info!(
        "Starting RAGCHAT server on {}:{} (model service {}, {} stored records)",
        args.bind,
        args.port,
        args.ollama_url,
        store.len()
    );

    let rag = RagOrchestrator::new(client, store, rag_config);
    let config = ServerConfig::default()
        .with_bind(&args.bind)
        .with_port(args.port);

    Server::new(config, AppState::new(rag)).run().await?;

    Ok(())
}
