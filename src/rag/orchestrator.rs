//! RAG Orchestrator
//!
//! Drives one request through embed -> retrieve -> prompt -> generate ->
//! aggregate. Holds no per-request state; the client and store are injected.

use futures::StreamExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn, Span};

use super::config::RagConfig;
use super::prompt::build_prompt;
use crate::error::{RagError, Result};
use crate::model::{FragmentStream, ModelClient};
use crate::storage::{validate_message, EmbeddingStore, TextEmbedding};
use crate::vector::{codec, decode_candidates, rank};

/// Shown when no stored message can ground an answer
pub const NO_CONTEXT_MESSAGE: &str =
    "I don't have enough context to answer that, could you try something different?";

/// Outcome of a successful `ask`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Generated answer and how many stored messages backed it
    Grounded { text: String, matches: usize },
    /// Nothing in the store could be ranked against the question
    NoContext,
}

impl Answer {
    /// User-facing text
    pub fn text(&self) -> &str {
        match self {
            Answer::Grounded { text, .. } => text,
            Answer::NoContext => NO_CONTEXT_MESSAGE,
        }
    }
}

/// Request stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Retrieving,
    PromptBuilding,
    Generating,
    Aggregating,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::Retrieving => "retrieving",
            Stage::PromptBuilding => "prompt_building",
            Stage::Generating => "generating",
            Stage::Aggregating => "aggregating",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the current stage on the request span
struct StageTracker {
    stage: Stage,
}

impl StageTracker {
    fn new() -> Self {
        let tracker = Self {
            stage: Stage::Embedding,
        };
        Span::current().record("stage", tracing::field::display(tracker.stage));
        tracker
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = %self.stage, to = %stage, "Stage transition");
        self.stage = stage;
        Span::current().record("stage", tracing::field::display(stage));
    }
}

/// Await `fut` unless `cancel` fires first
async fn cancellable<F: Future>(cancel: &CancellationToken, stage: Stage, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RagError::Cancelled(format!("{} stage", stage))),
        out = fut => Ok(out),
    }
}

fn as_generation_failure(e: RagError) -> RagError {
    match e {
        RagError::GenerationFailed(_) | RagError::Cancelled(_) => e,
        other => RagError::GenerationFailed(other.to_string()),
    }
}

/// Concatenate a fragment stream into one answer.
///
/// Any stream error fails the whole answer; partial text is dropped.
pub async fn aggregate_fragments(mut stream: FragmentStream, cancel: &CancellationToken) -> Result<String> {
    let mut answer = String::new();
    let mut fragments = 0usize;
    let mut finished = false;

    loop {
        let next = cancellable(cancel, Stage::Aggregating, stream.next()).await?;
        match next {
            None => break,
            Some(Ok(fragment)) => {
                answer.push_str(&fragment.text);
                fragments += 1;
                finished |= fragment.is_final;
            }
            Some(Err(e)) => {
                warn!(fragments, error = %e, "Generation stream failed, discarding partial answer");
                return Err(as_generation_failure(e));
            }
        }
    }

    if !finished {
        warn!(fragments, "Generation stream ended without a final fragment");
    }
    debug!(fragments, len = answer.len(), "Aggregated answer");
    Ok(answer)
}

/// Retrieval-augmented question answering over an embedding store
#[derive(Clone)]
pub struct RagOrchestrator {
    client: Arc<dyn ModelClient>,
    store: Arc<dyn EmbeddingStore>,
    config: RagConfig,
}

impl RagOrchestrator {
    pub fn new(client: Arc<dyn ModelClient>, store: Arc<dyn EmbeddingStore>, config: RagConfig) -> Self {
        Self { client, store, config }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn EmbeddingStore> {
        &self.store
    }

    /// Embed `message` and persist it
    #[instrument(skip(self, message), fields(len = message.len()))]
    pub async fn ingest(&self, message: &str) -> Result<TextEmbedding> {
        // Fail before spending a remote call on a message the store will refuse
        validate_message(message)?;

        let vector = self.client.embed(message).await?;
        let record = self.store.append(message, codec::encode(&vector)).await?;

        info!(id = record.id, dimension = vector.len(), "Ingested message");
        Ok(record)
    }

    /// Answer `question` from stored context
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with_cancel(question, &CancellationToken::new()).await
    }

    /// Answer `question`, giving up when `cancel` fires or the configured
    /// request timeout passes
    #[instrument(skip(self, question, cancel), fields(len = question.len(), stage = tracing::field::Empty))]
    pub async fn ask_with_cancel(&self, question: &str, cancel: &CancellationToken) -> Result<Answer> {
        let mut tracker = StageTracker::new();

        let result = match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(question, cancel, &mut tracker))
                .await
                .unwrap_or_else(|_| Err(RagError::Cancelled(format!("deadline of {:?} exceeded", limit)))),
            None => self.run(question, cancel, &mut tracker).await,
        };

        if let Err(e) = &result {
            error!(stage = %tracker.stage, error = %e, "Ask failed");
            tracker.enter(Stage::Failed);
        }
        result
    }

    async fn run(&self, question: &str, cancel: &CancellationToken, tracker: &mut StageTracker) -> Result<Answer> {
        tracker.enter(Stage::Embedding);
        let query = cancellable(cancel, Stage::Embedding, self.client.embed(question))
            .await?
            .map_err(|e| RagError::RetrievalFailed(format!("cannot embed question: {}", e)))?;

        tracker.enter(Stage::Retrieving);
        let records = cancellable(cancel, Stage::Retrieving, self.store.scan_all())
            .await?
            .map_err(|e| RagError::RetrievalFailed(format!("cannot scan store: {}", e)))?;
        let stored = records.len();
        let matches = rank(&query, decode_candidates(records), self.config.top_k);
        debug!(stored, ranked = matches.len(), "Retrieved context");

        if matches.is_empty() {
            info!(stored, "No rankable context for question");
            tracker.enter(Stage::Done);
            return Ok(Answer::NoContext);
        }

        tracker.enter(Stage::PromptBuilding);
        let prompt = build_prompt(&matches, question, &self.config.separator);
        trace!(%prompt, "Built prompt");

        tracker.enter(Stage::Generating);
        let stream = cancellable(cancel, Stage::Generating, self.client.generate(&prompt))
            .await?
            .map_err(as_generation_failure)?;

        tracker.enter(Stage::Aggregating);
        let text = aggregate_fragments(stream, cancel).await?;

        tracker.enter(Stage::Done);
        info!(matches = matches.len(), len = text.len(), "Answered question");
        Ok(Answer::Grounded {
            text,
            matches: matches.len(),
        })
    }
}
