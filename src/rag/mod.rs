//! RAG Module
//!
//! Retrieval-augmented answering: rank stored messages against a question,
//! build a grounded prompt and collect the streamed answer.

mod config;
mod orchestrator;
mod prompt;

pub use config::{RagConfig, DEFAULT_SEPARATOR};
pub use orchestrator::{aggregate_fragments, Answer, RagOrchestrator, Stage, NO_CONTEXT_MESSAGE};
pub use prompt::{build_context, build_prompt};
