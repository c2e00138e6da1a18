//! Protocol generation over an OpenAI-compatible chat endpoint.
//!
//! This module provides:
//! * [`TextGenerator`]: async trait implemented by all generator backends.
//! * [`ApiGenerator`]: OpenAI-compatible REST API backend.
//! * [`Summarizer`]: hierarchical summarizer (part requests + consolidation).
//! * [`PromptBuilder`]: part and consolidation instructions.
//! * [`chunk_paragraphs`] / [`TextChunk`]: paragraph-aligned text chunking.
//! * [`LlmError`]: error variants for LLM operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meeting_protocol::config::AppConfig;
//! use meeting_protocol::llm::{ApiGenerator, Summarizer};
//! use meeting_protocol::pipeline::{NoProgress, ProgressReporter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let summarizer = Summarizer::from_config(
//!         Arc::new(ApiGenerator::from_config(&config.llm)),
//!         &config.summary,
//!     );
//!
//!     let progress = ProgressReporter::new(&NoProgress);
//!     let protocol = summarizer
//!         .summarize("Anna: let's ship on Friday.", &config.summary.custom_prompt, &progress)
//!         .await
//!         .unwrap();
//!     println!("{protocol}");
//! }
//! ```

pub mod chunker;
pub mod client;
pub mod prompt;
pub mod summarizer;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use chunker::{chunk_paragraphs, paragraphs, TextChunk};
pub use client::{ApiGenerator, LlmError, TextGenerator};
pub use prompt::{PromptBuilder, DEFAULT_PROMPT};
pub use summarizer::Summarizer;

#[cfg(test)]
pub use client::ScriptedGenerator;
