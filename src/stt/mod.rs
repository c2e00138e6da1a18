//! Speech-to-text over a remote endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                ChunkTranscriber                        │
//! │                                                        │
//! │  chunks ──▶ Transcriber (trait) ──▶ TranscriptFragment │
//! │               │   ApiTranscriber                       │
//! │               ▼                                        │
//! │          RetryPolicy + Sleeper (backoff, pacing)       │
//! └───────────────────────────┬────────────────────────────┘
//!                             ▼
//!                  assemble(fragments) → transcript
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meeting_protocol::config::AppConfig;
//! use meeting_protocol::pipeline::{NoProgress, ProgressReporter};
//! use meeting_protocol::stt::{assemble, ApiTranscriber, ChunkTranscriber, RetryPolicy};
//!
//! # async fn example(chunks: Vec<meeting_protocol::media::MediaChunk>) {
//! let config = AppConfig::default();
//! let orchestrator = ChunkTranscriber::new(
//!     Arc::new(ApiTranscriber::from_config(&config.transcription)),
//!     RetryPolicy::from_config(&config.retry),
//! );
//!
//! let progress = ProgressReporter::new(&NoProgress);
//! let fragments = orchestrator.transcribe_all(chunks, &progress).await.unwrap();
//! println!("{}", assemble(&fragments));
//! # }
//! ```

pub mod assemble;
pub mod engine;
pub mod orchestrator;
pub mod retry;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use assemble::{assemble, TranscriptFragment};
pub use engine::{ApiTranscriber, TranscribeError, Transcriber};
pub use orchestrator::{ChunkTranscriber, TranscribeAllError};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};

#[cfg(test)]
pub use engine::ScriptedTranscriber;
