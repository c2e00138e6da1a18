//! Chunk orchestrator: submits chunks one at a time with retry and backoff.
//!
//! # Per-chunk flow
//!
//! ```text
//! report progress ──▶ transcribe(chunk)
//!                        ├─ Ok            ──▶ fragment, next chunk
//!                        ├─ Err, 429      ──▶ sleep base·2^attempt, retry
//!                        ├─ Err, other    ──▶ sleep base·attempt,   retry
//!                        └─ Err, no tries ──▶ abort run (no partial result)
//! ```
//!
//! Chunks are never sent concurrently: the endpoint's rate limit is per
//! caller, and only one payload has to be resident at a time. A short pause
//! separates consecutive submissions.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::cancel::or_cancel;
use crate::media::MediaChunk;
use crate::pipeline::{ProgressReporter, Stage};
use crate::stt::assemble::TranscriptFragment;
use crate::stt::engine::{TranscribeError, Transcriber};
use crate::stt::retry::{RetryPolicy, Sleeper, TokioSleeper};

// ---------------------------------------------------------------------------
// TranscribeAllError
// ---------------------------------------------------------------------------

/// Terminal outcomes of [`ChunkTranscriber::transcribe_all`].
#[derive(Debug, Error)]
pub enum TranscribeAllError {
    /// A chunk failed on every attempt.
    #[error("transcription of chunk {chunk_index} failed: {last_error}")]
    Failed {
        chunk_index: usize,
        last_error: TranscribeError,
    },

    #[error("transcription cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// ChunkTranscriber
// ---------------------------------------------------------------------------

/// Sequentially transcribes an ordered list of chunks.
pub struct ChunkTranscriber {
    transcriber: Arc<dyn Transcriber>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl ChunkTranscriber {
    pub fn new(transcriber: Arc<dyn Transcriber>, policy: RetryPolicy) -> Self {
        Self {
            transcriber,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the timer used for backoff and inter-chunk pauses.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Transcribe every chunk in order, returning one fragment per chunk.
    pub async fn transcribe_all(
        &self,
        chunks: Vec<MediaChunk>,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<TranscriptFragment>, TranscribeAllError> {
        self.transcribe_all_with_cancel(chunks, progress, &CancellationToken::new())
            .await
    }

    pub async fn transcribe_all_with_cancel(
        &self,
        chunks: Vec<MediaChunk>,
        progress: &ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranscriptFragment>, TranscribeAllError> {
        let total = chunks.len();
        let mut fragments = Vec::with_capacity(total);

        // Consuming the chunks drops each payload once it has been sent.
        for (position, chunk) in chunks.into_iter().enumerate() {
            if position > 0 && !self.policy.inter_chunk_pause.is_zero() {
                or_cancel(cancel, self.sleeper.sleep(self.policy.inter_chunk_pause))
                    .await
                    .ok_or(TranscribeAllError::Cancelled)?;
            }

            progress.stage(
                Stage::Transcribing,
                position,
                total,
                format!("Transcribing part {} of {}", position + 1, total),
            );

            let text = self.transcribe_chunk(&chunk, cancel).await?;
            log::info!(
                "stt: chunk {}/{} done ({} chars)",
                position + 1,
                total,
                text.len()
            );
            fragments.push(TranscriptFragment {
                chunk_index: chunk.index,
                text,
            });
        }

        progress.stage(Stage::Transcribing, total, total, "Transcription complete");
        Ok(fragments)
    }

    /// One chunk with retries. Every failure consumes an attempt.
    async fn transcribe_chunk(
        &self,
        chunk: &MediaChunk,
        cancel: &CancellationToken,
    ) -> Result<String, TranscribeAllError> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = or_cancel(cancel, self.transcriber.transcribe(chunk))
                .await
                .ok_or(TranscribeAllError::Cancelled)?;

            let err = match result {
                Ok(text) => return Ok(text),
                Err(err) => err,
            };

            if attempt >= attempts {
                log::error!(
                    "stt: chunk {} failed after {attempts} attempt(s): {err}",
                    chunk.index
                );
                return Err(TranscribeAllError::Failed {
                    chunk_index: chunk.index,
                    last_error: err,
                });
            }

            let delay = self.policy.backoff(attempt, &err);
            log::warn!(
                "stt: chunk {} attempt {attempt}/{attempts} failed ({err}), retrying in {delay:?}",
                chunk.index
            );
            or_cancel(cancel, self.sleeper.sleep(delay))
                .await
                .ok_or(TranscribeAllError::Cancelled)?;
            attempt += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
