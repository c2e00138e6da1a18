//! Segmentation controller: splits an oversized recording into upload-sized
//! chunks.
//!
//! # Flow
//!
//! ```text
//! asset ≤ max_chunk_bytes ──▶ one chunk, codec engine untouched
//!
//! otherwise:
//!   write input ─▶ run_segment(target) ─▶ read outputs
//!        ▲                                    │
//!        │        any chunk > max?  ──yes──▶ unlink outputs, target /= 2 (≥ floor)
//!        │                                    │
//!        └──────── attempts left ◀────────────┘
//!
//!   every workspace file is unlinked before returning, on every path
//! ```
//!
//! Workspace names carry a per-call run id, so concurrent calls sharing one
//! engine never see each other's files.
//!
//! The codec engine splits by duration, not size. Halving the duration
//! roughly halves the chunk size for a constant bitrate, so the loop
//! converges quickly; the attempt ceiling guards against outliers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cancel::or_cancel;
use crate::config::SegmentationConfig;
use crate::media::asset::{MediaAsset, MediaChunk, CANONICAL_MIME};
use crate::media::codec::{CodecEngine, CodecError};

// ---------------------------------------------------------------------------
// Segmenter
// ---------------------------------------------------------------------------

/// Drives a [`CodecEngine`] until every produced chunk fits the size ceiling.
pub struct Segmenter {
    engine: Arc<dyn CodecEngine>,
    config: SegmentationConfig,
}

impl Segmenter {
    pub fn new(engine: Arc<dyn CodecEngine>, config: SegmentationConfig) -> Self {
        Self { engine, config }
    }

    /// Split `asset` into ordered chunks of at most `max_chunk_bytes` each.
    ///
    /// If the attempt ceiling is reached while some chunks are still too
    /// large, those chunks are returned anyway; the transcription endpoint
    /// decides whether it can take them.
    pub async fn segment(&self, asset: &MediaAsset) -> Result<Vec<MediaChunk>, CodecError> {
        self.segment_with_cancel(asset, &CancellationToken::new())
            .await
    }

    /// Like [`segment`](Self::segment), but stops at the next engine call
    /// once `cancel` fires. Workspace cleanup still runs.
    pub async fn segment_with_cancel(
        &self,
        asset: &MediaAsset,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaChunk>, CodecError> {
        if asset.len() <= self.config.max_chunk_bytes {
            log::debug!(
                "segment: {} bytes fits in one chunk, skipping codec engine",
                asset.len()
            );
            return Ok(vec![MediaChunk {
                index: 0,
                payload: asset.data().clone(),
                mime: asset.mime().to_string(),
            }]);
        }

        or_cancel(cancel, self.engine.ensure_loaded())
            .await
            .ok_or(CodecError::Cancelled)??;

        let run_id = Uuid::new_v4().simple().to_string();
        let mut scratch = Scratch::new(self.engine.as_ref(), format!("chunk-{run_id}"));
        let input = format!("input-{run_id}.{}", asset.extension());
        let result = self.split(asset, &input, &mut scratch, cancel).await;
        scratch.release().await;
        result
    }

    async fn split(
        &self,
        asset: &MediaAsset,
        input: &str,
        scratch: &mut Scratch<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaChunk>, CodecError> {
        let engine = self.engine.as_ref();
        let max = self.config.max_chunk_bytes;
        let floor = self.config.min_target_secs.max(1);
        let max_attempts = self.config.max_attempts.max(1);

        scratch.track(input.to_string());
        or_cancel(cancel, engine.write_input(input, asset.data()))
            .await
            .ok_or(CodecError::Cancelled)??;

        let mut target = self.config.default_target_secs.max(floor);
        let mut attempt = 1;

        loop {
            log::info!("segment: attempt {attempt}/{max_attempts} with {target}s segments");

            let outputs = or_cancel(cancel, engine.run_segment(input, target, &scratch.prefix))
                .await
                .ok_or(CodecError::Cancelled)??;
            scratch.track_all(&outputs);
            if outputs.is_empty() {
                return Err(CodecError::NoOutput);
            }

            let mut chunks = Vec::with_capacity(outputs.len());
            for (index, name) in outputs.iter().enumerate() {
                let payload = or_cancel(cancel, engine.read_output(name))
                    .await
                    .ok_or(CodecError::Cancelled)??;
                chunks.push(MediaChunk {
                    index,
                    payload,
                    mime: CANONICAL_MIME.to_string(),
                });
            }

            let oversized = chunks.iter().filter(|c| c.len() > max).count();
            if oversized == 0 {
                log::info!(
                    "segment: {} chunk(s) of at most {} bytes",
                    chunks.len(),
                    max
                );
                return Ok(chunks);
            }

            let next = (target / 2).max(floor);
            if attempt >= max_attempts || next == target {
                log::warn!(
                    "segment: {oversized} of {} chunk(s) still exceed {max} bytes at {target}s, \
                     continuing with oversized chunks",
                    chunks.len()
                );
                return Ok(chunks);
            }

            log::debug!("segment: {oversized} oversized chunk(s), retrying at {next}s");
            drop(chunks);
            scratch.release_matching(&outputs).await;
            target = next;
            attempt += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Scratch
// ---------------------------------------------------------------------------

/// Tracks every workspace file created during one segmentation so they can
/// all be unlinked, whatever the outcome. Segments an interrupted engine run
/// wrote without reporting are found again through `prefix`.
struct Scratch<'a> {
    engine: &'a dyn CodecEngine,
    prefix: String,
    files: Vec<String>,
}

impl<'a> Scratch<'a> {
    fn new(engine: &'a dyn CodecEngine, prefix: String) -> Self {
        Self {
            engine,
            prefix,
            files: Vec::new(),
        }
    }

    fn track(&mut self, name: String) {
        if !self.files.contains(&name) {
            self.files.push(name);
        }
    }

    fn track_all(&mut self, names: &[String]) {
        for name in names {
            self.track(name.clone());
        }
    }

    async fn release_matching(&mut self, names: &[String]) {
        for name in names {
            self.unlink(name).await;
        }
        self.files.retain(|f| !names.contains(f));
    }

    async fn release(mut self) {
        for name in std::mem::take(&mut self.files) {
            self.unlink(&name).await;
        }
        if let Err(e) = self.engine.discard_outputs(&self.prefix).await {
            log::warn!("segment: failed to remove {}_* from workspace: {e}", self.prefix);
        }
    }

    async fn unlink(&self, name: &str) {
        if let Err(e) = self.engine.unlink(name).await {
            log::warn!("segment: failed to remove {name} from workspace: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
