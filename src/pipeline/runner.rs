//! Pipeline runner: drives one recording through segment → transcribe →
//! assemble → summarize.
//!
//! # Pipeline flow
//!
//! ```text
//! MediaAsset
//!   └─▶ Segmenter::segment               [ 0–12 %]  CodecError  → SegmentationFailed
//!         └─▶ ChunkTranscriber::transcribe_all [12–90 %]  retries → TranscriptionFailed
//!               └─▶ assemble(fragments)
//!                     └─▶ Summarizer::summarize  [90–100 %] LlmError → SummarizationFailed
//!                           └─▶ ProtocolDocument
//! ```
//!
//! Every stage is awaited in turn; nothing inside a run happens concurrently.
//! A cancelled token ends the run with [`PipelineError::Cancelled`] at the
//! next suspension point, whichever stage it is in.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::llm::{ApiGenerator, LlmError, Summarizer};
use crate::media::{CodecEngine, CodecError, MediaAsset, Segmenter};
use crate::stt::{
    assemble, ApiTranscriber, ChunkTranscriber, RetryPolicy, TranscribeAllError, TranscribeError,
};

use super::document::ProtocolDocument;
use super::progress::{ProgressReporter, ProgressSink};
use super::state::Stage;

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Fatal outcomes of a pipeline run.
///
/// Transient transcription failures (rate limits, timeouts) are retried
/// inside the stt module and only appear here as the `last_error` of a
/// [`TranscriptionFailed`](PipelineError::TranscriptionFailed).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The codec engine could not process the recording.
    #[error("could not prepare the recording: {0}")]
    SegmentationFailed(CodecError),

    /// A chunk failed on every retry attempt.
    #[error("transcription of part {} failed: {last_error}", .chunk_index + 1)]
    TranscriptionFailed {
        chunk_index: usize,
        last_error: TranscribeError,
    },

    /// The text-generation request failed. The transcript is still valid.
    #[error("protocol generation failed: {0}")]
    SummarizationFailed(LlmError),

    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

impl From<CodecError> for PipelineError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::SegmentationFailed(other),
        }
    }
}

impl From<TranscribeAllError> for PipelineError {
    fn from(e: TranscribeAllError) -> Self {
        match e {
            TranscribeAllError::Failed {
                chunk_index,
                last_error,
            } => PipelineError::TranscriptionFailed {
                chunk_index,
                last_error,
            },
            TranscribeAllError::Cancelled => PipelineError::Cancelled,
        }
    }
}

impl From<LlmError> for PipelineError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::SummarizationFailed(other),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineRunner
// ---------------------------------------------------------------------------

/// Owns the three stage drivers and runs recordings through them.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use meeting_protocol::config::AppConfig;
/// use meeting_protocol::media::{FfmpegEngine, MediaAsset};
/// use meeting_protocol::pipeline::{PipelineRunner, ProgressEvent};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = AppConfig::default();
/// let engine = Arc::new(FfmpegEngine::new(config.segmentation.audio_bitrate_kbps)?);
/// let runner = PipelineRunner::from_config(&config, engine);
///
/// let asset = MediaAsset::from_path("weekly.m4a").await?;
/// let sink = |e: ProgressEvent| println!("[{:>3}%] {}", e.percent, e.message);
/// let doc = runner.run(&asset, &config.summary.custom_prompt, &sink).await?;
/// println!("{}", doc.text());
/// # Ok(())
/// # }
/// ```
pub struct PipelineRunner {
    segmenter: Segmenter,
    transcriber: ChunkTranscriber,
    summarizer: Summarizer,
}

impl PipelineRunner {
    pub fn new(segmenter: Segmenter, transcriber: ChunkTranscriber, summarizer: Summarizer) -> Self {
        Self {
            segmenter,
            transcriber,
            summarizer,
        }
    }

    /// Wire the remote endpoints from `config` around `engine`.
    pub fn from_config(config: &AppConfig, engine: Arc<dyn CodecEngine>) -> Self {
        let segmenter = Segmenter::new(engine, config.segmentation.clone());
        let transcriber = ChunkTranscriber::new(
            Arc::new(ApiTranscriber::from_config(&config.transcription)),
            RetryPolicy::from_config(&config.retry),
        );
        let summarizer =
            Summarizer::from_config(Arc::new(ApiGenerator::from_config(&config.llm)), &config.summary);
        Self::new(segmenter, transcriber, summarizer)
    }

    /// Turn `asset` into a protocol following `prompt`.
    pub async fn run(
        &self,
        asset: &MediaAsset,
        prompt: &str,
        sink: &dyn ProgressSink,
    ) -> Result<ProtocolDocument, PipelineError> {
        self.run_with_cancel(asset, prompt, sink, &CancellationToken::new())
            .await
    }

    pub async fn run_with_cancel(
        &self,
        asset: &MediaAsset,
        prompt: &str,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<ProtocolDocument, PipelineError> {
        let progress = ProgressReporter::new(sink);

        let transcript = self.transcript(asset, &progress, cancel).await?;

        let text = self
            .summarizer
            .summarize_with_cancel(&transcript, prompt, &progress, cancel)
            .await
            .map_err(|e| {
                if !matches!(e, LlmError::Cancelled) {
                    log::error!("pipeline: summarization failed: {e}");
                }
                PipelineError::from(e)
            })?;

        progress.stage(Stage::Done, 1, 1, Stage::Done.label());
        log::info!(
            "pipeline: protocol for {} ready ({} chars)",
            asset.name(),
            text.len()
        );
        Ok(ProtocolDocument::new(asset.name(), transcript, text))
    }

    /// Segment and transcribe only; no text-generation request is made.
    pub async fn transcribe(
        &self,
        asset: &MediaAsset,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let progress = ProgressReporter::new(sink);
        let transcript = self.transcript(asset, &progress, cancel).await?;
        progress.stage(Stage::Done, 1, 1, Stage::Done.label());
        Ok(transcript)
    }

    async fn transcript(
        &self,
        asset: &MediaAsset,
        progress: &ProgressReporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        log::info!(
            "pipeline: starting {} ({} bytes, {})",
            asset.name(),
            asset.len(),
            asset.mime()
        );
        progress.stage(Stage::Segmenting, 0, 1, Stage::Segmenting.label());

        let chunks = self
            .segmenter
            .segment_with_cancel(asset, cancel)
            .await
            .map_err(PipelineError::from)?;

        let parts = chunks.len();
        log::info!("pipeline: {} split into {parts} part(s)", asset.name());
        progress.stage(
            Stage::Segmenting,
            1,
            1,
            format!("Audio prepared ({parts} part(s))"),
        );

        let fragments = self
            .transcriber
            .transcribe_all_with_cancel(chunks, progress, cancel)
            .await?;

        Ok(assemble(&fragments))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::llm::ScriptedGenerator;
    use crate::media::segment::tests::{config as segment_config, MockCodec};
    use crate::pipeline::progress::tests::CollectingSink;
    use crate::stt::retry::RecordingSleeper;
    use crate::stt::ScriptedTranscriber;

    const MIB: usize = 1024 * 1024;
    const PAUSE: Duration = Duration::from_millis(500);
    /// 24.5 MiB
    const MAX_CHUNK: u64 = 24 * 1024 * 1024 + 512 * 1024;

    struct Harness {
        runner: PipelineRunner,
        codec: Arc<MockCodec>,
        transcriber: Arc<ScriptedTranscriber>,
        generator: Arc<ScriptedGenerator>,
        sleeper: Arc<RecordingSleeper>,
    }

    fn harness(
        transcripts: Vec<Result<String, TranscribeError>>,
        outputs: Vec<Result<String, LlmError>>,
    ) -> Harness {
        // Every segment is 20 MiB regardless of the target duration.
        let codec = Arc::new(MockCodec::with_segment_len(|_| 20 * MIB));
        let transcriber = Arc::new(ScriptedTranscriber::new(transcripts));
        let generator = Arc::new(ScriptedGenerator::new(outputs));
        let sleeper = Arc::new(RecordingSleeper::default());

        let policy = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(2000),
            inter_chunk_pause: PAUSE,
        };
        let runner = PipelineRunner::new(
            Segmenter::new(codec.clone(), segment_config(MAX_CHUNK)),
            ChunkTranscriber::new(transcriber.clone(), policy).with_sleeper(sleeper.clone()),
            Summarizer::new(generator.clone(), 100_000),
        );
        Harness {
            runner,
            codec,
            transcriber,
            generator,
            sleeper,
        }
    }

    fn asset(len: usize) -> MediaAsset {
        MediaAsset::new("weekly.webm", "video/webm", vec![7u8; len]).unwrap()
    }

    fn is_monotonic(percents: &[u8]) -> bool {
        percents.windows(2).all(|w| w[0] <= w[1])
    }

    #[tokio::test]
    async fn forty_megabyte_recording_end_to_end() {
        let h = harness(
            vec![Ok("Good morning everyone.".into()), Ok("Let's ship Friday.".into())],
            vec![Ok("# Weekly sync\n- Ship Friday".into())],
        );
        let sink = CollectingSink::default();

        let doc = h
            .runner
            .run(&asset(40 * MIB), "Write minutes.", &sink)
            .await
            .unwrap();

        // Segmentation: two chunks on the first attempt, no shrink.
        assert_eq!(h.codec.targets(), vec![600]);
        assert_eq!(h.codec.file_count(), 0);
        // Transcription: two sequential calls, one pause between them.
        assert_eq!(h.transcriber.calls(), vec![0, 1]);
        assert_eq!(h.sleeper.delays(), vec![PAUSE]);
        // Summarization: one call over the space-joined transcript.
        let requests = h.generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "Write minutes.");
        assert_eq!(requests[0].1, "Good morning everyone. Let's ship Friday.");

        assert_eq!(doc.text(), "# Weekly sync\n- Ship Friday");
        assert_eq!(doc.transcript(), "Good morning everyone. Let's ship Friday.");
        assert_eq!(doc.source_name(), "weekly.webm");

        let percents = sink.percents();
        assert!(is_monotonic(&percents), "{percents:?}");
        assert_eq!(percents.first(), Some(&0));
        assert_eq!(percents.last(), Some(&100));
    }

    #[tokio::test]
    async fn small_recording_skips_codec_engine() {
        let h = harness(vec![Ok("short call".into())], vec![]);

        let doc = h
            .runner
            .run(&asset(1024), "p", &crate::pipeline::NoProgress)
            .await
            .unwrap();

        assert_eq!(h.codec.loads.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(h.codec.targets().is_empty());
        assert_eq!(doc.transcript(), "short call");
        assert_eq!(doc.text(), "output-1");
    }

    #[tokio::test]
    async fn exhausted_transcription_retries_are_fatal() {
        let h = harness(
            vec![
                Ok("part one".into()),
                Err(TranscribeError::Timeout),
                Err(TranscribeError::Timeout),
                Err(TranscribeError::Timeout),
            ],
            vec![],
        );

        let err = h
            .runner
            .run(&asset(40 * MIB), "p", &crate::pipeline::NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::TranscriptionFailed { chunk_index: 1, .. }
        ));
        assert_eq!(err.to_string(), "transcription of part 2 failed: transcription request timed out");
        assert!(h.generator.requests().is_empty());
    }

    #[tokio::test]
    async fn summarization_failure_is_fatal() {
        let h = harness(
            vec![],
            vec![Err(LlmError::Api {
                status: 401,
                message: "Incorrect API key provided".into(),
            })],
        );

        let err = h
            .runner
            .run(&asset(1024), "p", &crate::pipeline::NoProgress)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::SummarizationFailed(LlmError::Api { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn transcript_only_makes_no_generation_request() {
        let h = harness(vec![Ok("a".into()), Ok("b".into())], vec![]);
        let sink = CollectingSink::default();

        let transcript = h
            .runner
            .transcribe(&asset(40 * MIB), &sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(transcript, "a b");
        assert!(h.generator.requests().is_empty());
        assert_eq!(sink.percents().last(), Some(&100));
    }

    #[tokio::test]
    async fn cancellation_is_distinct_from_failure() {
        let h = harness(vec![], vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = h
            .runner
            .run_with_cancel(&asset(40 * MIB), "p", &crate::pipeline::NoProgress, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(h.transcriber.calls().is_empty());
        assert!(h.generator.requests().is_empty());
        assert_eq!(h.codec.file_count(), 0);
    }

    #[test]
    fn cancelled_stage_errors_map_to_cancelled() {
        assert!(PipelineError::from(CodecError::Cancelled).is_cancelled());
        assert!(PipelineError::from(TranscribeAllError::Cancelled).is_cancelled());
        assert!(PipelineError::from(LlmError::Cancelled).is_cancelled());
        assert!(matches!(
            PipelineError::from(CodecError::NoOutput),
            PipelineError::SegmentationFailed(_)
        ));
    }
}
