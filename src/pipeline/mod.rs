//! Pipeline module: one recording in, one meeting protocol out.
//!
//! # Architecture
//!
//! ```text
//! MediaAsset
//!     │
//!     ▼
//! PipelineRunner::run()            ← async, one stage at a time
//!     │
//!     ├─ Segmenter           (media)   Stage::Segmenting    0–12 %
//!     ├─ ChunkTranscriber    (stt)     Stage::Transcribing 12–90 %
//!     ├─ assemble            (stt)
//!     └─ Summarizer          (llm)     Stage::Summarizing  90–100 %
//!     │
//!     ▼
//! ProtocolDocument
//!
//! ProgressSink ◀── ProgressReporter (monotonic percentages)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meeting_protocol::config::AppConfig;
//! use meeting_protocol::media::{FfmpegEngine, MediaAsset};
//! use meeting_protocol::pipeline::{NoProgress, PipelineRunner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut config = AppConfig::default();
//!     config.resolve_api_keys();
//!     let engine = Arc::new(FfmpegEngine::new(config.segmentation.audio_bitrate_kbps)?);
//!     let runner = PipelineRunner::from_config(&config, engine);
//!
//!     let asset = MediaAsset::from_path("standup.mp3").await?;
//!     let doc = runner.run(&asset, &config.summary.custom_prompt, &NoProgress).await?;
//!     std::fs::write(doc.suggested_file_name(), doc.text())?;
//!     Ok(())
//! }
//! ```

pub mod document;
pub mod progress;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use document::ProtocolDocument;
pub use progress::{NoProgress, ProgressEvent, ProgressReporter, ProgressSink};
pub use runner::{PipelineError, PipelineRunner};
pub use state::Stage;
