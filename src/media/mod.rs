//! Media intake and segmentation.
//!
//! * [`MediaAsset`] / [`MediaChunk`]: the recording and its upload-sized slices.
//! * [`CodecEngine`]: async trait over a transcoding engine with a private
//!   workspace; [`FfmpegEngine`] is the production implementation.
//! * [`Segmenter`]: splits oversized assets with an adaptive target duration.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use meeting_protocol::config::SegmentationConfig;
//! use meeting_protocol::media::{FfmpegEngine, MediaAsset, Segmenter};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let asset = MediaAsset::from_path("board-meeting.webm").await?;
//! let engine = Arc::new(FfmpegEngine::new(64)?);
//! let segmenter = Segmenter::new(engine, SegmentationConfig::default());
//!
//! let chunks = segmenter.segment(&asset).await?;
//! println!("{} chunk(s)", chunks.len());
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod codec;
pub mod segment;

pub use asset::{
    estimate_processing_minutes, MediaAsset, MediaChunk, MediaError, CANONICAL_MIME,
    SUPPORTED_MIME_TYPES,
};
pub use codec::{CodecEngine, CodecError, FfmpegEngine};
pub use segment::Segmenter;
