//! Meeting protocol generator.
//!
//! Turns a long audio/video recording into a structured meeting protocol:
//! the recording is split into upload-sized MP3 chunks, each chunk is
//! transcribed by a remote speech-to-text endpoint, the fragments are joined
//! into one transcript, and a remote chat model writes the protocol.
//!
//! * [`media`]: assets, the codec engine and the segmentation controller.
//! * [`stt`]: transcription client, retry policy and chunk orchestrator.
//! * [`llm`]: chat client, paragraph chunker and hierarchical summarizer.
//! * [`pipeline`]: the end-to-end runner, progress reporting and output document.
//! * [`config`]: TOML settings.

pub mod cancel;
pub mod config;
pub mod http;
pub mod llm;
pub mod media;
pub mod pipeline;
pub mod stt;
