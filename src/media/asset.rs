//! Media asset and chunk types.
//!
//! A [`MediaAsset`] is the immutable recording handed to one pipeline run.
//! [`MediaChunk`]s are the ceiling-compliant slices produced from it by the
//! segmentation controller.

use std::path::Path;

use bytes::Bytes;
use thiserror::Error;

/// MIME type of the canonical re-encode produced by the codec engine.
pub const CANONICAL_MIME: &str = "audio/mpeg";

/// MIME types accepted at intake.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/wave",
    "audio/x-wav",
    "audio/x-m4a",
    "audio/mp4",
    "audio/aac",
    "audio/ogg",
    "audio/webm",
    "audio/flac",
    "video/webm",
];

const MIB: u64 = 1024 * 1024;

/// Assets above this size still work but take noticeably long.
const LARGE_ASSET_BYTES: u64 = 500 * MIB;

// ---------------------------------------------------------------------------
// MediaError
// ---------------------------------------------------------------------------

/// Errors raised while taking in a recording.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to read media file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported media type: {0}")]
    UnsupportedType(String),

    #[error("media file is empty")]
    Empty,
}

// ---------------------------------------------------------------------------
// MediaAsset
// ---------------------------------------------------------------------------

/// One uploaded recording: opaque bytes plus declared MIME type.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    name: String,
    mime: String,
    data: Bytes,
}

impl MediaAsset {
    /// Wrap in-memory bytes. The MIME type must be one of
    /// [`SUPPORTED_MIME_TYPES`].
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Result<Self, MediaError> {
        let mime = mime.into();
        if !is_supported_mime(&mime) {
            return Err(MediaError::UnsupportedType(mime));
        }
        let data = data.into();
        if data.is_empty() {
            return Err(MediaError::Empty);
        }

        let asset = Self {
            name: name.into(),
            mime,
            data,
        };
        if asset.len() > LARGE_ASSET_BYTES {
            log::warn!(
                "media: very large file ({} MiB), processing will take roughly {} min",
                asset.len() / MIB,
                estimate_processing_minutes(asset.len())
            );
        }
        Ok(asset)
    }

    /// Read a recording from disk, inferring the MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let mime = mime_from_path(path)
            .ok_or_else(|| MediaError::UnsupportedType(path.display().to_string()))?;
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());
        Self::new(name, mime, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Byte length of the recording.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension matching the declared MIME type.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime)
    }
}

// ---------------------------------------------------------------------------
// MediaChunk
// ---------------------------------------------------------------------------

/// A bounded slice of a recording, ready for upload.
///
/// Indices are 0-based and gapless; chunks must be consumed in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaChunk {
    pub index: usize,
    pub payload: Bytes,
    pub mime: String,
}

impl MediaChunk {
    pub fn len(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Upload file name, e.g. `chunk_007.mp3`.
    pub fn file_name(&self) -> String {
        format!("chunk_{:03}.{}", self.index, extension_for_mime(&self.mime))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn is_supported_mime(mime: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&mime)
}

/// Infer a supported MIME type from a file extension (case-insensitive).
pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp3" | "mpeg" | "mpga" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/x-m4a",
        "mp4" => "audio/mp4",
        "aac" => "audio/aac",
        "ogg" | "oga" => "audio/ogg",
        "weba" => "audio/webm",
        "webm" => "video/webm",
        "flac" => "audio/flac",
        _ => return None,
    };
    Some(mime)
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/wave" | "audio/x-wav" => "wav",
        "audio/x-m4a" => "m4a",
        "audio/mp4" => "mp4",
        "audio/aac" => "aac",
        "audio/ogg" => "ogg",
        "audio/webm" | "video/webm" => "webm",
        "audio/flac" => "flac",
        _ => "bin",
    }
}

/// Rough wall-clock estimate: one minute of processing per 5 MiB of media.
pub fn estimate_processing_minutes(bytes: u64) -> u64 {
    bytes.div_ceil(5 * MIB)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rejects_unsupported_mime() {
        let err = MediaAsset::new("x.txt", "text/plain", vec![1u8]).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedType(m) if m == "text/plain"));
    }

    #[test]
    fn rejects_empty_payload() {
        let err = MediaAsset::new("x.mp3", "audio/mpeg", Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, MediaError::Empty));
    }

    #[test]
    fn mime_inference_is_case_insensitive() {
        assert_eq!(mime_from_path(Path::new("a/Meeting.MP3")), Some("audio/mpeg"));
        assert_eq!(mime_from_path(Path::new("call.webm")), Some("video/webm"));
        assert_eq!(mime_from_path(Path::new("notes.docx")), None);
        assert_eq!(mime_from_path(Path::new("no_extension")), None);
    }

    #[test]
    fn every_inferred_mime_is_supported() {
        for ext in ["mp3", "wav", "m4a", "mp4", "aac", "ogg", "weba", "webm", "flac"] {
            let mime = mime_from_path(Path::new(&format!("f.{ext}"))).unwrap();
            assert!(is_supported_mime(mime), "{mime} should be supported");
        }
    }

    #[test]
    fn chunk_file_name_follows_mime() {
        let chunk = MediaChunk {
            index: 7,
            payload: Bytes::from_static(b"abc"),
            mime: CANONICAL_MIME.into(),
        };
        assert_eq!(chunk.file_name(), "chunk_007.mp3");
        assert_eq!(chunk.len(), 3);
    }

    #[test]
    fn processing_estimate_rounds_up() {
        assert_eq!(estimate_processing_minutes(0), 0);
        assert_eq!(estimate_processing_minutes(1), 1);
        assert_eq!(estimate_processing_minutes(5 * MIB), 1);
        assert_eq!(estimate_processing_minutes(5 * MIB + 1), 2);
    }

    #[tokio::test]
    async fn from_path_reads_bytes_and_name() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("standup.m4a");
        std::fs::write(&path, b"fake-audio").expect("write");

        let asset = MediaAsset::from_path(&path).await.unwrap();
        assert_eq!(asset.name(), "standup.m4a");
        assert_eq!(asset.mime(), "audio/x-m4a");
        assert_eq!(asset.len(), 10);
        assert_eq!(asset.extension(), "m4a");
    }

    #[tokio::test]
    async fn from_path_missing_file_is_io_error() {
        let dir = tempdir().expect("temp dir");
        let err = MediaAsset::from_path(dir.path().join("gone.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Io(_)));
    }
}
