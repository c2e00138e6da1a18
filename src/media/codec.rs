//! Codec adapter: the [`CodecEngine`] trait and its ffmpeg implementation.
//!
//! A codec engine owns a private workspace. Callers write the input into it,
//! ask for a segmented re-encode, read the produced files back and unlink
//! everything they created. [`CodecEngine::run_segment`] returns the produced
//! file names in order, so callers never guess at "the next chunk".
//!
//! [`FfmpegEngine`] is the production implementation. The `ffmpeg` binary is
//! located lazily on first use; concurrent first calls share one lookup.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::OnceCell;

// ---------------------------------------------------------------------------
// CodecError
// ---------------------------------------------------------------------------

/// Errors from the codec engine or its workspace.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The engine could not be loaded (e.g. `ffmpeg` is not installed).
    #[error("codec engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Workspace read/write failure.
    #[error("codec workspace I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The engine ran but rejected the input.
    #[error("codec engine exited with {}: {stderr}", exit_label(.code))]
    ProcessFailed { code: Option<i32>, stderr: String },

    /// The engine succeeded but produced no segments.
    #[error("codec engine produced no output")]
    NoOutput,

    /// A workspace file name contained a path separator or was empty.
    #[error("invalid workspace file name: {0:?}")]
    InvalidName(String),

    /// Segmentation was cancelled by the caller.
    #[error("segmentation cancelled")]
    Cancelled,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "signal".to_string(),
    }
}

// ---------------------------------------------------------------------------
// CodecEngine trait
// ---------------------------------------------------------------------------

/// Transcoding engine with a private, name-addressed workspace.
///
/// Implementations must be `Send + Sync` so one engine can be shared behind
/// an `Arc<dyn CodecEngine>`.
#[async_trait]
pub trait CodecEngine: Send + Sync {
    /// Idempotent initialisation. Safe to call before every run.
    async fn ensure_loaded(&self) -> Result<(), CodecError>;

    /// Store `data` in the workspace under `name`.
    async fn write_input(&self, name: &str, data: &[u8]) -> Result<(), CodecError>;

    /// Re-encode `input` to the canonical codec, split into segments of about
    /// `target_secs` seconds each. Returns the produced names in playback order.
    async fn run_segment(
        &self,
        input: &str,
        target_secs: u32,
        output_prefix: &str,
    ) -> Result<Vec<String>, CodecError>;

    /// Read a produced file.
    async fn read_output(&self, name: &str) -> Result<Bytes, CodecError>;

    /// Remove a file from the workspace. Missing files are not an error.
    async fn unlink(&self, name: &str) -> Result<(), CodecError>;

    /// Remove every segment written under `output_prefix`, including any an
    /// interrupted or failed run left behind.
    async fn discard_outputs(&self, output_prefix: &str) -> Result<(), CodecError>;
}

// Compile-time assertion: Box<dyn CodecEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn CodecEngine>) {}
};

// ---------------------------------------------------------------------------
// FfmpegEngine
// ---------------------------------------------------------------------------

/// Codec engine backed by the `ffmpeg` command-line tool.
///
/// Segments are mono MP3 at a fixed bitrate, written as
/// `<prefix>_000.mp3`, `<prefix>_001.mp3`, ... inside a temporary directory
/// that is removed when the engine is dropped.
pub struct FfmpegEngine {
    binary: OnceCell<PathBuf>,
    explicit_binary: Option<PathBuf>,
    workspace: TempDir,
    bitrate_kbps: u32,
}

impl std::fmt::Debug for FfmpegEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegEngine")
            .field("binary", &self.binary.get())
            .field("workspace", &self.workspace.path())
            .field("bitrate_kbps", &self.bitrate_kbps)
            .finish()
    }
}

impl FfmpegEngine {
    /// Create an engine with a fresh temporary workspace.
    pub fn new(bitrate_kbps: u32) -> Result<Self, CodecError> {
        let workspace = tempfile::Builder::new()
            .prefix("meeting-protocol-")
            .tempdir()?;
        Ok(Self {
            binary: OnceCell::new(),
            explicit_binary: None,
            workspace,
            bitrate_kbps,
        })
    }

    /// Use a specific `ffmpeg` executable instead of searching `PATH`.
    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_binary = Some(path.into());
        self
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    async fn binary(&self) -> Result<&PathBuf, CodecError> {
        self.binary
            .get_or_try_init(|| async {
                let path = match &self.explicit_binary {
                    Some(path) if path.exists() => path.clone(),
                    Some(path) => {
                        return Err(CodecError::EngineUnavailable(format!(
                            "{} does not exist",
                            path.display()
                        )))
                    }
                    None => which::which("ffmpeg").map_err(|e| {
                        CodecError::EngineUnavailable(format!("ffmpeg not found on PATH: {e}"))
                    })?,
                };
                log::info!("codec: using ffmpeg at {}", path.display());
                Ok(path)
            })
            .await
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, CodecError> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !plain {
            return Err(CodecError::InvalidName(name.to_string()));
        }
        Ok(self.workspace.path().join(name))
    }

    async fn list_outputs(&self, output_prefix: &str) -> Result<Vec<String>, CodecError> {
        let stem = format!("{output_prefix}_");
        let mut indexed = Vec::new();
        let mut entries = tokio::fs::read_dir(self.workspace.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(index) = segment_index(&name, &stem) {
                indexed.push((index, name));
            }
        }
        // %03d stops padding past 999, so order numerically.
        indexed.sort();
        Ok(indexed.into_iter().map(|(_, name)| name).collect())
    }

    async fn discard_quietly(&self, output_prefix: &str) {
        if let Err(e) = self.discard_outputs(output_prefix).await {
            log::warn!("codec: failed to remove partial {output_prefix}_* segments: {e}");
        }
    }
}

fn segment_index(name: &str, stem: &str) -> Option<u64> {
    let digits = name.strip_prefix(stem)?.strip_suffix(".mp3")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[async_trait]
impl CodecEngine for FfmpegEngine {
    async fn ensure_loaded(&self) -> Result<(), CodecError> {
        self.binary().await.map(|_| ())
    }

    async fn write_input(&self, name: &str, data: &[u8]) -> Result<(), CodecError> {
        let path = self.resolve(name)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    async fn run_segment(
        &self,
        input: &str,
        target_secs: u32,
        output_prefix: &str,
    ) -> Result<Vec<String>, CodecError> {
        let binary = self.binary().await?;
        let input_path = self.resolve(input)?;
        let pattern = self.resolve(&format!("{output_prefix}_%03d.mp3"))?;

        let mut command = Command::new(binary);
        command
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-y")
            .arg("-i")
            .arg(&input_path)
            .arg("-vn")
            .args(["-ac", "1"])
            .args(["-c:a", "libmp3lame"])
            .arg("-b:a")
            .arg(format!("{}k", self.bitrate_kbps))
            .args(["-f", "segment"])
            .arg("-segment_time")
            .arg(target_secs.to_string())
            .args(["-reset_timestamps", "1"])
            .arg(&pattern)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log::debug!("codec: running {command:?}");

        let output = match command.output().await {
            Ok(output) => output,
            Err(e) => {
                self.discard_quietly(output_prefix).await;
                return Err(CodecError::EngineUnavailable(format!(
                    "failed to spawn ffmpeg: {e}"
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::error!("codec: ffmpeg failed: {stderr}");
            // ffmpeg may have finished some segments before it gave up.
            self.discard_quietly(output_prefix).await;
            return Err(CodecError::ProcessFailed {
                code: output.status.code(),
                stderr,
            });
        }

        let names = self.list_outputs(output_prefix).await?;
        log::debug!(
            "codec: {} segment(s) at {}s target",
            names.len(),
            target_secs
        );
        Ok(names)
    }

    async fn read_output(&self, name: &str) -> Result<Bytes, CodecError> {
        let path = self.resolve(name)?;
        Ok(Bytes::from(tokio::fs::read(path).await?))
    }

    async fn unlink(&self, name: &str) -> Result<(), CodecError> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn discard_outputs(&self, output_prefix: &str) -> Result<(), CodecError> {
        for name in self.list_outputs(output_prefix).await? {
            self.unlink(&name).await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
