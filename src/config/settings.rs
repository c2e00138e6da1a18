//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to each
//! pipeline stage by value.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::llm::DEFAULT_PROMPT;

/// Environment variable consulted when no API key is stored in the file.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

// ---------------------------------------------------------------------------
// TranscriptionConfig
// ---------------------------------------------------------------------------

/// Settings for the remote speech-to-text endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Base URL of the API endpoint (`/v1/audio/transcriptions` is appended).
    pub base_url: String,
    /// Bearer token. `None` falls back to [`API_KEY_ENV`].
    pub api_key: Option<String>,
    /// Model identifier sent with every chunk.
    pub model: String,
    /// Per-request timeout enforced by the HTTP transport.
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "whisper-1".into(),
            timeout_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the remote text-generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the API endpoint (`/v1/chat/completions` is appended).
    pub base_url: String,
    /// Bearer token. `None` falls back to [`API_KEY_ENV`].
    pub api_key: Option<String>,
    /// Model identifier (e.g. `"gpt-4o-mini"`).
    pub model: String,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f32,
    /// Upper bound on generated tokens per request.
    pub max_tokens: u32,
    /// Per-request timeout enforced by the HTTP transport.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            temperature: 0.7,
            max_tokens: 4000,
            timeout_secs: 180,
        }
    }
}

// ---------------------------------------------------------------------------
// SegmentationConfig
// ---------------------------------------------------------------------------

/// Settings for splitting oversized media before upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Hard per-request payload ceiling of the transcription endpoint.
    pub max_chunk_bytes: u64,
    /// First segment length handed to the codec engine.
    pub default_target_secs: u32,
    /// The adaptive shrink loop never goes below this.
    pub min_target_secs: u32,
    /// Number of segmentation attempts before falling back to oversized chunks.
    pub max_attempts: u32,
    /// Bitrate of the canonical MP3 re-encode.
    pub audio_bitrate_kbps: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            // 24.5 MiB, just under the 25 MB upload limit.
            max_chunk_bytes: 24 * 1024 * 1024 + 512 * 1024,
            default_target_secs: 600,
            min_target_secs: 60,
            max_attempts: 5,
            audio_bitrate_kbps: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

/// Retry and pacing settings for per-chunk transcription requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per chunk, including the first one.
    pub attempts: u32,
    /// Backoff unit: rate limits wait `base * 2^attempt`, other failures `base * attempt`.
    pub base_delay_ms: u64,
    /// Pause between consecutive chunk submissions.
    pub inter_chunk_pause_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 2000,
            inter_chunk_pause_ms: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// SummaryConfig
// ---------------------------------------------------------------------------

/// Settings for the hierarchical summarizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Input ceiling (in characters) of a single text-generation request.
    pub max_input_chars: usize,
    /// Instruction used to turn a transcript into a protocol.
    pub custom_prompt: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 100_000,
            custom_prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use meeting_protocol::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub transcription: TranscriptionConfig,
    pub llm: LlmConfig,
    pub segmentation: SegmentationConfig,
    pub retry: RetryConfig,
    pub summary: SummaryConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill missing API keys from [`API_KEY_ENV`].
    pub fn resolve_api_keys(&mut self) {
        self.resolve_api_keys_with(std::env::var(API_KEY_ENV).ok());
    }

    fn resolve_api_keys_with(&mut self, env_key: Option<String>) {
        let env_key = env_key.filter(|k| !k.trim().is_empty());
        if is_blank(&self.transcription.api_key) {
            self.transcription.api_key = env_key.clone();
        }
        if is_blank(&self.llm.api_key) {
            self.llm.api_key = env_key;
        }
    }
}

fn is_blank(key: &Option<String>) -> bool {
    key.as_deref().map_or(true, |k| k.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
