//! Core transcription trait and the remote API implementation.
//!
//! # Overview
//!
//! [`Transcriber`] is the interface used by the chunk orchestrator. It is
//! object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn Transcriber>`.
//!
//! [`ApiTranscriber`] posts one chunk per request to an OpenAI-compatible
//! `/v1/audio/transcriptions` endpoint and asks for plain-text output.
//!
//! [`ScriptedTranscriber`] (available under `#[cfg(test)]`) replays a
//! pre-configured sequence of results, for testing retry behaviour without a
//! network.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::TranscriptionConfig;
use crate::http;
use crate::media::MediaChunk;

// ---------------------------------------------------------------------------
// TranscribeError
// ---------------------------------------------------------------------------

/// Errors from a single transcription request.
#[derive(Debug, Clone, Error)]
pub enum TranscribeError {
    /// HTTP 429: the caller is over its rate limit. Always worth retrying.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Any other non-success status.
    #[error("transcription API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The transport timed out.
    #[error("transcription request timed out")]
    Timeout,
}

impl TranscribeError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TranscribeError::RateLimited(_))
    }
}

impl From<reqwest::Error> for TranscribeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscribeError::Timeout
        } else {
            TranscribeError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Turns one media chunk into text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, chunk: &MediaChunk) -> Result<String, TranscribeError>;
}

// ---------------------------------------------------------------------------
// ApiTranscriber
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/transcriptions` endpoint.
///
/// The chunk is sent as a multipart `file` part named after its index
/// (`chunk_003.mp3`), together with the configured model and
/// `response_format=text`.
pub struct ApiTranscriber {
    client: reqwest::Client,
    config: TranscriptionConfig,
}

impl ApiTranscriber {
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            client: http::build_client(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Transcriber for ApiTranscriber {
    async fn transcribe(&self, chunk: &MediaChunk) -> Result<String, TranscribeError> {
        let part = Part::stream_with_length(chunk.payload.clone(), chunk.len())
            .file_name(chunk.file_name())
            .mime_str(&chunk.mime)
            .map_err(|e| TranscribeError::Request(e.to_string()))?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "text");

        let req = self.client.post(self.endpoint()).multipart(form);
        let response = http::with_auth(req, self.config.api_key.as_deref())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = http::error_message(status, &body);
            return Err(classify(status, message));
        }

        let text = response.text().await?;
        Ok(text.trim().to_string())
    }
}

fn classify(status: StatusCode, message: String) -> TranscribeError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        TranscribeError::RateLimited(message)
    } else {
        TranscribeError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedTranscriber (test-only)
// ---------------------------------------------------------------------------

/// Replays scripted results in call order; once the script is exhausted it
/// echoes `text-<index>` for every chunk.
#[cfg(test)]
pub struct ScriptedTranscriber {
    script: std::sync::Mutex<std::collections::VecDeque<Result<String, TranscribeError>>>,
    pub calls: std::sync::Mutex<Vec<usize>>,
}

#[cfg(test)]
impl ScriptedTranscriber {
    pub fn new(script: Vec<Result<String, TranscribeError>>) -> Self {
        Self {
            script: std::sync::Mutex::new(script.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, chunk: &MediaChunk) -> Result<String, TranscribeError> {
        self.calls.lock().unwrap().push(chunk.index);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(format!("text-{}", chunk.index)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_requests_is_rate_limited() {
        let err = classify(StatusCode::TOO_MANY_REQUESTS, "slow down".into());
        assert!(err.is_rate_limited());
        assert!(err.to_string().contains("slow down"));
    }

    #[test]
    fn other_statuses_are_api_errors() {
        let err = classify(StatusCode::PAYLOAD_TOO_LARGE, "Maximum content size".into());
        assert!(!err.is_rate_limited());
        assert!(matches!(err, TranscribeError::Api { status: 413, .. }));
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let config = TranscriptionConfig {
            base_url: "http://localhost:8000/".into(),
            ..TranscriptionConfig::default()
        };
        let transcriber = ApiTranscriber::from_config(&config);
        assert_eq!(
            transcriber.endpoint(),
            "http://localhost:8000/v1/audio/transcriptions"
        );
    }

    #[test]
    fn transcriber_is_object_safe() {
        let transcriber: Box<dyn Transcriber> =
            Box::new(ApiTranscriber::from_config(&TranscriptionConfig::default()));
        drop(transcriber);
    }

    #[tokio::test]
    async fn scripted_transcriber_replays_then_echoes() {
        let t = ScriptedTranscriber::new(vec![Err(TranscribeError::Timeout)]);
        let chunk = MediaChunk {
            index: 4,
            payload: bytes::Bytes::from_static(b"x"),
            mime: "audio/mpeg".into(),
        };
        assert!(t.transcribe(&chunk).await.is_err());
        assert_eq!(t.transcribe(&chunk).await.unwrap(), "text-4");
        assert_eq!(t.calls(), vec![4, 4]);
    }
}
