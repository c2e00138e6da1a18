//! Core `TextGenerator` trait and `ApiGenerator` implementation.
//!
//! `ApiGenerator` calls any OpenAI-compatible `/v1/chat/completions` endpoint
//! (OpenAI, Groq, Ollama in OpenAI mode, LM Studio, vLLM, ...). All
//! connection details come from [`LlmConfig`].

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::http;

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur during text generation.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("LLM request timed out")]
    Timeout,

    /// Non-success status from the endpoint.
    #[error("LLM API returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The LLM returned a response with no usable text content.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// The caller cancelled the run.
    #[error("generation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// TextGenerator trait
// ---------------------------------------------------------------------------

/// One instruction + content in, generated text out.
///
/// # Arguments
/// * `instruction` – System message (what to do).
/// * `content`     – User message (what to do it to).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, instruction: &str, content: &str) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// ApiGenerator
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct ApiGenerator {
    client: reqwest::Client,
    config: LlmConfig,
}

impl ApiGenerator {
    /// Build an `ApiGenerator` with the per-request timeout from
    /// `config.timeout_secs`.
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            client: http::build_client(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn request_body(&self, instruction: &str, content: &str) -> serde_json::Value {
        serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": instruction },
                { "role": "user",   "content": content     }
            ],
            "stream":      false,
            "temperature": self.config.temperature,
            "max_tokens":  self.config.max_tokens
        })
    }
}

/// Pull `choices[0].message.content` out of a completion response, verbatim.
/// Whitespace-only content counts as empty.
fn extract_content(json: &serde_json::Value) -> Result<String, LlmError> {
    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or(LlmError::EmptyResponse)?;

    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text.to_string())
}

#[async_trait]
impl TextGenerator for ApiGenerator {
    async fn generate(&self, instruction: &str, content: &str) -> Result<String, LlmError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = self.request_body(instruction, content);

        let req = self.client.post(&url).json(&body);
        let response = http::with_auth(req, self.config.api_key.as_deref())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: http::error_message(status, &body),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        extract_content(&json)
    }
}

// ---------------------------------------------------------------------------
// ScriptedGenerator (test-only)
// ---------------------------------------------------------------------------

/// Records every request; replies from a script, then with a numbered echo.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedGenerator {
    script: std::sync::Mutex<std::collections::VecDeque<Result<String, LlmError>>>,
    pub requests: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl ScriptedGenerator {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: std::sync::Mutex::new(script.into()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, instruction: &str, content: &str) -> Result<String, LlmError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((instruction.to_string(), content.to_string()));
            requests.len()
        };
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(format!("output-{n}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            base_url: "http://localhost:11434".into(),
            api_key: api_key.map(|s| s.to_string()),
            model: "qwen2.5:7b".into(),
            temperature: 0.2,
            max_tokens: 1024,
            timeout_secs: 10,
        }
    }

    #[test]
    fn from_config_accepts_missing_and_empty_keys() {
        let _ = ApiGenerator::from_config(&make_config(None));
        let _ = ApiGenerator::from_config(&make_config(Some("")));
        let _ = ApiGenerator::from_config(&make_config(Some("sk-test-1234")));
    }

    #[test]
    fn request_body_carries_model_settings() {
        let generator = ApiGenerator::from_config(&make_config(None));
        let body = generator.request_body("Summarize.", "transcript text");

        assert_eq!(body["model"], "qwen2.5:7b");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "Summarize.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "transcript text");
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn extracts_first_choice_verbatim() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "  # Protocol\n" } }]
        });
        assert_eq!(extract_content(&json).unwrap(), "  # Protocol\n");
    }

    #[test]
    fn missing_or_blank_content_is_empty_response() {
        let none = serde_json::json!({ "choices": [] });
        let blank = serde_json::json!({ "choices": [{ "message": { "content": "   " } }] });
        assert!(matches!(extract_content(&none), Err(LlmError::EmptyResponse)));
        assert!(matches!(extract_content(&blank), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn generator_is_object_safe() {
        let generator: Box<dyn TextGenerator> =
            Box::new(ApiGenerator::from_config(&make_config(None)));
        drop(generator);
    }
}
