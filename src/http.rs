//! Shared helpers for the OpenAI-compatible HTTP endpoints.

use std::time::Duration;

use reqwest::StatusCode;

/// Build a client with a per-request timeout.
///
/// Falls back to a default client if the builder fails (TLS backend
/// initialisation is the only realistic cause).
pub fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Attach `Authorization: Bearer …` only for a non-empty key.
pub fn with_auth(req: reqwest::RequestBuilder, api_key: Option<&str>) -> reqwest::RequestBuilder {
    match api_key.map(str::trim) {
        Some(key) if !key.is_empty() => req.bearer_auth(key),
        _ => req,
    }
}

/// Extract a readable message from an error response body.
///
/// OpenAI-style bodies look like `{"error": {"message": "..."}}`; anything
/// else falls back to the raw body or the status reason.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    if let Some(msg) = parsed
        .as_ref()
        .and_then(|json| json["error"]["message"].as_str())
        .filter(|m| !m.is_empty())
    {
        return msg.to_string();
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    format!(
        "Error: {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    )
    .trim_end()
    .to_string()
}
