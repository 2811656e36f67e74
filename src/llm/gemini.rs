use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::CONFIG;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

const MAX_RETRY_ATTEMPTS: usize = 2;
const RETRY_BASE_DELAY_MS: u64 = 900;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

pub fn is_configured() -> bool {
    !CONFIG.gemini_api_key.trim().is_empty()
}

fn redact_api_key(text: &str) -> String {
    let key = CONFIG.gemini_api_key.trim();
    if key.is_empty() {
        return text.to_string();
    }
    text.replace(key, "[redacted]")
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn retry_delay(attempt: usize) -> Duration {
    let attempt = attempt.max(1) as u64;
    Duration::from_millis(RETRY_BASE_DELAY_MS.saturating_mul(attempt))
}

fn extract_text(response: GeminiResponse) -> String {
    let mut text_parts = Vec::new();
    for candidate in response.candidates.unwrap_or_default() {
        if let Some(content) = candidate.content {
            for part in content.parts.unwrap_or_default() {
                if let Some(text) = part.text {
                    if !text.trim().is_empty() {
                        text_parts.push(text);
                    }
                }
            }
        }
    }
    text_parts.join("\n")
}

async fn call_api(payload: &Value) -> Result<GeminiResponse> {
    let client = get_http_client();
    let url = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
        CONFIG.gemini_model, CONFIG.gemini_api_key
    );

    let mut attempt = 0usize;
    loop {
        attempt += 1;
        let response = match client
            .post(&url)
            .timeout(Duration::from_secs(CONFIG.llm_timeout_seconds))
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err_text = redact_api_key(&err.to_string());
                let should_retry = should_retry_error(&err) && attempt < MAX_RETRY_ATTEMPTS;
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={}, retrying={})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect(),
                    should_retry
                );
                if should_retry {
                    tokio::time::sleep(retry_delay(attempt)).await;
                    continue;
                }
                return Err(anyhow!("Gemini request failed: {}", err_text));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let should_retry = should_retry_status(status) && attempt < MAX_RETRY_ATTEMPTS;
            warn!(
                "Gemini API error: status={}, retrying={}",
                status, should_retry
            );
            if tracing::enabled!(tracing::Level::DEBUG) {
                debug!(target: "llm.gemini", status = %status, body = %redact_api_key(&body));
            }
            if should_retry {
                tokio::time::sleep(retry_delay(attempt)).await;
                continue;
            }
            return Err(anyhow!(
                "Gemini request failed with status {}: {}",
                status,
                redact_api_key(&body)
            ));
        }

        return Ok(response.json::<GeminiResponse>().await?);
    }
}

/// One-shot text completion. The entire instruction lives in the user turn;
/// callers embed schema directives in the prompt itself.
pub async fn complete(prompt: &str, operation: &str) -> Result<String> {
    if !is_configured() {
        return Err(anyhow!("GEMINI_API_KEY is not configured"));
    }

    let payload = json!({
        "contents": [{ "parts": [{ "text": prompt }] }]
    });

    log_llm_timing("gemini", &CONFIG.gemini_model, operation, None, || async {
        let response = call_api(&payload).await?;
        let text = extract_text(response);
        if text.trim().is_empty() {
            return Err(anyhow!("Gemini returned an empty completion"));
        }
        Ok(text)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_parts_across_candidates() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [ { "text": "{\"subject\":" }, { "text": "\"office\"}" } ] } }
            ]
        }))
        .expect("response");
        assert_eq!(extract_text(response), "{\"subject\":\n\"office\"}");
    }

    #[test]
    fn tolerates_missing_candidates_and_empty_parts() {
        let response: GeminiResponse = serde_json::from_value(json!({})).expect("response");
        assert_eq!(extract_text(response), "");

        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [ { "content": { "parts": [ { "text": "   " } ] } } ]
        }))
        .expect("response");
        assert_eq!(extract_text(response), "");
    }

    #[test]
    fn retries_on_rate_limits_and_server_errors_only() {
        assert!(should_retry_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!should_retry_status(StatusCode::BAD_REQUEST));
        assert!(!should_retry_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn retry_delay_scales_with_attempt() {
        assert_eq!(retry_delay(1), Duration::from_millis(900));
        assert_eq!(retry_delay(2), Duration::from_millis(1800));
    }
}
