//! Client for the FIBO text-to-image model behind the fal.ai queue API.
//!
//! One opaque asynchronous operation per image: submit the job, poll its
//! status with a bounded wait, fetch the result. No retries beyond the poll
//! loop; callers see either an image URL or a `GenerationError` message.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::CONFIG;
use crate::prompt::StructuredPrompt;
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

const FAL_HEALTH_URL: &str = "https://fal.ai/api/health";
const GUIDANCE_SCALE: f64 = 5.0;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct GenerationError(pub String);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub image_url: String,
    pub request_id: String,
    pub seed: i64,
    pub processing_time_ms: u64,
    pub size: String,
    pub hdr: bool,
}

#[derive(Debug, Deserialize)]
struct QueueSubmitResponse {
    request_id: String,
    status_url: String,
    response_url: String,
}

#[derive(Debug, Deserialize)]
struct QueueStatusResponse {
    status: String,
}

struct QueueOutcome {
    request_id: String,
    payload: Value,
}

pub fn is_configured() -> bool {
    !CONFIG.fal_key.trim().is_empty()
}

/// Quick reachability probe used by the health endpoint.
pub async fn probe_health() -> bool {
    let client = get_http_client();
    match client
        .get(FAL_HEALTH_URL)
        .header("Authorization", format!("Key {}", CONFIG.fal_key))
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(err) => {
            warn!("FIBO health probe failed: {err}");
            false
        }
    }
}

/// Generates one image for a structured prompt. The seed defaults to a
/// millisecond-derived value so repeated unseeded requests vary.
pub async fn generate_image(
    prompt: &StructuredPrompt,
    hdr: bool,
    size: &str,
    seed: Option<i64>,
) -> Result<GenerationResult, GenerationError> {
    if !is_configured() {
        return Err(GenerationError("FAL_KEY is not configured".to_string()));
    }

    let started = Instant::now();
    let seed = seed.unwrap_or_else(default_seed);

    let arguments = json!({
        "structured_prompt": prompt,
        "seed": seed,
        "steps_num": if hdr { 40 } else { 30 },
        "guidance_scale": GUIDANCE_SCALE,
        "aspect_ratio": aspect_ratio_for_size(size),
        "negative_prompt": negative_prompt_for(prompt),
    });

    let outcome = log_llm_timing(
        "fal",
        &CONFIG.fal_model,
        "generate_image",
        Some(json!({ "size": size, "hdr": hdr })),
        || async { run_queue_cycle(&arguments).await },
    )
    .await
    .map_err(|err| GenerationError(format!("FIBO generation failed: {err}")))?;

    let image_url = extract_image_url(&outcome.payload).ok_or_else(|| {
        GenerationError("No image URL found in FIBO response".to_string())
    })?;

    Ok(GenerationResult {
        image_url,
        request_id: outcome.request_id,
        seed,
        processing_time_ms: started.elapsed().as_millis() as u64,
        size: size.to_string(),
        hdr,
    })
}

async fn run_queue_cycle(arguments: &Value) -> Result<QueueOutcome> {
    let client = get_http_client();
    let auth = format!("Key {}", CONFIG.fal_key);
    let submit_url = format!(
        "{}/{}",
        CONFIG.fal_queue_base_url.trim_end_matches('/'),
        CONFIG.fal_model
    );

    let response = client
        .post(&submit_url)
        .header("Authorization", &auth)
        .json(arguments)
        .send()
        .await
        .map_err(|err| anyhow!("queue submit failed: {err}"))?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("queue submit returned {status}: {body}"));
    }
    let submitted: QueueSubmitResponse = response.json().await?;
    info!("FIBO request {} queued", submitted.request_id);

    let deadline = Instant::now() + Duration::from_secs(CONFIG.generation_max_wait_seconds);
    loop {
        let response = client
            .get(&submitted.status_url)
            .header("Authorization", &auth)
            .send()
            .await
            .map_err(|err| anyhow!("status poll failed: {err}"))?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(anyhow!("status poll returned {status}"));
        }
        let status: QueueStatusResponse = response.json().await?;
        match status.status.as_str() {
            "COMPLETED" => break,
            "FAILED" | "CANCELLED" => {
                return Err(anyhow!(
                    "request {} ended with status {}",
                    submitted.request_id,
                    status.status
                ));
            }
            _ => {}
        }
        if Instant::now() >= deadline {
            return Err(anyhow!(
                "timed out after {}s waiting for request {}",
                CONFIG.generation_max_wait_seconds,
                submitted.request_id
            ));
        }
        tokio::time::sleep(Duration::from_millis(CONFIG.generation_poll_interval_ms)).await;
    }

    let response = client
        .get(&submitted.response_url)
        .header("Authorization", &auth)
        .send()
        .await
        .map_err(|err| anyhow!("result fetch failed: {err}"))?;
    if !response.status().is_success() {
        let status = response.status();
        return Err(anyhow!("result fetch returned {status}"));
    }
    let payload: Value = response.json().await?;

    Ok(QueueOutcome {
        request_id: submitted.request_id,
        payload,
    })
}

fn default_seed() -> i64 {
    (Utc::now().timestamp_millis() % 100_000).abs()
}

fn aspect_ratio_for_size(size: &str) -> &'static str {
    match size {
        "1024x1024" | "768x768" | "1536x1536" => "1:1",
        "768x1024" => "3:4",
        "1024x768" => "4:3",
        "1024x576" => "16:9",
        "576x1024" => "9:16",
        _ => "1:1",
    }
}

fn negative_prompt_for(prompt: &StructuredPrompt) -> String {
    let mut negative =
        String::from("{'style_medium':'digital illustration','artistic_style':'non-realistic'}");
    let hdr = prompt
        .get("style_attributes")
        .and_then(|style| style.get("dynamic_range"))
        .and_then(Value::as_str)
        == Some("hdr");
    if hdr {
        negative.push_str(", {'technical_flaws':'clipped highlights, blown out, crushed shadows'}");
    }
    negative
}

/// Providers have shipped the image URL under several shapes; accept all of
/// them.
fn extract_image_url(payload: &Value) -> Option<String> {
    if let Some(url) = payload
        .get("image")
        .and_then(|image| image.get("url"))
        .and_then(Value::as_str)
    {
        return Some(url.to_string());
    }
    if let Some(url) = payload
        .get("images")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .and_then(|image| image.get("url"))
        .and_then(Value::as_str)
    {
        return Some(url.to_string());
    }
    payload
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt_with(entries: Value) -> StructuredPrompt {
        match entries {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn maps_sizes_to_aspect_ratios() {
        assert_eq!(aspect_ratio_for_size("1024x1024"), "1:1");
        assert_eq!(aspect_ratio_for_size("768x1024"), "3:4");
        assert_eq!(aspect_ratio_for_size("1024x768"), "4:3");
        assert_eq!(aspect_ratio_for_size("1024x576"), "16:9");
        assert_eq!(aspect_ratio_for_size("576x1024"), "9:16");
        assert_eq!(aspect_ratio_for_size("1536x1536"), "1:1");
        assert_eq!(aspect_ratio_for_size("640x480"), "1:1");
    }

    #[test]
    fn negative_prompt_adds_flaw_clause_for_hdr() {
        let sdr = prompt_with(json!({"style_attributes": {"dynamic_range": "standard"}}));
        assert!(!negative_prompt_for(&sdr).contains("technical_flaws"));

        let hdr = prompt_with(json!({"style_attributes": {"dynamic_range": "hdr"}}));
        assert!(negative_prompt_for(&hdr).contains("clipped highlights"));

        let bare = StructuredPrompt::new();
        assert!(!negative_prompt_for(&bare).contains("technical_flaws"));
    }

    #[test]
    fn finds_the_image_url_in_all_known_shapes() {
        let nested = json!({"image": {"url": "https://img/one.png"}});
        assert_eq!(extract_image_url(&nested).as_deref(), Some("https://img/one.png"));

        let listed = json!({"images": [{"url": "https://img/two.png"}, {"url": "https://img/ignored.png"}]});
        assert_eq!(extract_image_url(&listed).as_deref(), Some("https://img/two.png"));

        let flat = json!({"url": "https://img/three.png"});
        assert_eq!(extract_image_url(&flat).as_deref(), Some("https://img/three.png"));

        let missing = json!({"detail": "no image"});
        assert_eq!(extract_image_url(&missing), None);
    }

    #[test]
    fn default_seed_stays_in_provider_range() {
        for _ in 0..10 {
            let seed = default_seed();
            assert!((0..100_000).contains(&seed));
        }
    }
}
