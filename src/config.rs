use std::env;

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub log_level: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub llm_timeout_seconds: u64,
    pub fal_key: String,
    pub fal_model: String,
    pub fal_queue_base_url: String,
    pub generation_poll_interval_ms: u64,
    pub generation_max_wait_seconds: u64,
    pub cache_ttl_seconds: u64,
    pub cors_allowed_origins: Vec<String>,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_csv(name: &str, default: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

impl Config {
    pub fn load() -> Result<Self> {
        let gemini_api_key = env_string("GEMINI_API_KEY", "");
        let fal_key = env_string("FAL_KEY", "");

        if fal_key.trim().is_empty() {
            warn!("FAL_KEY is not set; image generation requests will be rejected.");
        }
        if gemini_api_key.trim().is_empty() {
            warn!(
                "GEMINI_API_KEY is not set; prompt synthesis and refinement \
                 will use the deterministic fallback only."
            );
        }

        Ok(Config {
            server_addr: env_string("SERVER_ADDR", "0.0.0.0:8000"),
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            gemini_api_key,
            gemini_model: env_string("GEMINI_MODEL", "gemini-2.0-flash"),
            llm_timeout_seconds: env_u64("LLM_TIMEOUT_SECONDS", 30),
            fal_key,
            fal_model: env_string("FAL_MODEL", "bria/fibo/generate"),
            fal_queue_base_url: env_string("FAL_QUEUE_BASE_URL", "https://queue.fal.run"),
            generation_poll_interval_ms: env_u64("GENERATION_POLL_INTERVAL_MS", 1500),
            generation_max_wait_seconds: env_u64("GENERATION_MAX_WAIT_SECONDS", 180),
            cache_ttl_seconds: env_u64("CACHE_TTL_SECONDS", 3600),
            cors_allowed_origins: env_csv(
                "CORS_ALLOWED_ORIGINS",
                "http://localhost:3000,http://127.0.0.1:3000",
            ),
        })
    }
}
