use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::ApiError;
use crate::api::schemas::{
    GenerationMetadata, GenerationResponse, LegacySceneRequest, PresetResponse, RefineRequest,
    RefineResponse,
};
use crate::generation::fibo;
use crate::llm::gemini;
use crate::models::lighting;
use crate::models::scene::{SceneRequest, DEFAULT_OUTPUT_SIZE};
use crate::prompt;
use crate::state::AppState;
use crate::utils::cache::ResponseCache;
use crate::utils::timing::{complete_request_timer, start_request_timer};

pub async fn home() -> Json<Value> {
    Json(json!({
        "status": "ready",
        "features": ["hdr", "lighting_control", "cinematic_json", "refine"],
        "apis_configured": {
            "fal": fibo::is_configured(),
            "gemini": gemini::is_configured(),
        },
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let fal_configured = fibo::is_configured();
    let gemini_configured = gemini::is_configured();

    let mut checks = serde_json::Map::new();
    checks.insert("fal_api".to_string(), json!(fal_configured));
    checks.insert("gemini_api".to_string(), json!(gemini_configured));
    checks.insert(
        "cache_size".to_string(),
        json!(state.generation_cache.len()),
    );
    checks.insert(
        "ready".to_string(),
        json!(fal_configured && gemini_configured),
    );
    if fal_configured {
        checks.insert("fal_accessible".to_string(), json!(fibo::probe_health().await));
    }

    let status = if fal_configured && gemini_configured {
        "healthy"
    } else {
        "degraded"
    };

    Json(json!({ "status": status, "checks": checks }))
}

pub async fn get_preset(Path(name): Path<String>) -> Result<Json<PresetResponse>, ApiError> {
    let lights = lighting::preset(&name)
        .ok_or_else(|| ApiError::NotFound(format!("Preset '{name}' not found")))?;

    Ok(Json(PresetResponse {
        description: format!("Cinematic {} lighting", name.replace('_', " ")),
        color_profile: lighting::mix_light_colors(&lights),
        preset: name,
        lights,
    }))
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SceneRequest>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let mut timer = start_request_timer("generate");
    match run_generation(&state, request).await {
        Ok(response) => {
            complete_request_timer(&mut timer, "success", None);
            Ok(Json(response))
        }
        Err(err) => {
            complete_request_timer(&mut timer, "error", Some(err.to_string()));
            Err(err)
        }
    }
}

pub async fn generate_legacy(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LegacySceneRequest>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let mut timer = start_request_timer("generate_legacy");
    match run_generation(&state, request.into_scene_request()).await {
        Ok(response) => {
            complete_request_timer(&mut timer, "success", None);
            Ok(Json(response))
        }
        Err(err) => {
            complete_request_timer(&mut timer, "error", Some(err.to_string()));
            Err(err)
        }
    }
}

pub async fn refine(
    Json(request): Json<RefineRequest>,
) -> Result<Json<RefineResponse>, ApiError> {
    let mut timer = start_request_timer("refine");
    match run_refinement(request).await {
        Ok(response) => {
            complete_request_timer(&mut timer, "success", None);
            Ok(Json(response))
        }
        Err(err) => {
            complete_request_timer(&mut timer, "error", Some(err.to_string()));
            Err(err)
        }
    }
}

/// The full generation pipeline: validate, inject the key light, check the
/// cache, synthesize, enhance for HDR, generate, cache.
async fn run_generation(
    state: &AppState,
    mut request: SceneRequest,
) -> Result<GenerationResponse, ApiError> {
    request
        .validate()
        .map_err(|err| ApiError::Validation(format!("{err:#}")))?;
    request.ensure_key_light();

    if !fibo::is_configured() {
        return Err(ApiError::Internal("FAL_KEY is not configured".to_string()));
    }

    let request_value = serde_json::to_value(&request)
        .map_err(|err| ApiError::Internal(format!("request serialization failed: {err}")))?;
    let cache_key = ResponseCache::key_for(&request_value);
    if let Some(cached) = state.generation_cache.get(&cache_key) {
        if let Ok(response) = serde_json::from_value::<GenerationResponse>(cached) {
            info!("Serving generation response from cache");
            return Ok(response);
        }
    }

    let mut json_prompt = prompt::synthesize(&request).await;
    if request.hdr_enabled {
        prompt::enhance_for_hdr(&mut json_prompt);
    }

    let result = fibo::generate_image(
        &json_prompt,
        request.hdr_enabled,
        &request.output_size,
        request.seed,
    )
    .await
    .map_err(|err| ApiError::Internal(format!("Generation failed: {err}")))?;

    let response = GenerationResponse {
        success: true,
        image_url: result.image_url,
        request_id: result.request_id,
        json_prompt,
        metadata: GenerationMetadata {
            lighting_setup: request.lighting_setup.clone(),
            camera: request.camera.clone(),
            hdr: request.hdr_enabled,
            style: request.style.clone(),
            seed: result.seed,
            size: result.size,
        },
        processing_time_ms: result.processing_time_ms,
    };

    if let Ok(payload) = serde_json::to_value(&response) {
        state.generation_cache.set(cache_key, payload);
    }

    Ok(response)
}

async fn run_refinement(request: RefineRequest) -> Result<RefineResponse, ApiError> {
    let instruction_len = request.instruction.chars().count();
    if !(2..=200).contains(&instruction_len) {
        return Err(ApiError::Validation(
            "instruction must be between 2 and 200 characters".to_string(),
        ));
    }

    if !fibo::is_configured() {
        return Err(ApiError::Internal("FAL_KEY is not configured".to_string()));
    }

    let (refined_json, changes) = prompt::refine(&request.previous_json, &request.instruction).await;

    let result = fibo::generate_image(&refined_json, request.hdr, DEFAULT_OUTPUT_SIZE, request.seed)
        .await
        .map_err(|err| ApiError::Internal(format!("Generation failed: {err}")))?;

    Ok(RefineResponse {
        success: true,
        image_url: result.image_url,
        refined_json,
        instruction_applied: request.instruction,
        changes,
    })
}
