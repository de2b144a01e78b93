//! Settings API endpoint
//!
//! Lets an administrator configure the Gemini API key at runtime:
//! written to the database (authoritative across restarts) and swapped
//! into the live moderation service immediately.

use crate::api::identity::Identity;
use crate::{config, ApiError, ApiResult, AppState};
use arc_common::db::settings;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetApiKeyRequest {
    /// The Gemini API key to configure
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/settings/gemini_api_key (admin)
pub async fn set_gemini_api_key(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    identity.require_admin()?;

    if !config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }

    let api_key = payload.api_key.trim().to_string();

    settings::set_setting(&state.db, settings::GEMINI_API_KEY, &api_key).await?;
    state.moderation.set_api_key(api_key).await;

    info!(admin = %identity.0.guid, "Gemini API key configured; moderation enabled");

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Gemini API key configured successfully".to_string(),
    }))
}

/// Build settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings/gemini_api_key", post(set_gemini_api_key))
}
