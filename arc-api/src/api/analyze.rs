//! Artifact authenticity analysis
//!
//! Sends the artifact's image and details to the Gemini model for an
//! authenticity assessment. Unlike the moderation pipeline this is a
//! synchronous advisory call: failures surface to the caller instead of
//! being absorbed into a record.

use crate::api::identity::Identity;
use crate::services::gemini::{extract_json_object, Part};
use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub era: String,
    #[serde(default)]
    pub region: String,
    pub image_url: Option<String>,
}

/// Assessment shape the analysis prompt asks the model for
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    /// 0-100 likelihood of the artifact being authentic and culturally
    /// significant
    pub authenticity_score: f64,
    /// Whether the artifact is considered authentic enough for the
    /// platform
    pub is_authentic: bool,
    /// Detailed feedback explaining the assessment
    pub feedback: String,
}

fn build_analysis_prompt(payload: &AnalyzeRequest) -> String {
    format!(
        "You are an expert historian and artifact appraiser. \
         Analyze the following artifact based on its image and details:\n\
         \n\
         Title: {}\n\
         Category: {}\n\
         Era: {}\n\
         Region: {}\n\
         Description: {}\n\
         \n\
         Your task is to determine if this item appears to be a genuine cultural artifact \
         suitable for a digital museum.\n\
         \n\
         Criteria for Authenticity:\n\
         1. Visual consistency with the stated Era and Region.\n\
         2. Plausibility of the artifact's existence and description.\n\
         3. Rejection of obvious modern items, memes, low-quality internet images that are \
         clearly not artifacts, or items that are explicitly labeled as replicas/fakes without context.\n\
         \n\
         Provide a strict assessment. Respond in JSON format only with no markdown formatting:\n\
         {{\n\
             \"authenticityScore\": 0-100 (likelihood of the artifact being authentic and culturally significant),\n\
             \"isAuthentic\": true/false (authentic enough for the platform, score >= 70),\n\
             \"feedback\": \"Detailed feedback explaining why the artifact was accepted or rejected\"\n\
         }}",
        payload.title, payload.category, payload.era, payload.region, payload.description
    )
}

/// POST /api/ai/analyze
///
/// Requires a configured Gemini key (503 otherwise). The image is
/// fetched server-side and inlined into a multimodal request.
pub async fn analyze_artifact(
    State(state): State<AppState>,
    _identity: Identity,
    Json(payload): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let image_url = payload
        .image_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Image URL is required for analysis".to_string()))?;

    let client = state.moderation.client().await.ok_or_else(|| {
        ApiError::Unavailable("AI analysis is not configured (no Gemini API key)".to_string())
    })?;

    // Fetch the image and inline it; Gemini does not fetch remote URLs
    let image_response = state
        .moderation
        .http_client()
        .get(image_url)
        .send()
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to fetch image: {}", e)))?;

    if !image_response.status().is_success() {
        return Err(ApiError::Upstream(format!(
            "Failed to fetch image: HTTP {}",
            image_response.status().as_u16()
        )));
    }

    let mime_type = image_response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.starts_with("image/"))
        .unwrap_or("image/jpeg")
        .to_string();

    let image_bytes = image_response
        .bytes()
        .await
        .map_err(|e| ApiError::Upstream(format!("Failed to read image: {}", e)))?;
    let image_data = base64::engine::general_purpose::STANDARD.encode(&image_bytes);

    let parts = vec![
        Part::text(build_analysis_prompt(&payload)),
        Part::inline_image(mime_type, image_data),
    ];

    let text = client.generate(parts).await.map_err(|e| {
        warn!("AI analysis call failed: {}", e);
        ApiError::Upstream(format!("Failed to analyze artifact: {}", e))
    })?;

    let json_str = extract_json_object(&text).ok_or_else(|| {
        ApiError::Upstream("AI analysis returned no parseable assessment".to_string())
    })?;

    let assessment: AnalyzeResponse = serde_json::from_str(json_str).map_err(|e| {
        ApiError::Upstream(format!("AI analysis returned an unexpected shape: {}", e))
    })?;

    info!(
        score = assessment.authenticity_score,
        authentic = assessment.is_authentic,
        "Artifact analysis completed"
    );

    Ok(Json(assessment))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/api/ai/analyze", post(analyze_artifact))
}
