//! Artifact endpoints
//!
//! Browsing, submission (with AI-assisted moderation), ownership-gated
//! updates, likes, comments, and the admin status override. Only
//! approved artifacts are visible to the public; owners and admins can
//! see their pending/rejected records.

use crate::api::identity::{Identity, OptionalIdentity};
use crate::services::ArtifactSubmission;
use crate::{validate, ApiError, ApiResult, AppState};
use arc_common::db::models::{Artifact, ArtifactUpdate, Comment, NewArtifact};
use arc_common::moderation::{AiReview, ArtifactStatus};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

/// Artifact as served to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub era: String,
    pub region: String,
    pub status: ArtifactStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_review: Option<AiReview>,
    /// Owner's user id
    pub user: String,
    /// Ids of users who liked this artifact
    pub likes: Vec<String>,
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    /// Commenter's user id
    pub user: String,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        CommentResponse {
            id: comment.guid,
            user: comment.user_id,
            user_name: comment.user_name,
            text: comment.text,
            created_at: comment.created_at,
        }
    }
}

impl ArtifactResponse {
    /// Assemble the response, loading likes and comments
    pub async fn build(pool: &SqlitePool, artifact: Artifact) -> ApiResult<ArtifactResponse> {
        let likes = Artifact::likes(pool, &artifact.guid).await?;
        let comments = Artifact::comments(pool, &artifact.guid).await?;
        let ai_review = artifact.ai_review();

        Ok(ArtifactResponse {
            id: artifact.guid.clone(),
            title: artifact.title,
            description: artifact.description,
            image_url: artifact.image_url,
            category: artifact.category,
            era: artifact.era,
            region: artifact.region,
            status: artifact.status,
            ai_review,
            user: artifact.user_id,
            likes,
            comments: comments.into_iter().map(CommentResponse::from).collect(),
            created_at: artifact.created_at,
            updated_at: artifact.updated_at,
        })
    }

    pub async fn build_many(
        pool: &SqlitePool,
        artifacts: Vec<Artifact>,
    ) -> ApiResult<Vec<ArtifactResponse>> {
        let mut responses = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            responses.push(Self::build(pool, artifact).await?);
        }
        Ok(responses)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Status filter; admin-only (the public always sees approved)
    pub status: Option<String>,
}

/// GET /api/artifacts
///
/// Public catalog of approved artifacts. Admins may pass `?status=` to
/// browse the moderation queue.
pub async fn list_artifacts(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ArtifactResponse>>> {
    let status = match query.status.as_deref() {
        Some(status) => {
            let caller = identity
                .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;
            if !caller.is_admin {
                return Err(ApiError::Forbidden(
                    "Only administrators can browse by status".to_string(),
                ));
            }
            status.parse::<ArtifactStatus>()?
        }
        None => ArtifactStatus::Approved,
    };

    let artifacts = Artifact::list_by_status(&state.db, status).await?;
    Ok(Json(ArtifactResponse::build_many(&state.db, artifacts).await?))
}

/// GET /api/artifacts/:id
///
/// Approved artifacts are public; anything else only exists for its
/// owner and admins.
pub async fn get_artifact(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<ArtifactResponse>> {
    let artifact = Artifact::fetch_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Artifact not found".to_string()))?;

    let visible = artifact.status == ArtifactStatus::Approved
        || identity
            .as_ref()
            .is_some_and(|u| u.guid == artifact.user_id || u.is_admin);

    if !visible {
        return Err(ApiError::NotFound("Artifact not found".to_string()));
    }

    Ok(Json(ArtifactResponse::build(&state.db, artifact).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtifactRequest {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub era: String,
    pub region: String,
}

/// POST /api/artifacts
///
/// Validates the submission, runs the moderation pipeline, and persists
/// the artifact with the derived status. Moderation failures never block
/// creation; see the moderation service for the fail-open policy.
pub async fn create_artifact(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateArtifactRequest>,
) -> ApiResult<(StatusCode, Json<ArtifactResponse>)> {
    validate::artifact_title(&payload.title)?;
    validate::artifact_description(&payload.description)?;
    validate::artifact_image_url(&payload.image_url)?;
    validate::artifact_category(&payload.category)?;
    validate::artifact_era(&payload.era)?;
    validate::artifact_region(&payload.region)?;

    let submission = ArtifactSubmission {
        title: payload.title.clone(),
        description: payload.description.clone(),
        category: payload.category.clone(),
        era: payload.era.clone(),
        region: payload.region.clone(),
    };
    let outcome = state.moderation.moderate(&submission).await;

    let artifact = Artifact::insert(
        &state.db,
        NewArtifact {
            title: payload.title,
            description: payload.description,
            image_url: payload.image_url,
            category: payload.category,
            era: payload.era,
            region: payload.region,
            user_id: identity.0.guid.clone(),
        },
        outcome.status,
        outcome.review.as_ref(),
    )
    .await?;

    info!(
        artifact = %artifact.guid,
        status = %artifact.status,
        user = %identity.0.guid,
        "Artifact created"
    );

    let response = ArtifactResponse::build(&state.db, artifact).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArtifactRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub era: Option<String>,
    pub region: Option<String>,
}

/// PUT /api/artifacts/:id
///
/// Owner or admin; partial update of the descriptive fields. The
/// moderation status is untouched (re-review of edits is the admin
/// queue's job).
pub async fn update_artifact(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<UpdateArtifactRequest>,
) -> ApiResult<Json<ArtifactResponse>> {
    let artifact = Artifact::fetch_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Artifact not found".to_string()))?;

    identity.require_owner_or_admin(&artifact.user_id, "artifact")?;

    if let Some(title) = &payload.title {
        validate::artifact_title(title)?;
    }
    if let Some(description) = &payload.description {
        validate::artifact_description(description)?;
    }
    if let Some(image_url) = &payload.image_url {
        validate::artifact_image_url(image_url)?;
    }
    if let Some(category) = &payload.category {
        validate::artifact_category(category)?;
    }
    if let Some(era) = &payload.era {
        validate::artifact_era(era)?;
    }
    if let Some(region) = &payload.region {
        validate::artifact_region(region)?;
    }

    let updated = Artifact::update_fields(
        &state.db,
        &id,
        ArtifactUpdate {
            title: payload.title,
            description: payload.description,
            image_url: payload.image_url,
            category: payload.category,
            era: payload.era,
            region: payload.region,
        },
    )
    .await?;

    Ok(Json(ArtifactResponse::build(&state.db, updated).await?))
}

/// DELETE /api/artifacts/:id
pub async fn delete_artifact(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let artifact = Artifact::fetch_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Artifact not found".to_string()))?;

    identity.require_owner_or_admin(&artifact.user_id, "artifact")?;

    Artifact::delete(&state.db, &id).await?;
    Ok(Json(json!({ "message": "Artifact removed" })))
}

/// POST /api/artifacts/:id/like
///
/// Toggle the caller's like; returns the updated liker list.
pub async fn like_artifact(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<String>>> {
    if Artifact::fetch_by_id(&state.db, &id).await?.is_none() {
        return Err(ApiError::NotFound("Artifact not found".to_string()));
    }

    let likes = Artifact::toggle_like(&state.db, &id, &identity.0.guid).await?;
    Ok(Json(likes))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

/// POST /api/artifacts/:id/comment
///
/// Append a comment; returns the artifact's full comment list.
pub async fn create_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Vec<CommentResponse>>)> {
    validate::comment_text(&payload.text)?;

    if Artifact::fetch_by_id(&state.db, &id).await?.is_none() {
        return Err(ApiError::NotFound("Artifact not found".to_string()));
    }

    Artifact::add_comment(&state.db, &id, &identity.0, payload.text.trim()).await?;

    let comments = Artifact::comments(&state.db, &id).await?;
    Ok((
        StatusCode::CREATED,
        Json(comments.into_iter().map(CommentResponse::from).collect()),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

/// PUT /api/artifacts/:id/status
///
/// Admin override of the moderation status, bypassing the AI path. The
/// target status is validated against the three-value enumeration before
/// anything is touched; a supplied reason is stamped onto the review
/// record.
pub async fn update_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<Json<ArtifactResponse>> {
    identity.require_admin()?;

    let status = payload.status.parse::<ArtifactStatus>()?;
    if let Some(reason) = &payload.reason {
        validate::override_reason(reason)?;
    }

    let artifact =
        Artifact::override_status(&state.db, &id, status, payload.reason.as_deref()).await?;

    info!(
        artifact = %artifact.guid,
        status = %artifact.status,
        admin = %identity.0.guid,
        "Artifact status overridden"
    );

    Ok(Json(ArtifactResponse::build(&state.db, artifact).await?))
}

/// Build artifact routes
pub fn artifact_routes() -> Router<AppState> {
    Router::new()
        .route("/api/artifacts", get(list_artifacts).post(create_artifact))
        .route(
            "/api/artifacts/:id",
            get(get_artifact).put(update_artifact).delete(delete_artifact),
        )
        .route("/api/artifacts/:id/like", post(like_artifact))
        .route("/api/artifacts/:id/comment", post(create_comment))
        .route("/api/artifacts/:id/status", put(update_status))
}
