//! User endpoints
//!
//! Profile and admin user management. Login, signup and credential
//! handling live in the upstream gateway; this service only knows
//! profiles and the admin flag.

use crate::api::artifacts::ArtifactResponse;
use crate::api::identity::Identity;
use crate::{validate, ApiResult, AppState};
use arc_common::db::models::{Artifact, User};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// User profile as served to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.guid,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
            avatar: user.avatar,
            created_at: user.created_at,
        }
    }
}

/// GET /api/users/profile
pub async fn get_profile(identity: Identity) -> Json<UserResponse> {
    Json(UserResponse::from(identity.0))
}

/// GET /api/users/liked
///
/// Artifacts the caller has liked, newest like first.
pub async fn get_liked_artifacts(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<ArtifactResponse>>> {
    let artifacts = Artifact::list_liked_by(&state.db, &identity.0.guid).await?;
    Ok(Json(ArtifactResponse::build_many(&state.db, artifacts).await?))
}

/// GET /api/users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<UserResponse>>> {
    identity.require_admin()?;

    let users = User::list_all(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
}

/// PUT /api/users/:id (admin)
pub async fn update_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    identity.require_admin()?;

    if let Some(name) = &payload.name {
        validate::user_name(name)?;
    }
    if let Some(email) = &payload.email {
        validate::user_email(email)?;
    }

    let user = User::update(
        &state.db,
        &id,
        payload.name.as_deref(),
        payload.email.as_deref(),
        payload.is_admin,
    )
    .await?;

    info!(user = %user.guid, admin = %identity.0.guid, "User updated");
    Ok(Json(UserResponse::from(user)))
}

/// DELETE /api/users/:id (admin)
///
/// Owned artifacts, likes, comments and collections cascade away with
/// the account.
pub async fn delete_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    identity.require_admin()?;

    User::delete(&state.db, &id).await?;

    info!(user = %id, admin = %identity.0.guid, "User removed");
    Ok(Json(json!({ "message": "User removed" })))
}

/// Build user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/profile", get(get_profile))
        .route("/api/users/liked", get(get_liked_artifacts))
        .route("/api/users/:id", axum::routing::put(update_user).delete(delete_user))
}
