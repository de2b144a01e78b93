//! Collection endpoints
//!
//! User-curated sets of artifacts. Public listing excludes private
//! collections; membership changes are owner-gated.

use crate::api::artifacts::ArtifactResponse;
use crate::api::identity::{Identity, OptionalIdentity};
use crate::{validate, ApiError, ApiResult, AppState};
use arc_common::db::models::{Artifact, Collection, CollectionUpdate, NewCollection};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;

/// Cover image used when a collection is created without one
const DEFAULT_COVER_IMAGE: &str =
    "https://images.unsplash.com/photo-1461360370896-922624d12aa1?q=80&w=2674&auto=format&fit=crop";

/// Collection as served to clients, member artifacts populated
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub is_private: bool,
    /// Owner's user id
    pub user: String,
    pub artifacts: Vec<ArtifactResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CollectionResponse {
    pub async fn build(pool: &SqlitePool, collection: Collection) -> ApiResult<CollectionResponse> {
        let artifacts = Collection::artifacts(pool, &collection.guid).await?;

        Ok(CollectionResponse {
            id: collection.guid.clone(),
            title: collection.title,
            description: collection.description,
            image_url: collection.image_url,
            is_private: collection.is_private,
            user: collection.user_id,
            artifacts: ArtifactResponse::build_many(pool, artifacts).await?,
            created_at: collection.created_at,
            updated_at: collection.updated_at,
        })
    }

    pub async fn build_many(
        pool: &SqlitePool,
        collections: Vec<Collection>,
    ) -> ApiResult<Vec<CollectionResponse>> {
        let mut responses = Vec::with_capacity(collections.len());
        for collection in collections {
            responses.push(Self::build(pool, collection).await?);
        }
        Ok(responses)
    }
}

/// GET /api/collections
pub async fn list_collections(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CollectionResponse>>> {
    let collections = Collection::list_public(&state.db).await?;
    Ok(Json(CollectionResponse::build_many(&state.db, collections).await?))
}

/// GET /api/collections/my
pub async fn my_collections(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<Vec<CollectionResponse>>> {
    let collections = Collection::list_by_user(&state.db, &identity.0.guid).await?;
    Ok(Json(CollectionResponse::build_many(&state.db, collections).await?))
}

/// GET /api/collections/:id
///
/// Private collections only exist for their owner and admins.
pub async fn get_collection(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
) -> ApiResult<Json<CollectionResponse>> {
    let collection = Collection::fetch_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    let visible = !collection.is_private
        || identity
            .as_ref()
            .is_some_and(|u| u.guid == collection.user_id || u.is_admin);

    if !visible {
        return Err(ApiError::NotFound("Collection not found".to_string()));
    }

    Ok(Json(CollectionResponse::build(&state.db, collection).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

/// POST /api/collections
pub async fn create_collection(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateCollectionRequest>,
) -> ApiResult<(StatusCode, Json<CollectionResponse>)> {
    validate::collection_title(&payload.title)?;
    validate::collection_description(&payload.description)?;
    if let Some(image_url) = &payload.image_url {
        validate::collection_image_url(image_url)?;
    }

    let collection = Collection::insert(
        &state.db,
        NewCollection {
            title: payload.title,
            description: payload.description,
            image_url: payload
                .image_url
                .unwrap_or_else(|| DEFAULT_COVER_IMAGE.to_string()),
            is_private: payload.is_private,
            user_id: identity.0.guid.clone(),
        },
    )
    .await?;

    let response = CollectionResponse::build(&state.db, collection).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCollectionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_private: Option<bool>,
}

/// PUT /api/collections/:id
pub async fn update_collection(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCollectionRequest>,
) -> ApiResult<Json<CollectionResponse>> {
    let collection = Collection::fetch_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    identity.require_owner_or_admin(&collection.user_id, "collection")?;

    if let Some(title) = &payload.title {
        validate::collection_title(title)?;
    }
    if let Some(description) = &payload.description {
        validate::collection_description(description)?;
    }
    if let Some(image_url) = &payload.image_url {
        validate::collection_image_url(image_url)?;
    }

    let updated = Collection::update_fields(
        &state.db,
        &id,
        CollectionUpdate {
            title: payload.title,
            description: payload.description,
            image_url: payload.image_url,
            is_private: payload.is_private,
        },
    )
    .await?;

    Ok(Json(CollectionResponse::build(&state.db, updated).await?))
}

/// DELETE /api/collections/:id
pub async fn delete_collection(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let collection = Collection::fetch_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    identity.require_owner_or_admin(&collection.user_id, "collection")?;

    Collection::delete(&state.db, &id).await?;
    Ok(Json(json!({ "message": "Collection removed" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddArtifactRequest {
    pub artifact_id: String,
}

/// POST /api/collections/:id/artifacts
///
/// Adding an artifact twice is an input error (400).
pub async fn add_artifact(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(payload): Json<AddArtifactRequest>,
) -> ApiResult<Json<CollectionResponse>> {
    let collection = Collection::fetch_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    identity.require_owner_or_admin(&collection.user_id, "collection")?;

    if Artifact::fetch_by_id(&state.db, &payload.artifact_id).await?.is_none() {
        return Err(ApiError::NotFound("Artifact not found".to_string()));
    }

    Collection::add_artifact(&state.db, &id, &payload.artifact_id).await?;

    let collection = Collection::fetch_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;
    Ok(Json(CollectionResponse::build(&state.db, collection).await?))
}

/// DELETE /api/collections/:id/artifacts/:artifact_id
pub async fn remove_artifact(
    State(state): State<AppState>,
    identity: Identity,
    Path((id, artifact_id)): Path<(String, String)>,
) -> ApiResult<Json<CollectionResponse>> {
    let collection = Collection::fetch_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;

    identity.require_owner_or_admin(&collection.user_id, "collection")?;

    Collection::remove_artifact(&state.db, &id, &artifact_id).await?;

    let collection = Collection::fetch_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Collection not found".to_string()))?;
    Ok(Json(CollectionResponse::build(&state.db, collection).await?))
}

/// Build collection routes
pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/api/collections", get(list_collections).post(create_collection))
        .route("/api/collections/my", get(my_collections))
        .route(
            "/api/collections/:id",
            get(get_collection).put(update_collection).delete(delete_collection),
        )
        .route("/api/collections/:id/artifacts", post(add_artifact))
        .route(
            "/api/collections/:id/artifacts/:artifact_id",
            delete(remove_artifact),
        )
}
