//! Integration tests for arc-api endpoints
//!
//! Drive the full router against an in-memory SQLite database. The
//! moderation service is either disabled (no key) or backed by a stub
//! reviewer, so no network calls happen.

use arc_api::services::{
    ArtifactSubmission, ContentReviewer, ModerationService, ModerationSettings, ReviewError,
};
use arc_api::{build_router, AppState};
use arc_common::db::init::SEED_ADMIN_GUID;
use arc_common::db::models::User;
use arc_common::moderation::AiReview;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: In-memory database with the full schema.
///
/// A single connection keeps every query on the same in-memory database.
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .expect("Should enable foreign keys");

    arc_common::db::create_tables(&pool)
        .await
        .expect("Should create schema");

    pool
}

/// Test helper: App with moderation disabled (no Gemini key)
fn setup_app(db: SqlitePool) -> axum::Router {
    let moderation =
        ModerationService::new(ModerationSettings::default(), None).expect("service");
    build_router(AppState::new(db, moderation))
}

/// Test helper: App with an injected reviewer
fn setup_app_with_reviewer(db: SqlitePool, reviewer: Arc<dyn ContentReviewer>) -> axum::Router {
    let moderation = ModerationService::with_reviewer(reviewer, 0.7);
    build_router(AppState::new(db, moderation))
}

/// Reviewer that errors instead of returning a failure record; exercises
/// the orchestration's fail-open path.
struct ErroringReviewer;

#[async_trait]
impl ContentReviewer for ErroringReviewer {
    async fn review(
        &self,
        _submission: &ArtifactSubmission,
    ) -> Result<AiReview, ReviewError> {
        Err(ReviewError("simulated outage".to_string()))
    }
}

/// Reviewer returning a fixed verdict
struct FixedReviewer(AiReview);

#[async_trait]
impl ContentReviewer for FixedReviewer {
    async fn review(
        &self,
        _submission: &ArtifactSubmission,
    ) -> Result<AiReview, ReviewError> {
        Ok(self.0.clone())
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, user_id: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-user-id", user_id)
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, uri: &str, user_id: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user_id) = user_id {
        builder = builder.header("x-user-id", user_id);
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn seed_user(pool: &SqlitePool, name: &str, email: &str) -> User {
    User::insert(pool, name, email, false).await.expect("Should insert user")
}

fn artifact_payload() -> Value {
    json!({
        "title": "Bronze ritual vessel",
        "description": "A ding cauldron used in ancestral offerings, with taotie motifs.",
        "imageUrl": "https://example.com/ding.jpg",
        "category": "Metalwork",
        "era": "Shang dynasty",
        "region": "China"
    })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_identity_required() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "arc-api");
    assert!(body["version"].is_string());
    assert_eq!(body["moderation_enabled"], false);
}

// =============================================================================
// Artifact creation and the moderation policy
// =============================================================================

#[tokio::test]
async fn test_create_requires_identity() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .oneshot(send_json("POST", "/api/artifacts", None, &artifact_payload()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_with_moderation_disabled_auto_approves() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let response = app
        .oneshot(send_json(
            "POST",
            "/api/artifacts",
            Some(&user.guid),
            &artifact_payload(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["user"], user.guid.as_str());
    // No review record is attached when moderation never ran
    assert!(body.get("aiReview").is_none());
}

#[tokio::test]
async fn test_create_with_erroring_reviewer_fails_open_to_pending() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app_with_reviewer(db, Arc::new(ErroringReviewer));

    let response = app
        .oneshot(send_json(
            "POST",
            "/api/artifacts",
            Some(&user.guid),
            &artifact_payload(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["aiReview"]["isAppropriate"], Value::Null);
    assert_eq!(body["aiReview"]["confidence"], 0.0);
}

#[tokio::test]
async fn test_create_with_confident_verdict_stores_review() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let verdict = AiReview {
        is_appropriate: Some(false),
        confidence: 0.95,
        reason: "Off-topic content".to_string(),
        reviewed_at: Utc::now(),
    };
    let app = setup_app_with_reviewer(db, Arc::new(FixedReviewer(verdict)));

    let response = app
        .oneshot(send_json(
            "POST",
            "/api/artifacts",
            Some(&user.guid),
            &artifact_payload(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["aiReview"]["isAppropriate"], Value::Bool(false));
    assert_eq!(body["aiReview"]["reason"], "Off-topic content");
}

#[tokio::test]
async fn test_create_validates_fields() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let mut payload = artifact_payload();
    payload["title"] = json!("ab");

    let response = app
        .oneshot(send_json("POST", "/api/artifacts", Some(&user.guid), &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Visibility
// =============================================================================

#[tokio::test]
async fn test_pending_artifact_hidden_from_public_but_not_owner() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app_with_reviewer(db, Arc::new(ErroringReviewer));

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/artifacts",
            Some(&user.guid),
            &artifact_payload(),
        ))
        .await
        .unwrap();
    let created = extract_json(response.into_body()).await;
    let artifact_id = created["id"].as_str().unwrap().to_string();

    // Public catalog doesn't include it
    let response = app.clone().oneshot(get("/api/artifacts")).await.unwrap();
    let listing = extract_json(response.into_body()).await;
    assert_eq!(listing.as_array().unwrap().len(), 0);

    // Anonymous detail fetch 404s
    let response = app
        .clone()
        .oneshot(get(&format!("/api/artifacts/{}", artifact_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The owner still sees it
    let response = app
        .clone()
        .oneshot(get_as(&format!("/api/artifacts/{}", artifact_id), &user.guid))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Admins can browse the moderation queue
    let response = app
        .oneshot(get_as("/api/artifacts?status=pending", SEED_ADMIN_GUID))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let queue = extract_json(response.into_body()).await;
    assert_eq!(queue.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_filter_is_admin_only() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let response = app
        .clone()
        .oneshot(get("/api/artifacts?status=pending"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get_as("/api/artifacts?status=pending", &user.guid))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Admin status override
// =============================================================================

async fn create_approved_artifact(app: &axum::Router, user_id: &str) -> String {
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/artifacts",
            Some(user_id),
            &artifact_payload(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_override_rejects_unknown_status_without_mutation() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let artifact_id = create_approved_artifact(&app, &user.guid).await;

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/artifacts/{}/status", artifact_id),
            Some(SEED_ADMIN_GUID),
            &json!({ "status": "archived" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Stored status is unchanged
    let response = app
        .oneshot(get(&format!("/api/artifacts/{}", artifact_id)))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "approved");
}

#[tokio::test]
async fn test_override_applies_status_and_stamps_reason() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let artifact_id = create_approved_artifact(&app, &user.guid).await;

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/artifacts/{}/status", artifact_id),
            Some(SEED_ADMIN_GUID),
            &json!({ "status": "rejected", "reason": "Listing is a modern replica" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "rejected");
    assert_eq!(body["aiReview"]["reason"], "Listing is a modern replica");
    assert!(body["aiReview"]["reviewedAt"].is_string());
}

#[tokio::test]
async fn test_override_requires_admin() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let artifact_id = create_approved_artifact(&app, &user.guid).await;

    let response = app
        .oneshot(send_json(
            "PUT",
            &format!("/api/artifacts/{}/status", artifact_id),
            Some(&user.guid),
            &json!({ "status": "rejected" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Likes and comments
// =============================================================================

#[tokio::test]
async fn test_like_toggles() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let artifact_id = create_approved_artifact(&app, &user.guid).await;
    let uri = format!("/api/artifacts/{}/like", artifact_id);

    let response = app
        .clone()
        .oneshot(send_json("POST", &uri, Some(&user.guid), &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let likes = extract_json(response.into_body()).await;
    assert_eq!(likes, json!([user.guid.as_str()]));

    // Liking again removes the like
    let response = app
        .oneshot(send_json("POST", &uri, Some(&user.guid), &json!({})))
        .await
        .unwrap();
    let likes = extract_json(response.into_body()).await;
    assert_eq!(likes, json!([]));
}

#[tokio::test]
async fn test_comments_append_and_validate() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let artifact_id = create_approved_artifact(&app, &user.guid).await;
    let uri = format!("/api/artifacts/{}/comment", artifact_id);

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &uri,
            Some(&user.guid),
            &json!({ "text": "Remarkable craftsmanship" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let comments = extract_json(response.into_body()).await;
    assert_eq!(comments.as_array().unwrap().len(), 1);
    assert_eq!(comments[0]["userName"], "Alice");
    assert_eq!(comments[0]["text"], "Remarkable craftsmanship");

    // Empty comment is rejected
    let response = app
        .oneshot(send_json("POST", &uri, Some(&user.guid), &json!({ "text": "  " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Collections
// =============================================================================

#[tokio::test]
async fn test_collection_membership() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let artifact_id = create_approved_artifact(&app, &user.guid).await;

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/collections",
            Some(&user.guid),
            &json!({
                "title": "Bronze Age highlights",
                "description": "Favorite bronze pieces"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let collection = extract_json(response.into_body()).await;
    let collection_id = collection["id"].as_str().unwrap().to_string();
    // Default cover image applies
    assert!(collection["imageUrl"].as_str().unwrap().starts_with("https://"));

    let uri = format!("/api/collections/{}/artifacts", collection_id);
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &uri,
            Some(&user.guid),
            &json!({ "artifactId": artifact_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["artifacts"].as_array().unwrap().len(), 1);

    // Adding the same artifact twice is an input error
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &uri,
            Some(&user.guid),
            &json!({ "artifactId": artifact_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Removal works and is idempotent at the HTTP level
    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!(
                    "/api/collections/{}/artifacts/{}",
                    collection_id, artifact_id
                ))
                .header("x-user-id", &user.guid)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["artifacts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_private_collections_hidden_from_public() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/collections",
            Some(&user.guid),
            &json!({
                "title": "Private drafts",
                "description": "Not ready to share",
                "isPrivate": true
            }),
        ))
        .await
        .unwrap();
    let collection = extract_json(response.into_body()).await;
    let collection_id = collection["id"].as_str().unwrap().to_string();

    // Not in the public listing
    let response = app.clone().oneshot(get("/api/collections")).await.unwrap();
    let listing = extract_json(response.into_body()).await;
    assert_eq!(listing.as_array().unwrap().len(), 0);

    // Anonymous detail fetch 404s; owner sees it
    let response = app
        .clone()
        .oneshot(get(&format!("/api/collections/{}", collection_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(get_as(&format!("/api/collections/{}", collection_id), &user.guid))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // And it shows up under /my
    let response = app
        .oneshot(get_as("/api/collections/my", &user.guid))
        .await
        .unwrap();
    let mine = extract_json(response.into_body()).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_profile_and_liked_artifacts() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let response = app
        .clone()
        .oneshot(get_as("/api/users/profile", &user.guid))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile = extract_json(response.into_body()).await;
    assert_eq!(profile["name"], "Alice");
    assert_eq!(profile["isAdmin"], false);

    let artifact_id = create_approved_artifact(&app, &user.guid).await;
    app.clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/artifacts/{}/like", artifact_id),
            Some(&user.guid),
            &json!({}),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(get_as("/api/users/liked", &user.guid))
        .await
        .unwrap();
    let liked = extract_json(response.into_body()).await;
    assert_eq!(liked.as_array().unwrap().len(), 1);
    assert_eq!(liked[0]["id"], artifact_id.as_str());
}

#[tokio::test]
async fn test_user_admin_endpoints_gated() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    let response = app
        .clone()
        .oneshot(get_as("/api/users", &user.guid))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(get_as("/api/users", SEED_ADMIN_GUID))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let users = extract_json(response.into_body()).await;
    // Seeded admin + Alice
    assert_eq!(users.as_array().unwrap().len(), 2);

    // Admin can promote a user
    let response = app
        .oneshot(send_json(
            "PUT",
            &format!("/api/users/{}", user.guid),
            Some(SEED_ADMIN_GUID),
            &json!({ "isAdmin": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = extract_json(response.into_body()).await;
    assert_eq!(updated["isAdmin"], true);
}

// =============================================================================
// Settings
// =============================================================================

#[tokio::test]
async fn test_settings_endpoint_enables_moderation() {
    let db = setup_test_db().await;
    let user = seed_user(&db, "Alice", "alice@example.com").await;
    let app = setup_app(db);

    // Non-admin is rejected
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/settings/gemini_api_key",
            Some(&user.guid),
            &json!({ "apiKey": "fresh-key" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Blank key is rejected
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/settings/gemini_api_key",
            Some(SEED_ADMIN_GUID),
            &json!({ "apiKey": "   " }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Admin sets a key; moderation flips on
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/settings/gemini_api_key",
            Some(SEED_ADMIN_GUID),
            &json!({ "apiKey": "fresh-key" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["success"], true);

    let response = app.oneshot(get("/health")).await.unwrap();
    let health = extract_json(response.into_body()).await;
    assert_eq!(health["moderation_enabled"], true);
}
