//! Database models and queries

use crate::moderation::{AiReview, ArtifactStatus};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Registered user (authentication happens upstream; this is the profile
/// and authorization record)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub guid: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub async fn fetch_by_id(pool: &SqlitePool, guid: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE guid = ?")
            .bind(guid)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(pool)
            .await?;
        Ok(users)
    }

    pub async fn insert(
        pool: &SqlitePool,
        name: &str,
        email: &str,
        is_admin: bool,
    ) -> Result<User> {
        let now = Utc::now();
        let user = User {
            guid: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            is_admin,
            avatar: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO users (guid, name, email, is_admin, avatar, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.guid)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.is_admin)
        .bind(&user.avatar)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(pool)
        .await?;

        Ok(user)
    }

    /// Apply an admin profile update; unspecified fields keep their value
    pub async fn update(
        pool: &SqlitePool,
        guid: &str,
        name: Option<&str>,
        email: Option<&str>,
        is_admin: Option<bool>,
    ) -> Result<User> {
        let mut user = Self::fetch_by_id(pool, guid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("User {}", guid)))?;

        if let Some(name) = name {
            user.name = name.to_string();
        }
        if let Some(email) = email {
            user.email = email.to_string();
        }
        if let Some(is_admin) = is_admin {
            user.is_admin = is_admin;
        }
        user.updated_at = Utc::now();

        sqlx::query(
            "UPDATE users SET name = ?, email = ?, is_admin = ?, updated_at = ? WHERE guid = ?",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.is_admin)
        .bind(user.updated_at)
        .bind(guid)
        .execute(pool)
        .await?;

        Ok(user)
    }

    /// Remove a user; owned artifacts, likes, comments and collections
    /// cascade at the schema level
    pub async fn delete(pool: &SqlitePool, guid: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE guid = ?")
            .bind(guid)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User {}", guid)));
        }
        Ok(())
    }
}

/// Fields supplied by a client when submitting an artifact
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub era: String,
    pub region: String,
    pub user_id: String,
}

/// Partial update of an artifact's descriptive fields
#[derive(Debug, Clone, Default)]
pub struct ArtifactUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub era: Option<String>,
    pub region: Option<String>,
}

/// Stored artifact record
///
/// The `ai_*` columns flatten the optional review record; a review exists
/// iff `ai_reviewed_at` is set (a failed review is stored with
/// `ai_is_appropriate = NULL`, which is distinct from "never reviewed").
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Artifact {
    pub guid: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub era: String,
    pub region: String,
    pub status: ArtifactStatus,
    pub ai_is_appropriate: Option<bool>,
    pub ai_confidence: Option<f64>,
    pub ai_reason: Option<String>,
    pub ai_reviewed_at: Option<DateTime<Utc>>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    /// Reassemble the review record from the flattened columns
    pub fn ai_review(&self) -> Option<AiReview> {
        let reviewed_at = self.ai_reviewed_at?;
        Some(AiReview {
            is_appropriate: self.ai_is_appropriate,
            confidence: self.ai_confidence.unwrap_or(0.0),
            reason: self.ai_reason.clone().unwrap_or_default(),
            reviewed_at,
        })
    }

    pub async fn fetch_by_id(pool: &SqlitePool, guid: &str) -> Result<Option<Artifact>> {
        let artifact = sqlx::query_as::<_, Artifact>("SELECT * FROM artifacts WHERE guid = ?")
            .bind(guid)
            .fetch_optional(pool)
            .await?;
        Ok(artifact)
    }

    pub async fn list_by_status(pool: &SqlitePool, status: ArtifactStatus) -> Result<Vec<Artifact>> {
        let artifacts = sqlx::query_as::<_, Artifact>(
            "SELECT * FROM artifacts WHERE status = ? ORDER BY created_at DESC",
        )
        .bind(status)
        .fetch_all(pool)
        .await?;
        Ok(artifacts)
    }

    /// Artifacts a user has liked, newest like first
    pub async fn list_liked_by(pool: &SqlitePool, user_id: &str) -> Result<Vec<Artifact>> {
        let artifacts = sqlx::query_as::<_, Artifact>(
            r#"
            SELECT a.* FROM artifacts a
            JOIN artifact_likes l ON a.guid = l.artifact_id
            WHERE l.user_id = ?
            ORDER BY l.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(artifacts)
    }

    pub async fn insert(
        pool: &SqlitePool,
        new: NewArtifact,
        status: ArtifactStatus,
        ai_review: Option<&AiReview>,
    ) -> Result<Artifact> {
        let now = Utc::now();
        let artifact = Artifact {
            guid: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            image_url: new.image_url,
            category: new.category,
            era: new.era,
            region: new.region,
            status,
            ai_is_appropriate: ai_review.and_then(|r| r.is_appropriate),
            ai_confidence: ai_review.map(|r| r.confidence),
            ai_reason: ai_review.map(|r| r.reason.clone()),
            ai_reviewed_at: ai_review.map(|r| r.reviewed_at),
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO artifacts (
                guid, title, description, image_url, category, era, region,
                status, ai_is_appropriate, ai_confidence, ai_reason, ai_reviewed_at,
                user_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&artifact.guid)
        .bind(&artifact.title)
        .bind(&artifact.description)
        .bind(&artifact.image_url)
        .bind(&artifact.category)
        .bind(&artifact.era)
        .bind(&artifact.region)
        .bind(artifact.status)
        .bind(artifact.ai_is_appropriate)
        .bind(artifact.ai_confidence)
        .bind(&artifact.ai_reason)
        .bind(artifact.ai_reviewed_at)
        .bind(&artifact.user_id)
        .bind(artifact.created_at)
        .bind(artifact.updated_at)
        .execute(pool)
        .await?;

        Ok(artifact)
    }

    /// Apply a partial update; unspecified fields keep their value
    pub async fn update_fields(
        pool: &SqlitePool,
        guid: &str,
        update: ArtifactUpdate,
    ) -> Result<Artifact> {
        let mut artifact = Self::fetch_by_id(pool, guid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Artifact {}", guid)))?;

        if let Some(title) = update.title {
            artifact.title = title;
        }
        if let Some(description) = update.description {
            artifact.description = description;
        }
        if let Some(image_url) = update.image_url {
            artifact.image_url = image_url;
        }
        if let Some(category) = update.category {
            artifact.category = category;
        }
        if let Some(era) = update.era {
            artifact.era = era;
        }
        if let Some(region) = update.region {
            artifact.region = region;
        }
        artifact.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE artifacts
            SET title = ?, description = ?, image_url = ?, category = ?,
                era = ?, region = ?, updated_at = ?
            WHERE guid = ?
            "#,
        )
        .bind(&artifact.title)
        .bind(&artifact.description)
        .bind(&artifact.image_url)
        .bind(&artifact.category)
        .bind(&artifact.era)
        .bind(&artifact.region)
        .bind(artifact.updated_at)
        .bind(guid)
        .execute(pool)
        .await?;

        Ok(artifact)
    }

    /// Force a status, bypassing the automated review.
    ///
    /// A supplied reason overwrites `ai_reason` and stamps a fresh
    /// `ai_reviewed_at`; the other review columns are left untouched.
    pub async fn override_status(
        pool: &SqlitePool,
        guid: &str,
        status: ArtifactStatus,
        reason: Option<&str>,
    ) -> Result<Artifact> {
        let now = Utc::now();

        let result = match reason {
            Some(reason) => {
                sqlx::query(
                    r#"
                    UPDATE artifacts
                    SET status = ?, ai_reason = ?, ai_reviewed_at = ?, updated_at = ?
                    WHERE guid = ?
                    "#,
                )
                .bind(status)
                .bind(reason)
                .bind(now)
                .bind(now)
                .bind(guid)
                .execute(pool)
                .await?
            }
            None => {
                sqlx::query("UPDATE artifacts SET status = ?, updated_at = ? WHERE guid = ?")
                    .bind(status)
                    .bind(now)
                    .bind(guid)
                    .execute(pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Artifact {}", guid)));
        }

        Self::fetch_by_id(pool, guid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Artifact {}", guid)))
    }

    /// Remove an artifact; likes, comments and collection membership
    /// cascade at the schema level
    pub async fn delete(pool: &SqlitePool, guid: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM artifacts WHERE guid = ?")
            .bind(guid)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Artifact {}", guid)));
        }
        Ok(())
    }

    /// Ids of users who liked this artifact
    pub async fn likes(pool: &SqlitePool, guid: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT user_id FROM artifact_likes WHERE artifact_id = ? ORDER BY created_at",
        )
        .bind(guid)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Toggle a user's like; returns the updated liker list
    pub async fn toggle_like(pool: &SqlitePool, guid: &str, user_id: &str) -> Result<Vec<String>> {
        let removed = sqlx::query(
            "DELETE FROM artifact_likes WHERE artifact_id = ? AND user_id = ?",
        )
        .bind(guid)
        .bind(user_id)
        .execute(pool)
        .await?;

        if removed.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO artifact_likes (artifact_id, user_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(guid)
            .bind(user_id)
            .bind(Utc::now())
            .execute(pool)
            .await?;
        }

        Self::likes(pool, guid).await
    }

    pub async fn comments(pool: &SqlitePool, guid: &str) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM artifact_comments WHERE artifact_id = ? ORDER BY created_at",
        )
        .bind(guid)
        .fetch_all(pool)
        .await?;
        Ok(comments)
    }

    pub async fn add_comment(
        pool: &SqlitePool,
        guid: &str,
        user: &User,
        text: &str,
    ) -> Result<Comment> {
        let comment = Comment {
            guid: Uuid::new_v4().to_string(),
            artifact_id: guid.to_string(),
            user_id: user.guid.clone(),
            user_name: user.name.clone(),
            text: text.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO artifact_comments (guid, artifact_id, user_id, user_name, text, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment.guid)
        .bind(&comment.artifact_id)
        .bind(&comment.user_id)
        .bind(&comment.user_name)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(pool)
        .await?;

        Ok(comment)
    }
}

/// Comment on an artifact
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub guid: String,
    pub artifact_id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by a client when creating a collection
#[derive(Debug, Clone)]
pub struct NewCollection {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub is_private: bool,
    pub user_id: String,
}

/// Partial update of a collection
#[derive(Debug, Clone, Default)]
pub struct CollectionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_private: Option<bool>,
}

/// User-curated set of artifacts
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Collection {
    pub guid: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub is_private: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    pub async fn fetch_by_id(pool: &SqlitePool, guid: &str) -> Result<Option<Collection>> {
        let collection =
            sqlx::query_as::<_, Collection>("SELECT * FROM collections WHERE guid = ?")
                .bind(guid)
                .fetch_optional(pool)
                .await?;
        Ok(collection)
    }

    /// Publicly listable collections (private ones are excluded)
    pub async fn list_public(pool: &SqlitePool) -> Result<Vec<Collection>> {
        let collections = sqlx::query_as::<_, Collection>(
            "SELECT * FROM collections WHERE is_private = 0 ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(collections)
    }

    pub async fn list_by_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Collection>> {
        let collections = sqlx::query_as::<_, Collection>(
            "SELECT * FROM collections WHERE user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(collections)
    }

    pub async fn insert(pool: &SqlitePool, new: NewCollection) -> Result<Collection> {
        let now = Utc::now();
        let collection = Collection {
            guid: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            image_url: new.image_url,
            is_private: new.is_private,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO collections (guid, title, description, image_url, is_private,
                                     user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&collection.guid)
        .bind(&collection.title)
        .bind(&collection.description)
        .bind(&collection.image_url)
        .bind(collection.is_private)
        .bind(&collection.user_id)
        .bind(collection.created_at)
        .bind(collection.updated_at)
        .execute(pool)
        .await?;

        Ok(collection)
    }

    /// Apply a partial update; unspecified fields keep their value
    pub async fn update_fields(
        pool: &SqlitePool,
        guid: &str,
        update: CollectionUpdate,
    ) -> Result<Collection> {
        let mut collection = Self::fetch_by_id(pool, guid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Collection {}", guid)))?;

        if let Some(title) = update.title {
            collection.title = title;
        }
        if let Some(description) = update.description {
            collection.description = description;
        }
        if let Some(image_url) = update.image_url {
            collection.image_url = image_url;
        }
        if let Some(is_private) = update.is_private {
            collection.is_private = is_private;
        }
        collection.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE collections
            SET title = ?, description = ?, image_url = ?, is_private = ?, updated_at = ?
            WHERE guid = ?
            "#,
        )
        .bind(&collection.title)
        .bind(&collection.description)
        .bind(&collection.image_url)
        .bind(collection.is_private)
        .bind(collection.updated_at)
        .bind(guid)
        .execute(pool)
        .await?;

        Ok(collection)
    }

    pub async fn delete(pool: &SqlitePool, guid: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM collections WHERE guid = ?")
            .bind(guid)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Collection {}", guid)));
        }
        Ok(())
    }

    /// Member artifacts in insertion order
    pub async fn artifacts(pool: &SqlitePool, guid: &str) -> Result<Vec<Artifact>> {
        let artifacts = sqlx::query_as::<_, Artifact>(
            r#"
            SELECT a.* FROM artifacts a
            JOIN collection_artifacts ca ON a.guid = ca.artifact_id
            WHERE ca.collection_id = ?
            ORDER BY ca.added_at
            "#,
        )
        .bind(guid)
        .fetch_all(pool)
        .await?;
        Ok(artifacts)
    }

    /// Add an artifact; adding twice is an input error
    pub async fn add_artifact(pool: &SqlitePool, guid: &str, artifact_id: &str) -> Result<()> {
        let exists: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM collection_artifacts WHERE collection_id = ? AND artifact_id = ?",
        )
        .bind(guid)
        .bind(artifact_id)
        .fetch_one(pool)
        .await?;

        if exists.0 > 0 {
            return Err(Error::InvalidInput("Artifact already in collection".to_string()));
        }

        sqlx::query(
            "INSERT INTO collection_artifacts (collection_id, artifact_id, added_at) VALUES (?, ?, ?)",
        )
        .bind(guid)
        .bind(artifact_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn remove_artifact(pool: &SqlitePool, guid: &str, artifact_id: &str) -> Result<()> {
        sqlx::query(
            "DELETE FROM collection_artifacts WHERE collection_id = ? AND artifact_id = ?",
        )
        .bind(guid)
        .bind(artifact_id)
        .execute(pool)
        .await?;

        Ok(())
    }
}
