//! Caller identity extraction
//!
//! Authentication itself happens upstream: an authenticating gateway
//! verifies the caller and forwards their user id in the `x-user-id`
//! header. This module resolves that id against the users table, so
//! handlers get a full profile (including the admin flag) or a 401.

use crate::{ApiError, AppState};
use arc_common::db::models::User;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header carrying the authenticated caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller (required)
#[derive(Debug, Clone)]
pub struct Identity(pub User);

/// Authenticated caller if the gateway forwarded one
///
/// An absent header is anonymous; a present but unresolvable id is still
/// a 401, since that indicates a broken gateway rather than a guest.
#[derive(Debug, Clone)]
pub struct OptionalIdentity(pub Option<User>);

async fn resolve_user(state: &AppState, raw_id: &str) -> Result<User, ApiError> {
    let user_id = Uuid::parse_str(raw_id)
        .map_err(|_| ApiError::Unauthorized("Malformed user id".to_string()))?;

    User::fetch_by_id(&state.db, &user_id.to_string())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

        let user = resolve_user(state, raw_id).await?;
        Ok(Identity(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw_id = match parts.headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok()) {
            Some(raw_id) => raw_id,
            None => return Ok(OptionalIdentity(None)),
        };

        let user = resolve_user(state, raw_id).await?;
        Ok(OptionalIdentity(Some(user)))
    }
}

impl Identity {
    /// 403 unless the caller is an administrator
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Administrator access required".to_string()))
        }
    }

    /// 403 unless the caller owns the resource or is an administrator
    pub fn require_owner_or_admin(&self, owner_id: &str, what: &str) -> Result<(), ApiError> {
        if self.0.guid == owner_id || self.0.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("Not authorized to modify this {}", what)))
        }
    }
}
