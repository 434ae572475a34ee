// ============================================================================
// User Routes
// ============================================================================
//
// Profile reads and updates plus per-user listings. Credentials and profile
// creation live in the identity layer, not here.
//
// Endpoints:
// - GET /api/users/search?q=<query>
// - GET /api/users/:id
// - PUT /api/users/:id
// - GET /api/users/:id/groups
// - GET /api/users/:id/recent-chats
//
// ============================================================================

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use confab_error::AppError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::extractors::TrustedUser;
use crate::context::AppContext;

const SEARCH_RESULT_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

/// GET /api/users/search
pub async fn search_users(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(_user_id): TrustedUser,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = params.q.unwrap_or_default();
    if query.is_empty() {
        return Err(AppError::validation("Search query is required"));
    }

    let users = ctx.users.search(&query, SEARCH_RESULT_LIMIT).await?;
    Ok(Json(users))
}

/// GET /api/users/:id
///
/// Reading your own profile doubles as a presence ping: the profile comes
/// back already marked online.
pub async fn get_user(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(auth_user_id): TrustedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut user = ctx.users.require(id).await?;

    if auth_user_id == id {
        match ctx.users.touch_presence(id).await {
            Ok(()) => user = ctx.users.require(id).await?,
            Err(err) => warn!(user_id = %id, error = %err, "Presence touch failed"),
        }
    }

    Ok(Json(user))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(auth_user_id): TrustedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if auth_user_id != id {
        return Err(AppError::forbidden("You can only update your own profile"));
    }
    if matches!(&req.username, Some(username) if username.is_empty()) {
        return Err(AppError::validation("Username cannot be empty"));
    }

    let user = ctx
        .users
        .update_profile(id, req.username, req.avatar_url)
        .await?;
    Ok(Json(user))
}

/// GET /api/users/:id/groups
pub async fn get_user_groups(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(_auth_user_id): TrustedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let groups = ctx.groups.groups_for_user(id).await?;
    Ok(Json(groups))
}

/// GET /api/users/:id/recent-chats
pub async fn get_recent_chats(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(auth_user_id): TrustedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if auth_user_id != id {
        return Err(AppError::forbidden(
            "You can only view your own conversations",
        ));
    }

    let chats = ctx.messages.recent_chats(id).await?;
    Ok(Json(chats))
}
