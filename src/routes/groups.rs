// ============================================================================
// Group Routes
// ============================================================================
//
// Endpoints:
// - POST   /api/groups - create a group
// - GET    /api/groups/:id - fetch a group with roster
// - PUT    /api/groups/:id - update metadata (admins)
// - DELETE /api/groups/:id - delete a group (creator)
// - POST   /api/groups/:id/members - add a member (admins)
// - DELETE /api/groups/:id/members/:user_id - remove a member
//
// ============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use confab_error::AppError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::extractors::TrustedUser;
use crate::context::AppContext;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

/// POST /api/groups
pub async fn create_group(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(creator_id): TrustedUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let group = ctx
        .groups
        .create_group(creator_id, req.name, req.description, req.member_ids)
        .await?;

    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /api/groups/:id
pub async fn get_group(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(requester_id): TrustedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let group = ctx.groups.get_group(requester_id, id).await?;
    Ok(Json(group))
}

/// PUT /api/groups/:id
pub async fn update_group(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(actor_id): TrustedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let group = ctx
        .groups
        .update_group(actor_id, id, req.name, req.description, req.avatar_url)
        .await?;

    Ok(Json(group))
}

/// DELETE /api/groups/:id
pub async fn delete_group(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(actor_id): TrustedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    ctx.groups.delete_group(actor_id, id).await?;
    Ok(Json(json!({ "message": "Group deleted successfully" })))
}

/// POST /api/groups/:id/members
pub async fn add_member(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(actor_id): TrustedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    ctx.groups.add_member(actor_id, id, req.user_id).await?;
    Ok(Json(json!({ "message": "User added to group successfully" })))
}

/// DELETE /api/groups/:id/members/:user_id
pub async fn remove_member(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(actor_id): TrustedUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    ctx.groups.remove_member(actor_id, id, user_id).await?;
    Ok(Json(json!({ "message": "User removed from group successfully" })))
}
