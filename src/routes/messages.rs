// ============================================================================
// Message Routes
// ============================================================================
//
// Endpoints:
// - POST   /api/messages/direct - send a direct message
// - GET    /api/messages/direct/:user_id/:other_user_id - direct history
// - GET    /api/messages/direct/unseen-count/:user_id/:other_user_id
// - POST   /api/messages/group - send a group message
// - GET    /api/messages/group/:group_id - group history
// - POST   /api/messages/mark-as-read
// - GET    /api/messages/unseen-count
// - DELETE /api/messages/:id
//
// ============================================================================

use axum::{
    extract::{Path, Query, State},
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

const DEFAULT_PAGE_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct SendDirectMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendGroupMessageRequest {
    pub group_id: Uuid,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Pagination arrives as raw strings so that junk values can fall back to
/// the defaults instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkAsReadRequest {
    pub message_ids: Vec<Uuid>,
}

fn page(params: &PageParams) -> (i64, i64) {
    (
        parse_or(params.limit.as_deref(), DEFAULT_PAGE_LIMIT),
        parse_or(params.offset.as_deref(), 0),
    )
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(default)
}

/// POST /api/messages/direct
pub async fn send_direct_message(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(sender_id): TrustedUser,
    Json(req): Json<SendDirectMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = ctx
        .messages
        .send_direct(sender_id, req.receiver_id, req.content, req.kind.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/messages/direct/:user_id/:other_user_id
pub async fn get_direct_messages(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(requester_id): TrustedUser,
    Path((user_id, other_user_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page(&params);
    let messages = ctx
        .messages
        .list_direct(requester_id, user_id, other_user_id, limit, offset)
        .await?;

    Ok(Json(messages))
}

/// POST /api/messages/group
pub async fn send_group_message(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(sender_id): TrustedUser,
    Json(req): Json<SendGroupMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = ctx
        .messages
        .send_group(sender_id, req.group_id, req.content, req.kind.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/messages/group/:group_id
pub async fn get_group_messages(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(requester_id): TrustedUser,
    Path(group_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let (limit, offset) = page(&params);
    let messages = ctx
        .messages
        .list_group(requester_id, group_id, limit, offset)
        .await?;

    Ok(Json(messages))
}

/// POST /api/messages/mark-as-read
pub async fn mark_as_read(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(requester_id): TrustedUser,
    Json(req): Json<MarkAsReadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = ctx.messages.mark_read(requester_id, req.message_ids).await?;
    Ok(Json(json!({ "updated": updated })))
}

/// GET /api/messages/direct/unseen-count/:user_id/:other_user_id
pub async fn get_unseen_count_between(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(requester_id): TrustedUser,
    Path((user_id, other_user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    if requester_id != user_id {
        return Err(AppError::forbidden(
            "You can only view your own unseen counts",
        ));
    }

    let count = ctx
        .messages
        .count_unseen(requester_id, Some(other_user_id))
        .await?;
    Ok(Json(json!({ "count": count })))
}

/// GET /api/messages/unseen-count
pub async fn get_unseen_count(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(requester_id): TrustedUser,
) -> Result<impl IntoResponse, AppError> {
    let count = ctx.messages.count_unseen(requester_id, None).await?;
    Ok(Json(json!({ "count": count })))
}

/// DELETE /api/messages/:id
pub async fn delete_message(
    State(ctx): State<Arc<AppContext>>,
    TrustedUser(requester_id): TrustedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    ctx.messages.delete_message(requester_id, id).await?;
    Ok(Json(json!({ "message": "Message deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: Option<&str>, offset: Option<&str>) -> PageParams {
        PageParams {
            limit: limit.map(String::from),
            offset: offset.map(String::from),
        }
    }

    #[test]
    fn test_page_defaults() {
        assert_eq!(page(&params(None, None)), (DEFAULT_PAGE_LIMIT, 0));
    }

    #[test]
    fn test_page_honors_valid_values() {
        assert_eq!(page(&params(Some("10"), Some("30"))), (10, 30));
        assert_eq!(page(&params(Some("0"), Some("0"))), (0, 0));
    }

    #[test]
    fn test_page_falls_back_on_junk() {
        assert_eq!(page(&params(Some("abc"), Some("xyz"))), (DEFAULT_PAGE_LIMIT, 0));
        assert_eq!(page(&params(Some(""), None)), (DEFAULT_PAGE_LIMIT, 0));
        assert_eq!(page(&params(Some("12.5"), None)), (DEFAULT_PAGE_LIMIT, 0));
    }

    #[test]
    fn test_page_falls_back_on_negatives() {
        assert_eq!(page(&params(Some("-1"), Some("-20"))), (DEFAULT_PAGE_LIMIT, 0));
    }
}
