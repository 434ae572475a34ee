// ============================================================================
// TrustedUser Extractor
// ============================================================================
//
// Extracts the caller's identity from the x-user-id header set by the
// gateway in front of this service.
//
// SECURITY: the header is trusted unconditionally. The server MUST only be
// reachable through the gateway; direct internet exposure would let anyone
// impersonate any user.
//
// ============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use confab_error::AppError;
use uuid::Uuid;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity propagated by the gateway.
#[derive(Debug, Clone)]
pub struct TrustedUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for TrustedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| {
                tracing::warn!(
                    "Missing or invalid x-user-id header, is this request coming through the gateway?"
                );
                AppError::auth("Authentication required").into_response()
            })?;

        tracing::trace!(user_id = %user_id, "TrustedUser extracted from header");

        Ok(TrustedUser(user_id))
    }
}
