// ============================================================================
// HTTP Routes
// ============================================================================
//
// Router assembly and handlers. Authentication is the gateway-trust pattern:
// every /api route reads the caller from the x-user-id header via the
// TrustedUser extractor.
//
// Structure:
// - mod.rs: router assembly and middleware
// - extractors.rs: TrustedUser extractor
// - health.rs: liveness endpoint
// - users.rs: profile, search, per-user listings
// - messages.rs: direct and group messaging
// - groups.rs: group lifecycle and membership
//
// ============================================================================

mod extractors;
mod groups;
mod health;
mod messages;
mod users;

pub use extractors::{TrustedUser, USER_ID_HEADER};

use axum::http::{header, HeaderName, Method};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Create the application router with all routes and middleware.
pub fn create_router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
        ]);

    Router::new()
        .route("/health", get(health::health_check))
        // Users
        .route("/api/users/search", get(users::search_users))
        .route(
            "/api/users/:id",
            get(users::get_user).put(users::update_user),
        )
        .route("/api/users/:id/groups", get(users::get_user_groups))
        .route("/api/users/:id/recent-chats", get(users::get_recent_chats))
        // Messages
        .route("/api/messages/direct", post(messages::send_direct_message))
        .route(
            "/api/messages/direct/:user_id/:other_user_id",
            get(messages::get_direct_messages),
        )
        .route(
            "/api/messages/direct/unseen-count/:user_id/:other_user_id",
            get(messages::get_unseen_count_between),
        )
        .route("/api/messages/group", post(messages::send_group_message))
        .route(
            "/api/messages/group/:group_id",
            get(messages::get_group_messages),
        )
        .route("/api/messages/mark-as-read", post(messages::mark_as_read))
        .route("/api/messages/unseen-count", get(messages::get_unseen_count))
        .route("/api/messages/:id", delete(messages::delete_message))
        // Groups
        .route("/api/groups", post(groups::create_group))
        .route(
            "/api/groups/:id",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/api/groups/:id/members", post(groups::add_member))
        .route(
            "/api/groups/:id/members/:user_id",
            delete(groups::remove_member),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .into_inner(),
        )
        .with_state(ctx)
}
