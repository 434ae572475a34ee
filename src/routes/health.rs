// ============================================================================
// Health Route
// ============================================================================
//
// GET /health - liveness plus a database ping. MQTT state is reported but
// never fails the check, fan-out being best effort.
//
// ============================================================================

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::context::AppContext;

pub async fn health_check(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&ctx.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "mqtt_enabled": ctx.publisher.is_enabled(),
            })),
        ),
        Err(err) => {
            tracing::error!(error = %err, "Health check database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}
