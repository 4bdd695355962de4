//! Liveness endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::json;
use tracing::debug;

use crate::handlers::ServerResult;
use crate::server::AppState;

/// `GET /health` — liveness plus a cheap store-reachability check.
pub async fn health_check(
    State(app_state): State<AppState>,
) -> ServerResult<(StatusCode, Json<serde_json::Value>)> {
    debug!("health check requested");

    let spec_count = app_state.store.list().await.len();

    let response = json!({
        "status": "healthy",
        "service": "resolver-server",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "components": {
            "store": {
                "status": "healthy",
                "specifications": spec_count,
            }
        }
    });

    Ok((StatusCode::OK, Json(response)))
}
