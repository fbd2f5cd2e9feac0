//! Driver-list proxy endpoint

use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

/// GET /api/drivers
///
/// Proxy the external driver-list endpoint. A non-2xx upstream response
/// is a hard failure, surfaced as 502.
pub async fn get_drivers(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let Some(client) = &state.drivers else {
        return Err((
            StatusCode::NOT_FOUND,
            "no driver endpoint configured".to_string(),
        ));
    };

    client
        .fetch()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))
}
