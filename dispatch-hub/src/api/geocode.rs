//! Geocoding search endpoint

use crate::services::geocode::GeocodeResult;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

/// Query parameters for the geocode search
#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: String,
}

/// GET /api/geocode?q=...
///
/// Forward-geocode a free-text query to the configured country's top
/// ranked candidates. When the client disconnects mid-typing, axum drops
/// this future and the upstream request is canceled with it.
pub async fn geocode_search(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<Vec<GeocodeResult>>, (StatusCode, String)> {
    if query.q.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }

    state
        .geocode
        .search(&query.q)
        .await
        .map(Json)
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))
}
