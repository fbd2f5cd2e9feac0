//! Fleet state endpoints
//!
//! `GET /api/fleet` and `GET /api/fleet/{id}` serve the reconciler's
//! current snapshot. `POST /api/fleet/{id}/advance` publishes a manually
//! advanced status array back to the bus WITHOUT touching local state:
//! the bus is the single authoritative source, and the fleet converges
//! when the route echo comes back around.

use crate::bus::OutboundRoute;
use crate::reconciler;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use dispatch_common::model::{FleetState, StopStatus, VehicleState};
use serde::Serialize;
use tracing::info;

/// GET /api/fleet
///
/// Snapshot of every vehicle seen this session.
pub async fn get_fleet(State(state): State<AppState>) -> Json<FleetState> {
    Json(state.fleet.read().await.clone())
}

/// GET /api/fleet/{id}
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<VehicleState>, (StatusCode, String)> {
    state
        .fleet
        .read()
        .await
        .get(&vehicle_id)
        .cloned()
        .map(Json)
        .ok_or((
            StatusCode::NOT_FOUND,
            format!("unknown vehicle {}", vehicle_id),
        ))
}

/// Response to a manual advance: what was published, not what is stored
#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    pub vehicle_id: String,
    #[serde(rename = "statusArr")]
    pub status_arr: Vec<StopStatus>,
}

/// POST /api/fleet/{id}/advance
///
/// Promote the vehicle's first en-route stop to arrived, or its first
/// pending stop to en-route, and publish the result. Returns 202: local
/// state is deliberately left to the bus echo.
pub async fn advance_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<(StatusCode, Json<AdvanceResponse>), (StatusCode, String)> {
    let vehicle = state
        .fleet
        .read()
        .await
        .get(&vehicle_id)
        .cloned()
        .ok_or((
            StatusCode::NOT_FOUND,
            format!("unknown vehicle {}", vehicle_id),
        ))?;

    let next = reconciler::advance(&vehicle.status_arr).ok_or((
        StatusCode::CONFLICT,
        format!("vehicle {} has nothing to advance", vehicle_id),
    ))?;

    info!("Publishing manual advance for {}", vehicle_id);
    state
        .publisher
        .send(OutboundRoute {
            vehicle_id: vehicle_id.clone(),
            route: vehicle.route,
            status_arr: next.clone(),
        })
        .await
        .map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "bus client is not running".to_string(),
            )
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AdvanceResponse {
            vehicle_id,
            status_arr: next,
        }),
    ))
}
