//! Booking endpoint (route authoring)

use crate::booking::{self, BookingRequest};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use dispatch_common::model::Waypoint;
use serde::Serialize;
use tracing::info;

/// Response to a booking: the generated route as published
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub vehicle_id: String,
    pub route: Vec<Waypoint>,
}

/// POST /api/bookings
///
/// Validate the stops (2-5), assign waypoint ids, and publish the route
/// with a zero-filled status array. Returns 202: the fleet view updates
/// when the route echoes back from the bus.
pub async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), (StatusCode, String)> {
    let out = booking::outbound_for(&request)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    info!(
        "Publishing booking for {} with {} stops",
        out.vehicle_id,
        out.route.len()
    );

    let response = BookingResponse {
        vehicle_id: out.vehicle_id.clone(),
        route: out.route.clone(),
    };

    state.publisher.send(out).await.map_err(|_| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "bus client is not running".to_string(),
        )
    })?;

    Ok((StatusCode::ACCEPTED, Json(response)))
}
