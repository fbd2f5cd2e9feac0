//! dispatch-hub library - ride-dispatch reconciliation service
//!
//! Maintains authoritative fleet state from a publish/subscribe message
//! bus and exposes it to the presentation layer over HTTP + SSE, along
//! with route authoring and manual status-advance operations.

use axum::routing::{get, post};
use axum::Router;
use dispatch_common::events::EventBus;
use dispatch_common::model::FleetState;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod booking;
pub mod bus;
pub mod reconciler;
pub mod services;

use bus::OutboundRoute;
use services::{DriversClient, GeocodeClient};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Fleet snapshot, written only by the reconciler task
    pub fleet: Arc<RwLock<FleetState>>,
    /// Event broadcast for SSE clients
    pub events: Arc<EventBus>,
    /// Outbound route publishes, drained by the bus client
    pub publisher: mpsc::Sender<OutboundRoute>,
    /// Driver-list proxy client, None when not configured
    pub drivers: Option<Arc<DriversClient>>,
    /// Forward geocoding client
    pub geocode: Arc<GeocodeClient>,
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/api/fleet", get(api::get_fleet))
        .route("/api/fleet/:vehicle_id", get(api::get_vehicle))
        .route("/api/fleet/:vehicle_id/advance", post(api::advance_vehicle))
        .route("/api/bookings", post(api::create_booking))
        .route("/api/drivers", get(api::get_drivers))
        .route("/api/geocode", get(api::geocode_search))
        .route("/api/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
