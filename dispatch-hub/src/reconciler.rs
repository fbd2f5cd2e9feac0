//! Route/telemetry reconciliation
//!
//! Maintains the authoritative fleet state from inbound bus messages,
//! detects status transitions to drive notifications, and auto-clears
//! completed routes by publishing back to the bus.
//!
//! The state transition itself is the pure function `apply`: message plus
//! prior state in, new state plus a list of effects out. The surrounding
//! `Reconciler` task is the effect layer, emitting events on the
//! `EventBus` and handing clear publishes to the bus client. This keeps
//! the core deterministic and unit-testable with no broker or UI present.
//!
//! Messages are consumed strictly one at a time (single receiver on the
//! inbound channel), so presentation reads through the shared lock never
//! observe a half-applied message.

use crate::bus::{InboundMessage, OutboundRoute};
use dispatch_common::events::{DispatchEvent, EventBus};
use dispatch_common::model::{
    FleetState, RoutePayload, StatusSnapshot, StopStatus, TelemetryPayload, Waypoint,
};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// A side effect requested by the pure transition function
#[derive(Debug, Clone)]
pub enum Effect {
    /// Emit a notification/presentation event
    Emit(DispatchEvent),
    /// Publish an empty route for the vehicle so its published state
    /// matches the cleared view immediately
    PublishClear { vehicle_id: String },
}

/// Apply one inbound message to the fleet, returning the effects to run.
///
/// Pure: no I/O, no clocks beyond event timestamps, no channels.
pub fn apply(
    fleet: &mut FleetState,
    prev: &mut StatusSnapshot,
    message: &InboundMessage,
) -> Vec<Effect> {
    match message {
        InboundMessage::Route {
            vehicle_id,
            payload,
        } => apply_route(fleet, prev, vehicle_id, payload),
        InboundMessage::Telemetry {
            vehicle_id,
            payload,
        } => apply_telemetry(fleet, prev, vehicle_id, payload),
        InboundMessage::Unrecognized { topic } => {
            debug!("No handler for topic {}", topic);
            Vec::new()
        }
    }
}

/// Replace a vehicle's route wholesale from a route message
fn apply_route(
    fleet: &mut FleetState,
    prev: &mut StatusSnapshot,
    vehicle_id: &str,
    payload: &RoutePayload,
) -> Vec<Effect> {
    let now = chrono::Utc::now();

    // Take the payload's statusArr only when it actually describes the
    // route; anything else means "freshly booked", zero-filled.
    let status_arr = match &payload.status_arr {
        Some(arr) if arr.len() == payload.route.len() => arr.clone(),
        Some(arr) => {
            warn!(
                "statusArr length {} does not match route length {} for {}, zero-filling",
                arr.len(),
                payload.route.len(),
                vehicle_id
            );
            vec![StopStatus::Pending; payload.route.len()]
        }
        None => vec![StopStatus::Pending; payload.route.len()],
    };

    let vehicle = fleet.entry(vehicle_id.to_string()).or_default();
    vehicle.route = payload.route.clone();
    vehicle.status_arr = status_arr.clone();
    if let Some(position) = payload.position {
        // Payload position wins; otherwise the last telemetry fix stands
        vehicle.position = Some(position);
    }

    // The next telemetry diff is computed against this baseline, not
    // against a stale telemetry-derived one
    prev.insert(vehicle_id.to_string(), status_arr.clone());

    let notification = if status_arr.iter().all(|s| *s == StopStatus::Pending) {
        DispatchEvent::NewBooking {
            vehicle_id: vehicle_id.to_string(),
            stops: payload.route.len(),
            timestamp: now,
        }
    } else {
        DispatchEvent::RouteReceived {
            vehicle_id: vehicle_id.to_string(),
            stops: payload.route.len(),
            timestamp: now,
        }
    };

    vec![
        Effect::Emit(notification),
        Effect::Emit(DispatchEvent::FleetUpdated {
            vehicle_id: vehicle_id.to_string(),
            timestamp: now,
        }),
    ]
}

/// Merge a telemetry message: transition detection, completion check,
/// then position/status update
fn apply_telemetry(
    fleet: &mut FleetState,
    prev: &mut StatusSnapshot,
    vehicle_id: &str,
    payload: &TelemetryPayload,
) -> Vec<Effect> {
    let now = chrono::Utc::now();
    let mut effects = Vec::new();

    // Edge detection against the previous snapshot; missing entries
    // default to pending
    let previous = prev.get(vehicle_id).cloned().unwrap_or_default();
    for (index, status) in payload.status_arr.iter().enumerate() {
        let before = previous.get(index).copied().unwrap_or(StopStatus::Pending);
        if before == *status {
            continue;
        }
        let stop_title = stop_title(&payload.route, index);
        match (before, *status) {
            (StopStatus::Pending, StopStatus::EnRoute) => {
                effects.push(Effect::Emit(DispatchEvent::VehicleEnRoute {
                    vehicle_id: vehicle_id.to_string(),
                    stop_index: index,
                    stop_title,
                    timestamp: now,
                }));
            }
            (StopStatus::EnRoute, StopStatus::Arrived) => {
                effects.push(Effect::Emit(DispatchEvent::VehicleArrived {
                    vehicle_id: vehicle_id.to_string(),
                    stop_index: index,
                    stop_title,
                    timestamp: now,
                }));
            }
            // Regressions and skipped codes carry no notification
            _ => {}
        }
    }

    let completed = !payload.status_arr.is_empty()
        && payload.status_arr.iter().all(|s| *s == StopStatus::Arrived);

    let vehicle = fleet.entry(vehicle_id.to_string()).or_default();
    if completed {
        info!("{} completed its route, auto-clearing", vehicle_id);
        effects.push(Effect::Emit(DispatchEvent::TripCompleted {
            vehicle_id: vehicle_id.to_string(),
            timestamp: now,
        }));
        effects.push(Effect::PublishClear {
            vehicle_id: vehicle_id.to_string(),
        });

        prev.insert(vehicle_id.to_string(), Vec::new());
        vehicle.route.clear();
        vehicle.status_arr.clear();
        vehicle.position = Some(payload.position);
    } else {
        prev.insert(vehicle_id.to_string(), payload.status_arr.clone());
        vehicle.status_arr = payload.status_arr.clone();
        vehicle.position = Some(payload.position);
        // Route untouched: telemetry never carries an authoritative route
    }

    effects.push(Effect::Emit(DispatchEvent::FleetUpdated {
        vehicle_id: vehicle_id.to_string(),
        timestamp: now,
    }));
    effects
}

/// Title for a transition notification, from the incoming payload's route
/// echo, falling back to a positional label
fn stop_title(route: &[Waypoint], index: usize) -> String {
    route
        .get(index)
        .map(|w| w.title.clone())
        .unwrap_or_else(|| format!("#{}", index + 1))
}

/// Compute the manually advanced status array: the first en-route stop is
/// marked arrived; otherwise the first pending stop is marked en-route.
/// Returns None when there is nothing left to advance.
pub fn advance(status_arr: &[StopStatus]) -> Option<Vec<StopStatus>> {
    let index = status_arr
        .iter()
        .position(|s| *s == StopStatus::EnRoute)
        .or_else(|| status_arr.iter().position(|s| *s == StopStatus::Pending))?;

    let mut next = status_arr.to_vec();
    next[index] = match next[index] {
        StopStatus::EnRoute => StopStatus::Arrived,
        _ => StopStatus::EnRoute,
    };
    Some(next)
}

/// The effect layer: consumes inbound messages one at a time, applies the
/// pure transition under the fleet lock, then runs the effects
pub struct Reconciler {
    fleet: Arc<RwLock<FleetState>>,
    prev: StatusSnapshot,
    events: Arc<EventBus>,
    outbound: mpsc::Sender<OutboundRoute>,
}

impl Reconciler {
    pub fn new(
        fleet: Arc<RwLock<FleetState>>,
        events: Arc<EventBus>,
        outbound: mpsc::Sender<OutboundRoute>,
    ) -> Self {
        Self {
            fleet,
            prev: StatusSnapshot::new(),
            events,
            outbound,
        }
    }

    /// Run until the inbound channel closes. Every failure path inside
    /// returns to a ready-to-receive state.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<InboundMessage>) {
        info!("Reconciler started");

        while let Some(message) = inbound.recv().await {
            let effects = {
                let mut fleet = self.fleet.write().await;
                apply(&mut fleet, &mut self.prev, &message)
            };

            for effect in effects {
                match effect {
                    Effect::Emit(event) => {
                        self.events.emit(event);
                    }
                    Effect::PublishClear { vehicle_id } => {
                        let clear = OutboundRoute {
                            vehicle_id,
                            route: Vec::new(),
                            status_arr: Vec::new(),
                        };
                        if self.outbound.send(clear).await.is_err() {
                            warn!("Bus client gone, dropping clear publish");
                        }
                    }
                }
            }
        }

        debug!("Inbound channel closed, reconciler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_promotes_first_pending_when_nothing_en_route() {
        let next = advance(&[StopStatus::Pending, StopStatus::Pending]).unwrap();
        assert_eq!(next, vec![StopStatus::EnRoute, StopStatus::Pending]);
    }

    #[test]
    fn advance_promotes_first_en_route_before_any_pending() {
        let next = advance(&[
            StopStatus::Arrived,
            StopStatus::EnRoute,
            StopStatus::Pending,
        ])
        .unwrap();
        assert_eq!(
            next,
            vec![StopStatus::Arrived, StopStatus::Arrived, StopStatus::Pending]
        );
    }

    #[test]
    fn advance_skips_arrived_stops_when_promoting_pending() {
        let next = advance(&[StopStatus::Arrived, StopStatus::Pending]).unwrap();
        assert_eq!(next, vec![StopStatus::Arrived, StopStatus::EnRoute]);
    }

    #[test]
    fn advance_has_nothing_to_do_on_a_finished_route() {
        assert!(advance(&[StopStatus::Arrived, StopStatus::Arrived]).is_none());
        assert!(advance(&[]).is_none());
    }

    #[test]
    fn stop_title_falls_back_to_positional_label() {
        assert_eq!(stop_title(&[], 1), "#2");
    }
}
