//! Event types for the dispatch event system
//!
//! Provides the shared `DispatchEvent` enum and the `EventBus` used to
//! fan events out to SSE clients and any other in-process listeners.
//! Events are broadcast via the EventBus and serialized for SSE
//! transmission with a `type` tag.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Dispatch event types
///
/// Every variant carries a timestamp so the presentation layer can render
/// a time-ordered notification log without trusting client clocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DispatchEvent {
    /// Bus connection established (initial connect or reconnect)
    BusConnected {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Bus connection dropped. Emitted once per drop; reconnection is the
    /// transport library's concern.
    BusDisconnected {
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A vehicle received a freshly booked route (all stops pending).
    /// The only audible notification.
    NewBooking {
        vehicle_id: String,
        stops: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A vehicle received a route that is already partly underway
    /// (status echo from a manual advance, for instance)
    RouteReceived {
        vehicle_id: String,
        stops: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A vehicle started driving toward a stop (status 0 -> 1)
    VehicleEnRoute {
        vehicle_id: String,
        stop_index: usize,
        stop_title: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A vehicle arrived at a stop (status 1 -> 2)
    VehicleArrived {
        vehicle_id: String,
        stop_index: usize,
        stop_title: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Every stop of a vehicle's route is arrived; the route was
    /// auto-cleared and a clear publish was issued
    TripCompleted {
        vehicle_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Fleet state changed for a vehicle; presentation should re-render
    FleetUpdated {
        vehicle_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An outbound publish was not accepted by the broker. One-shot
    /// alert; local state is unchanged.
    PublishFailed {
        topic: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DispatchEvent {
    /// Event type string for the SSE `event:` field
    pub fn type_str(&self) -> &'static str {
        match self {
            DispatchEvent::BusConnected { .. } => "BusConnected",
            DispatchEvent::BusDisconnected { .. } => "BusDisconnected",
            DispatchEvent::NewBooking { .. } => "NewBooking",
            DispatchEvent::RouteReceived { .. } => "RouteReceived",
            DispatchEvent::VehicleEnRoute { .. } => "VehicleEnRoute",
            DispatchEvent::VehicleArrived { .. } => "VehicleArrived",
            DispatchEvent::TripCompleted { .. } => "TripCompleted",
            DispatchEvent::FleetUpdated { .. } => "FleetUpdated",
            DispatchEvent::PublishFailed { .. } => "PublishFailed",
        }
    }

    /// Whether the presentation layer should play the notification sound
    /// for this event. Only a fresh booking is audible.
    pub fn is_audible(&self) -> bool {
        matches!(self, DispatchEvent::NewBooking { .. })
    }
}

/// Broadcast bus for dispatch events
///
/// Thin wrapper over `tokio::sync::broadcast` so emitters do not care
/// whether anyone is listening.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DispatchEvent>,
}

impl EventBus {
    /// Create a new EventBus buffering up to `capacity` events per
    /// subscriber before old events are dropped
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events. Events emitted before subscription
    /// are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers, returning the number of
    /// receivers it reached. No subscribers is not an error.
    pub fn emit(&self, event: DispatchEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_new_booking_is_audible() {
        let now = chrono::Utc::now();
        let booking = DispatchEvent::NewBooking {
            vehicle_id: "v1".to_string(),
            stops: 2,
            timestamp: now,
        };
        let received = DispatchEvent::RouteReceived {
            vehicle_id: "v1".to_string(),
            stops: 2,
            timestamp: now,
        };
        assert!(booking.is_audible());
        assert!(!received.is_audible());
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = DispatchEvent::TripCompleted {
            vehicle_id: "v1".to_string(),
            timestamp: chrono::Utc::now(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TripCompleted");
        assert_eq!(json["vehicle_id"], "v1");
    }

    #[tokio::test]
    async fn event_bus_delivers_to_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let reached = bus.emit(DispatchEvent::BusConnected {
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(reached, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.type_str(), "BusConnected");
    }

    #[test]
    fn emit_without_subscribers_is_not_an_error() {
        let bus = EventBus::new(16);
        let reached = bus.emit(DispatchEvent::BusConnected {
            timestamp: chrono::Utc::now(),
        });
        assert_eq!(reached, 0);
    }
}
