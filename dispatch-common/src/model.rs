//! Fleet data model and bus wire payloads
//!
//! Field names on the serialized forms (`route`, `statusArr`,
//! `position: {lat, lng}`) are the bus wire contract shared with the
//! vehicles; they must not change.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single stop in a vehicle's route.
///
/// Immutable once included in a published route; created by route
/// authoring, never mutated by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Identifier unique within its route
    pub id: String,
    /// Display title shown in notifications and the route table
    pub title: String,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
}

/// A vehicle position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

/// Per-waypoint progress code.
///
/// Wire format is the bare integer (0/1/2). Codes are monotonically
/// non-decreasing over the lifetime of a route instance by convention;
/// regressions are ignored rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum StopStatus {
    /// Stop not yet started
    Pending,
    /// Vehicle is on its way to this stop
    EnRoute,
    /// Vehicle has arrived at this stop
    Arrived,
}

impl From<StopStatus> for u8 {
    fn from(status: StopStatus) -> Self {
        match status {
            StopStatus::Pending => 0,
            StopStatus::EnRoute => 1,
            StopStatus::Arrived => 2,
        }
    }
}

impl TryFrom<u8> for StopStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StopStatus::Pending),
            1 => Ok(StopStatus::EnRoute),
            2 => Ok(StopStatus::Arrived),
            other => Err(format!("unknown stop status code {}", other)),
        }
    }
}

/// Per-vehicle state held by the reconciler and read by the presentation
/// layer.
///
/// Created implicitly on the first message referencing an unseen vehicle
/// id; never deleted for the lifetime of the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Current route, replaced wholesale on each new-route message
    #[serde(default)]
    pub route: Vec<Waypoint>,
    /// One status code per waypoint, same length as `route` whenever both
    /// are non-empty
    #[serde(rename = "statusArr", default)]
    pub status_arr: Vec<StopStatus>,
    /// Last known position, None until first telemetry arrives
    #[serde(default)]
    pub position: Option<Position>,
}

/// Mapping from vehicle identifier to vehicle state; the single
/// process-wide mutable structure, owned by the reconciler.
pub type FleetState = HashMap<String, VehicleState>;

/// Mapping from vehicle identifier to the status array observed at the
/// previous message for that vehicle. Used only for transition edge
/// detection, never displayed.
pub type StatusSnapshot = HashMap<String, Vec<StopStatus>>;

/// Payload of a `vehicle/{id}/route` message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePayload {
    /// Ordered stops; a missing or non-sequence field fails
    /// deserialization and the message is discarded
    pub route: Vec<Waypoint>,
    /// Status codes, one per stop; absent means "freshly booked"
    #[serde(rename = "statusArr", default, skip_serializing_if = "Option::is_none")]
    pub status_arr: Option<Vec<StopStatus>>,
    /// Optional position; wins over the locally held one when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Payload of a `vehicle/{id}/telemetry` message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPayload {
    /// Current vehicle position (required)
    pub position: Position,
    /// Status codes; defaults to empty when absent
    #[serde(rename = "statusArr", default)]
    pub status_arr: Vec<StopStatus>,
    /// Route echo used for notification titles; defaults to empty.
    /// Telemetry never carries an authoritative route.
    #[serde(default)]
    pub route: Vec<Waypoint>,
}
