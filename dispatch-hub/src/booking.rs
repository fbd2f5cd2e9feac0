//! Route authoring
//!
//! Builds a candidate route from operator-supplied stops and turns it
//! into one outbound route publish with a zero-filled status array. Stop
//! identifiers are freshly generated UUIDs, unique within the route.

use crate::bus::OutboundRoute;
use dispatch_common::model::{StopStatus, Waypoint};
use dispatch_common::{Error, Result};
use serde::Deserialize;
use uuid::Uuid;

/// Minimum number of stops in a booking (a ride needs at least a pickup
/// and a dropoff)
pub const MIN_STOPS: usize = 2;
/// Maximum number of stops in a booking
pub const MAX_STOPS: usize = 5;

/// One operator-supplied stop, before an id is assigned
#[derive(Debug, Clone, Deserialize)]
pub struct BookingStop {
    pub title: String,
    pub lat: f64,
    pub lng: f64,
}

/// A booking request as received from the presentation layer
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub vehicle_id: String,
    pub stops: Vec<BookingStop>,
}

/// Assign fresh waypoint ids to the stops, enforcing the stop-count bounds
pub fn build_route(stops: &[BookingStop]) -> Result<Vec<Waypoint>> {
    if stops.len() < MIN_STOPS || stops.len() > MAX_STOPS {
        return Err(Error::InvalidInput(format!(
            "a booking needs between {} and {} stops, got {}",
            MIN_STOPS,
            MAX_STOPS,
            stops.len()
        )));
    }

    Ok(stops
        .iter()
        .map(|stop| Waypoint {
            id: Uuid::new_v4().to_string(),
            title: stop.title.clone(),
            lat: stop.lat,
            lng: stop.lng,
        })
        .collect())
}

/// Turn a booking request into the outbound route publish
pub fn outbound_for(request: &BookingRequest) -> Result<OutboundRoute> {
    if request.vehicle_id.trim().is_empty() {
        return Err(Error::InvalidInput("vehicle_id must not be empty".to_string()));
    }

    let route = build_route(&request.stops)?;
    let status_arr = vec![StopStatus::Pending; route.len()];
    Ok(OutboundRoute {
        vehicle_id: request.vehicle_id.clone(),
        route,
        status_arr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(title: &str) -> BookingStop {
        BookingStop {
            title: title.to_string(),
            lat: 21.03,
            lng: 105.85,
        }
    }

    #[test]
    fn rejects_fewer_than_two_stops() {
        assert!(build_route(&[stop("only")]).is_err());
        assert!(build_route(&[]).is_err());
    }

    #[test]
    fn rejects_more_than_five_stops() {
        let stops: Vec<BookingStop> = (0..6).map(|i| stop(&format!("Stop {}", i))).collect();
        assert!(build_route(&stops).is_err());
    }

    #[test]
    fn assigns_unique_ids_to_every_stop() {
        let stops: Vec<BookingStop> = (0..5).map(|i| stop(&format!("Stop {}", i))).collect();
        let route = build_route(&stops).unwrap();

        assert_eq!(route.len(), 5);
        for pair in route.windows(2) {
            assert_ne!(pair[0].id, pair[1].id);
        }
        assert_eq!(route[0].title, "Stop 0");
    }

    #[test]
    fn outbound_publish_is_zero_filled() {
        let request = BookingRequest {
            vehicle_id: "v1".to_string(),
            stops: vec![stop("Pickup"), stop("Dropoff")],
        };

        let out = outbound_for(&request).unwrap();
        assert_eq!(out.vehicle_id, "v1");
        assert_eq!(out.status_arr, vec![StopStatus::Pending, StopStatus::Pending]);
        assert_eq!(out.route.len(), out.status_arr.len());
    }

    #[test]
    fn rejects_blank_vehicle_id() {
        let request = BookingRequest {
            vehicle_id: "  ".to_string(),
            stops: vec![stop("Pickup"), stop("Dropoff")],
        };
        assert!(outbound_for(&request).is_err());
    }
}
