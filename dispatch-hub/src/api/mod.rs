//! HTTP API handlers for dispatch-hub

pub mod bookings;
pub mod drivers;
pub mod fleet;
pub mod geocode;
pub mod health;
pub mod sse;

pub use bookings::create_booking;
pub use drivers::get_drivers;
pub use fleet::{advance_vehicle, get_fleet, get_vehicle};
pub use geocode::geocode_search;
pub use health::health_check;
pub use sse::event_stream;
