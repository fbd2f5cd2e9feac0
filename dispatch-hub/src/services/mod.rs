//! External service clients

pub mod drivers;
pub mod geocode;

pub use drivers::DriversClient;
pub use geocode::GeocodeClient;
