//! # Dispatch Common Library
//!
//! Shared code for the ride-dispatch service:
//! - Fleet data model and bus wire payloads
//! - Event types (DispatchEvent enum) and the EventBus
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod model;

pub use error::{Error, Result};
