//! Core types and pickup-date resolution for the Avfall Sør MQTT bridge.

/// Domain models for addresses, calendars, and resolved pickups.
pub mod model;
/// Traits describing the lookup and calendar backends.
pub mod ports;
/// Norwegian date-label parsing and next-pickup reduction.
pub mod resolve;
/// High-level service facade used by the binary.
pub mod service;

pub use model::*;
pub use ports::*;
pub use resolve::*;
pub use service::*;
