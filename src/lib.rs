//! flightdeck
//!
//! Exposes a single drone over HTTP. Requests from any number of clients are
//! funnelled through one gateway worker that owns the drone and runs commands
//! strictly one at a time.

pub mod api;
pub mod config;
pub mod device;
pub mod gateway;
pub mod startup;

pub use flightdeck_shared as shared;
