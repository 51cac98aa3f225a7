//! flightdeck Shared Types
//!
//! This crate provides the command vocabulary, outcome and error types, and
//! the flight state machine shared between the gateway, the device drivers
//! and the HTTP adapter.

pub mod command;
pub mod error;
pub mod state_machine;

use std::time::{SystemTime, UNIX_EPOCH};

pub use command::{Command, UnrecognizedCommand};
pub use error::{CommandError, DeviceError, Outcome};
pub use state_machine::{FlightEvent, FlightState, FlightStateMachine, InvalidTransition};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Timing parameters for command dispatch
pub mod limits {
    /// How long a single device exchange may take before the driver gives up
    pub const DEVICE_TIMEOUT_MS: u64 = 10_000;

    /// How long a caller waits for the gateway to report an outcome
    pub const REPLY_TIMEOUT_MS: u64 = 30_000;

    /// How long the ArduPilot driver waits for the first HEARTBEAT
    pub const HEARTBEAT_WAIT_MS: u64 = 5_000;

    /// Simulated latency of one device operation
    pub const SIM_LATENCY_MS: u64 = 250;
}
