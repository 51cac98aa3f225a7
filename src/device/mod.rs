//! Drone device backends
//!
//! This module handles:
//! - The `Drone` capability trait the gateway drives
//! - Tello SDK over UDP
//! - ArduPilot/PX4 over MAVLink
//! - An in-process simulator

mod ardupilot;
mod sim;
mod tello;
mod traits;

pub use ardupilot::{ArduPilotDrone, FcConfig, FcConnectionType};
pub use sim::{SimConfig, SimDrone};
pub use tello::{TelloConfig, TelloDrone};
pub use traits::Drone;
