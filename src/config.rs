//! Command-line and environment configuration

use crate::device::{
    ArduPilotDrone, Drone, FcConfig, FcConnectionType, SimConfig, SimDrone, TelloConfig,
    TelloDrone,
};
use crate::gateway::GatewayConfig;
use clap::{Parser, ValueEnum};
use flightdeck_shared::limits;
use std::net::SocketAddr;
use std::time::Duration;

/// Which drone backend to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DriverKind {
    /// Ryze/DJI Tello over its UDP SDK
    Tello,
    /// ArduPilot/PX4 flight controller over MAVLink
    Ardupilot,
    /// In-process simulator
    Sim,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "flightdeck", version, about = "HTTP control gateway for a single drone")]
pub struct Settings {
    /// Address the HTTP API listens on
    #[arg(long, env = "FLIGHTDECK_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Drone backend
    #[arg(long, env = "FLIGHTDECK_DRIVER", value_enum, default_value_t = DriverKind::Tello)]
    pub driver: DriverKind,

    /// Local UDP port Tello replies arrive on
    #[arg(long, env = "FLIGHTDECK_TELLO_LOCAL_PORT", default_value_t = 8888)]
    pub tello_local_port: u16,

    /// Tello command address
    #[arg(long, env = "FLIGHTDECK_TELLO_ADDRESS", default_value = "192.168.10.1:8889")]
    pub tello_address: String,

    /// MAVLink link, e.g. udpin:0.0.0.0:14550, tcp:127.0.0.1:5760, serial:/dev/ttyACM0:57600
    #[arg(long, env = "FLIGHTDECK_MAVLINK_ADDRESS", default_value = "udpin:0.0.0.0:14550")]
    pub mavlink_address: FcConnectionType,

    /// Take-off altitude for MAVLink drones, in metres
    #[arg(long, env = "FLIGHTDECK_TAKEOFF_ALTITUDE", default_value_t = 2.5)]
    pub takeoff_altitude: f32,

    /// Simulated duration of each take-off or landing
    #[arg(long, env = "FLIGHTDECK_SIM_LATENCY_MS", default_value_t = limits::SIM_LATENCY_MS)]
    pub sim_latency_ms: u64,

    /// How long a single device exchange may take
    #[arg(long, env = "FLIGHTDECK_DEVICE_TIMEOUT_SECS", default_value_t = limits::DEVICE_TIMEOUT_MS / 1000)]
    pub device_timeout_secs: u64,

    /// How long an HTTP caller waits for its command's outcome
    #[arg(long, env = "FLIGHTDECK_REPLY_TIMEOUT_SECS", default_value_t = limits::REPLY_TIMEOUT_MS / 1000)]
    pub reply_timeout_secs: u64,
}

impl Settings {
    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            reply_timeout: Duration::from_secs(self.reply_timeout_secs),
        }
    }

    pub fn tello(&self) -> TelloConfig {
        TelloConfig {
            local_port: self.tello_local_port,
            drone_address: self.tello_address.clone(),
            reply_timeout: Duration::from_secs(self.device_timeout_secs),
        }
    }

    pub fn flight_controller(&self) -> FcConfig {
        FcConfig {
            connection: self.mavlink_address.clone(),
            takeoff_altitude_m: self.takeoff_altitude,
            ack_timeout: Duration::from_secs(self.device_timeout_secs),
            ..Default::default()
        }
    }

    pub fn sim(&self) -> SimConfig {
        SimConfig {
            latency: Duration::from_millis(self.sim_latency_ms),
        }
    }

    /// Build the selected (not yet connected) drone backend
    pub fn build_drone(&self) -> Box<dyn Drone> {
        match self.driver {
            DriverKind::Tello => Box::new(TelloDrone::new(self.tello())),
            DriverKind::Ardupilot => Box::new(ArduPilotDrone::new(self.flight_controller())),
            DriverKind::Sim => Box::new(SimDrone::new(self.sim())),
        }
    }
}
