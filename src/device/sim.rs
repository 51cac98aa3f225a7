//! Simulated drone for development without hardware

use super::traits::Drone;
use async_trait::async_trait;
use flightdeck_shared::{limits, Command, DeviceError, FlightEvent, FlightState, FlightStateMachine};
use std::time::Duration;
use tracing::info;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Time each take-off or landing takes
    pub latency: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(limits::SIM_LATENCY_MS),
        }
    }
}

/// An in-process drone that follows the flight state machine
pub struct SimDrone {
    config: SimConfig,
    fsm: FlightStateMachine,
    connected: bool,
}

impl SimDrone {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            fsm: FlightStateMachine::new(),
            connected: false,
        }
    }

    pub fn state(&self) -> FlightState {
        self.fsm.state()
    }

    /// Run one start/finish transition pair with the configured latency between
    async fn transition(
        &mut self,
        command: Command,
        start: FlightEvent,
        finish: FlightEvent,
    ) -> Result<(), DeviceError> {
        if !self.connected {
            return Err(DeviceError::NotConnected);
        }

        self.fsm
            .process_event(start)
            .map_err(|e| DeviceError::Rejected {
                command,
                reason: e.to_string(),
            })?;

        tokio::time::sleep(self.config.latency).await;

        let state = self.fsm.process_event(finish).map_err(|e| DeviceError::Rejected {
            command,
            reason: e.to_string(),
        })?;
        info!("[SIM] {} complete, now {:?}", command, state);
        Ok(())
    }
}

#[async_trait]
impl Drone for SimDrone {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        info!("[SIM] Simulated drone ready (latency {:?})", self.config.latency);
        self.connected = true;
        Ok(())
    }

    async fn take_off(&mut self) -> Result<(), DeviceError> {
        self.transition(
            Command::TakeOff,
            FlightEvent::TakeoffStarted,
            FlightEvent::TakeoffComplete,
        )
        .await
    }

    async fn land(&mut self) -> Result<(), DeviceError> {
        self.transition(Command::Land, FlightEvent::LandingStarted, FlightEvent::Landed)
            .await
    }

    fn name(&self) -> &'static str {
        "sim"
    }
}
