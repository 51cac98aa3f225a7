//! Flight State Machine
//!
//! Defines the valid take-off and landing transitions of a single drone.

use thiserror::Error;

/// Coarse flight state of the drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightState {
    /// On the ground, motors idle
    #[default]
    Landed,
    /// Climbing to hover altitude
    TakingOff,
    /// Hovering or flying
    Airborne,
    /// Descending to the ground
    Landing,
}

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightEvent {
    /// Takeoff initiated
    TakeoffStarted,
    /// Reached hover altitude
    TakeoffComplete,
    /// Landing initiated
    LandingStarted,
    /// Touched down
    Landed,
}

/// An event that is not valid from the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} while {from:?}")]
pub struct InvalidTransition {
    pub from: FlightState,
    pub event: FlightEvent,
}

/// The flight state machine for one drone
#[derive(Debug, Default)]
pub struct FlightStateMachine {
    current_state: FlightState,
    last_transition_ms: u64,
}

impl FlightStateMachine {
    /// Create a new state machine in Landed state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current state
    pub fn state(&self) -> FlightState {
        self.current_state
    }

    /// Timestamp of the last accepted transition (0 if none)
    pub fn last_transition_ms(&self) -> u64 {
        self.last_transition_ms
    }

    /// Process an event, moving to the next state if the transition is valid
    pub fn process_event(&mut self, event: FlightEvent) -> Result<FlightState, InvalidTransition> {
        let next = self.next_state(event).ok_or(InvalidTransition {
            from: self.current_state,
            event,
        })?;

        self.current_state = next;
        self.last_transition_ms = crate::now_ms();
        Ok(next)
    }

    /// Get the next state for a given event, if the transition is valid
    fn next_state(&self, event: FlightEvent) -> Option<FlightState> {
        use FlightEvent::*;
        use FlightState::*;

        match (self.current_state, event) {
            (FlightState::Landed, TakeoffStarted) => Some(TakingOff),

            (TakingOff, TakeoffComplete) => Some(Airborne),

            (Airborne, LandingStarted) => Some(Landing),
            // Landing can also interrupt a climb
            (TakingOff, LandingStarted) => Some(Landing),

            (Landing, FlightEvent::Landed) => Some(FlightState::Landed),

            _ => None,
        }
    }
}
