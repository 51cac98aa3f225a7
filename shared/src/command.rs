//! Command vocabulary
//!
//! The closed set of operations the gateway can run against the drone.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A device operation the gateway can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Lift off and hover
    TakeOff,
    /// Land at the current position
    Land,
}

impl Command {
    /// Every command, in declaration order
    pub const ALL: [Command; 2] = [Command::TakeOff, Command::Land];

    /// Canonical tag used in routes and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::TakeOff => "takeoff",
            Command::Land => "land",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command tag outside the known vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized command {0:?}")]
pub struct UnrecognizedCommand(pub String);

impl FromStr for Command {
    type Err = UnrecognizedCommand;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "takeoff" | "take_off" | "take-off" => Ok(Command::TakeOff),
            "land" => Ok(Command::Land),
            _ => Err(UnrecognizedCommand(tag.to_string())),
        }
    }
}
