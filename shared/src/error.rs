//! Error and outcome types

use crate::command::{Command, UnrecognizedCommand};
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a device driver
#[derive(Debug, Error)]
pub enum DeviceError {
    /// An operation was attempted before the link was established
    #[error("device not connected")]
    NotConnected,

    /// Free-form driver fault; displays as the bare cause
    #[error("{0}")]
    Fault(String),

    /// The device answered but refused the command
    #[error("device rejected {command}: {reason}")]
    Rejected { command: Command, reason: String },

    /// The device did not answer in time
    #[error("no response from device within {0:?}")]
    Timeout(Duration),

    /// The device answered with something we could not interpret
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("device i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    pub fn fault(cause: impl Into<String>) -> Self {
        Self::Fault(cause.into())
    }
}

/// Why a submitted command did not succeed
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Unrecognized(#[from] UnrecognizedCommand),

    /// No outcome arrived within the reply timeout
    #[error("gateway unresponsive after {0:?}")]
    Unresponsive(Duration),

    /// The gateway worker has stopped
    #[error("gateway is shut down")]
    Closed,
}

/// Result of executing one command
pub type Outcome = Result<(), CommandError>;
