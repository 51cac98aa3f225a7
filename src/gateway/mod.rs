//! Command dispatch gateway
//!
//! This module handles:
//! - Accepting commands from any number of concurrent callers
//! - Executing them one at a time, in acceptance order, on the single drone
//! - Handing each caller the outcome of its own command
//!
//! The drone is moved into the worker task at startup; callers only ever hold
//! a cloneable `Gateway` handle.

mod submission;
mod worker;

pub use worker::{Gateway, GatewayConfig, WorkerHandle};
