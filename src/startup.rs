//! Process bring-up

use crate::device::Drone;
use anyhow::Context;
use tracing::{error, info};

/// Connect the drone before anything is served.
///
/// Without a drone there is nothing to serve, so the error is meant to be
/// returned from `main` and end the process.
pub async fn connect_drone<D: Drone + ?Sized>(drone: &mut D) -> anyhow::Result<()> {
    let name = drone.name();
    if let Err(e) = drone.connect().await {
        error!("Failed to connect to {} drone: {}", name, e);
        return Err(e).with_context(|| format!("connecting to {} drone", name));
    }
    info!("Connected to {} drone", name);
    Ok(())
}
