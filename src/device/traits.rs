//! Drone capability trait for pluggable device backends

use async_trait::async_trait;
use flightdeck_shared::DeviceError;

/// Exclusive handle to one physical (or simulated) drone.
///
/// Methods take `&mut self`: a drone executes one operation at a time and the
/// handle must never be driven from two places at once.
#[async_trait]
pub trait Drone: Send + 'static {
    /// Establish the link to the drone. Called once at startup.
    async fn connect(&mut self) -> Result<(), DeviceError>;

    /// Lift off and hover
    async fn take_off(&mut self) -> Result<(), DeviceError>;

    /// Land at the current position
    async fn land(&mut self) -> Result<(), DeviceError>;

    /// Human-readable name for this backend
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<D: Drone + ?Sized> Drone for Box<D> {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        (**self).connect().await
    }

    async fn take_off(&mut self) -> Result<(), DeviceError> {
        (**self).take_off().await
    }

    async fn land(&mut self) -> Result<(), DeviceError> {
        (**self).land().await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
