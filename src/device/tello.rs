//! Tello SDK driver
//!
//! Speaks the Tello text SDK over UDP: one ASCII command per datagram, one
//! `ok` / `error ...` reply per command.

use super::traits::Drone;
use async_trait::async_trait;
use flightdeck_shared::{limits, Command, DeviceError};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Configuration for the Tello link
#[derive(Debug, Clone)]
pub struct TelloConfig {
    /// Local UDP port replies arrive on
    pub local_port: u16,
    /// Drone command address
    pub drone_address: String,
    /// How long to wait for each reply
    pub reply_timeout: Duration,
}

impl Default for TelloConfig {
    fn default() -> Self {
        Self {
            local_port: 8888,
            drone_address: "192.168.10.1:8889".into(),
            reply_timeout: Duration::from_millis(limits::DEVICE_TIMEOUT_MS),
        }
    }
}

/// A Tello drone reached over its UDP command port.
///
/// SDK replies carry no correlation id, so a reply is matched to a command
/// only by order. After a timed-out exchange the driver waits (up to one more
/// `reply_timeout`) for the overdue reply and discards it before sending the
/// next command. A reply later than that can still be taken for the next
/// command's answer.
pub struct TelloDrone {
    config: TelloConfig,
    socket: Option<UdpSocket>,
    /// The last exchange timed out; its reply may still be on the way
    reply_overdue: bool,
}

impl TelloDrone {
    pub fn new(config: TelloConfig) -> Self {
        Self {
            config,
            socket: None,
            reply_overdue: false,
        }
    }

    /// Send one SDK command and wait for its reply
    async fn exchange(&mut self, message: &str) -> Result<String, DeviceError> {
        let socket = self.socket.as_ref().ok_or(DeviceError::NotConnected)?;
        let reply_timeout = self.config.reply_timeout;
        let mut buf = [0u8; 1024];

        if std::mem::take(&mut self.reply_overdue) {
            match timeout(reply_timeout, socket.recv(&mut buf)).await {
                Ok(Ok(n)) => debug!(
                    "[TELLO] Discarding overdue reply: {:?}",
                    String::from_utf8_lossy(&buf[..n])
                ),
                Ok(Err(e)) => debug!("[TELLO] Error while waiting for overdue reply: {}", e),
                Err(_) => debug!("[TELLO] Overdue reply never arrived"),
            }
        }

        // Drop anything else still queued
        while let Ok(n) = socket.try_recv(&mut buf) {
            debug!("[TELLO] Discarding stale reply: {:?}", String::from_utf8_lossy(&buf[..n]));
        }

        debug!("[TELLO] -> {}", message);
        socket.send(message.as_bytes()).await?;

        let n = match timeout(reply_timeout, socket.recv(&mut buf)).await {
            Ok(received) => received?,
            Err(_) => {
                self.reply_overdue = true;
                return Err(DeviceError::Timeout(reply_timeout));
            }
        };

        let reply = std::str::from_utf8(&buf[..n])
            .map_err(|e| DeviceError::Protocol(format!("non-UTF-8 reply: {}", e)))?
            .trim()
            .to_string();
        debug!("[TELLO] <- {}", reply);

        Ok(reply)
    }

    async fn run(&mut self, command: Command, message: &str) -> Result<(), DeviceError> {
        let reply = self.exchange(message).await?;
        if reply.eq_ignore_ascii_case("ok") {
            Ok(())
        } else {
            Err(DeviceError::Rejected {
                command,
                reason: reply,
            })
        }
    }
}

#[async_trait]
impl Drone for TelloDrone {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        info!(
            "[TELLO] Binding 0.0.0.0:{} for drone at {}",
            self.config.local_port, self.config.drone_address
        );

        let socket = UdpSocket::bind(("0.0.0.0", self.config.local_port)).await?;
        socket.connect(&self.config.drone_address).await?;
        self.socket = Some(socket);
        self.reply_overdue = false;

        // Enter SDK mode
        match self.exchange("command").await {
            Ok(reply) if reply.eq_ignore_ascii_case("ok") => {
                info!("[TELLO] SDK mode enabled");
                Ok(())
            }
            Ok(reply) => {
                self.socket = None;
                Err(DeviceError::Protocol(format!("SDK mode refused: {}", reply)))
            }
            Err(e) => {
                warn!("[TELLO] No answer to SDK handshake: {}", e);
                self.socket = None;
                Err(e)
            }
        }
    }

    async fn take_off(&mut self) -> Result<(), DeviceError> {
        self.run(Command::TakeOff, "takeoff").await
    }

    async fn land(&mut self) -> Result<(), DeviceError> {
        self.run(Command::Land, "land").await
    }

    fn name(&self) -> &'static str {
        "tello"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bind a fake drone and a driver pointed at it
    async fn fake_drone(reply_timeout: Duration) -> (UdpSocket, TelloDrone) {
        let drone_side = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let spare = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let local_port = spare.local_addr().unwrap().port();
        drop(spare);

        let driver = TelloDrone::new(TelloConfig {
            local_port,
            drone_address: drone_side.local_addr().unwrap().to_string(),
            reply_timeout,
        });
        (drone_side, driver)
    }

    /// Answer the next datagram with `reply`, returning what was received
    async fn answer(drone_side: &UdpSocket, reply: &str) -> String {
        let mut buf = [0u8; 64];
        let (n, peer) = drone_side.recv_from(&mut buf).await.unwrap();
        drone_side.send_to(reply.as_bytes(), peer).await.unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[test]
    fn test_default_config() {
        let config = TelloConfig::default();
        assert_eq!(config.local_port, 8888);
        assert_eq!(config.drone_address, "192.168.10.1:8889");
    }

    #[tokio::test]
    async fn test_operations_require_connect() {
        let mut drone = TelloDrone::new(TelloConfig::default());
        assert!(matches!(drone.take_off().await, Err(DeviceError::NotConnected)));
        assert!(matches!(drone.land().await, Err(DeviceError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_then_takeoff_and_land() {
        let (drone_side, mut driver) = fake_drone(Duration::from_secs(2)).await;

        let fake = tokio::spawn(async move {
            let mut seen = Vec::new();
            seen.push(answer(&drone_side, "ok").await);
            seen.push(answer(&drone_side, "ok").await);
            seen.push(answer(&drone_side, "ok").await);
            seen
        });

        driver.connect().await.unwrap();
        driver.take_off().await.unwrap();
        driver.land().await.unwrap();

        assert_eq!(fake.await.unwrap(), vec!["command", "takeoff", "land"]);
    }

    #[tokio::test]
    async fn test_error_reply_is_rejection() {
        let (drone_side, mut driver) = fake_drone(Duration::from_secs(2)).await;

        let fake = tokio::spawn(async move {
            answer(&drone_side, "ok").await;
            answer(&drone_side, "error Motor stop").await;
        });

        driver.connect().await.unwrap();
        let err = driver.take_off().await.unwrap_err();
        fake.await.unwrap();

        match err {
            DeviceError::Rejected { command, reason } => {
                assert_eq!(command, Command::TakeOff);
                assert_eq!(reason, "error Motor stop");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_silent_drone_times_out() {
        let (_drone_side, mut driver) = fake_drone(Duration::from_millis(50)).await;

        let err = driver.connect().await.unwrap_err();
        assert!(matches!(err, DeviceError::Timeout(_)));
        assert!(matches!(driver.land().await, Err(DeviceError::NotConnected)));
    }

    #[tokio::test]
    async fn test_late_reply_is_not_taken_for_the_next_command() {
        let (drone_side, mut driver) = fake_drone(Duration::from_millis(200)).await;

        let fake = tokio::spawn(async move {
            answer(&drone_side, "ok").await;

            // Answer the take-off only after the driver gave up on it
            let mut buf = [0u8; 64];
            let (_, peer) = drone_side.recv_from(&mut buf).await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            drone_side.send_to(b"ok", peer).await.unwrap();

            answer(&drone_side, "error Not joystick").await
        });

        driver.connect().await.unwrap();
        assert!(matches!(driver.take_off().await, Err(DeviceError::Timeout(_))));

        match driver.land().await {
            Err(DeviceError::Rejected { command, reason }) => {
                assert_eq!(command, Command::Land);
                assert_eq!(reason, "error Not joystick");
            }
            other => panic!("land got the take-off's reply: {other:?}"),
        }
        assert_eq!(fake.await.unwrap(), "land");
    }
}
