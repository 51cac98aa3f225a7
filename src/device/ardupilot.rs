//! ArduPilot Driver
//!
//! Drives an ArduPilot/PX4 flight controller over MAVLink (serial, UDP or TCP).
//! Every command is a COMMAND_LONG that must be answered by a matching
//! COMMAND_ACK before the next one is sent.

use super::traits::Drone;
use async_trait::async_trait;
use flightdeck_shared::{limits, Command, DeviceError};
use mavlink::ardupilotmega::{MavCmd, MavMessage, MavResult, COMMAND_LONG_DATA};
use mavlink::error::MessageReadError;
use mavlink::{AsyncMavConnection, MavHeader};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// ArduPilot Copter custom mode number for GUIDED
const GUIDED_MODE: f32 = 4.0;

/// MAV_MODE_FLAG_CUSTOM_MODE_ENABLED
const CUSTOM_MODE_ENABLED: f32 = 1.0;

type FcLink = Box<dyn AsyncMavConnection<MavMessage> + Send + Sync>;

/// Connection type for flight controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FcConnectionType {
    /// Serial port connection (e.g., "/dev/ttyACM0" or "/dev/serial0")
    Serial { port: String, baud: u32 },
    /// UDP connection (e.g., "0.0.0.0:14550")
    Udp { address: String },
    /// TCP connection (e.g., "127.0.0.1:5760")
    Tcp { address: String },
}

impl FcConnectionType {
    /// Address string understood by `mavlink::connect_async`
    pub fn connection_string(&self) -> String {
        match self {
            FcConnectionType::Serial { port, baud } => format!("serial:{}:{}", port, baud),
            FcConnectionType::Udp { address } => format!("udpin:{}", address),
            FcConnectionType::Tcp { address } => format!("tcpout:{}", address),
        }
    }
}

impl Default for FcConnectionType {
    fn default() -> Self {
        // Default to SITL UDP for development
        Self::Udp {
            address: "0.0.0.0:14550".into(),
        }
    }
}

impl FromStr for FcConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("missing scheme in {:?}", s))?;

        match scheme {
            "udp" | "udpin" => Ok(Self::Udp {
                address: rest.into(),
            }),
            "tcp" | "tcpout" => Ok(Self::Tcp {
                address: rest.into(),
            }),
            "serial" => {
                let (port, baud) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| format!("serial address needs a baud rate: {:?}", s))?;
                let baud = baud
                    .parse()
                    .map_err(|_| format!("invalid baud rate {:?}", baud))?;
                Ok(Self::Serial {
                    port: port.into(),
                    baud,
                })
            }
            other => Err(format!("unsupported scheme {:?}", other)),
        }
    }
}

/// Configuration for flight controller connection
#[derive(Debug, Clone)]
pub struct FcConfig {
    /// Connection type and parameters
    pub connection: FcConnectionType,
    /// System ID for this companion computer
    pub system_id: u8,
    /// Component ID for this companion computer
    pub component_id: u8,
    /// Target system ID (flight controller)
    pub target_system: u8,
    /// Target component ID (autopilot)
    pub target_component: u8,
    /// Altitude for take-off, in metres
    pub takeoff_altitude_m: f32,
    /// How long to wait for each COMMAND_ACK
    pub ack_timeout: Duration,
    /// How long `connect` waits for the first HEARTBEAT
    pub heartbeat_timeout: Duration,
}

impl Default for FcConfig {
    fn default() -> Self {
        Self {
            connection: FcConnectionType::default(),
            system_id: 255,      // Companion computer
            component_id: 190,   // MAV_COMP_ID_ONBOARD_COMPUTER
            target_system: 1,    // Autopilot
            target_component: 1, // MAV_COMP_ID_AUTOPILOT1
            takeoff_altitude_m: 2.5,
            ack_timeout: Duration::from_millis(limits::DEVICE_TIMEOUT_MS),
            heartbeat_timeout: Duration::from_millis(limits::HEARTBEAT_WAIT_MS),
        }
    }
}

/// A flight controller reached over MAVLink
pub struct ArduPilotDrone {
    config: FcConfig,
    link: Option<FcLink>,
    sequence: u8,
}

impl ArduPilotDrone {
    pub fn new(config: FcConfig) -> Self {
        Self {
            config,
            link: None,
            sequence: 0,
        }
    }

    fn next_header(&mut self) -> MavHeader {
        self.sequence = self.sequence.wrapping_add(1);
        MavHeader {
            system_id: self.config.system_id,
            component_id: self.config.component_id,
            sequence: self.sequence,
        }
    }

    /// Build a COMMAND_LONG addressed to the autopilot
    fn command_long(&self, command: MavCmd, params: [f32; 7]) -> MavMessage {
        MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
            target_system: self.config.target_system,
            target_component: self.config.target_component,
            command,
            confirmation: 0,
            param1: params[0],
            param2: params[1],
            param3: params[2],
            param4: params[3],
            param5: params[4],
            param6: params[5],
            param7: params[6],
        })
    }

    /// Send a COMMAND_LONG and wait for the autopilot to accept it.
    ///
    /// The exchange is one future: on timeout it is dropped, reader included,
    /// so nothing is left behind to swallow the next command's ACK.
    async fn send_and_ack(
        &mut self,
        command: Command,
        mav_cmd: MavCmd,
        params: [f32; 7],
    ) -> Result<(), DeviceError> {
        let header = self.next_header();
        let msg = self.command_long(mav_cmd, params);
        let ack_timeout = self.config.ack_timeout;
        let link = self.link.as_ref().ok_or(DeviceError::NotConnected)?;

        debug!("[MAVLink] Sending {:?}", mav_cmd);

        let exchange = async {
            link.send(&header, &msg)
                .await
                .map_err(|e| DeviceError::Protocol(format!("send failed: {}", e)))?;

            loop {
                match link.recv().await {
                    Ok((_, MavMessage::COMMAND_ACK(ack))) if ack.command == mav_cmd => {
                        return Ok(ack.result);
                    }
                    Ok(_) => {}
                    Err(MessageReadError::Io(e)) => return Err(DeviceError::Io(e)),
                    Err(e) => debug!("[MAVLink] Skipping unreadable frame: {}", e),
                }
            }
        };

        let result = timeout(ack_timeout, exchange)
            .await
            .map_err(|_| DeviceError::Timeout(ack_timeout))??;

        if result == MavResult::MAV_RESULT_ACCEPTED {
            Ok(())
        } else {
            warn!("[MAVLink] {:?} answered with {:?}", mav_cmd, result);
            Err(DeviceError::Rejected {
                command,
                reason: format!("{:?}", result),
            })
        }
    }
}

#[async_trait]
impl Drone for ArduPilotDrone {
    async fn connect(&mut self) -> Result<(), DeviceError> {
        let address = self.config.connection.connection_string();
        let wait = self.config.heartbeat_timeout;
        info!("[MAVLink] Connecting to flight controller at {}", address);

        let link = timeout(wait, mavlink::connect_async::<MavMessage>(&address))
            .await
            .map_err(|_| DeviceError::Timeout(wait))??;

        // The link is only usable once the autopilot has been heard from
        let heartbeat = async {
            loop {
                match link.recv().await {
                    Ok((_, MavMessage::HEARTBEAT(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(MessageReadError::Io(e)) => return Err(DeviceError::Io(e)),
                    Err(e) => debug!("[MAVLink] Skipping unreadable frame: {}", e),
                }
            }
        };
        timeout(wait, heartbeat)
            .await
            .map_err(|_| DeviceError::Timeout(wait))??;

        info!("[MAVLink] Connected to flight controller");
        self.link = Some(link);
        Ok(())
    }

    async fn take_off(&mut self) -> Result<(), DeviceError> {
        let altitude = self.config.takeoff_altitude_m;
        info!("[MAVLink] Taking off to {}m", altitude);

        self.send_and_ack(
            Command::TakeOff,
            MavCmd::MAV_CMD_DO_SET_MODE,
            [CUSTOM_MODE_ENABLED, GUIDED_MODE, 0.0, 0.0, 0.0, 0.0, 0.0],
        )
        .await?;

        // param1: 1 = arm
        self.send_and_ack(
            Command::TakeOff,
            MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        )
        .await?;

        // NAN yaw/lat/lon hold the current values
        self.send_and_ack(
            Command::TakeOff,
            MavCmd::MAV_CMD_NAV_TAKEOFF,
            [0.0, 0.0, 0.0, f32::NAN, f32::NAN, f32::NAN, altitude],
        )
        .await
    }

    async fn land(&mut self) -> Result<(), DeviceError> {
        info!("[MAVLink] Landing at current position");

        self.send_and_ack(
            Command::Land,
            MavCmd::MAV_CMD_NAV_LAND,
            [0.0, 0.0, 0.0, f32::NAN, f32::NAN, f32::NAN, 0.0],
        )
        .await
    }

    fn name(&self) -> &'static str {
        "ardupilot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::ardupilotmega::{COMMAND_ACK_DATA, HEARTBEAT_DATA};
    use std::sync::{mpsc, Arc};
    use tokio::task::JoinHandle;

    /// A UDP port nothing is listening on
    fn free_port() -> u16 {
        let socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind");
        socket.local_addr().expect("local addr").port()
    }

    fn config_for(port: u16) -> FcConfig {
        FcConfig {
            connection: FcConnectionType::Udp {
                address: format!("127.0.0.1:{}", port),
            },
            ack_timeout: Duration::from_millis(300),
            heartbeat_timeout: Duration::from_millis(300),
            ..Default::default()
        }
    }

    /// Autopilot that heartbeats toward `port` and acknowledges COMMAND_LONGs
    /// with whatever `answer` returns (`None` = stay silent)
    async fn fake_autopilot<F>(port: u16, answer: F) -> Vec<JoinHandle<()>>
    where
        F: Fn(MavCmd) -> Option<MavResult> + Send + 'static,
    {
        let link = Arc::new(
            mavlink::connect_async::<MavMessage>(&format!("udpout:127.0.0.1:{}", port))
                .await
                .expect("autopilot link"),
        );
        let header = MavHeader {
            system_id: 1,
            component_id: 1,
            sequence: 0,
        };

        let heartbeat_link = link.clone();
        let heartbeat = tokio::spawn(async move {
            loop {
                let msg = MavMessage::HEARTBEAT(HEARTBEAT_DATA::default());
                let _ = heartbeat_link.send(&header, &msg).await;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        });

        let responder = tokio::spawn(async move {
            loop {
                let Ok((_, MavMessage::COMMAND_LONG(cmd))) = link.recv().await else {
                    continue;
                };
                if let Some(result) = answer(cmd.command) {
                    let ack = MavMessage::COMMAND_ACK(COMMAND_ACK_DATA {
                        command: cmd.command,
                        result,
                        ..Default::default()
                    });
                    let _ = link.send(&header, &ack).await;
                }
            }
        });

        vec![heartbeat, responder]
    }

    async fn connected_drone<F>(answer: F) -> (ArduPilotDrone, Vec<JoinHandle<()>>)
    where
        F: Fn(MavCmd) -> Option<MavResult> + Send + 'static,
    {
        let port = free_port();
        let mut drone = ArduPilotDrone::new(config_for(port));
        let autopilot = fake_autopilot(port, answer).await;
        drone.connect().await.expect("connect");
        (drone, autopilot)
    }

    #[test]
    fn test_default_config() {
        let config = FcConfig::default();
        assert_eq!(config.system_id, 255);
        assert_eq!(config.target_system, 1);
        assert_eq!(config.connection.connection_string(), "udpin:0.0.0.0:14550");
    }

    #[test]
    fn test_parse_connection_types() {
        assert_eq!(
            "serial:/dev/ttyACM0:57600".parse::<FcConnectionType>(),
            Ok(FcConnectionType::Serial {
                port: "/dev/ttyACM0".into(),
                baud: 57600,
            })
        );
        assert_eq!(
            "udpin:127.0.0.1:14550".parse::<FcConnectionType>(),
            Ok(FcConnectionType::Udp {
                address: "127.0.0.1:14550".into(),
            })
        );
        assert_eq!(
            "tcp:127.0.0.1:5760".parse::<FcConnectionType>(),
            Ok(FcConnectionType::Tcp {
                address: "127.0.0.1:5760".into(),
            })
        );
        assert!("serial:/dev/ttyACM0".parse::<FcConnectionType>().is_err());
        assert!("carrier-pigeon:home".parse::<FcConnectionType>().is_err());
    }

    #[test]
    fn test_command_long_targets_autopilot() {
        let drone = ArduPilotDrone::new(FcConfig::default());
        let msg = drone.command_long(MavCmd::MAV_CMD_NAV_LAND, [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 7.0]);

        match msg {
            MavMessage::COMMAND_LONG(data) => {
                assert_eq!(data.target_system, 1);
                assert_eq!(data.target_component, 1);
                assert_eq!(data.command, MavCmd::MAV_CMD_NAV_LAND);
                assert_eq!(data.param7, 7.0);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_header_sequence_wraps() {
        let mut drone = ArduPilotDrone::new(FcConfig::default());
        drone.sequence = u8::MAX;
        assert_eq!(drone.next_header().sequence, 0);
        assert_eq!(drone.next_header().sequence, 1);
    }

    #[tokio::test]
    async fn test_operations_require_connect() {
        let mut drone = ArduPilotDrone::new(FcConfig::default());
        assert!(matches!(drone.take_off().await, Err(DeviceError::NotConnected)));
        assert!(matches!(drone.land().await, Err(DeviceError::NotConnected)));
    }

    #[tokio::test]
    async fn test_accepted_acks_complete_commands() {
        let (mut drone, autopilot) =
            connected_drone(|_| Some(MavResult::MAV_RESULT_ACCEPTED)).await;

        drone.take_off().await.expect("take off");
        drone.land().await.expect("land");

        autopilot.iter().for_each(JoinHandle::abort);
    }

    #[tokio::test]
    async fn test_denied_ack_is_a_rejection() {
        let (mut drone, autopilot) = connected_drone(|cmd| match cmd {
            MavCmd::MAV_CMD_COMPONENT_ARM_DISARM => Some(MavResult::MAV_RESULT_DENIED),
            _ => Some(MavResult::MAV_RESULT_ACCEPTED),
        })
        .await;

        match drone.take_off().await {
            Err(DeviceError::Rejected { command, reason }) => {
                assert_eq!(command, Command::TakeOff);
                assert!(reason.contains("DENIED"), "reason: {reason}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        autopilot.iter().for_each(JoinHandle::abort);
    }

    #[tokio::test]
    async fn test_missing_ack_does_not_steal_the_next_one() {
        let (mut drone, autopilot) = connected_drone(|cmd| match cmd {
            MavCmd::MAV_CMD_NAV_LAND => None,
            _ => Some(MavResult::MAV_RESULT_ACCEPTED),
        })
        .await;

        assert!(matches!(drone.land().await, Err(DeviceError::Timeout(_))));
        // Nothing from the abandoned exchange may still be reading the link
        drone.take_off().await.expect("take off after timeout");

        autopilot.iter().for_each(JoinHandle::abort);
    }

    #[test]
    fn test_silent_link_fails_connect_and_releases_runtime() {
        let (done_tx, done_rx) = mpsc::channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("runtime");
            let mut drone = ArduPilotDrone::new(config_for(free_port()));
            let result = runtime.block_on(drone.connect());
            drop(runtime);
            let _ = done_tx.send(matches!(result, Err(DeviceError::Timeout(_))));
        });

        assert_eq!(done_rx.recv_timeout(Duration::from_secs(10)), Ok(true));
    }
}
