//! Command gateway - serializes concurrent callers onto one drone

use super::submission::Submission;
use crate::device::Drone;
use flightdeck_shared::{limits, Command, CommandError, Outcome, UnrecognizedCommand};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Configuration for the gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// How long a caller waits for its outcome before giving up
    pub reply_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_millis(limits::REPLY_TIMEOUT_MS),
        }
    }
}

/// Cloneable handle callers submit commands through
#[derive(Clone)]
pub struct Gateway {
    intake: mpsc::UnboundedSender<Submission>,
    config: GatewayConfig,
}

/// Owns the worker task; yields the device back once the worker stops
pub struct WorkerHandle<D> {
    task: JoinHandle<D>,
}

impl<D> WorkerHandle<D> {
    /// Wait for the worker to drain its queue and stop.
    ///
    /// The worker stops once every `Gateway` clone has been dropped.
    pub async fn join(self) -> Result<D, JoinError> {
        self.task.await
    }
}

impl Gateway {
    /// Start the worker. The device is moved into it and never shared.
    pub fn spawn<D: Drone>(device: D, config: GatewayConfig) -> (Self, WorkerHandle<D>) {
        let (intake, queue) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_worker(device, queue));

        (Self { intake, config }, WorkerHandle { task })
    }

    /// Execute a command and wait for its outcome
    pub async fn submit(&self, command: Command) -> Outcome {
        self.enqueue(Ok(command)).await
    }

    /// Execute a command given by its textual tag
    pub async fn submit_tag(&self, tag: &str) -> Outcome {
        self.enqueue(tag.parse()).await
    }

    async fn enqueue(&self, request: Result<Command, UnrecognizedCommand>) -> Outcome {
        let label = match &request {
            Ok(command) => command.as_str().to_string(),
            Err(unrecognized) => unrecognized.0.clone(),
        };
        let (submission, outcome_rx) = Submission::new(request);

        self.intake
            .send(submission)
            .map_err(|_| CommandError::Closed)?;

        match timeout(self.config.reply_timeout, outcome_rx).await {
            Ok(Ok(outcome)) => outcome,
            // Worker dropped the submission without answering (it died)
            Ok(Err(_)) => Err(CommandError::Closed),
            Err(_) => {
                warn!(
                    "[GATEWAY] No outcome for {} within {:?}",
                    label, self.config.reply_timeout
                );
                Err(CommandError::Unresponsive(self.config.reply_timeout))
            }
        }
    }
}

/// Take submissions one at a time, in acceptance order, until the intake closes.
///
/// `seq` numbers submissions as they leave the queue, so it matches execution order.
async fn run_worker<D: Drone>(mut device: D, mut queue: mpsc::UnboundedReceiver<Submission>) -> D {
    info!("[GATEWAY] Worker started for {} drone", device.name());
    let mut seq: u64 = 0;

    while let Some(submission) = queue.recv().await {
        seq += 1;
        let outcome = match &submission.request {
            Ok(command) => {
                debug!(seq, "[GATEWAY] Executing {}", command);
                execute(&mut device, *command).await
            }
            Err(unrecognized) => Err(unrecognized.clone().into()),
        };

        match &outcome {
            Ok(()) => info!(seq, "[GATEWAY] Command succeeded"),
            Err(e) => warn!(seq, "[GATEWAY] Command failed: {}", e),
        }

        submission.resolve(seq, outcome);
    }

    info!("[GATEWAY] Intake closed, worker stopping");
    device
}

async fn execute<D: Drone>(device: &mut D, command: Command) -> Outcome {
    match command {
        Command::TakeOff => device.take_off().await?,
        Command::Land => device.land().await?,
    }
    Ok(())
}
