//! A queued command paired with its private outcome slot

use flightdeck_shared::{Command, Outcome, UnrecognizedCommand};
use tokio::sync::oneshot;
use tracing::warn;

/// One caller's request, as seen by the worker
#[derive(Debug)]
pub struct Submission {
    /// The parsed command, or the tag that failed to parse
    pub request: Result<Command, UnrecognizedCommand>,
    reply: oneshot::Sender<Outcome>,
}

impl Submission {
    /// Create a submission and the receiver its outcome will arrive on
    pub fn new(request: Result<Command, UnrecognizedCommand>) -> (Self, oneshot::Receiver<Outcome>) {
        let (reply, rx) = oneshot::channel();
        (Self { request, reply }, rx)
    }

    /// Deliver the outcome. Consumes the submission so it can only happen once.
    ///
    /// `seq` is the worker's execution number, used only for the log line.
    pub fn resolve(self, seq: u64, outcome: Outcome) {
        if let Err(undelivered) = self.reply.send(outcome) {
            warn!(
                seq,
                "[GATEWAY] Caller went away before its outcome arrived: {:?}",
                undelivered
            );
        }
    }
}
