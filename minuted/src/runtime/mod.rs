//! The worker loop shared by the three stages.
//!
//! Each stage implements [StageWorker]; the [Worker] owns the polling loop,
//! per-message failure isolation and the shutdown handshake. A message is
//! deleted from the queue only after its stage reports success or condemns it
//! as invalid; any other failure leaves the message for the queue's
//! visibility timeout to redeliver.
use async_trait::async_trait;
use flume::{Receiver, Sender};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::model::{now_timestamp, RecordKey, RecordUpdate, Stage, Status};
use crate::{Error, Ports, ReceivedMessage};

/// Messages fetched per poll.
const POLL_BATCH: i32 = 1;

/// Long-poll wait per receive call.
const POLL_WAIT_SECS: i32 = 20;

/// Pause between empty polls.
const IDLE_SLEEP: Duration = Duration::from_secs(5);

/// Outcome of processing one message. Both variants acknowledge the message;
/// failures are reported through `Err` instead.
#[derive(Debug)]
pub enum Disposition {
    /// The stage did its work and advanced the job
    Complete,
    /// The message is invalid or redundant and must not be retried
    Discard {
        /// Reason logged alongside the acknowledgment
        reason: String,
    },
}

impl Disposition {
    /// Shorthand for a discard disposition.
    pub fn discard(reason: impl Into<String>) -> Disposition {
        Disposition::Discard {
            reason: reason.into(),
        }
    }
}

/// One pipeline stage as seen by the worker loop.
#[async_trait]
pub trait StageWorker: Send + Sync {
    /// Stage name used in logs.
    fn name(&self) -> &'static str;

    /// URL of the queue this stage consumes.
    fn queue_url(&self) -> &str;

    /// External dependencies, shared with the loop for acknowledgment and
    /// failure bookkeeping.
    fn ports(&self) -> &Ports;

    /// Process a single raw message body.
    async fn process(&self, body: &str) -> Result<Disposition, Error>;
}

/// Create the kill-switch pair used for cooperative shutdown. The sender side
/// is wired to process signals by the binary; the receiver side is handed to
/// each [Worker].
/// ```
/// use minuted::runtime::shutdown_channel;
///
/// let (shutdown, signal) = shutdown_channel();
/// shutdown.send(()).unwrap();
/// # tokio_test::block_on(async {
/// signal.recv_async().await.unwrap();
/// # });
/// ```
pub fn shutdown_channel() -> (Sender<()>, Receiver<()>) {
    flume::bounded(1)
}

/// Long-lived polling loop around one [StageWorker].
pub struct Worker<S> {
    stage: S,
    shutdown: Receiver<()>,
}

impl<S: StageWorker> Worker<S> {
    /// Wrap a stage with a shutdown receiver from [shutdown_channel].
    pub fn new(stage: S, shutdown: Receiver<()>) -> Self {
        Worker { stage, shutdown }
    }

    /// Run until the kill switch fires. A failure in one message never
    /// aborts the batch or the loop.
    pub async fn run(&self) -> Result<(), Error> {
        info!(
            stage = self.stage.name(),
            queue = self.stage.queue_url(),
            "worker started"
        );

        loop {
            if self.shutdown.try_recv().is_ok() {
                break;
            }

            let received = tokio::select! {
                r = self.stage.ports().queue.receive(
                    self.stage.queue_url(),
                    POLL_BATCH,
                    POLL_WAIT_SECS,
                ) => r,
                _ = self.shutdown.recv_async() => break,
            };

            let messages = match received {
                Ok(messages) => messages,
                Err(e) => {
                    error!(
                        stage = self.stage.name(),
                        error = format!("{}", e),
                        "queue receive failed"
                    );
                    if self.idle().await {
                        break;
                    }
                    continue;
                }
            };

            if messages.is_empty() {
                if self.idle().await {
                    break;
                }
                continue;
            }

            for message in &messages {
                self.handle(message).await;
            }
        }

        info!(stage = self.stage.name(), "worker stopped");
        Ok(())
    }

    /// Process one message inside its own failure scope.
    async fn handle(&self, message: &ReceivedMessage) {
        match self.stage.process(&message.body).await {
            Ok(Disposition::Complete) => {
                debug!(stage = self.stage.name(), "message processed");
                self.acknowledge(message).await;
            }
            Ok(Disposition::Discard { reason }) => {
                debug!(stage = self.stage.name(), reason = reason, "message discarded");
                self.acknowledge(message).await;
            }
            Err(e) if e.is_validation() => {
                warn!(
                    stage = self.stage.name(),
                    error = format!("{}", e),
                    "invalid message discarded"
                );
                self.acknowledge(message).await;
            }
            Err(e) => {
                error!(
                    stage = self.stage.name(),
                    error = format!("{}", e),
                    "message processing failed"
                );
                // Leave the message for redelivery; record the failure on the
                // job so the UI can surface it.
                self.mark_failed(&message.body, &e).await;
            }
        }
    }

    async fn acknowledge(&self, message: &ReceivedMessage) {
        if let Err(e) = self
            .stage
            .ports()
            .queue
            .delete(self.stage.queue_url(), &message.receipt_handle)
            .await
        {
            warn!(
                stage = self.stage.name(),
                error = format!("{}", e),
                "failed to acknowledge message"
            );
        }
    }

    /// Best-effort write of the failure onto the record. A secondary failure
    /// here is logged and swallowed; the loop must keep running.
    async fn mark_failed(&self, body: &str, cause: &Error) {
        let Some(key) = self.locate(body).await else {
            warn!(
                stage = self.stage.name(),
                "failure not recorded: message does not identify a record"
            );
            return;
        };

        let update = RecordUpdate {
            status: Some(Status::Failed),
            stage: Some(Stage::Failed),
            error_message: Some(Some(format!("{}", cause))),
            updated_at: Some(now_timestamp()),
            ..Default::default()
        };

        if let Err(secondary) = self.stage.ports().records.update(&key, update).await {
            warn!(
                stage = self.stage.name(),
                meeting_id = key.meeting_id,
                error = format!("{}", secondary),
                "failed to record failure state"
            );
        }
    }

    /// Resolve the record a message refers to. Bodies carry `meetingId` and
    /// usually `createdAt`; when the instant is missing the most recent
    /// record for the meeting is used.
    async fn locate(&self, body: &str) -> Option<RecordKey> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        let meeting_id = value.get("meetingId")?.as_str()?.to_string();

        if let Some(created_at) = value.get("createdAt").and_then(|v| v.as_str()) {
            return Some(RecordKey::new(meeting_id, created_at));
        }

        match self.stage.ports().records.find_by_id(&meeting_id).await {
            Ok(Some(record)) => Some(record.key()),
            Ok(None) => None,
            Err(e) => {
                warn!(
                    meeting_id = meeting_id,
                    error = format!("{}", e),
                    "record lookup failed while recording failure"
                );
                None
            }
        }
    }

    /// Sleep between empty polls, waking early on shutdown. Returns true
    /// when shutdown was requested.
    async fn idle(&self) -> bool {
        tokio::select! {
            _ = sleep(IDLE_SLEEP) => false,
            _ = self.shutdown.recv_async() => true,
        }
    }
}
