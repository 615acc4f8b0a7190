//! Retry entry point exposed to the HTTP layer.
//!
//! A failed job re-enters the pipeline from the top: the record flips back to
//! `processing/transcribing` under a conditional write, then a fresh new-job
//! message is enqueued reproducing the original upload coordinates.
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::model::message::NewJob;
use crate::model::{now_timestamp, RecordUpdate, Stage, Status};
use crate::{Error as PipelineError, Ports};

/// Outcome of a rejected or failed retry, one variant per HTTP status the
/// caller maps onto.
#[derive(Debug, Error)]
pub enum RetryError {
    /// No record exists for the meeting (maps to 404)
    #[error("Meeting record not found: {0}")]
    NotFound(String),

    /// The record is not in a failed state (maps to 400)
    #[error("Meeting is not in a failed state: {0}")]
    NotFailed(Status),

    /// Another retry won the conditional update (maps to 409)
    #[error("Concurrent retry in progress")]
    Conflict,

    /// The record flipped but the job could not be enqueued (maps to 500)
    #[error("Failed to enqueue retry job")]
    Enqueue(#[source] PipelineError),

    /// Record store failure before any side effect (maps to 500)
    #[error(transparent)]
    Store(#[from] PipelineError),
}

/// Re-enqueue a failed meeting. Preconditions: the record exists and is in
/// `failed` status. The record is flipped before the enqueue so a concurrent
/// retry loses the conditional write instead of double-enqueuing; if the
/// enqueue itself fails the flip is reverted best-effort.
pub async fn retry_meeting(
    ports: &Ports,
    config: &Config,
    meeting_id: &str,
) -> Result<(), RetryError> {
    let record = ports
        .records
        .find_by_id(meeting_id)
        .await?
        .ok_or_else(|| RetryError::NotFound(meeting_id.to_string()))?;

    if record.status != Status::Failed {
        return Err(RetryError::NotFailed(record.status));
    }

    let key = record.key();
    let flip = RecordUpdate {
        status: Some(Status::Processing),
        stage: Some(Stage::Transcribing),
        error_message: Some(None),
        updated_at: Some(now_timestamp()),
        expect_status: Some(Status::Failed),
        ..Default::default()
    };
    match ports.records.update(&key, flip).await {
        Ok(()) => {}
        Err(PipelineError::ConditionFailed) => return Err(RetryError::Conflict),
        Err(e) => return Err(RetryError::Store(e)),
    }

    let job = NewJob {
        meeting_id: record.meeting_id.clone(),
        s3_key: record.s3_key.clone(),
        filename: record.filename.clone(),
        meeting_type: Some(record.meeting_type),
        created_at: Some(record.created_at.clone()),
    };
    let body = serde_json::to_string(&job).map_err(|e| RetryError::Store(e.into()))?;

    if let Err(e) = ports.queue.send(&config.queues.transcription, &body).await {
        let revert = RecordUpdate {
            status: Some(Status::Failed),
            stage: Some(Stage::Failed),
            error_message: Some(Some(format!("SQS 入队失败: {e}"))),
            updated_at: Some(now_timestamp()),
            ..Default::default()
        };
        if let Err(secondary) = ports.records.update(&key, revert).await {
            warn!(
                meeting_id = meeting_id,
                error = format!("{}", secondary),
                "failed to revert record after enqueue failure"
            );
        }
        return Err(RetryError::Enqueue(e));
    }

    info!(meeting_id = meeting_id, "retry enqueued");
    Ok(())
}
