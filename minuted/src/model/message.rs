//! The three queue message shapes, one per stage boundary.
//!
//! The transcription queue additionally accepts raw bucket notification
//! envelopes delivered by the object store itself; those synthesize a meeting
//! id and type before entering the pipeline.
use serde::{Deserialize, Serialize};

use super::{epoch_millis, now_timestamp, MeetingType};

/// Message consumed by the transcription stage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    /// Meeting identifier
    pub meeting_id: String,
    /// Blob key of the uploaded media
    pub s3_key: String,
    /// Original filename
    #[serde(default)]
    pub filename: String,
    /// Meeting type as declared by the sender, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_type: Option<MeetingType>,
    /// Creation instant of the record this job belongs to. Present on
    /// retries and on uploads that created the record first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl NewJob {
    /// Synthesize a job from an external bucket notification. The meeting id
    /// and creation instant are fixed here, before any record write, so that
    /// every downstream reference agrees on them.
    pub fn from_external_key(s3_key: &str) -> NewJob {
        let filename = s3_key.rsplit('/').next().unwrap_or(s3_key).to_string();
        NewJob {
            meeting_id: format!("meeting-{}", epoch_millis()),
            s3_key: s3_key.to_string(),
            meeting_type: Some(MeetingType::from_filename(&filename)),
            filename,
            created_at: Some(now_timestamp()),
        }
    }
}

/// Message enqueued by the transcription stage for the report stage. Track
/// keys are null when the track was disabled or failed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeDone {
    /// Meeting identifier
    pub meeting_id: String,
    /// Creation instant propagated from the record
    pub created_at: String,
    /// Managed transcription track output key
    pub transcribe_key: Option<String>,
    /// Whisper track output key
    pub whisper_key: Option<String>,
    /// FunASR track output key
    pub funasr_key: Option<String>,
    /// Meeting type resolved by the transcription stage
    #[serde(default)]
    pub meeting_type: Option<MeetingType>,
}

/// Message enqueued by the report stage for the export stage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportDone {
    /// Meeting identifier
    pub meeting_id: String,
    /// Creation instant propagated from the record
    pub created_at: String,
    /// Blob key of the generated report JSON
    pub report_key: String,
    /// Display name used in the email subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_name: Option<String>,
}

/// A transcription queue message after shape detection.
#[derive(Debug, PartialEq)]
pub enum InboundJob {
    /// Internal message shape produced by the upload surface or retry
    Internal(NewJob),
    /// Bucket notification envelope; carries only the object key
    External {
        /// Object key of the uploaded media
        s3_key: String,
    },
    /// Bucket-configuration test event, carries no object
    TestEvent,
}

/// Classify a raw transcription queue body. Internal messages parse as
/// [NewJob]; anything with a `Records` array is treated as a bucket
/// notification; the store's `s3:TestEvent` ping is recognized so it can be
/// discarded without noise.
pub fn parse_inbound_job(body: &str) -> Result<InboundJob, crate::Error> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| crate::Error::InvalidMessage(format!("not valid JSON: {e}")))?;

    if value.get("Event").and_then(|v| v.as_str()) == Some("s3:TestEvent") {
        return Ok(InboundJob::TestEvent);
    }

    if let Some(records) = value.get("Records").and_then(|v| v.as_array()) {
        let key = records
            .first()
            .and_then(|r| r.pointer("/s3/object/key"))
            .and_then(|k| k.as_str())
            .ok_or_else(|| {
                crate::Error::InvalidMessage("notification without an object key".into())
            })?;
        return Ok(InboundJob::External {
            s3_key: key.to_string(),
        });
    }

    let job: NewJob = serde_json::from_value(value)
        .map_err(|e| crate::Error::InvalidMessage(format!("malformed job message: {e}")))?;
    Ok(InboundJob::Internal(job))
}
