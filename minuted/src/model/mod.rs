//! Durable records and wire shapes shared by every stage.
//!
//! Field names serialize in camelCase to match the record table and the queue
//! message bodies. Timestamps are ISO-8601 instants with millisecond
//! precision carried as opaque strings: `createdAt` doubles as half of the
//! record's composite key, so it must round-trip byte for byte.
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod message;

/// Coarse lifecycle state of a meeting record.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Record created but not yet queued
    Created,
    /// Queued for transcription
    Pending,
    /// A worker holds the job
    Processing,
    /// Transcription finished
    Transcribed,
    /// Report generated
    Reported,
    /// Minutes delivered
    Completed,
    /// Terminal for this attempt; re-entered only through retry
    Failed,
}

impl Status {
    /// Stable lowercase name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Created => "created",
            Status::Pending => "pending",
            Status::Processing => "processing",
            Status::Transcribed => "transcribed",
            Status::Reported => "reported",
            Status::Completed => "completed",
            Status::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fine-grained progress label surfaced to the UI.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Speech recognition in flight
    Transcribing,
    /// Waiting on the report queue
    Reporting,
    /// Language model generating the report
    Generating,
    /// Waiting on the export queue
    Exporting,
    /// Email being rendered and sent
    Sending,
    /// Pipeline finished
    Done,
    /// Terminal for this attempt
    Failed,
}

impl Stage {
    /// Stable lowercase name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Transcribing => "transcribing",
            Stage::Reporting => "reporting",
            Stage::Generating => "generating",
            Stage::Exporting => "exporting",
            Stage::Sending => "sending",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of meeting, selecting the report shape and prompt.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MeetingType {
    /// Catch-all meeting
    #[default]
    General,
    /// Team weekly with KPI and project review sections
    Weekly,
    /// Technical discussion
    Tech,
    /// Customer-facing meeting
    Customer,
}

impl MeetingType {
    /// Stable lowercase name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingType::General => "general",
            MeetingType::Weekly => "weekly",
            MeetingType::Tech => "tech",
            MeetingType::Customer => "customer",
        }
    }

    /// Derive the meeting type from an uploaded filename. Externally
    /// notified uploads encode the type as a filename prefix.
    pub fn from_filename(filename: &str) -> MeetingType {
        if filename.starts_with("weekly__") {
            MeetingType::Weekly
        } else if filename.starts_with("tech__") {
            MeetingType::Tech
        } else {
            MeetingType::General
        }
    }
}

impl fmt::Display for MeetingType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Composite primary key of a meeting record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// Opaque stable meeting identifier
    pub meeting_id: String,
    /// Creation instant, immutable after creation
    pub created_at: String,
}

impl RecordKey {
    /// Build a key from its two halves.
    pub fn new(meeting_id: impl Into<String>, created_at: impl Into<String>) -> Self {
        RecordKey {
            meeting_id: meeting_id.into(),
            created_at: created_at.into(),
        }
    }
}

/// The durable record of a single job.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRecord {
    /// Primary key half, `meeting-<epoch-ms>` for externally notified uploads
    pub meeting_id: String,
    /// Sort key half, set exactly once
    pub created_at: String,
    /// Coarse lifecycle state
    pub status: Status,
    /// Fine-grained progress label
    pub stage: Stage,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Original upload filename
    #[serde(default)]
    pub filename: String,
    /// Kind of meeting
    #[serde(default)]
    pub meeting_type: MeetingType,
    /// Blob key of the original media
    #[serde(default)]
    pub s3_key: String,
    /// Blob key of the managed transcription track output, empty when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcribe_key: Option<String>,
    /// Blob key of the Whisper track output, empty when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whisper_key: Option<String>,
    /// Blob key of the FunASR track output, empty when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funasr_key: Option<String>,
    /// Blob key of the generated report JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_key: Option<String>,
    /// Blob key of the delivery artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_key: Option<String>,
    /// Validated recipient addresses; empty means "use the default"
    #[serde(default)]
    pub recipient_emails: Vec<String>,
    /// Human-readable last error, removed on retry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Instant of the last record mutation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Instant the minutes were delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<String>,
}

impl MeetingRecord {
    /// The composite key of this record.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.meeting_id.clone(), self.created_at.clone())
    }
}

/// Partial update applied to a meeting record. Unset fields are left alone;
/// `error_message` distinguishes "set" from "remove" with a nested option.
#[derive(Clone, Debug, Default)]
pub struct RecordUpdate {
    /// New lifecycle state
    pub status: Option<Status>,
    /// New progress label
    pub stage: Option<Stage>,
    /// Managed transcription track key
    pub transcribe_key: Option<String>,
    /// Whisper track key
    pub whisper_key: Option<String>,
    /// FunASR track key
    pub funasr_key: Option<String>,
    /// Report blob key
    pub report_key: Option<String>,
    /// Delivery artifact blob key
    pub pdf_key: Option<String>,
    /// `Some(Some(msg))` sets the error, `Some(None)` removes it
    pub error_message: Option<Option<String>>,
    /// Mutation instant; stages stamp this on every write
    pub updated_at: Option<String>,
    /// Delivery instant
    pub exported_at: Option<String>,
    /// When set, the write is conditional on the record currently holding
    /// this status
    pub expect_status: Option<Status>,
}

impl RecordUpdate {
    /// Apply this update to an owned record, honoring the condition. Shared
    /// by in-memory stores; the table-backed store expresses the same
    /// semantics as an update expression.
    pub fn apply(&self, record: &mut MeetingRecord) -> Result<(), crate::Error> {
        if let Some(expected) = self.expect_status {
            if record.status != expected {
                return Err(crate::Error::ConditionFailed);
            }
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(stage) = self.stage {
            record.stage = stage;
        }
        if let Some(ref key) = self.transcribe_key {
            record.transcribe_key = Some(key.clone());
        }
        if let Some(ref key) = self.whisper_key {
            record.whisper_key = Some(key.clone());
        }
        if let Some(ref key) = self.funasr_key {
            record.funasr_key = Some(key.clone());
        }
        if let Some(ref key) = self.report_key {
            record.report_key = Some(key.clone());
        }
        if let Some(ref key) = self.pdf_key {
            record.pdf_key = Some(key.clone());
        }
        if let Some(ref error_message) = self.error_message {
            record.error_message = error_message.clone();
        }
        if let Some(ref at) = self.updated_at {
            record.updated_at = Some(at.clone());
        }
        if let Some(ref at) = self.exported_at {
            record.exported_at = Some(at.clone());
        }
        Ok(())
    }
}

/// A glossary term injected into language model prompts to stabilize
/// domain spelling. Read-only from the pipeline.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryTerm {
    /// Primary key
    pub term_id: String,
    /// Canonical spelling
    pub term: String,
    /// Alternative spellings the model should map to the canonical one
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Short definition
    #[serde(default)]
    pub definition: String,
    /// Creation instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Current instant as an ISO-8601 string with millisecond precision, the
/// format every `createdAt` and `updatedAt` carries.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current instant as epoch milliseconds, used to synthesize meeting ids for
/// externally notified uploads.
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}
