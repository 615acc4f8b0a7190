//! Meeting recording to structured minutes processing pipeline
//!
//! Provides a library for running the three stage workers that turn an
//! uploaded meeting recording into delivered minutes: transcription fans out
//! to up to three speech recognition tracks, report generation fuses the
//! transcripts and calls a language model, and export renders and mails the
//! result. Stages hand off through durable queues and track progress in a
//! keyed record store.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Configuration loading and validation
pub mod config;
/// Glossary term cache shared by report workers
pub mod glossary;
/// Records, glossary terms and queue message shapes
pub mod model;
/// Concrete queue, storage, speech and mail adapters
pub mod modules;
/// Retry entry point consumed by the HTTP layer
pub mod retry;
/// The worker loop shared by all stages
pub mod runtime;
/// The three pipeline stage implementations
pub mod stages;

use model::{GlossaryTerm, MeetingRecord, RecordKey, RecordUpdate, Status};

/// Join the configured blob prefix onto a key. An empty prefix leaves the
/// key untouched; the stored full key is what records carry.
pub fn prefixed_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}

/// A message handed out by the queue port. The receipt handle must be passed
/// back to [Queue::delete] to acknowledge the message; an unacknowledged
/// message becomes visible again once the queue's visibility timeout expires.
#[derive(Clone, Debug)]
pub struct ReceivedMessage {
    /// Raw message body
    pub body: String,
    /// Opaque acknowledgment token
    pub receipt_handle: String,
}

/// Queue port with at-least-once, visibility-timeout semantics.
#[async_trait]
pub trait Queue {
    /// Long-poll the queue for up to `max` messages, waiting up to `wait_secs`.
    async fn receive(
        &self,
        queue_url: &str,
        max: i32,
        wait_secs: i32,
    ) -> Result<Vec<ReceivedMessage>, Error>;

    /// Acknowledge a received message so it is not redelivered.
    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), Error>;

    /// Enqueue a message body.
    async fn send(&self, queue_url: &str, body: &str) -> Result<(), Error>;
}

/// Object storage port keyed by string.
#[async_trait]
pub trait BlobStore {
    /// Fetch the object stored at `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, Error>;

    /// Store `bytes` under `key` and return the full key, including any
    /// configured prefix. Callers persist the returned key, not the input.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, Error>;
}

/// Record store port over the meeting table, composite key
/// `(meetingId, createdAt)` with a secondary index on `(status, createdAt)`.
#[async_trait]
pub trait RecordStore {
    /// Fetch a record by its full composite key.
    async fn get(&self, key: &RecordKey) -> Result<Option<MeetingRecord>, Error>;

    /// Fetch the most recent record for a meeting id.
    async fn find_by_id(&self, meeting_id: &str) -> Result<Option<MeetingRecord>, Error>;

    /// Query the `(status, createdAt)` index for one record whose `s3Key`
    /// matches, limit 1. Used for duplicate detection of external
    /// notifications.
    async fn find_by_status(
        &self,
        status: Status,
        s3_key: &str,
    ) -> Result<Option<MeetingRecord>, Error>;

    /// Create or replace a record.
    async fn put(&self, record: &MeetingRecord) -> Result<(), Error>;

    /// Apply a partial update. When [RecordUpdate::expect_status] is set the
    /// write is conditional and a condition miss returns
    /// [Error::ConditionFailed].
    async fn update(&self, key: &RecordKey, update: RecordUpdate) -> Result<(), Error>;
}

/// Read-only port over the glossary term table.
#[async_trait]
pub trait GlossaryStore {
    /// Scan every glossary term, paginating internally.
    async fn scan_terms(&self) -> Result<Vec<GlossaryTerm>, Error>;
}

/// State of a managed transcription job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscribeJobState {
    /// Job accepted and still running
    InProgress,
    /// Job finished; output is at the key the job was started with
    Completed,
    /// Job failed with the given reason
    Failed(String),
}

/// Port over the managed batch transcription service.
#[async_trait]
pub trait TranscribeJobs {
    /// Start a transcription job writing its output to `output_key`.
    async fn start(&self, job_name: &str, media_uri: &str, output_key: &str)
        -> Result<(), Error>;

    /// Poll the state of a previously started job.
    async fn status(&self, job_name: &str) -> Result<TranscribeJobState, Error>;
}

/// Request body for the HTTP speech recognition services.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AsrRequest {
    /// Blob key of the media to transcribe
    pub s3_key: String,
    /// Bucket holding the media
    pub s3_bucket: String,
    /// Optional language hint, sent only when the service accepts one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Port over an HTTP speech recognition service exposing `POST /asr` and
/// `GET /health`. Whisper- and FunASR-shaped services share this contract.
#[async_trait]
pub trait AsrEndpoint {
    /// Probe `GET /health`. Implementations bound the probe at five seconds.
    async fn healthy(&self) -> bool;

    /// Submit media for transcription and return the service's JSON payload.
    /// Callers bound the overall request; implementations do not time out the
    /// submission themselves.
    async fn submit(&self, request: AsrRequest) -> Result<serde_json::Value, Error>;
}

/// Language model port, prompt in, text out.
#[async_trait]
pub trait LanguageModel {
    /// Run the prompt and return the raw completion text.
    async fn invoke(&self, prompt: &str, max_tokens: u32) -> Result<String, Error>;
}

/// An outbound HTML email.
#[derive(Clone, Debug, Default)]
pub struct EmailMessage {
    /// Sender address
    pub from: String,
    /// Primary recipients
    pub to: Vec<String>,
    /// Blind-copied recipients
    pub bcc: Vec<String>,
    /// Subject line, UTF-8; adapters MIME-encode before sending
    pub subject: String,
    /// HTML body
    pub html_body: String,
}

/// Email transport port.
#[async_trait]
pub trait Mailer {
    /// Send one HTML email.
    async fn send_html(&self, email: EmailMessage) -> Result<(), Error>;
}

/// The full set of external dependencies handed to the stage workers. Tracks
/// that are disabled by configuration carry `None` for their port.
#[derive(Clone)]
pub struct Ports {
    /// Queue port shared by every stage
    pub queue: Arc<dyn Queue + Send + Sync>,
    /// Object storage
    pub blobs: Arc<dyn BlobStore + Send + Sync>,
    /// Meeting record store
    pub records: Arc<dyn RecordStore + Send + Sync>,
    /// Glossary term store
    pub glossary: Arc<dyn GlossaryStore + Send + Sync>,
    /// Managed transcription service, when that track is enabled
    pub transcribe: Option<Arc<dyn TranscribeJobs + Send + Sync>>,
    /// Whisper HTTP service, when that track is enabled
    pub whisper: Option<Arc<dyn AsrEndpoint + Send + Sync>>,
    /// FunASR HTTP service, when that track is enabled
    pub funasr: Option<Arc<dyn AsrEndpoint + Send + Sync>>,
    /// Language model used by the report stage
    pub llm: Arc<dyn LanguageModel + Send + Sync>,
    /// Email transport used by the export stage
    pub mailer: Arc<dyn Mailer + Send + Sync>,
}

/// Enum to capture errors occurring through the pipeline.
///
/// Uses `thiserror` for ergonomic error handling with proper
/// `std::error::Error` implementation. Variants map onto the stage
/// controller's dispositions: validation failures discard the offending
/// message while everything else leaves it for redelivery.
#[derive(Debug, Error)]
pub enum Error {
    /// JSON encoding or decoding of a message, record or report failed
    #[error("Unable to serialize JSON object")]
    UnableToSerializeJsonObject(
        #[from]
        #[source]
        serde_json::Error,
    ),

    /// YAML parsing of a configuration document failed
    #[error("Unable to parse YAML document")]
    UnableToParseYamlDocument(
        #[from]
        #[source]
        serde_yaml::Error,
    ),

    /// Configuration rejected at startup
    #[error("Configuration validation failed: {0}")]
    ConfigFailedValidation(String),

    /// Queue receive, delete or send failed
    #[error("Queue error: {0}")]
    QueueError(String),

    /// Object storage get or put failed
    #[error("Blob store error: {0}")]
    BlobError(String),

    /// Record store operation failed
    #[error("Record store error: {0}")]
    RecordError(String),

    /// A conditional record update found the record in a different state
    #[error("Conditional update failed")]
    ConditionFailed,

    /// No record exists for the given meeting
    #[error("Meeting record not found: {0}")]
    RecordNotFound(String),

    /// A queue message failed validation and should be discarded
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A single transcription track failed
    #[error("Transcription error: {0}")]
    TranscriptionError(String),

    /// Every enabled transcription track came back empty
    #[error("All transcription tracks failed")]
    AllTracksFailed,

    /// No transcript source was available to build a report from
    #[error("All transcript sources failed")]
    AllSourcesFailed,

    /// Language model invocation failed
    #[error("Language model error: {0}")]
    LanguageModelError(String),

    /// The language model response did not satisfy the report schema
    #[error("Report validation failed: {0}")]
    ReportFailedValidation(String),

    /// The report schema itself failed to compile
    #[error("Invalid validation schema: {0}")]
    InvalidValidationSchema(String),

    /// Email send failed
    #[error("Email error: {0}")]
    EmailError(String),

    /// Failure of internal machinery not covered by another variant
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

impl Error {
    /// True for failures that condemn the message rather than the downstream:
    /// the stage controller discards these instead of leaving them for
    /// redelivery.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidMessage(_))
    }
}
