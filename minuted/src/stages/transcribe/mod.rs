//! Transcription stage.
//!
//! Consumes new-job messages, deduplicates externally notified uploads, fans
//! out to the enabled speech recognition tracks in parallel and hands the
//! finished job to the report queue. A track failure is non-fatal as long as
//! at least one track produced a transcript.
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::model::message::{parse_inbound_job, InboundJob, NewJob, TranscribeDone};
use crate::model::{
    now_timestamp, MeetingRecord, MeetingType, RecordKey, RecordUpdate, Stage, Status,
};
use crate::runtime::{Disposition, StageWorker};
use crate::{Error, Ports};

mod tracks;
pub use tracks::{Track, TrackKind};

/// Record statuses a duplicate upload may be sitting in. An external
/// notification whose object key already appears under one of these is
/// redelivery noise, not a new job.
const DEDUP_STATUSES: [Status; 4] = [
    Status::Pending,
    Status::Processing,
    Status::Reported,
    Status::Completed,
];

/// Per-track results of one fan-out, keyed by track identity.
#[derive(Default)]
struct TrackOutcomes {
    transcribe: Option<String>,
    whisper: Option<String>,
    funasr: Option<String>,
}

impl TrackOutcomes {
    fn set(&mut self, kind: TrackKind, stored: Option<String>) {
        match kind {
            TrackKind::Transcribe => self.transcribe = stored,
            TrackKind::Whisper => self.whisper = stored,
            TrackKind::FunAsr => self.funasr = stored,
        }
    }

    fn is_empty(&self) -> bool {
        self.transcribe.is_none() && self.whisper.is_none() && self.funasr.is_none()
    }
}

/// The transcription stage worker.
pub struct TranscriptionStage {
    ports: Ports,
    config: Arc<Config>,
}

impl TranscriptionStage {
    /// Build the stage from its dependencies.
    pub fn new(ports: Ports, config: Arc<Config>) -> Self {
        TranscriptionStage { ports, config }
    }

    /// The tracks enabled by configuration, instantiated for one run.
    fn enabled_tracks(&self) -> Vec<Track> {
        let bucket = self.config.storage.bucket.clone();
        let mut enabled = Vec::new();

        if self.config.tracks.enable_transcribe {
            if let Some(jobs) = &self.ports.transcribe {
                enabled.push(Track::Managed {
                    jobs: Arc::clone(jobs),
                    bucket: bucket.clone(),
                    prefix: self.config.storage.prefix.clone(),
                });
            }
        }
        if self.config.tracks.enable_whisper {
            if let Some(endpoint) = &self.ports.whisper {
                enabled.push(Track::Whisper {
                    endpoint: Arc::clone(endpoint),
                    blobs: Arc::clone(&self.ports.blobs),
                    bucket: bucket.clone(),
                });
            }
        }
        if self.config.tracks.funasr_enabled() {
            if let Some(endpoint) = &self.ports.funasr {
                enabled.push(Track::FunAsr {
                    endpoint: Arc::clone(endpoint),
                    blobs: Arc::clone(&self.ports.blobs),
                    bucket,
                    language: self.config.tracks.funasr_language.clone(),
                });
            }
        }

        enabled
    }

    /// Check the `(status, createdAt)` index for a record already covering
    /// this object key.
    async fn is_duplicate(&self, s3_key: &str) -> Result<bool, Error> {
        for status in DEDUP_STATUSES {
            if self
                .ports
                .records
                .find_by_status(status, s3_key)
                .await?
                .is_some()
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Resolve the creation instant for an internal job: from the message
    /// when present, otherwise from the most recent record for the meeting.
    async fn resolve_created_at(&self, job: &NewJob) -> Result<String, Error> {
        if let Some(at) = &job.created_at {
            return Ok(at.clone());
        }
        match self.ports.records.find_by_id(&job.meeting_id).await? {
            Some(record) => Ok(record.created_at),
            None => Err(Error::RecordNotFound(job.meeting_id.clone())),
        }
    }

    /// Run every enabled track in parallel and collect per-track outcomes.
    /// Tracks are spawned before any is awaited so a failing track cannot
    /// cancel or mask its siblings.
    async fn fan_out(&self, key: &RecordKey, s3_key: &str) -> Result<TrackOutcomes, Error> {
        let enabled = self.enabled_tracks();
        if enabled.is_empty() {
            return Err(Error::ConfigFailedValidation(
                "no transcription track is enabled".into(),
            ));
        }

        let mut handles = JoinSet::new();
        for track in enabled {
            let kind = track.kind();
            let meeting_id = key.meeting_id.clone();
            let media_key = s3_key.to_string();
            let _ = handles.spawn(async move { (kind, track.run(meeting_id, media_key).await) });
        }

        let mut outcomes = TrackOutcomes::default();
        while let Some(joined) = handles.join_next().await {
            match joined {
                Ok((kind, Ok(Some(stored)))) => {
                    debug!(track = %kind, key = stored, "track finished");
                    outcomes.set(kind, Some(stored));
                }
                Ok((kind, Ok(None))) => {
                    debug!(track = %kind, "track skipped");
                }
                Ok((kind, Err(e))) => {
                    warn!(
                        track = %kind,
                        meeting_id = key.meeting_id,
                        error = format!("{}", e),
                        "track failed"
                    );
                }
                Err(e) => {
                    warn!(error = format!("{}", e), "track task aborted");
                }
            }
        }

        if outcomes.is_empty() {
            return Err(Error::AllTracksFailed);
        }
        Ok(outcomes)
    }

    /// Resolve the meeting type: a non-general message value wins, then the
    /// record, then general.
    async fn resolve_meeting_type(
        &self,
        key: &RecordKey,
        from_message: Option<MeetingType>,
    ) -> Result<MeetingType, Error> {
        if let Some(meeting_type) = from_message {
            if meeting_type != MeetingType::General {
                return Ok(meeting_type);
            }
        }
        Ok(self
            .ports
            .records
            .get(key)
            .await?
            .map(|record| record.meeting_type)
            .unwrap_or_default())
    }

    /// The body of the stage once a job and its record key are pinned down.
    async fn transcribe(&self, key: &RecordKey, job: &NewJob) -> Result<(), Error> {
        self.ports
            .records
            .update(
                key,
                RecordUpdate {
                    status: Some(Status::Processing),
                    stage: Some(Stage::Transcribing),
                    updated_at: Some(now_timestamp()),
                    ..Default::default()
                },
            )
            .await?;

        let outcomes = self.fan_out(key, &job.s3_key).await?;

        // Record first, enqueue second: a redelivered message must observe
        // the advanced record.
        self.ports
            .records
            .update(
                key,
                RecordUpdate {
                    status: Some(Status::Transcribed),
                    stage: Some(Stage::Reporting),
                    transcribe_key: Some(outcomes.transcribe.clone().unwrap_or_default()),
                    whisper_key: Some(outcomes.whisper.clone().unwrap_or_default()),
                    funasr_key: Some(outcomes.funasr.clone().unwrap_or_default()),
                    updated_at: Some(now_timestamp()),
                    ..Default::default()
                },
            )
            .await?;

        let meeting_type = self.resolve_meeting_type(key, job.meeting_type).await?;

        let done = TranscribeDone {
            meeting_id: key.meeting_id.clone(),
            created_at: key.created_at.clone(),
            transcribe_key: outcomes.transcribe,
            whisper_key: outcomes.whisper,
            funasr_key: outcomes.funasr,
            meeting_type: Some(meeting_type),
        };
        self.ports
            .queue
            .send(&self.config.queues.report, &serde_json::to_string(&done)?)
            .await?;

        info!(
            meeting_id = key.meeting_id,
            meeting_type = %meeting_type,
            "transcription complete"
        );
        Ok(())
    }

    /// Best-effort failure write for externally notified jobs, whose record
    /// key exists only in this scope and cannot be recovered from the
    /// message body by the worker loop.
    async fn mark_failed(&self, key: &RecordKey, cause: &Error) {
        let update = RecordUpdate {
            status: Some(Status::Failed),
            stage: Some(Stage::Failed),
            error_message: Some(Some(format!("{}", cause))),
            updated_at: Some(now_timestamp()),
            ..Default::default()
        };
        if let Err(secondary) = self.ports.records.update(key, update).await {
            warn!(
                meeting_id = key.meeting_id,
                error = format!("{}", secondary),
                "failed to record failure state"
            );
        }
    }
}

#[async_trait::async_trait]
impl StageWorker for TranscriptionStage {
    fn name(&self) -> &'static str {
        "transcription"
    }

    fn queue_url(&self) -> &str {
        &self.config.queues.transcription
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    async fn process(&self, body: &str) -> Result<Disposition, Error> {
        let (job, external) = match parse_inbound_job(body)? {
            InboundJob::TestEvent => {
                return Ok(Disposition::discard("bucket test event"));
            }
            InboundJob::External { s3_key } => {
                if s3_key.is_empty() || s3_key.ends_with(".keep") {
                    return Ok(Disposition::discard(format!(
                        "nothing to transcribe for '{s3_key}'"
                    )));
                }
                if self.is_duplicate(&s3_key).await? {
                    return Ok(Disposition::discard(format!(
                        "duplicate notification for {s3_key}"
                    )));
                }
                (NewJob::from_external_key(&s3_key), true)
            }
            InboundJob::Internal(job) => {
                if job.s3_key.is_empty() || job.s3_key.ends_with(".keep") {
                    return Ok(Disposition::discard(format!(
                        "nothing to transcribe for '{}'",
                        job.s3_key
                    )));
                }
                (job, false)
            }
        };

        // The creation instant is pinned here, once, and every later write
        // and outbound message carries this value.
        let key = if external {
            let created_at = job
                .created_at
                .clone()
                .unwrap_or_else(now_timestamp);
            let record = MeetingRecord {
                meeting_id: job.meeting_id.clone(),
                created_at: created_at.clone(),
                status: Status::Pending,
                stage: Stage::Transcribing,
                title: job.filename.clone(),
                filename: job.filename.clone(),
                meeting_type: job.meeting_type.unwrap_or_default(),
                s3_key: job.s3_key.clone(),
                transcribe_key: None,
                whisper_key: None,
                funasr_key: None,
                report_key: None,
                pdf_key: None,
                recipient_emails: vec![],
                error_message: None,
                updated_at: Some(created_at.clone()),
                exported_at: None,
            };
            self.ports.records.put(&record).await?;
            info!(
                meeting_id = record.meeting_id,
                s3_key = record.s3_key,
                "record created for external upload"
            );
            RecordKey::new(job.meeting_id.clone(), created_at)
        } else {
            let created_at = self.resolve_created_at(&job).await?;
            RecordKey::new(job.meeting_id.clone(), created_at)
        };

        match self.transcribe(&key, &job).await {
            Ok(()) => Ok(Disposition::Complete),
            Err(e) => {
                if external {
                    self.mark_failed(&key, &e).await;
                }
                Err(e)
            }
        }
    }
}
