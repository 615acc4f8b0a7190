//! The three speech recognition tracks.
//!
//! Tracks are a closed set: a managed batch job that is polled to
//! completion, and two HTTP services (Whisper- and FunASR-shaped) that take
//! the media coordinates and answer with transcript JSON. Every track
//! resolves to `Ok(Some(blob key))`, `Ok(None)` for a deliberate skip, or an
//! error the caller records as a track failure.
use std::fmt;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info};

use crate::{AsrEndpoint, AsrRequest, BlobStore, Error, TranscribeJobs, TranscribeJobState};

/// Interval between managed job polls.
const JOB_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Managed job poll attempts before giving up (30 minutes wall clock).
const JOB_POLL_ATTEMPTS: u32 = 180;

/// Hard bound on one HTTP transcription request. Dropping the request future
/// at the deadline cancels the in-flight call on every exit path.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Identity of a track, used in logs and to map outcomes onto record fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackKind {
    /// Managed batch transcription
    Transcribe,
    /// Whisper HTTP service
    Whisper,
    /// FunASR HTTP service, sole source of speaker-labelled segments
    FunAsr,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrackKind::Transcribe => write!(f, "transcribe"),
            TrackKind::Whisper => write!(f, "whisper"),
            TrackKind::FunAsr => write!(f, "funasr"),
        }
    }
}

/// One enabled speech recognition track, ready to run against a single job.
pub enum Track {
    /// Managed batch transcription job
    Managed {
        /// Job service port
        jobs: Arc<dyn TranscribeJobs + Send + Sync>,
        /// Bucket holding the media
        bucket: String,
        /// Blob prefix the job output lands under
        prefix: String,
    },
    /// Whisper HTTP service
    Whisper {
        /// Service port
        endpoint: Arc<dyn AsrEndpoint + Send + Sync>,
        /// Transcript destination
        blobs: Arc<dyn BlobStore + Send + Sync>,
        /// Bucket holding the media
        bucket: String,
    },
    /// FunASR HTTP service
    FunAsr {
        /// Service port
        endpoint: Arc<dyn AsrEndpoint + Send + Sync>,
        /// Transcript destination
        blobs: Arc<dyn BlobStore + Send + Sync>,
        /// Bucket holding the media
        bucket: String,
        /// Language hint forwarded to the service
        language: String,
    },
}

impl Track {
    /// The identity of this track.
    pub fn kind(&self) -> TrackKind {
        match self {
            Track::Managed { .. } => TrackKind::Transcribe,
            Track::Whisper { .. } => TrackKind::Whisper,
            Track::FunAsr { .. } => TrackKind::FunAsr,
        }
    }

    /// Run the track for one job. Returns the blob key of the stored
    /// transcript, or `None` when the track skipped itself.
    pub async fn run(self, meeting_id: String, s3_key: String) -> Result<Option<String>, Error> {
        match self {
            Track::Managed {
                jobs,
                bucket,
                prefix,
            } => run_managed(jobs, &bucket, &prefix, &meeting_id, &s3_key).await,
            Track::Whisper {
                endpoint,
                blobs,
                bucket,
            } => {
                run_http(
                    TrackKind::Whisper,
                    endpoint,
                    blobs,
                    AsrRequest {
                        s3_key,
                        s3_bucket: bucket,
                        language: None,
                    },
                    format!("transcripts/{meeting_id}/whisper.json"),
                )
                .await
            }
            Track::FunAsr {
                endpoint,
                blobs,
                bucket,
                language,
            } => {
                run_http(
                    TrackKind::FunAsr,
                    endpoint,
                    blobs,
                    AsrRequest {
                        s3_key,
                        s3_bucket: bucket,
                        language: Some(language),
                    },
                    format!("transcripts/{meeting_id}/funasr.json"),
                )
                .await
            }
        }
    }
}

async fn run_managed(
    jobs: Arc<dyn TranscribeJobs + Send + Sync>,
    bucket: &str,
    prefix: &str,
    meeting_id: &str,
    s3_key: &str,
) -> Result<Option<String>, Error> {
    let job_name = format!("{meeting_id}-transcribe");
    let media_uri = format!("s3://{bucket}/{s3_key}");
    let output_key = crate::prefixed_key(prefix, &format!("transcripts/{meeting_id}/transcribe.json"));

    jobs.start(&job_name, &media_uri, &output_key).await?;
    debug!(job = job_name, "transcription job started");

    for _ in 0..JOB_POLL_ATTEMPTS {
        match jobs.status(&job_name).await? {
            TranscribeJobState::Completed => return Ok(Some(output_key)),
            TranscribeJobState::Failed(reason) => {
                return Err(Error::TranscriptionError(format!(
                    "transcription job {job_name} failed: {reason}"
                )));
            }
            TranscribeJobState::InProgress => sleep(JOB_POLL_INTERVAL).await,
        }
    }

    Err(Error::TranscriptionError(format!(
        "transcription job {job_name} did not finish within 30 minutes"
    )))
}

async fn run_http(
    kind: TrackKind,
    endpoint: Arc<dyn AsrEndpoint + Send + Sync>,
    blobs: Arc<dyn BlobStore + Send + Sync>,
    request: AsrRequest,
    output_key: String,
) -> Result<Option<String>, Error> {
    if !endpoint.healthy().await {
        info!(track = %kind, "service unavailable, skipping track");
        return Ok(None);
    }

    let payload = timeout(SUBMIT_TIMEOUT, endpoint.submit(request))
        .await
        .map_err(|_| {
            Error::TranscriptionError(format!("{kind} request cancelled after 30 minutes"))
        })??;

    let bytes = serde_json::to_vec(&payload)?;
    let stored = blobs.put(&output_key, bytes, "application/json").await?;
    Ok(Some(stored))
}
