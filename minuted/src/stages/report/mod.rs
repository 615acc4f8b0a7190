//! Report generation stage.
//!
//! Consumes transcription-complete messages, fuses the per-track transcripts
//! into one labelled document, asks the language model for a structured
//! report and hands the job to the export queue.
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::glossary::GlossaryCache;
use crate::model::message::{ReportDone, TranscribeDone};
use crate::model::{now_timestamp, MeetingType, RecordKey, RecordUpdate, Stage, Status};
use crate::runtime::{Disposition, StageWorker};
use crate::{BlobStore, Error, Ports};

pub mod prompt;
pub mod schema;
pub mod transcript;

/// The report stage worker.
pub struct ReportStage {
    ports: Ports,
    config: Arc<Config>,
    glossary: GlossaryCache,
}

impl ReportStage {
    /// Build the stage from its dependencies.
    pub fn new(ports: Ports, config: Arc<Config>) -> Self {
        ReportStage {
            ports,
            config,
            glossary: GlossaryCache::new(),
        }
    }

    /// Launch a transcript fetch as its own task. Fetches are started before
    /// any is awaited so one side failing cannot abort the other: partial
    /// success keeps the surviving transcript.
    fn spawn_fetch(&self, key: &Option<String>) -> Option<JoinHandle<Result<Vec<u8>, Error>>> {
        let key = key.as_ref().filter(|k| !k.is_empty())?.clone();
        let blobs: Arc<dyn BlobStore + Send + Sync> = Arc::clone(&self.ports.blobs);
        Some(tokio::spawn(async move { blobs.get(&key).await }))
    }

    /// Await a spawned fetch, flattening every failure to `None`.
    async fn settle_fetch(
        &self,
        handle: Option<JoinHandle<Result<Vec<u8>, Error>>>,
        source: &str,
    ) -> Option<Vec<u8>> {
        match handle?.await {
            Ok(Ok(raw)) => Some(raw),
            Ok(Err(e)) => {
                warn!(source = source, error = format!("{}", e), "transcript fetch failed");
                None
            }
            Err(e) => {
                warn!(source = source, error = format!("{}", e), "transcript fetch aborted");
                None
            }
        }
    }

    /// Fuse the available transcripts into the document handed to the model.
    async fn assemble(&self, done: &TranscribeDone) -> Result<String, Error> {
        let aws_fetch = self.spawn_fetch(&done.transcribe_key);
        let whisper_fetch = self.spawn_fetch(&done.whisper_key);

        let (aws_raw, whisper_raw) = futures::future::join(
            self.settle_fetch(aws_fetch, "transcribe"),
            self.settle_fetch(whisper_fetch, "whisper"),
        )
        .await;
        let aws_text = aws_raw.map(|raw| transcript::extract_plain_text(&raw));
        let whisper_text = whisper_raw.map(|raw| transcript::extract_plain_text(&raw));

        let mut parts = Vec::new();
        if let Some(machine) = transcript::compose_machine_part(aws_text, whisper_text) {
            parts.push(machine);
        }

        if let Some(key) = done.funasr_key.as_ref().filter(|k| !k.is_empty()) {
            match self.ports.blobs.get(key).await {
                Ok(raw) => {
                    if let Some(rendered) = transcript::render_speaker_lines(&raw) {
                        parts.push(transcript::compose_speaker_part(&rendered));
                    }
                }
                Err(e) => {
                    warn!(
                        source = "funasr",
                        error = format!("{}", e),
                        "transcript fetch failed"
                    );
                }
            }
        }

        if parts.is_empty() {
            return Err(Error::AllSourcesFailed);
        }

        Ok(transcript::truncate_transcript(&parts.join("\n\n")))
    }
}

#[async_trait::async_trait]
impl StageWorker for ReportStage {
    fn name(&self) -> &'static str {
        "report"
    }

    fn queue_url(&self) -> &str {
        &self.config.queues.report
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    async fn process(&self, body: &str) -> Result<Disposition, Error> {
        let done: TranscribeDone = serde_json::from_str(body)
            .map_err(|e| Error::InvalidMessage(format!("malformed message: {e}")))?;
        let key = RecordKey::new(done.meeting_id.clone(), done.created_at.clone());

        self.ports
            .records
            .update(
                &key,
                RecordUpdate {
                    stage: Some(Stage::Generating),
                    updated_at: Some(now_timestamp()),
                    ..Default::default()
                },
            )
            .await?;

        let record = self
            .ports
            .records
            .get(&key)
            .await?
            .ok_or_else(|| Error::RecordNotFound(done.meeting_id.clone()))?;

        let meeting_type = match done.meeting_type {
            Some(meeting_type) if meeting_type != MeetingType::General => meeting_type,
            _ => record.meeting_type,
        };

        let transcript = self.assemble(&done).await?;
        let terms = self.glossary.terms(&self.ports.glossary).await?;
        let prompt = prompt::build(meeting_type, &transcript, &terms);

        let completion = self
            .ports
            .llm
            .invoke(&prompt, self.config.report.max_output_tokens)
            .await?;
        let report = schema::extract_report(&completion)?;
        schema::validate_report(meeting_type, &report)?;

        let report_key = self
            .ports
            .blobs
            .put(
                &format!("reports/{}/report.json", key.meeting_id),
                serde_json::to_vec(&report)?,
                "application/json",
            )
            .await?;

        // Record first, enqueue second: a redelivered message must observe
        // the advanced record.
        self.ports
            .records
            .update(
                &key,
                RecordUpdate {
                    status: Some(Status::Reported),
                    stage: Some(Stage::Exporting),
                    report_key: Some(report_key.clone()),
                    updated_at: Some(now_timestamp()),
                    ..Default::default()
                },
            )
            .await?;

        let next = ReportDone {
            meeting_id: key.meeting_id.clone(),
            created_at: key.created_at.clone(),
            report_key,
            meeting_name: Some(record.title).filter(|t| !t.is_empty()),
        };
        self.ports
            .queue
            .send(&self.config.queues.export, &serde_json::to_string(&next)?)
            .await?;

        info!(
            meeting_id = key.meeting_id,
            meeting_type = %meeting_type,
            "report generated"
        );
        Ok(Disposition::Complete)
    }
}
