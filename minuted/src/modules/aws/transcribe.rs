//! Managed transcription job adapter.
//!
//! Required IAM permissions:
//!   - transcribe:StartTranscriptionJob
//!   - transcribe:GetTranscriptionJob
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_transcribe::error::DisplayErrorContext;
use aws_sdk_transcribe::types::{LanguageCode, Media, TranscriptionJobStatus};
use aws_sdk_transcribe::Client;

use crate::{Error, TranscribeJobState, TranscribeJobs};

/// Transcribe-backed [TranscribeJobs]. Job output is written back into the
/// pipeline's own bucket so the blob key returned by the track resolves.
pub struct TranscribeJobClient {
    client: Client,
    output_bucket: String,
    language_code: String,
    vocabulary: Option<String>,
}

impl TranscribeJobClient {
    /// Build the adapter for one output bucket.
    pub fn new(
        conf: &SdkConfig,
        output_bucket: &str,
        language_code: &str,
        vocabulary: Option<String>,
    ) -> Self {
        TranscribeJobClient {
            client: Client::new(conf),
            output_bucket: output_bucket.to_string(),
            language_code: language_code.to_string(),
            vocabulary,
        }
    }
}

#[async_trait]
impl TranscribeJobs for TranscribeJobClient {
    async fn start(
        &self,
        job_name: &str,
        media_uri: &str,
        output_key: &str,
    ) -> Result<(), Error> {
        let mut request = self
            .client
            .start_transcription_job()
            .transcription_job_name(job_name)
            .media(Media::builder().media_file_uri(media_uri).build())
            .language_code(LanguageCode::from(self.language_code.as_str()))
            .output_bucket_name(&self.output_bucket)
            .output_key(output_key);

        if let Some(vocabulary) = &self.vocabulary {
            request = request.settings(
                aws_sdk_transcribe::types::Settings::builder()
                    .vocabulary_name(vocabulary)
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| Error::TranscriptionError(format!("{}", DisplayErrorContext(e))))?;
        Ok(())
    }

    async fn status(&self, job_name: &str) -> Result<TranscribeJobState, Error> {
        let output = self
            .client
            .get_transcription_job()
            .transcription_job_name(job_name)
            .send()
            .await
            .map_err(|e| Error::TranscriptionError(format!("{}", DisplayErrorContext(e))))?;

        let Some(job) = output.transcription_job() else {
            return Ok(TranscribeJobState::InProgress);
        };

        match job.transcription_job_status() {
            Some(TranscriptionJobStatus::Completed) => Ok(TranscribeJobState::Completed),
            Some(TranscriptionJobStatus::Failed) => Ok(TranscribeJobState::Failed(
                job.failure_reason().unwrap_or("unknown failure").to_string(),
            )),
            _ => Ok(TranscribeJobState::InProgress),
        }
    }
}
