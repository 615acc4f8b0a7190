//! AWS adapters: SQS queue, S3 blobs, DynamoDB records, SES mail, managed
//! Transcribe jobs and a Bedrock language model.
use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sqs::config::Credentials;

use crate::config::{AwsConfig, Config};
use crate::{Error, Ports};

mod bedrock;
mod dynamodb;
mod s3;
mod ses;
mod sqs;
mod transcribe;

pub use bedrock::BedrockModel;
pub use dynamodb::DynamoRecordStore;
pub use s3::S3BlobStore;
pub use ses::SesMailer;
pub use sqs::SqsQueue;
pub use transcribe::TranscribeJobClient;

/// Resolve the shared SDK configuration: ambient provider chain by default,
/// with optional region, endpoint and static credential overrides.
pub async fn sdk_config(aws: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::v2025_01_17());

    if let Some(region) = &aws.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint_url) = &aws.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }
    if let Some(creds) = &aws.credentials {
        let provider = Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            creds.session_token.clone(),
            None,
            "minuted",
        );
        loader = loader.credentials_provider(provider);
    }

    loader.load().await
}

/// Build the full port bundle from configuration. Disabled tracks get no
/// port; the HTTP speech clients come from [crate::modules::asr].
pub async fn build_ports(config: &Config) -> Result<Ports, Error> {
    let sdk = sdk_config(&config.aws).await;

    let store = Arc::new(DynamoRecordStore::new(
        &sdk,
        &config.tables.meetings,
        &config.tables.glossary,
    ));

    let transcribe = if config.tracks.enable_transcribe {
        Some(Arc::new(TranscribeJobClient::new(
            &sdk,
            &config.storage.bucket,
            &config.tracks.transcribe_language,
            config.tracks.transcribe_vocabulary.clone(),
        )) as Arc<dyn crate::TranscribeJobs + Send + Sync>)
    } else {
        None
    };

    let whisper = if config.tracks.enable_whisper && !config.tracks.whisper_url.is_empty() {
        Some(Arc::new(crate::modules::asr::HttpAsrEndpoint::new(
            &config.tracks.whisper_url,
        )?) as Arc<dyn crate::AsrEndpoint + Send + Sync>)
    } else {
        None
    };

    let funasr = if config.tracks.funasr_enabled() {
        Some(Arc::new(crate::modules::asr::HttpAsrEndpoint::new(
            &config.tracks.funasr_url,
        )?) as Arc<dyn crate::AsrEndpoint + Send + Sync>)
    } else {
        None
    };

    Ok(Ports {
        queue: Arc::new(SqsQueue::new(&sdk)),
        blobs: Arc::new(S3BlobStore::new(
            &sdk,
            &config.storage.bucket,
            &config.storage.prefix,
        )),
        records: store.clone(),
        glossary: store,
        transcribe,
        whisper,
        funasr,
        llm: Arc::new(BedrockModel::new(&sdk, &config.report.model_id)),
        mailer: Arc::new(SesMailer::new(&sdk)),
    })
}
