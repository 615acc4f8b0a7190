//! Pipeline configuration.
//!
//! A configuration document is YAML rendered through handlebars in strict
//! mode with the process environment as template data, so deployments can
//! write `bucket: "{{S3_BUCKET}}"` and keep secrets out of the file. The
//! same fields can also be assembled directly from the flat environment
//! variable names with [Config::from_env].
//!
//! # Example Configuration
//!
//! ```yaml
//! storage:
//!   bucket: "{{S3_BUCKET}}"
//!   prefix: meetings
//! tables:
//!   meetings: meeting-minutes
//!   glossary: glossary-terms
//! queues:
//!   transcription: https://sqs.us-east-1.amazonaws.com/123/transcription
//!   report: https://sqs.us-east-1.amazonaws.com/123/report
//!   export: https://sqs.us-east-1.amazonaws.com/123/export
//! tracks:
//!   enable_whisper: true
//!   whisper_url: http://whisper.internal:9000
//! email:
//!   from: minutes@example.com
//!   default_recipient: team@example.com
//! ```
use handlebars::Handlebars;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use crate::Error;

/// Shared AWS client options. All fields optional; absent credentials fall
/// back to the ambient provider chain.
#[derive(Deserialize, Default, Clone)]
pub struct AwsConfig {
    /// Region override
    pub region: Option<String>,
    /// Endpoint override, used for local stack testing
    pub endpoint_url: Option<String>,
    /// Static credentials override
    pub credentials: Option<Credentials>,
}

/// Static AWS credentials.
#[derive(Deserialize, Clone)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Optional session token
    pub session_token: Option<String>,
}

/// Object storage namespace.
#[derive(Deserialize, Default, Clone)]
pub struct StorageConfig {
    /// Bucket holding media, transcripts, reports and exports
    pub bucket: String,
    /// Key prefix prepended to every write
    #[serde(default)]
    pub prefix: String,
}

/// Record store table names.
#[derive(Deserialize, Default, Clone)]
pub struct TableConfig {
    /// Meeting record table
    pub meetings: String,
    /// Glossary term table
    pub glossary: String,
}

/// Stage queue URLs.
#[derive(Deserialize, Default, Clone)]
pub struct QueueConfig {
    /// Queue feeding the transcription stage
    pub transcription: String,
    /// Queue feeding the report stage
    pub report: String,
    /// Queue feeding the export stage
    pub export: String,
}

/// Speech recognition track enablement.
#[derive(Deserialize, Clone)]
pub struct TrackConfig {
    /// Run the managed batch transcription track
    #[serde(default)]
    pub enable_transcribe: bool,
    /// Language code for managed transcription jobs
    #[serde(default = "default_transcribe_language")]
    pub transcribe_language: String,
    /// Custom vocabulary applied to managed transcription jobs
    #[serde(default)]
    pub transcribe_vocabulary: Option<String>,
    /// Run the Whisper HTTP track
    #[serde(default)]
    pub enable_whisper: bool,
    /// Whisper service base URL
    #[serde(default)]
    pub whisper_url: String,
    /// FunASR service base URL; non-empty enables the track
    #[serde(default)]
    pub funasr_url: String,
    /// Language hint passed to FunASR
    #[serde(default = "default_funasr_language")]
    pub funasr_language: String,
}

impl Default for TrackConfig {
    fn default() -> Self {
        TrackConfig {
            enable_transcribe: false,
            transcribe_language: default_transcribe_language(),
            transcribe_vocabulary: None,
            enable_whisper: false,
            whisper_url: String::new(),
            funasr_url: String::new(),
            funasr_language: default_funasr_language(),
        }
    }
}

impl TrackConfig {
    /// True when the FunASR track is enabled.
    pub fn funasr_enabled(&self) -> bool {
        !self.funasr_url.is_empty()
    }

    /// True when no track at all is enabled.
    pub fn all_disabled(&self) -> bool {
        !self.enable_transcribe && !self.enable_whisper && !self.funasr_enabled()
    }
}

/// Email sender and default recipient.
#[derive(Deserialize, Default, Clone)]
pub struct EmailConfig {
    /// Sender address
    #[serde(default)]
    pub from: String,
    /// Recipient used when a record carries no custom addresses
    #[serde(default)]
    pub default_recipient: String,
}

/// Language model options for the report stage.
#[derive(Deserialize, Clone)]
pub struct ReportConfig {
    /// Model identifier passed to the language model adapter
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Output token budget per report
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            model_id: default_model_id(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_funasr_language() -> String {
    "zh".to_string()
}

fn default_transcribe_language() -> String {
    "zh-CN".to_string()
}

fn default_model_id() -> String {
    "anthropic.claude-3-5-sonnet-20241022-v2:0".to_string()
}

fn default_max_output_tokens() -> u32 {
    16_000
}

/// Full pipeline configuration.
#[derive(Deserialize, Default, Clone)]
pub struct Config {
    /// Shared AWS client options
    #[serde(default)]
    pub aws: AwsConfig,
    /// Object storage namespace
    #[serde(default)]
    pub storage: StorageConfig,
    /// Record store tables
    #[serde(default)]
    pub tables: TableConfig,
    /// Stage queues
    #[serde(default)]
    pub queues: QueueConfig,
    /// Track enablement
    #[serde(default)]
    pub tracks: TrackConfig,
    /// Email options
    #[serde(default)]
    pub email: EmailConfig,
    /// Language model options
    #[serde(default)]
    pub report: ReportConfig,
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(conf: &str) -> Result<Self, Self::Err> {
        let mut environment_variables: HashMap<String, String> = HashMap::new();
        for (key, value) in env::vars() {
            let _ = environment_variables.insert(key, value);
        }

        let mut handle_bars = Handlebars::new();
        handle_bars.set_strict_mode(true);

        let populated_config = handle_bars
            .render_template(conf, &environment_variables)
            .map_err(|e| Error::ConfigFailedValidation(format!("{}", e)))?;

        let config: Config = serde_yaml::from_str(&populated_config)?;
        Ok(config)
    }
}

impl Config {
    /// Assemble a configuration from the flat environment variable names
    /// (`S3_BUCKET`, `SQS_TRANSCRIPTION_QUEUE`, `ENABLE_WHISPER`, ...).
    pub fn from_env() -> Config {
        Config {
            aws: AwsConfig {
                region: env_opt("AWS_REGION"),
                endpoint_url: None,
                credentials: None,
            },
            storage: StorageConfig {
                bucket: env_or_default("S3_BUCKET"),
                prefix: env_or_default("S3_PREFIX"),
            },
            tables: TableConfig {
                meetings: env_or_default("DYNAMODB_TABLE"),
                glossary: env_or_default("GLOSSARY_TABLE"),
            },
            queues: QueueConfig {
                transcription: env_or_default("SQS_TRANSCRIPTION_QUEUE"),
                report: env_or_default("SQS_REPORT_QUEUE"),
                export: env_or_default("SQS_EXPORT_QUEUE"),
            },
            tracks: TrackConfig {
                enable_transcribe: env_bool("ENABLE_TRANSCRIBE"),
                transcribe_language: env::var("TRANSCRIBE_LANGUAGE")
                    .unwrap_or_else(|_| default_transcribe_language()),
                transcribe_vocabulary: env_opt("TRANSCRIBE_VOCABULARY"),
                enable_whisper: env_bool("ENABLE_WHISPER"),
                whisper_url: env_or_default("WHISPER_URL"),
                funasr_url: env_or_default("FUNASR_URL"),
                funasr_language: env::var("FUNASR_LANGUAGE")
                    .unwrap_or_else(|_| default_funasr_language()),
            },
            email: EmailConfig {
                from: env_or_default("SES_FROM_EMAIL"),
                default_recipient: env_or_default("SES_TO_EMAIL"),
            },
            report: ReportConfig::default(),
        }
    }

    /// Validate the configuration at startup. Catches the states no worker
    /// can run from: every track disabled, a whisper track without a URL,
    /// and empty queue URLs.
    pub fn validate(&self) -> Result<(), Error> {
        if self.tracks.all_disabled() {
            return Err(Error::ConfigFailedValidation(
                "no transcription track is enabled".into(),
            ));
        }
        if self.tracks.enable_whisper && self.tracks.whisper_url.is_empty() {
            return Err(Error::ConfigFailedValidation(
                "whisper track enabled without whisper_url".into(),
            ));
        }
        if self.queues.transcription.is_empty()
            || self.queues.report.is_empty()
            || self.queues.export.is_empty()
        {
            return Err(Error::ConfigFailedValidation(
                "all three stage queue URLs are required".into(),
            ));
        }
        if self.storage.bucket.is_empty() {
            return Err(Error::ConfigFailedValidation("storage bucket is required".into()));
        }
        Ok(())
    }
}

fn env_or_default(key: &str) -> String {
    env::var(key).unwrap_or_default()
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_bool(key: &str) -> bool {
    matches!(
        env::var(key).unwrap_or_default().to_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
