//! In-memory fakes for the pipeline's ports, shared by the integration
//! tests.
#![allow(dead_code)]
use std::sync::Arc;

use minuted::config::Config;
use minuted::model::{MeetingRecord, MeetingType, Stage, Status};
use minuted::Ports;

pub mod asr;
pub mod llm;
pub mod mailer;
pub mod queue;
pub mod store;

pub use asr::{FakeAsrEndpoint, FakeTranscribeJobs};
pub use llm::FakeLanguageModel;
pub use mailer::FakeMailer;
pub use queue::FakeQueue;
pub use store::{FakeBlobStore, FakeGlossary, FakeRecordStore};

/// Everything a test needs: the port bundle plus concrete handles for
/// assertions.
pub struct TestContext {
    pub config: Arc<Config>,
    pub ports: Ports,
    pub queue: Arc<FakeQueue>,
    pub blobs: Arc<FakeBlobStore>,
    pub records: Arc<FakeRecordStore>,
    pub glossary: Arc<FakeGlossary>,
    pub transcribe: Arc<FakeTranscribeJobs>,
    pub whisper: Arc<FakeAsrEndpoint>,
    pub funasr: Arc<FakeAsrEndpoint>,
    pub llm: Arc<FakeLanguageModel>,
    pub mailer: Arc<FakeMailer>,
}

/// Build a context over fresh fakes. The base configuration enables the
/// FunASR track only; `configure` adjusts it per test.
pub fn context(configure: impl FnOnce(&mut Config)) -> TestContext {
    let mut config = Config::default();
    config.storage.bucket = "media".to_string();
    config.tables.meetings = "meetings".to_string();
    config.tables.glossary = "glossary".to_string();
    config.queues.transcription = "q-transcription".to_string();
    config.queues.report = "q-report".to_string();
    config.queues.export = "q-export".to_string();
    config.tracks.funasr_url = "http://funasr:10095".to_string();
    config.email.from = "minutes@example.com".to_string();
    config.email.default_recipient = "team@example.com".to_string();
    configure(&mut config);

    let queue = FakeQueue::new();
    let blobs = FakeBlobStore::new();
    let records = FakeRecordStore::new();
    let glossary = FakeGlossary::new();
    let transcribe = FakeTranscribeJobs::new();
    let whisper = FakeAsrEndpoint::new();
    let funasr = FakeAsrEndpoint::new();
    let llm = FakeLanguageModel::new();
    let mailer = FakeMailer::new();

    let ports = Ports {
        queue: queue.clone(),
        blobs: blobs.clone(),
        records: records.clone(),
        glossary: glossary.clone(),
        transcribe: Some(transcribe.clone()),
        whisper: Some(whisper.clone()),
        funasr: Some(funasr.clone()),
        llm: llm.clone(),
        mailer: mailer.clone(),
    };

    TestContext {
        config: Arc::new(config),
        ports,
        queue,
        blobs,
        records,
        glossary,
        transcribe,
        whisper,
        funasr,
        llm,
        mailer,
    }
}

/// A record as the upload surface creates it.
pub fn pending_record(meeting_id: &str, created_at: &str, s3_key: &str) -> MeetingRecord {
    MeetingRecord {
        meeting_id: meeting_id.to_string(),
        created_at: created_at.to_string(),
        status: Status::Pending,
        stage: Stage::Transcribing,
        title: "Team sync".to_string(),
        filename: s3_key.rsplit('/').next().unwrap_or(s3_key).to_string(),
        meeting_type: MeetingType::General,
        s3_key: s3_key.to_string(),
        transcribe_key: None,
        whisper_key: None,
        funasr_key: None,
        report_key: None,
        pdf_key: None,
        recipient_emails: vec![],
        error_message: None,
        updated_at: None,
        exported_at: None,
    }
}
