#![allow(dead_code)]
#![allow(missing_docs)]
//! Retry entry point: preconditions, the conditional flip and the revert on
//! enqueue failure.
mod dependencies;

use async_trait::async_trait;
use dependencies::{context, pending_record, FakeRecordStore};
use minuted::model::message::NewJob;
use minuted::model::{MeetingRecord, MeetingType, RecordKey, RecordUpdate, Stage, Status};
use minuted::retry::{retry_meeting, RetryError};
use minuted::{Error, Ports, RecordStore};
use std::sync::Arc;

const T0: &str = "2026-01-05T08:00:00.000Z";

fn failed_record() -> MeetingRecord {
    let mut record = pending_record("m1", T0, "inbox/m1/x.mp4");
    record.status = Status::Failed;
    record.stage = Stage::Failed;
    record.meeting_type = MeetingType::Weekly;
    record.error_message = Some("boom".into());
    record
}

#[tokio::test]
async fn unknown_meeting_is_not_found() {
    let ctx = context(|_| {});
    let result = retry_meeting(&ctx.ports, &ctx.config, "ghost").await;
    assert!(matches!(result, Err(RetryError::NotFound(_))));
    assert!(ctx.queue.sent_to("q-transcription").is_empty());
}

#[tokio::test]
async fn non_failed_record_is_rejected_without_side_effects() {
    let ctx = context(|_| {});
    ctx.records
        .insert(pending_record("m1", T0, "inbox/m1/x.mp4"));

    let result = retry_meeting(&ctx.ports, &ctx.config, "m1").await;
    assert!(matches!(result, Err(RetryError::NotFailed(Status::Pending))));
    assert!(ctx.records.update_keys().is_empty());
    assert!(ctx.queue.sent_to("q-transcription").is_empty());
}

#[tokio::test]
async fn failed_record_flips_and_enqueues_exactly_one_job() {
    let ctx = context(|_| {});
    ctx.records.insert(failed_record());

    retry_meeting(&ctx.ports, &ctx.config, "m1").await.unwrap();

    let record = ctx.records.latest("m1").unwrap();
    assert_eq!(record.status, Status::Processing);
    assert_eq!(record.stage, Stage::Transcribing);
    assert_eq!(record.error_message, None);

    let sent = ctx.queue.sent_to("q-transcription");
    assert_eq!(sent.len(), 1);
    let job: NewJob = serde_json::from_str(&sent[0]).unwrap();
    assert_eq!(job.meeting_id, "m1");
    assert_eq!(job.s3_key, "inbox/m1/x.mp4");
    assert_eq!(job.filename, "x.mp4");
    assert_eq!(job.meeting_type, Some(MeetingType::Weekly));
    assert_eq!(job.created_at.as_deref(), Some(T0));
}

/// Delegates to the real store but always reads the record as failed, the
/// state a concurrent retry observed just before the other one landed.
struct StaleReadStore {
    inner: Arc<FakeRecordStore>,
}

#[async_trait]
impl RecordStore for StaleReadStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<MeetingRecord>, Error> {
        self.inner.get(key).await
    }

    async fn find_by_id(&self, meeting_id: &str) -> Result<Option<MeetingRecord>, Error> {
        Ok(self.inner.find_by_id(meeting_id).await?.map(|mut record| {
            record.status = Status::Failed;
            record
        }))
    }

    async fn find_by_status(
        &self,
        status: Status,
        s3_key: &str,
    ) -> Result<Option<MeetingRecord>, Error> {
        self.inner.find_by_status(status, s3_key).await
    }

    async fn put(&self, record: &MeetingRecord) -> Result<(), Error> {
        self.inner.put(record).await
    }

    async fn update(&self, key: &RecordKey, update: RecordUpdate) -> Result<(), Error> {
        self.inner.update(key, update).await
    }
}

#[tokio::test]
async fn losing_a_concurrent_retry_is_a_conflict() {
    let ctx = context(|_| {});
    // The record already flipped to processing; this caller still saw failed.
    let mut record = failed_record();
    record.status = Status::Processing;
    record.stage = Stage::Transcribing;
    record.error_message = None;
    ctx.records.insert(record);

    let ports = Ports {
        records: Arc::new(StaleReadStore {
            inner: ctx.records.clone(),
        }),
        ..ctx.ports.clone()
    };

    let result = retry_meeting(&ports, &ctx.config, "m1").await;
    assert!(matches!(result, Err(RetryError::Conflict)));
    assert!(ctx.queue.sent_to("q-transcription").is_empty());
}

#[tokio::test]
async fn enqueue_failure_reverts_the_record() {
    let ctx = context(|_| {});
    ctx.records.insert(failed_record());
    ctx.queue.fail_sends();

    let result = retry_meeting(&ctx.ports, &ctx.config, "m1").await;
    assert!(matches!(result, Err(RetryError::Enqueue(_))));

    let record = ctx.records.latest("m1").unwrap();
    assert_eq!(record.status, Status::Failed);
    assert_eq!(record.stage, Stage::Failed);
    assert!(record
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("SQS 入队失败"));
}
