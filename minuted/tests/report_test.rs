#![allow(dead_code)]
#![allow(missing_docs)]
//! Report stage behavior: transcript fusion, prompt assembly, model output
//! validation and the hand-off to the export queue.
mod dependencies;

use dependencies::{context, pending_record};
use minuted::model::message::ReportDone;
use minuted::model::{MeetingType, Stage, Status};
use minuted::runtime::{Disposition, StageWorker};
use minuted::stages::report::ReportStage;
use minuted::Error;
use serde_json::json;

const T0: &str = "2026-01-05T08:00:00.000Z";

fn done_body(
    transcribe_key: Option<&str>,
    whisper_key: Option<&str>,
    funasr_key: Option<&str>,
    meeting_type: Option<&str>,
) -> String {
    json!({
        "meetingId": "m1",
        "createdAt": T0,
        "transcribeKey": transcribe_key,
        "whisperKey": whisper_key,
        "funasrKey": funasr_key,
        "meetingType": meeting_type,
    })
    .to_string()
}

fn insert_funasr_blob(ctx: &dependencies::TestContext) {
    ctx.blobs.insert(
        "transcripts/m1/funasr.json",
        json!({
            "segments": [
                {"speaker": "SPEAKER_00", "text": "我们先过一下进展。"},
                {"speaker": "SPEAKER_00", "text": "然后安排下周。"},
                {"speaker": "SPEAKER_01", "text": "好的。"}
            ]
        })
        .to_string()
        .as_bytes(),
    );
}

#[tokio::test]
async fn speaker_transcript_becomes_a_report() {
    let ctx = context(|_| {});
    ctx.records
        .insert(pending_record("m1", T0, "inbox/m1/x.mp4"));
    insert_funasr_blob(&ctx);
    ctx.llm
        .respond_with("好的，以下是纪要：\n{\"summary\": \"ok\", \"actions\": []}");

    let stage = ReportStage::new(ctx.ports.clone(), ctx.config.clone());
    let outcome = stage
        .process(&done_body(None, None, Some("transcripts/m1/funasr.json"), None))
        .await
        .unwrap();
    assert!(matches!(outcome, Disposition::Complete));

    assert!(ctx.blobs.contains("reports/m1/report.json"));
    let record = ctx.records.latest("m1").unwrap();
    assert_eq!(record.status, Status::Reported);
    assert_eq!(record.stage, Stage::Exporting);
    assert_eq!(record.report_key.as_deref(), Some("reports/m1/report.json"));

    let sent = ctx.queue.sent_to("q-export");
    assert_eq!(sent.len(), 1);
    let done: ReportDone = serde_json::from_str(&sent[0]).unwrap();
    assert_eq!(done.created_at, T0);
    assert_eq!(done.report_key, "reports/m1/report.json");
    assert_eq!(done.meeting_name.as_deref(), Some("Team sync"));

    let prompt = &ctx.llm.prompts()[0];
    assert!(prompt.contains("[FunASR 转录（含说话人标签）]"));
    assert!(prompt.contains("[SPEAKER_00] 我们先过一下进展。然后安排下周。"));
    assert!(prompt.contains("说话人标签"));
}

#[tokio::test]
async fn one_failing_fetch_keeps_the_surviving_transcript() {
    let ctx = context(|_| {});
    ctx.records
        .insert(pending_record("m1", T0, "inbox/m1/x.mp4"));
    ctx.blobs
        .insert("transcripts/m1/whisper.json", b"whisper says hi");
    ctx.llm.respond_with("{\"summary\": \"ok\"}");

    let stage = ReportStage::new(ctx.ports.clone(), ctx.config.clone());
    let outcome = stage
        .process(&done_body(
            Some("transcripts/m1/transcribe.json"),
            Some("transcripts/m1/whisper.json"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert!(matches!(outcome, Disposition::Complete));

    let prompt = &ctx.llm.prompts()[0];
    assert!(prompt.contains("whisper says hi"));
    // A single surviving machine transcript travels bare.
    assert!(!prompt.contains("[AWS Transcribe 转录]"));
    assert!(!prompt.contains("[Whisper 转录]"));
}

#[tokio::test]
async fn dual_machine_transcripts_are_labelled() {
    let ctx = context(|_| {});
    ctx.records
        .insert(pending_record("m1", T0, "inbox/m1/x.mp4"));
    ctx.blobs.insert(
        "transcripts/m1/transcribe.json",
        json!({"results": {"transcripts": [{"transcript": "aws transcript text"}]}})
            .to_string()
            .as_bytes(),
    );
    ctx.blobs
        .insert("transcripts/m1/whisper.json", b"whisper transcript text");
    ctx.llm.respond_with("{\"summary\": \"ok\"}");

    let stage = ReportStage::new(ctx.ports.clone(), ctx.config.clone());
    stage
        .process(&done_body(
            Some("transcripts/m1/transcribe.json"),
            Some("transcripts/m1/whisper.json"),
            None,
            None,
        ))
        .await
        .unwrap();

    let prompt = &ctx.llm.prompts()[0];
    assert!(prompt.contains("[AWS Transcribe 转录]"));
    assert!(prompt.contains("aws transcript text"));
    assert!(prompt.contains("[Whisper 转录]"));
    assert!(prompt.contains("whisper transcript text"));
}

#[tokio::test]
async fn nothing_to_read_fails_the_stage() {
    let ctx = context(|_| {});
    ctx.records
        .insert(pending_record("m1", T0, "inbox/m1/x.mp4"));

    let stage = ReportStage::new(ctx.ports.clone(), ctx.config.clone());
    let result = stage.process(&done_body(None, None, None, None)).await;
    assert!(matches!(result, Err(Error::AllSourcesFailed)));
    assert!(ctx.queue.sent_to("q-export").is_empty());
}

#[tokio::test]
async fn completion_without_json_fails() {
    let ctx = context(|_| {});
    ctx.records
        .insert(pending_record("m1", T0, "inbox/m1/x.mp4"));
    insert_funasr_blob(&ctx);
    ctx.llm.respond_with("抱歉，我无法生成纪要。");

    let stage = ReportStage::new(ctx.ports.clone(), ctx.config.clone());
    let result = stage
        .process(&done_body(None, None, Some("transcripts/m1/funasr.json"), None))
        .await;

    assert!(matches!(result, Err(Error::ReportFailedValidation(_))));
    let record = ctx.records.latest("m1").unwrap();
    assert_ne!(record.status, Status::Reported);
    assert!(ctx.queue.sent_to("q-export").is_empty());
}

#[tokio::test]
async fn report_without_summary_fails_validation() {
    let ctx = context(|_| {});
    ctx.records
        .insert(pending_record("m1", T0, "inbox/m1/x.mp4"));
    insert_funasr_blob(&ctx);
    ctx.llm.respond_with("{\"actions\": []}");

    let stage = ReportStage::new(ctx.ports.clone(), ctx.config.clone());
    let result = stage
        .process(&done_body(None, None, Some("transcripts/m1/funasr.json"), None))
        .await;
    assert!(matches!(result, Err(Error::ReportFailedValidation(_))));
}

#[tokio::test]
async fn glossary_terms_reach_the_prompt() {
    let ctx = context(|_| {});
    ctx.records
        .insert(pending_record("m1", T0, "inbox/m1/x.mp4"));
    insert_funasr_blob(&ctx);
    ctx.glossary.add("EKS", "managed kubernetes");
    ctx.glossary.add("Bedrock", "managed model hosting");
    ctx.llm.respond_with("{\"summary\": \"ok\"}");

    let stage = ReportStage::new(ctx.ports.clone(), ctx.config.clone());
    stage
        .process(&done_body(None, None, Some("transcripts/m1/funasr.json"), None))
        .await
        .unwrap();

    let prompt = &ctx.llm.prompts()[0];
    assert!(prompt.contains("EKS"));
    assert!(prompt.contains("Bedrock"));
    assert!(prompt.contains("术语表"));
}

#[tokio::test]
async fn meeting_type_falls_back_to_the_record() {
    let ctx = context(|_| {});
    let mut record = pending_record("m1", T0, "inbox/m1/x.mp4");
    record.meeting_type = MeetingType::Customer;
    ctx.records.insert(record);
    insert_funasr_blob(&ctx);
    ctx.llm.respond_with("{\"summary\": \"ok\"}");

    let stage = ReportStage::new(ctx.ports.clone(), ctx.config.clone());
    stage
        .process(&done_body(None, None, Some("transcripts/m1/funasr.json"), Some("general")))
        .await
        .unwrap();

    let prompt = &ctx.llm.prompts()[0];
    assert!(prompt.contains("customerInfo"));
    assert!(prompt.contains("painPoints"));
}

#[tokio::test]
async fn stage_marks_generating_on_entry() {
    let ctx = context(|_| {});
    ctx.records
        .insert(pending_record("m1", T0, "inbox/m1/x.mp4"));

    let stage = ReportStage::new(ctx.ports.clone(), ctx.config.clone());
    // Fails later (no sources), but the entry write must have happened.
    let _ = stage.process(&done_body(None, None, None, None)).await;

    let keys = ctx.records.update_keys();
    assert_eq!(keys[0].created_at, T0);
}
