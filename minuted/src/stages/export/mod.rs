//! Export stage.
//!
//! Consumes report-complete messages, renders the delivery email and marks
//! the job terminal. A job with no resolvable recipient still completes; the
//! send is skipped, not failed.
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::model::message::ReportDone;
use crate::model::{now_timestamp, RecordKey, RecordUpdate, Stage, Status};
use crate::runtime::{Disposition, StageWorker};
use crate::{EmailMessage, Error, Ports};

pub mod html;

/// Resolve the destination of one delivery. Custom addresses win and the
/// default goes to BCC; otherwise the default alone; otherwise nothing.
fn resolve_recipients(custom: &[String], default: &str) -> Option<(Vec<String>, Vec<String>)> {
    if !custom.is_empty() {
        let bcc = if default.is_empty() {
            vec![]
        } else {
            vec![default.to_string()]
        };
        return Some((custom.to_vec(), bcc));
    }
    if !default.is_empty() {
        return Some((vec![default.to_string()], vec![]));
    }
    None
}

/// The export stage worker.
pub struct ExportStage {
    ports: Ports,
    config: Arc<Config>,
}

impl ExportStage {
    /// Build the stage from its dependencies.
    pub fn new(ports: Ports, config: Arc<Config>) -> Self {
        ExportStage { ports, config }
    }
}

#[async_trait::async_trait]
impl StageWorker for ExportStage {
    fn name(&self) -> &'static str {
        "export"
    }

    fn queue_url(&self) -> &str {
        &self.config.queues.export
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    async fn process(&self, body: &str) -> Result<Disposition, Error> {
        let done: ReportDone = serde_json::from_str(body)
            .map_err(|e| Error::InvalidMessage(format!("malformed message: {e}")))?;
        let key = RecordKey::new(done.meeting_id.clone(), done.created_at.clone());

        self.ports
            .records
            .update(
                &key,
                RecordUpdate {
                    stage: Some(Stage::Sending),
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

        let raw = self.ports.blobs.get(&done.report_key).await?;
        let report: serde_json::Value = serde_json::from_slice(&raw)?;

        let meeting_name = done
            .meeting_name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| Some(record.title.clone()).filter(|title| !title.is_empty()))
            .unwrap_or_else(|| key.meeting_id.clone());

        match resolve_recipients(
            &record.recipient_emails,
            &self.config.email.default_recipient,
        ) {
            Some((to, bcc)) => {
                let email = EmailMessage {
                    from: self.config.email.from.clone(),
                    to,
                    bcc,
                    subject: format!("会议纪要 - {meeting_name}"),
                    html_body: html::render_report_html(&meeting_name, &report)?,
                };
                self.ports.mailer.send_html(email).await?;
                info!(meeting_id = key.meeting_id, "minutes delivered");
            }
            None => {
                warn!(
                    meeting_id = key.meeting_id,
                    "no recipient configured, skipping email"
                );
            }
        }

        self.ports
            .records
            .update(
                &key,
                RecordUpdate {
                    status: Some(Status::Completed),
                    stage: Some(Stage::Done),
                    exported_at: Some(now_timestamp()),
                    updated_at: Some(now_timestamp()),
                    ..Default::default()
                },
            )
            .await?;

        Ok(Disposition::Complete)
    }
}
