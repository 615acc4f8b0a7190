//! SQS queue adapter.
//!
//! Required IAM permissions:
//!   - sqs:ReceiveMessage
//!   - sqs:DeleteMessage
//!   - sqs:SendMessage
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::Client;

use crate::{Error, Queue, ReceivedMessage};

/// SQS-backed [Queue].
pub struct SqsQueue {
    client: Client,
}

impl SqsQueue {
    /// Build the adapter from the shared SDK configuration.
    pub fn new(conf: &SdkConfig) -> Self {
        SqsQueue {
            client: Client::new(conf),
        }
    }
}

#[async_trait]
impl Queue for SqsQueue {
    async fn receive(
        &self,
        queue_url: &str,
        max: i32,
        wait_secs: i32,
    ) -> Result<Vec<ReceivedMessage>, Error> {
        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max)
            .wait_time_seconds(wait_secs)
            .send()
            .await
            .map_err(|e| Error::QueueError(format!("{}", DisplayErrorContext(e))))?;

        let messages = output
            .messages()
            .iter()
            .filter_map(|m| {
                let body = m.body()?.to_string();
                let receipt_handle = m.receipt_handle()?.to_string();
                Some(ReceivedMessage {
                    body,
                    receipt_handle,
                })
            })
            .collect();
        Ok(messages)
    }

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), Error> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| Error::QueueError(format!("{}", DisplayErrorContext(e))))?;
        Ok(())
    }

    async fn send(&self, queue_url: &str, body: &str) -> Result<(), Error> {
        self.client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| Error::QueueError(format!("{}", DisplayErrorContext(e))))?;
        Ok(())
    }
}
