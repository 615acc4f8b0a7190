//! SES email adapter.
//!
//! Required IAM permissions:
//!   - ses:SendEmail
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sesv2::error::DisplayErrorContext;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client;

use crate::stages::export::html::encode_subject;
use crate::{EmailMessage, Error, Mailer};

/// SES-backed [Mailer]. Subjects are MIME-encoded as UTF-8 before sending.
pub struct SesMailer {
    client: Client,
}

impl SesMailer {
    /// Build the adapter from the shared SDK configuration.
    pub fn new(conf: &SdkConfig) -> Self {
        SesMailer {
            client: Client::new(conf),
        }
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send_html(&self, email: EmailMessage) -> Result<(), Error> {
        let subject = Content::builder()
            .data(encode_subject(&email.subject))
            .charset("UTF-8")
            .build()
            .map_err(|e| Error::EmailError(format!("{}", e)))?;

        let html = Content::builder()
            .data(email.html_body)
            .charset("UTF-8")
            .build()
            .map_err(|e| Error::EmailError(format!("{}", e)))?;

        let message = Message::builder()
            .subject(subject)
            .body(Body::builder().html(html).build())
            .build();

        let mut destination = Destination::builder();
        for to in &email.to {
            destination = destination.to_addresses(to);
        }
        for bcc in &email.bcc {
            destination = destination.bcc_addresses(bcc);
        }

        self.client
            .send_email()
            .from_email_address(&email.from)
            .destination(destination.build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| Error::EmailError(format!("{}", DisplayErrorContext(e))))?;
        Ok(())
    }
}
