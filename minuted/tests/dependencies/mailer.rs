use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use minuted::{EmailMessage, Error, Mailer};

/// Records every delivered email.
pub struct FakeMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl FakeMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeMailer {
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send_html(&self, email: EmailMessage) -> Result<(), Error> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}
