use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use minuted::{AsrEndpoint, AsrRequest, Error, TranscribeJobState, TranscribeJobs};

enum AsrBehavior {
    Respond(serde_json::Value),
    Fail(String),
    /// Never answer; exercises the caller's deadline.
    Hang,
}

/// Scriptable HTTP speech service.
pub struct FakeAsrEndpoint {
    healthy: AtomicBool,
    behavior: Mutex<AsrBehavior>,
    requests: Mutex<Vec<AsrRequest>>,
}

impl FakeAsrEndpoint {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeAsrEndpoint {
            healthy: AtomicBool::new(true),
            behavior: Mutex::new(AsrBehavior::Fail("unscripted".into())),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_down(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }

    pub fn respond_with(&self, payload: serde_json::Value) {
        *self.behavior.lock().unwrap() = AsrBehavior::Respond(payload);
    }

    pub fn fail_with(&self, message: &str) {
        *self.behavior.lock().unwrap() = AsrBehavior::Fail(message.to_string());
    }

    pub fn hang(&self) {
        *self.behavior.lock().unwrap() = AsrBehavior::Hang;
    }

    pub fn requests(&self) -> Vec<AsrRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AsrEndpoint for FakeAsrEndpoint {
    async fn healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn submit(&self, request: AsrRequest) -> Result<serde_json::Value, Error> {
        self.requests.lock().unwrap().push(request);
        let behavior = {
            let guard = self.behavior.lock().unwrap();
            match &*guard {
                AsrBehavior::Respond(payload) => AsrBehavior::Respond(payload.clone()),
                AsrBehavior::Fail(message) => AsrBehavior::Fail(message.clone()),
                AsrBehavior::Hang => AsrBehavior::Hang,
            }
        };
        match behavior {
            AsrBehavior::Respond(payload) => Ok(payload),
            AsrBehavior::Fail(message) => Err(Error::TranscriptionError(message)),
            AsrBehavior::Hang => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Scriptable managed transcription service: `status` walks a queue of
/// states, repeating the last one.
pub struct FakeTranscribeJobs {
    statuses: Mutex<VecDeque<TranscribeJobState>>,
    fail_start: AtomicBool,
    started: Mutex<Vec<(String, String, String)>>,
}

impl FakeTranscribeJobs {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeTranscribeJobs {
            statuses: Mutex::new(VecDeque::new()),
            fail_start: AtomicBool::new(false),
            started: Mutex::new(Vec::new()),
        })
    }

    pub fn script_statuses(&self, states: Vec<TranscribeJobState>) {
        *self.statuses.lock().unwrap() = states.into();
    }

    pub fn fail_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn started_jobs(&self) -> Vec<(String, String, String)> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscribeJobs for FakeTranscribeJobs {
    async fn start(
        &self,
        job_name: &str,
        media_uri: &str,
        output_key: &str,
    ) -> Result<(), Error> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::TranscriptionError("start rejected".into()));
        }
        self.started.lock().unwrap().push((
            job_name.to_string(),
            media_uri.to_string(),
            output_key.to_string(),
        ));
        Ok(())
    }

    async fn status(&self, _job_name: &str) -> Result<TranscribeJobState, Error> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap_or(TranscribeJobState::InProgress))
        } else {
            Ok(statuses
                .front()
                .cloned()
                .unwrap_or(TranscribeJobState::InProgress))
        }
    }
}
