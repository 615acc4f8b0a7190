use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use minuted::{Error, Queue, ReceivedMessage};

/// In-memory queue. `send` appends to the named queue so a downstream stage
/// can consume what an upstream stage produced; deletions and sends are
/// recorded for assertions.
pub struct FakeQueue {
    queues: Mutex<HashMap<String, VecDeque<ReceivedMessage>>>,
    deletions: Mutex<Vec<String>>,
    sends: Mutex<Vec<(String, String)>>,
    fail_sends: AtomicBool,
    counter: AtomicUsize,
}

impl FakeQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeQueue {
            queues: Mutex::new(HashMap::new()),
            deletions: Mutex::new(Vec::new()),
            sends: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            counter: AtomicUsize::new(0),
        })
    }

    /// Enqueue a message as if an external producer sent it.
    pub fn push(&self, queue_url: &str, body: &str) {
        let receipt = format!("receipt-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        self.queues
            .lock()
            .unwrap()
            .entry(queue_url.to_string())
            .or_default()
            .push_back(ReceivedMessage {
                body: body.to_string(),
                receipt_handle: receipt,
            });
    }

    /// Pop the next message without going through a worker.
    pub fn pop(&self, queue_url: &str) -> Option<ReceivedMessage> {
        self.queues
            .lock()
            .unwrap()
            .get_mut(queue_url)
            .and_then(|q| q.pop_front())
    }

    /// Bodies sent to a queue, in order.
    pub fn sent_to(&self, queue_url: &str) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| url == queue_url)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn deletion_count(&self) -> usize {
        self.deletions.lock().unwrap().len()
    }

    pub fn pending(&self, queue_url: &str) -> usize {
        self.queues
            .lock()
            .unwrap()
            .get(queue_url)
            .map(|q| q.len())
            .unwrap_or(0)
    }

    /// Make every subsequent `send` fail.
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Queue for FakeQueue {
    async fn receive(
        &self,
        queue_url: &str,
        max: i32,
        _wait_secs: i32,
    ) -> Result<Vec<ReceivedMessage>, Error> {
        let mut queues = self.queues.lock().unwrap();
        let queue = queues.entry(queue_url.to_string()).or_default();
        let mut messages = Vec::new();
        for _ in 0..max {
            match queue.pop_front() {
                Some(message) => messages.push(message),
                None => break,
            }
        }
        Ok(messages)
    }

    async fn delete(&self, _queue_url: &str, receipt_handle: &str) -> Result<(), Error> {
        self.deletions.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }

    async fn send(&self, queue_url: &str, body: &str) -> Result<(), Error> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::QueueError("send failed".into()));
        }
        self.sends
            .lock()
            .unwrap()
            .push((queue_url.to_string(), body.to_string()));
        self.push(queue_url, body);
        Ok(())
    }
}
