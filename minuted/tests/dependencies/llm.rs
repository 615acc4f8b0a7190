use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use minuted::{Error, LanguageModel};

/// Scriptable language model: answers are consumed in order and every prompt
/// is kept for assertions.
pub struct FakeLanguageModel {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeLanguageModel {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeLanguageModel {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn respond_with(&self, completion: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(completion.to_string());
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeLanguageModel {
    async fn invoke(&self, prompt: &str, _max_tokens: u32) -> Result<String, Error> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::LanguageModelError("no scripted response".into()))
    }
}
