//! Bedrock language model adapter.
//!
//! Speaks the Anthropic messages body format and returns the first text
//! block of the response.
//!
//! Required IAM permissions:
//!   - bedrock:InvokeModel
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use serde_json::json;

use crate::{Error, LanguageModel};

/// Bedrock-backed [LanguageModel].
pub struct BedrockModel {
    client: Client,
    model_id: String,
}

impl BedrockModel {
    /// Build the adapter for one model id.
    pub fn new(conf: &SdkConfig, model_id: &str) -> Self {
        BedrockModel {
            client: Client::new(conf),
            model_id: model_id.to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for BedrockModel {
    async fn invoke(&self, prompt: &str, max_tokens: u32) -> Result<String, Error> {
        let body = json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": max_tokens,
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": prompt}]}
            ]
        });

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .body(Blob::new(serde_json::to_vec(&body)?))
            .send()
            .await
            .map_err(|e| Error::LanguageModelError(format!("{}", DisplayErrorContext(e))))?;

        let payload: serde_json::Value = serde_json::from_slice(output.body().as_ref())?;
        payload
            .pointer("/content/0/text")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::LanguageModelError("model response carried no text content".into())
            })
    }
}
