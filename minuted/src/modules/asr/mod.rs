//! HTTP speech recognition client.
//!
//! Whisper- and FunASR-shaped services expose the same two routes:
//! `GET /health` and `POST /asr` taking the media coordinates. One client
//! serves both; the caller decides whether a language hint travels along.
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::{AsrEndpoint, AsrRequest, Error};

/// Bound on the health probe. A service that cannot answer within this is
/// treated as down and its track is skipped.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Reqwest-backed [AsrEndpoint]. The submit call carries no client-side
/// timeout; the transcription stage bounds the whole request at its own
/// deadline.
pub struct HttpAsrEndpoint {
    client: Client,
    base_url: String,
}

impl HttpAsrEndpoint {
    /// Build a client for the service at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        reqwest::Url::parse(base_url)
            .map_err(|e| Error::ConfigFailedValidation(format!("Invalid URL: {}", e)))?;

        let client = Client::builder()
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| Error::ExecutionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpAsrEndpoint {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AsrEndpoint for HttpAsrEndpoint {
    async fn healthy(&self) -> bool {
        let probe = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;

        match probe {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(url = self.base_url, error = format!("{}", e), "health probe failed");
                false
            }
        }
    }

    async fn submit(&self, request: AsrRequest) -> Result<serde_json::Value, Error> {
        let response = self
            .client
            .post(format!("{}/asr", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::TranscriptionError(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TranscriptionError(format!(
                "service answered {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::TranscriptionError(format!("invalid response body: {}", e)))
    }
}
