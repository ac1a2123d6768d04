//! Ollama text-generation client
//!
//! Sends a single non-streaming prompt to `/api/generate` and returns the raw
//! completion. Interpreting the text is the decision engine's job.

use crate::error::{Result, SteeringError};
use crate::observability::NwdafMetrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// Deadline for one generation request
pub const LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// A model that completes a prompt
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Client for an Ollama server
pub struct OllamaClient {
    base_url: String,
    model: String,
    http: reqwest::Client,
    metrics: NwdafMetrics,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        metrics: NwdafMetrics,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(LLM_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            http,
            metrics,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SteeringError::backend(status, body));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SteeringError::Parse(format!("failed to decode response: {}", e)))?;

        let elapsed = start.elapsed();
        self.metrics.observe_llm_latency(elapsed.as_secs_f64());
        info!(
            model = %self.model,
            latency_ms = elapsed.as_millis() as u64,
            prompt_len = prompt.len(),
            response_len = body.response.len(),
            done = body.done,
            "LLM query completed"
        );

        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_generate_returns_completion() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::Json(json!({
                "model": "qwen2.5-coder",
                "prompt": "hello",
                "stream": false
            })))
            .with_status(200)
            .with_body(json!({"response": "{\"decision\":\"none\"}", "done": true}).to_string())
            .create_async()
            .await;

        let metrics = NwdafMetrics::new();
        let client = OllamaClient::new(server.url(), "qwen2.5-coder", metrics).unwrap();
        let text = client.generate("hello").await.unwrap();

        mock.assert_async().await;
        assert_eq!(text, r#"{"decision":"none"}"#);
    }

    #[tokio::test]
    async fn test_generate_non_success_is_backend_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(404)
            .with_body(r#"{"error":"model not found"}"#)
            .create_async()
            .await;

        let client = OllamaClient::new(server.url(), "missing", NwdafMetrics::new()).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, SteeringError::Backend { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_generate_bad_body_is_parse_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let client = OllamaClient::new(server.url(), "m", NwdafMetrics::new()).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, SteeringError::Parse(_)));
    }
}
