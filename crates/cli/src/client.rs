//! HTTP client for the NWDAF SBI

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

/// Client for a running NWDAF
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid NWDAF URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        Ok(response)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.client.get(self.url(path)?)).await?;
        response.json().await.context("Failed to parse response")
    }

    /// GET a plain-text body
    pub async fn get_text(&self, path: &str) -> Result<String> {
        let response = self.send(self.client.get(self.url(path)?)).await?;
        response.text().await.context("Failed to read response")
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .send(self.client.post(self.url(path)?).json(body))
            .await?;
        response.json().await.context("Failed to parse response")
    }

    /// POST a JSON body and return the plain-text reply
    pub async fn post_text<B: Serialize>(&self, path: &str, body: &B) -> Result<String> {
        let response = self
            .send(self.client.post(self.url(path)?).json(body))
            .await?;
        response.text().await.context("Failed to read response")
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .send(self.client.put(self.url(path)?).json(body))
            .await?;
        response.json().await.context("Failed to parse response")
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.client.delete(self.url(path)?)).await?;
        Ok(())
    }
}
