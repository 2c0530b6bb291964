//! HTTP client for communicating with voxad.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use voxa_shared::rpc::{
    CommandRequest, HealthResponse, SuggestionsResponse, SummarizeRequest, SummarizeResponse,
};
use voxa_shared::{CommandResponse, VoxaError};

/// Covers fallback model latency plus slack
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// What the listen loop needs from the daemon
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn command(&self, command: &str) -> Result<CommandResponse, VoxaError>;

    async fn suggestions(&self, limit: usize) -> Result<Vec<String>, VoxaError>;
}

/// Client for communicating with voxad
pub struct VoxadClient {
    http: reqwest::Client,
    base_url: String,
}

impl VoxadClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn summarize(&self, command: &str) -> Result<String, VoxaError> {
        let body = SummarizeRequest {
            command: command.to_string(),
        };
        let response: SummarizeResponse = self.post("/v1/summarize", &body).await?;
        Ok(response.summary)
    }

    pub async fn health(&self) -> Result<HealthResponse, VoxaError> {
        self.get("/v1/health").await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, VoxaError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, VoxaError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Self::decode(response).await
    }

    fn transport_error(&self, e: reqwest::Error) -> VoxaError {
        if e.is_connect() {
            VoxaError::DaemonNotRunning(self.base_url.clone())
        } else {
            VoxaError::Http(e.to_string())
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, VoxaError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| VoxaError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(VoxaError::Daemon {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Assistant for VoxadClient {
    async fn command(&self, command: &str) -> Result<CommandResponse, VoxaError> {
        let body = CommandRequest {
            command: command.to_string(),
        };
        self.post("/v1/command", &body).await
    }

    async fn suggestions(&self, limit: usize) -> Result<Vec<String>, VoxaError> {
        let response: SuggestionsResponse =
            self.get(&format!("/v1/suggestions?limit={}", limit)).await?;
        Ok(response.suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = VoxadClient::new("http://127.0.0.1:7878/");
        assert_eq!(client.base_url(), "http://127.0.0.1:7878");
    }

    #[tokio::test]
    async fn test_unreachable_daemon() {
        // Port 9 (discard) is closed on test machines
        let client = VoxadClient::new("http://127.0.0.1:9");
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, VoxaError::DaemonNotRunning(_)), "got {:?}", err);
    }
}
