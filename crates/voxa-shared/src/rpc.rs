//! Request and response bodies for the voxad HTTP API.

use serde::{Deserialize, Serialize};

/// Default number of suggestions returned by `/v1/suggestions`
pub const DEFAULT_SUGGESTIONS: usize = 3;

/// Body of `POST /v1/command`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

/// Query string of `GET /v1/suggestions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

/// Body of `POST /v1/summarize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}
