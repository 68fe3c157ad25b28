//! HTTP client for an OpenAI-compatible chat completions API.

use std::time::Duration;

use url::Url;

use crate::{
    types::{ChatRequest, ChatResponse},
    Error,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat completions client.
///
/// Each request builds a fresh `reqwest::Client` with a 60-second timeout and
/// sends the API key as a bearer token.
pub struct Client {
    /// Base URL for the API, without a trailing slash.
    base_api_url: String,
    api_key: String,
}

impl Client {
    /// Creates a client pointing at the public OpenAI API.
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Creates a client with a custom base URL: a compatible gateway, or
    /// wiremock in tests.
    pub fn with_base_url(base_url: &str, api_key: &str) -> Self {
        Self {
            base_api_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_api_url
    }

    fn get_url(&self, path: &str) -> Result<Url, Error> {
        Url::parse(format!("{}{}", &self.base_api_url, path).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::InvalidUrl(e.to_string())
        })
    }

    /// Sends one chat completion request.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, Error> {
        let url = self.get_url("/chat/completions")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed
            })?;
        tracing::debug!("POST {} model={}", url, request.model);
        let resp = client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send completion request: {}", e);
                Error::RequestFailed
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            Error::RequestFailed
        })?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Completion failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        serde_json::from_str::<ChatResponse>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse completion: {} | body: {}", e, snippet);
            Error::UnexpectedResponse(e.to_string())
        })
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
