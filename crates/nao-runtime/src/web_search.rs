//! Web search collaborator.
//!
//! [`SerperClient`] posts `{"q": query}` to the Serper Google-search API and
//! hands the raw response body back; the planner pastes it into the prompt
//! untouched.

use std::time::Duration;

use async_trait::async_trait;
use nao_types::NaoError;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Default Serper endpoint.
pub const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";

#[derive(Error, Debug)]
pub enum WebSearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no web search API key configured")]
    MissingApiKey,
}

impl From<WebSearchError> for NaoError {
    fn from(e: WebSearchError) -> Self {
        NaoError::WebSearch(e.to_string())
    }
}

/// Anything that can answer a free-text query with a text blob.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, WebSearchError>;
}

#[derive(Serialize)]
struct SearchBody<'a> {
    q: &'a str,
}

pub struct SerperClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl SerperClient {
    /// # Errors
    ///
    /// [`WebSearchError::MissingApiKey`] for a blank key,
    /// [`WebSearchError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, WebSearchError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(WebSearchError::MissingApiKey);
        }
        Ok(Self {
            endpoint: SERPER_ENDPOINT.to_string(),
            api_key,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Point the client at a different endpoint (a proxy or a test server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl WebSearch for SerperClient {
    async fn search(&self, query: &str) -> Result<String, WebSearchError> {
        debug!(endpoint = %self.endpoint, "web search");
        let body = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchBody { q: query })
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_rejected() {
        let err = SerperClient::new("  ", Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, WebSearchError::MissingApiKey));
    }

    #[test]
    fn endpoint_defaults_to_serper() {
        let client = SerperClient::new("key", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint, SERPER_ENDPOINT);
        let client = client.with_endpoint("http://localhost:9999/search");
        assert_eq!(client.endpoint, "http://localhost:9999/search");
    }

    #[test]
    fn body_is_q_object() {
        let json = serde_json::to_value(SearchBody { q: "weather in Dhaka" }).unwrap();
        assert_eq!(json, serde_json::json!({"q": "weather in Dhaka"}));
    }

    #[test]
    fn error_maps_to_web_search_variant() {
        let err: NaoError = WebSearchError::MissingApiKey.into();
        assert!(matches!(err, NaoError::WebSearch(_)));
    }
}
