use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::types::{GenerateContentRequest, GenerateContentResponse};
use crate::subscription::aggregator::{DiscoveryResponse, DiscoverySource};
use crate::subscription::summary::Summarizer;
use crate::Config;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Upper bound for one generateContent call; grounded search answers are slow
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("request to Gemini failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error ({status}): {body}")]
    Api { status: StatusCode, body: String },
}

/// REST client for the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    discovery_model: String,
    summary_model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        let defaults = Config::default();
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::new(),
            base_url: defaults.gemini_base_url,
            discovery_model: defaults.discovery_model,
            summary_model: defaults.summary_model,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Client for the configured credential; `None` without one
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.api_key.as_deref()?;
        Some(
            Self::new(api_key)
                .with_base_url(&config.gemini_base_url)
                .with_models(&config.discovery_model, &config.summary_model),
        )
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_models(mut self, discovery: &str, summary: &str) -> Self {
        self.discovery_model = discovery.to_string();
        self.summary_model = summary.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    pub(crate) async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        debug!(model, grounded = !request.tools.is_empty(), "Gemini generateContent request");

        let response = self
            .http
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, &self.api_key)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            return Err(GeminiError::Api { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl DiscoverySource for GeminiClient {
    async fn discover(&self, prompt: &str) -> crate::Result<DiscoveryResponse> {
        let request = GenerateContentRequest::new(prompt).with_google_search();
        let response = self.generate(&self.discovery_model, &request).await?;
        Ok(response.into_discovery())
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(&self, prompt: &str) -> crate::Result<String> {
        let request = GenerateContentRequest::new(prompt);
        let response = self.generate(&self.summary_model, &request).await?;
        Ok(response.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;

    #[test]
    fn test_from_config_requires_key() {
        assert!(GeminiClient::from_config(&Config::default()).is_none());

        let config = Config::default().with_api_key("k");
        let client = GeminiClient::from_config(&config).unwrap();
        assert_eq!(client.discovery_model, config.discovery_model);
        assert_eq!(client.summary_model, config.summary_model);
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("k").with_base_url("http://localhost:9000/v1beta/");
        assert_eq!(
            client.endpoint("gemini-test"),
            "http://localhost:9000/v1beta/models/gemini-test:generateContent"
        );
    }

    #[tokio::test]
    async fn test_stalled_service_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and never answer
            if let Ok((socket, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(socket);
            }
        });

        let client = GeminiClient::new("k")
            .with_base_url(&format!("http://{}", addr))
            .with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let err = client.discover("find").await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        let err = err.downcast::<GeminiError>().unwrap();
        assert!(matches!(err, GeminiError::Http(ref e) if e.is_timeout()));
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(GeminiClient::new("k").timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_error() {
        let client = GeminiClient::new("k").with_base_url("http://127.0.0.1:1");
        assert!(client.discover("find").await.is_err());
    }
}
