use crate::config::SummarizerConfig;
use crate::provider::{ModelError, ModelResult, SummaryProvider};
use crate::types::{BackendHealth, SummaryRequest};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    summary: String,
}

/// Summarization backend reached over plain HTTP JSON.
pub struct HttpSummaryProvider {
    client: reqwest::Client,
    base_url: String,
    config: SummarizerConfig,
}

impl HttpSummaryProvider {
    pub fn new(config: SummarizerConfig) -> ModelResult<Self> {
        config
            .validate()
            .map_err(|msg| ModelError::InvalidConfig { message: msg })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Unknown {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.normalized_base_url(),
            config,
        })
    }

    pub fn with_default_config() -> ModelResult<Self> {
        Self::new(SummarizerConfig::default())
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    async fn check_status(response: reqwest::Response) -> ModelResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ModelError::from_status(status, &body))
    }
}

#[async_trait]
impl SummaryProvider for HttpSummaryProvider {
    async fn summarize(&self, request: SummaryRequest) -> ModelResult<String> {
        debug!(
            "Requesting {} summary with model {} ({} chars)",
            request.content_type.as_str(),
            request.model,
            request.content.len()
        );

        let url = format!("{}/api/summarize", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(ModelError::from_transport)?;

        let response = Self::check_status(response).await?;
        let body: SummarizeResponse = response.json().await.map_err(ModelError::Network)?;

        info!("Summary request completed successfully");
        Ok(body.summary)
    }

    async fn health_check(&self) -> ModelResult<BackendHealth> {
        debug!("Performing health check");

        let url = format!("{}/api/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ModelError::from_transport)?;

        match Self::check_status(response).await {
            Ok(response) => {
                let health: BackendHealth = response.json().await.map_err(ModelError::Network)?;
                info!("Health check returned status {}", health.status);
                Ok(health)
            }
            Err(e) => {
                error!("Health check failed: {}", e);
                Err(e)
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentType;
    use tokio_test::assert_ok;

    fn provider_for(server: &mockito::ServerGuard) -> HttpSummaryProvider {
        HttpSummaryProvider::new(SummarizerConfig::default().with_base_url(server.url())).unwrap()
    }

    #[test]
    fn test_provider_creation_rejects_invalid_config() {
        let config = SummarizerConfig::default().with_base_url("not-a-url");
        assert!(matches!(
            HttpSummaryProvider::new(config),
            Err(ModelError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_base_url_normalization() {
        let config = SummarizerConfig::default().with_base_url("http://localhost:3000/");
        let provider = HttpSummaryProvider::new(config).unwrap();
        assert_eq!(provider.base_url, "http://localhost:3000");
        assert_eq!(provider.provider_name(), "http");
    }

    #[tokio::test]
    async fn test_summarize_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/summarize")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "content_type": "commit",
                "model": "gpt-4o-mini"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"summary":"  Refactors the parser.  "}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let request = SummaryRequest::new("commit text", ContentType::Commit, "gpt-4o-mini");
        let summary = assert_ok!(provider.summarize(request).await);
        assert_eq!(summary, "  Refactors the parser.  ");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_summarize_maps_503_to_maintenance() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/summarize")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let provider = provider_for(&server);
        let request = SummaryRequest::new("x", ContentType::PullRequest, "m");
        let err = provider.summarize(request).await.unwrap_err();
        assert!(err.is_maintenance());
    }

    #[tokio::test]
    async fn test_summarize_returns_error_on_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/summarize")
            .with_status(200)
            .with_body("not valid json")
            .create_async()
            .await;

        let provider = provider_for(&server);
        let request = SummaryRequest::new("x", ContentType::PullRequest, "m");
        let result = provider.summarize(request).await;
        assert!(matches!(result, Err(ModelError::Network(_))));
    }

    #[tokio::test]
    async fn test_health_check() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/health")
            .with_status(200)
            .with_body(r#"{"status":"ok","fastapi_health":{"status":"healthy","rate_limit":{"limit":60,"remaining":59}}}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let health = assert_ok!(provider.health_check().await);
        assert!(!health.is_degraded());
        let rate_limit = health.fastapi_health.unwrap().rate_limit.unwrap();
        assert_eq!(rate_limit.remaining, Some(59));
    }
}
