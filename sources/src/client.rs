use crate::config::ApiConfig;
use crate::error::{SourceError, SourceResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// HTTP client for the dashboard API: GitHub proxy, JIRA integration and
/// dependency-graph endpoints all live behind one base URL.
pub struct ProxyClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) config: ApiConfig,
}

impl ProxyClient {
    pub fn new(config: ApiConfig) -> SourceResult<Self> {
        config
            .validate()
            .map_err(|message| SourceError::InvalidConfig { message })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::InvalidConfig {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: config.normalized_base_url(),
            config,
        })
    }

    pub fn with_default_config() -> SourceResult<Self> {
        Self::new(ApiConfig::default())
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> SourceResult<T> {
        debug!("GET {} ({})", path, resource);
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(SourceError::from_transport)?;
        let response = Self::check_status(response, resource).await?;
        response.json().await.map_err(SourceError::Network)
    }

    pub(crate) async fn get_text(
        &self,
        path: &str,
        query: &[(&str, String)],
        resource: &str,
    ) -> SourceResult<String> {
        debug!("GET {} ({})", path, resource);
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(SourceError::from_transport)?;
        let response = Self::check_status(response, resource).await?;
        response.text().await.map_err(SourceError::Network)
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        resource: &str,
    ) -> SourceResult<T> {
        debug!("POST {} ({})", path, resource);
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(SourceError::from_transport)?;
        let response = Self::check_status(response, resource).await?;
        response.json().await.map_err(SourceError::Network)
    }

    async fn check_status(
        response: reqwest::Response,
        resource: &str,
    ) -> SourceResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SourceError::from_status(status, resource, &body))
    }
}
