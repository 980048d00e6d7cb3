//! Dashboard configuration
//!
//! Loaded from an optional TOML file; every section has defaults so an empty
//! file (or no file) is valid. A few environment variables override the file.

use crate::enrichment::EnrichmentConfig;
use crate::error::{DashboardError, DashboardResult};
use crate::insights::InsightThresholds;
use crate::requester::SummaryConfig;
use crate::streaming::StreamConfig;
use model::SummarizerConfig;
use serde::{Deserialize, Serialize};
use sources::{ApiConfig, JIRA_BASE_URL_ENV};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const API_BASE_URL_ENV: &str = "INSIGHT_API_BASE_URL";
pub const MODEL_ENV: &str = "INSIGHT_MODEL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the dashboard backend
    pub api_base_url: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Browse base for outbound JIRA links
    pub jira_base_url: Option<String>,
    /// Cache lifetime for JIRA summaries; unset keeps them for the process lifetime
    pub jira_summary_ttl_secs: Option<u64>,
    pub jira_summary_capacity: Option<usize>,
    pub enrichment: EnrichmentConfig,
    pub summary: SummaryConfig,
    pub chat: StreamConfig,
    pub insights: InsightThresholds,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
            jira_base_url: None,
            jira_summary_ttl_secs: None,
            jira_summary_capacity: None,
            enrichment: EnrichmentConfig::default(),
            summary: SummaryConfig::default(),
            chat: StreamConfig::default(),
            insights: InsightThresholds::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(text: &str) -> DashboardResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> DashboardResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Loads `path` if given, applies environment overrides and validates.
    pub fn load(path: Option<&Path>) -> DashboardResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        }
        .with_env_overrides();

        config
            .validate()
            .map_err(|message| DashboardError::InvalidConfig { message })?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = non_empty_env(API_BASE_URL_ENV) {
            self.api_base_url = url;
        }
        if let Some(model) = non_empty_env(MODEL_ENV) {
            self.summary.model = model;
        }
        if let Some(url) = non_empty_env(JIRA_BASE_URL_ENV) {
            self.jira_base_url = Some(url);
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn jira_summary_ttl(&self) -> Option<Duration> {
        self.jira_summary_ttl_secs.map(Duration::from_secs)
    }

    pub fn api_config(&self) -> ApiConfig {
        let config = ApiConfig::new()
            .with_base_url(&self.api_base_url)
            .with_timeout(self.timeout());
        match &self.jira_base_url {
            Some(url) => config.with_jira_browse_url(url),
            None => config,
        }
    }

    pub fn summarizer_config(&self) -> SummarizerConfig {
        SummarizerConfig::new()
            .with_base_url(&self.api_base_url)
            .with_timeout(self.timeout())
            .with_default_model(&self.summary.model)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_base_url.trim().is_empty() {
            return Err("API base URL cannot be empty".to_string());
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err("API base URL must start with http:// or https://".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }
        if self.jira_summary_capacity == Some(0) {
            return Err("JIRA summary capacity must be greater than 0".to_string());
        }
        self.enrichment.validate()?;
        self.summary.validate()?;
        self.insights.validate()?;
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
