use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable overriding where JIRA issue links point.
pub const JIRA_BASE_URL_ENV: &str = "JIRA_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Browse base used to build outbound issue links, e.g. `https://acme.atlassian.net`.
    pub jira_browse_url: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout: Duration::from_secs(30),
            jira_browse_url: None,
        }
    }
}

impl ApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_jira_browse_url(mut self, url: impl Into<String>) -> Self {
        self.jira_browse_url = Some(url.into());
        self
    }

    /// Applies `JIRA_BASE_URL` when it is set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(JIRA_BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.jira_browse_url = Some(url);
            }
        }
        self
    }

    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if let Some(jira) = &self.jira_browse_url {
            if !jira.starts_with("http://") && !jira.starts_with("https://") {
                return Err("JIRA browse URL must start with http:// or https://".to_string());
            }
        }

        if self.timeout.is_zero() {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert!(config.jira_browse_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ApiConfig::default();

        config.base_url = "".to_string();
        assert!(config.validate().is_err());

        config.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.base_url = "http://localhost:3000/".to_string();
        assert_eq!(config.normalized_base_url(), "http://localhost:3000");
        config.jira_browse_url = Some("acme.atlassian.net".to_string());
        assert!(config.validate().is_err());

        config.jira_browse_url = Some("https://acme.atlassian.net".to_string());
        config.timeout = Duration::from_secs(0);
        assert!(config.validate().is_err());
    }
}
