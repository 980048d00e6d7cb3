//! Cached AI summaries of the JIRA issues linked to a pull request.

use crate::cache::TtlCache;
use crate::error::DashboardResult;
use sources::{JiraApi, JiraIssue};
use std::sync::Arc;
use tracing::{debug, info};

/// Cache key for a set of issues on one pull request.
///
/// Keys are sorted and deduplicated first, so the order the issues were found
/// in does not matter.
///
/// ```
/// use dashboard::jira_summary::cache_key;
///
/// let key = cache_key(&["ABC-2", "ABC-1", "ABC-2"], 42, "org/repo");
/// assert_eq!(key, "ABC-1,ABC-2:42:org/repo");
/// ```
pub fn cache_key<S: AsRef<str>>(issue_keys: &[S], pr_number: u64, repo: &str) -> String {
    let mut keys: Vec<&str> = issue_keys.iter().map(AsRef::as_ref).collect();
    keys.sort_unstable();
    keys.dedup();
    format!("{}:{}:{}", keys.join(","), pr_number, repo)
}

pub struct JiraSummaryCache {
    jira: Arc<dyn JiraApi>,
    cache: TtlCache<String, String>,
    model: String,
}

impl JiraSummaryCache {
    /// `cache` decides lifetime and capacity; pass [`TtlCache::unbounded`] to
    /// keep summaries for the life of the process.
    pub fn new(jira: Arc<dyn JiraApi>, cache: TtlCache<String, String>, model: impl Into<String>) -> Self {
        Self {
            jira,
            cache,
            model: model.into(),
        }
    }

    /// Looks up a cached summary without touching the network.
    pub fn probe(&self, issues: &[JiraIssue], pr_number: u64, repo: &str) -> Option<String> {
        self.cache.get(&Self::key_for(issues, pr_number, repo))
    }

    pub async fn get_or_generate(
        &self,
        issues: &[JiraIssue],
        pr_number: u64,
        repo: &str,
    ) -> DashboardResult<String> {
        let key = Self::key_for(issues, pr_number, repo);
        if let Some(summary) = self.cache.get(&key) {
            debug!("JIRA summary cache hit for {}", key);
            return Ok(summary);
        }

        info!("Generating JIRA summary for {} issues on {}#{}", issues.len(), repo, pr_number);
        let summary = self.jira.summarize_issues(issues, &self.model).await?;
        let summary = summary.trim().to_string();
        self.cache.insert(key, summary.clone());
        Ok(summary)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    fn key_for(issues: &[JiraIssue], pr_number: u64, repo: &str) -> String {
        let keys: Vec<&str> = issues.iter().map(|i| i.key.as_str()).collect();
        cache_key(&keys, pr_number, repo)
    }
}
