//! Pull request and commit enrichment
//!
//! List endpoints return cheap records; file statistics and JIRA links need a
//! follow-up request per item. Items are processed in fixed-size batches:
//! every request in a batch runs concurrently, the batch is awaited in full
//! (failures included) and only then does the next batch start, after a short
//! pause. File statistics and JIRA links are fetched in two separate passes,
//! so at most `batch_size` requests are outstanding at any moment. A failed
//! item is logged and left as it was; it never affects its siblings or aborts
//! the run.

use crate::cache::TtlCache;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sources::{Commit, FileSummary, GitHubApi, JiraApi, JiraIssue, PullRequest};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for enrichment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Maximum requests in flight at once
    pub batch_size: usize,
    /// Pause between consecutive batches, in milliseconds
    pub batch_delay_ms: u64,
    /// How long an enriched item stays cached, in seconds
    pub cache_ttl_secs: u64,
    /// Look up JIRA issues for pull requests
    pub correlate_jira: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay_ms: 100,
            cache_ttl_secs: 600,
            correlate_jira: true,
        }
    }
}

impl EnrichmentConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("Batch size must be greater than 0".to_string());
        }
        if self.cache_ttl_secs == 0 {
            return Err("Cache TTL must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Result of an enrichment run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentReport {
    /// Items that gained file statistics, fetched or cached
    pub enriched_count: usize,
    /// Items served from the cache
    pub cache_hits: usize,
    /// Identities (`repo:number` or `repo:sha`) whose file fetch failed
    pub failed: Vec<String>,
    /// Number of file statistics batches issued
    pub batches: usize,
    /// Number of JIRA correlation batches issued
    pub correlation_batches: usize,
}

/// Runs `work` over `items` in batches of `batch_size`.
///
/// All futures of a batch are awaited before the next batch is created, and
/// `delay` is slept between batches. Output order matches input order.
pub async fn run_in_batches<'a, T, R, F, Fut>(
    items: &'a [T],
    batch_size: usize,
    delay: Duration,
    mut work: F,
) -> Vec<R>
where
    F: FnMut(&'a T) -> Fut,
    Fut: Future<Output = R>,
{
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(items.len());

    for (index, batch) in items.chunks(batch_size).enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        debug!("Starting batch {} with {} items", index + 1, batch.len());
        let outcomes = join_all(batch.iter().map(&mut work)).await;
        results.extend(outcomes);
    }

    results
}

enum ItemOutcome<V> {
    Cached(V),
    Fetched(V),
    Failed,
}

pub struct EnrichmentPipeline {
    github: Arc<dyn GitHubApi>,
    jira: Option<Arc<dyn JiraApi>>,
    config: EnrichmentConfig,
    pull_requests: TtlCache<String, FileSummary>,
    jira_links: TtlCache<String, Vec<JiraIssue>>,
    commits: TtlCache<String, FileSummary>,
}

impl EnrichmentPipeline {
    pub fn new(github: Arc<dyn GitHubApi>, config: EnrichmentConfig) -> Self {
        let ttl = config.cache_ttl();
        Self {
            github,
            jira: None,
            config,
            pull_requests: TtlCache::with_ttl(ttl),
            jira_links: TtlCache::with_ttl(ttl),
            commits: TtlCache::with_ttl(ttl),
        }
    }

    pub fn with_jira(mut self, jira: Arc<dyn JiraApi>) -> Self {
        self.jira = Some(jira);
        self
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    fn pull_request_key(repo: &str, number: u64) -> String {
        format!("{}:{}", repo, number)
    }

    fn commit_key(repo: &str, sha: &str) -> String {
        format!("{}:{}", repo, sha)
    }

    fn correlates_jira(&self) -> Option<&Arc<dyn JiraApi>> {
        self.jira.as_ref().filter(|_| self.config.correlate_jira)
    }

    /// Attaches file statistics and JIRA issues to each pull request.
    /// The returned list has the same order and length as the input.
    pub async fn enrich_pull_requests(
        &self,
        repo: &str,
        pull_requests: Vec<PullRequest>,
    ) -> (Vec<PullRequest>, EnrichmentReport) {
        info!("Enriching {} pull requests for {}", pull_requests.len(), repo);

        let outcomes = run_in_batches(
            &pull_requests,
            self.config.batch_size,
            self.config.batch_delay(),
            |pr| self.pull_request_summary(repo, pr),
        )
        .await;

        let mut report = EnrichmentReport {
            batches: pull_requests.len().div_ceil(self.config.batch_size.max(1)),
            ..Default::default()
        };

        let mut enriched: Vec<PullRequest> = pull_requests
            .into_iter()
            .zip(outcomes)
            .map(|(mut pr, outcome)| {
                let summary = match outcome {
                    ItemOutcome::Cached(summary) => {
                        report.cache_hits += 1;
                        summary
                    }
                    ItemOutcome::Fetched(summary) => summary,
                    ItemOutcome::Failed => {
                        report.failed.push(Self::pull_request_key(repo, pr.number));
                        return pr;
                    }
                };
                report.enriched_count += 1;
                pr.file_summary = Some(summary);
                pr
            })
            .collect();

        if let Some(jira) = self.correlates_jira() {
            report.correlation_batches = self.correlate_jira(jira.as_ref(), repo, &mut enriched).await;
        }

        info!(
            "Enriched {} pull requests ({} cached, {} failed)",
            report.enriched_count,
            report.cache_hits,
            report.failed.len()
        );
        (enriched, report)
    }

    async fn pull_request_summary(&self, repo: &str, pr: &PullRequest) -> ItemOutcome<FileSummary> {
        let key = Self::pull_request_key(repo, pr.number);
        if let Some(summary) = self.pull_requests.get(&key) {
            debug!("Cache hit for {}", key);
            return ItemOutcome::Cached(summary);
        }

        match self.github.pull_request_files(repo, pr.number).await {
            Ok(files) => {
                self.pull_requests.insert(key, files.summary);
                ItemOutcome::Fetched(files.summary)
            }
            Err(e) => {
                warn!("Failed to fetch files for {}: {}", key, e);
                ItemOutcome::Failed
            }
        }
    }

    /// Second pass over the pull requests that gained file statistics.
    /// Only successful lookups are cached, so a JIRA outage is retried on the
    /// next run. Returns the number of batches issued.
    async fn correlate_jira(&self, jira: &dyn JiraApi, repo: &str, pull_requests: &mut [PullRequest]) -> usize {
        let mut pending = Vec::new();
        for (index, pr) in pull_requests.iter_mut().enumerate() {
            if pr.file_summary.is_none() {
                continue;
            }
            match self.jira_links.get(&Self::pull_request_key(repo, pr.number)) {
                Some(issues) => pr.jira_issues = Some(issues),
                None => pending.push(index),
            }
        }
        if pending.is_empty() {
            return 0;
        }

        if !self.config.batch_delay().is_zero() {
            tokio::time::sleep(self.config.batch_delay()).await;
        }
        debug!("Correlating {} pull requests with JIRA", pending.len());

        let listed: &[PullRequest] = pull_requests;
        let lookups = run_in_batches(
            &pending,
            self.config.batch_size,
            self.config.batch_delay(),
            |index| {
                let pr = &listed[*index];
                async move {
                    let key = Self::pull_request_key(repo, pr.number);
                    match jira.pull_request_issues(repo, pr).await {
                        Ok(correlation) => {
                            self.jira_links.insert(key, correlation.jira_issues.clone());
                            Some(correlation.jira_issues)
                        }
                        Err(e) => {
                            warn!("JIRA lookup failed for {}: {}", key, e);
                            None
                        }
                    }
                }
            },
        )
        .await;

        for (index, issues) in pending.iter().zip(lookups) {
            if issues.is_some() {
                pull_requests[*index].jira_issues = issues;
            }
        }
        pending.len().div_ceil(self.config.batch_size.max(1))
    }

    /// Attaches file statistics to each commit.
    pub async fn enrich_commits(&self, repo: &str, commits: Vec<Commit>) -> (Vec<Commit>, EnrichmentReport) {
        info!("Enriching {} commits for {}", commits.len(), repo);

        let outcomes = run_in_batches(
            &commits,
            self.config.batch_size,
            self.config.batch_delay(),
            |commit| self.commit_summary(repo, commit),
        )
        .await;

        let mut report = EnrichmentReport {
            batches: commits.len().div_ceil(self.config.batch_size.max(1)),
            ..Default::default()
        };

        let enriched = commits
            .into_iter()
            .zip(outcomes)
            .map(|(mut commit, outcome)| {
                let summary = match outcome {
                    ItemOutcome::Cached(summary) => {
                        report.cache_hits += 1;
                        summary
                    }
                    ItemOutcome::Fetched(summary) => summary,
                    ItemOutcome::Failed => {
                        report.failed.push(Self::commit_key(repo, &commit.sha));
                        return commit;
                    }
                };
                report.enriched_count += 1;
                commit.file_summary = Some(summary);
                commit
            })
            .collect();

        (enriched, report)
    }

    async fn commit_summary(&self, repo: &str, commit: &Commit) -> ItemOutcome<FileSummary> {
        let key = Self::commit_key(repo, &commit.sha);
        if let Some(summary) = self.commits.get(&key) {
            return ItemOutcome::Cached(summary);
        }

        match self.github.commit_files(repo, &commit.sha).await {
            Ok(files) => {
                let summary = files.summary();
                self.commits.insert(key, summary);
                ItemOutcome::Fetched(summary)
            }
            Err(e) => {
                warn!("Failed to fetch files for {}: {}", key, e);
                ItemOutcome::Failed
            }
        }
    }

    /// Forgets cached enrichment so the next run refetches everything.
    pub fn clear_cache(&self) {
        self.pull_requests.clear();
        self.jira_links.clear();
        self.commits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrichment_config_default() {
        let config = EnrichmentConfig::default();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.batch_delay(), Duration::from_millis(100));
        assert!(config.correlate_jira);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_enrichment_config_validation() {
        let config = EnrichmentConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_in_batches_preserves_order() {
        let items: Vec<u64> = (1..=12).collect();
        let results = run_in_batches(&items, 5, Duration::from_millis(100), |n| {
            let n = *n;
            async move {
                // Later items finish first within a batch.
                tokio::time::sleep(Duration::from_millis(100 - n)).await;
                n * 10
            }
        })
        .await;
        assert_eq!(results, (1..=12).map(|n| n * 10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_run_in_batches_empty_input() {
        let items: Vec<u8> = Vec::new();
        let results: Vec<u8> = run_in_batches(&items, 5, Duration::ZERO, |n| {
            let n = *n;
            async move { n }
        })
        .await;
        assert!(results.is_empty());
    }
}
