//! In-process fakes for the backend traits.

#![allow(dead_code)]

use async_trait::async_trait;
use model::{BackendHealth, ContentType, ModelError, ModelResult, SummaryProvider, SummaryRequest};
use sources::{
    Commit, CommitFiles, CommitStats, FileChange, FileSummary, GitHubApi, Issue, IssueState,
    JiraApi, JiraCorrelation, JiraIssue, PullRequest, PullRequestFiles, PullRequestState, RepoRef,
    Repository, SearchIssueItem, SearchQuery, SourceError, SourceResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(String),
    End(String),
}

pub fn file(name: &str, patch: &str) -> FileChange {
    FileChange {
        filename: name.to_string(),
        status: "modified".to_string(),
        additions: 2,
        deletions: 1,
        changes: 3,
        patch: Some(patch.to_string()),
        sha: Some(format!("sha-{}", name)),
    }
}

pub fn jira_issue(key: &str) -> JiraIssue {
    JiraIssue {
        key: key.to_string(),
        summary: format!("Summary of {}", key),
        status: "Open".to_string(),
        issue_type: "Task".to_string(),
        assignee: None,
        description: None,
    }
}

/// Requests outstanding across every fake sharing it.
#[derive(Default)]
pub struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Gauge {
    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

/// GitHub fake that records call order and concurrency.
#[derive(Default)]
pub struct FakeGitHub {
    pub failing: HashSet<String>,
    pub delays: HashMap<String, Duration>,
    pub files: Vec<FileChange>,
    pub events: Mutex<Vec<Event>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub file_calls: AtomicUsize,
    pub gauge: Option<Arc<Gauge>>,
    pub listed_commits: Vec<Commit>,
    pub listed_pull_requests: Vec<PullRequest>,
    pub list_calls: AtomicUsize,
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, id: impl Into<String>) -> Self {
        self.failing.insert(id.into());
        self
    }

    pub fn with_delay(mut self, id: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(id.into(), delay);
        self
    }

    pub fn with_files(mut self, files: Vec<FileChange>) -> Self {
        self.files = files;
        self
    }

    pub fn listing(mut self, commits: Vec<Commit>, pull_requests: Vec<PullRequest>) -> Self {
        self.listed_commits = commits;
        self.listed_pull_requests = pull_requests;
        self
    }

    pub fn with_gauge(mut self, gauge: Arc<Gauge>) -> Self {
        self.gauge = Some(gauge);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.file_calls.load(Ordering::SeqCst)
    }

    async fn track(&self, id: String) -> SourceResult<()> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(gauge) = &self.gauge {
            gauge.enter();
        }
        self.events.lock().unwrap().push(Event::Start(id.clone()));

        let delay = self
            .delays
            .get(&id)
            .copied()
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(delay).await;

        self.events.lock().unwrap().push(Event::End(id.clone()));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(gauge) = &self.gauge {
            gauge.exit();
        }

        if self.failing.contains(&id) {
            return Err(SourceError::Api {
                status: 500,
                message: format!("files for {} unavailable", id),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn list_repositories(&self) -> SourceResult<Vec<Repository>> {
        Ok(Vec::new())
    }

    async fn list_pull_requests(
        &self,
        _repo: &str,
        _state: PullRequestState,
    ) -> SourceResult<Vec<PullRequest>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.listed_pull_requests.clone())
    }

    async fn list_commits(&self, _repo: &str) -> SourceResult<Vec<Commit>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.listed_commits.clone())
    }

    async fn list_issues(&self, _repo: &RepoRef, _state: IssueState) -> SourceResult<Vec<Issue>> {
        Ok(Vec::new())
    }

    async fn pull_request_files(&self, _repo: &str, number: u64) -> SourceResult<PullRequestFiles> {
        self.track(number.to_string()).await?;
        Ok(PullRequestFiles {
            files: self.files.clone(),
            summary: FileSummary {
                additions: number * 10,
                deletions: number,
                changed_files: self.files.len() as u64,
            },
        })
    }

    async fn commit_files(&self, _repo: &str, sha: &str) -> SourceResult<CommitFiles> {
        self.track(sha.to_string()).await?;
        Ok(CommitFiles {
            files: self.files.clone(),
            stats: CommitStats {
                additions: 5,
                deletions: 3,
                total: 8,
            },
        })
    }

    async fn file_diff(&self, _repo: &str, _reference: &str, _filename: &str) -> SourceResult<String> {
        Ok(String::new())
    }

    async fn search_page(&self, _query: &SearchQuery, _page: u32) -> SourceResult<Vec<SearchIssueItem>> {
        Ok(Vec::new())
    }
}

/// JIRA fake: every pull request links the issues named in its title.
#[derive(Default)]
pub struct FakeJira {
    pub failing: AtomicBool,
    pub correlation_calls: AtomicUsize,
    pub summary_calls: AtomicUsize,
    pub gauge: Option<Arc<Gauge>>,
}

impl FakeJira {
    pub fn failing() -> Self {
        let jira = Self::default();
        jira.set_failing(true);
        jira
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }


    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JiraApi for FakeJira {
    async fn pull_request_issues(
        &self,
        _repo: &str,
        pull_request: &PullRequest,
    ) -> SourceResult<JiraCorrelation> {
        self.correlation_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gauge) = &self.gauge {
            gauge.enter();
            tokio::time::sleep(Duration::from_millis(10)).await;
            gauge.exit();
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::ServiceUnavailable {
                message: "jira down".to_string(),
            });
        }
        let keys = sources::extract_issue_keys(&pull_request.title);
        Ok(JiraCorrelation {
            jira_issues: keys.iter().map(|k| jira_issue(k)).collect(),
            jira_references: keys,
        })
    }

    async fn summarize_issues(&self, issues: &[JiraIssue], _model: &str) -> SourceResult<String> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let keys: Vec<&str> = issues.iter().map(|i| i.key.as_str()).collect();
        Ok(format!("  Summary for {}  ", keys.join(" and ")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    Unavailable,
    Timeout,
    Other,
}

/// Summary provider that answers after a delay chosen by prompt content.
#[derive(Default)]
pub struct FakeProvider {
    pub delays: Vec<(String, Duration)>,
    pub failure: Mutex<Option<ProviderFailure>>,
    pub prompts: Mutex<Vec<(ContentType, String)>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompts containing `needle` take `delay` to answer.
    pub fn with_delay(mut self, needle: impl Into<String>, delay: Duration) -> Self {
        self.delays.push((needle.into(), delay));
        self
    }

    pub fn fail_with(&self, failure: Option<ProviderFailure>) {
        *self.failure.lock().unwrap() = failure;
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl SummaryProvider for FakeProvider {
    async fn summarize(&self, request: SummaryRequest) -> ModelResult<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((request.content_type, request.content.clone()));

        let delay = self
            .delays
            .iter()
            .find(|(needle, _)| request.content.contains(needle.as_str()))
            .map(|(_, d)| *d)
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(delay).await;

        let failure = *self.failure.lock().unwrap();
        match failure {
            Some(ProviderFailure::Unavailable) => Err(ModelError::Maintenance {
                message: "maintenance".to_string(),
            }),
            Some(ProviderFailure::Timeout) => Err(ModelError::ServiceUnavailable {
                message: "Request timeout".to_string(),
            }),
            Some(ProviderFailure::Other) => Err(ModelError::Unknown {
                message: "boom".to_string(),
            }),
            None => {
                let title = request
                    .content
                    .lines()
                    .find(|l| l.starts_with("PULL REQUEST:") || l.starts_with("COMMIT:"))
                    .unwrap_or("entity")
                    .to_string();
                Ok(format!("\n  Summary of {}  \n", title))
            }
        }
    }

    async fn health_check(&self) -> ModelResult<BackendHealth> {
        Ok(BackendHealth {
            status: "ok".to_string(),
            fastapi_health: None,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
