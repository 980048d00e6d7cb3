use crate::client::ProxyClient;
use crate::error::SourceResult;
use crate::types::{JiraCorrelation, JiraIssue, PullRequest};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, info};

/// JIRA integration endpoints.
#[async_trait]
pub trait JiraApi: Send + Sync {
    /// Issues referenced by a pull request in the given repository.
    async fn pull_request_issues(
        &self,
        repo: &str,
        pull_request: &PullRequest,
    ) -> SourceResult<JiraCorrelation>;

    /// AI summary of a set of issues.
    async fn summarize_issues(&self, issues: &[JiraIssue], model: &str) -> SourceResult<String>;
}

#[derive(Serialize)]
struct PullRequestIssuesBody<'a> {
    repo: &'a str,
    pull_request: &'a PullRequest,
}

#[derive(Serialize)]
struct SummarizeIssuesBody<'a> {
    issues: &'a [JiraIssue],
    model: &'a str,
}

#[derive(Deserialize)]
struct SummarizeIssuesResponse {
    summary: String,
}

#[async_trait]
impl JiraApi for ProxyClient {
    async fn pull_request_issues(
        &self,
        repo: &str,
        pull_request: &PullRequest,
    ) -> SourceResult<JiraCorrelation> {
        let body = PullRequestIssuesBody { repo, pull_request };
        let correlation: JiraCorrelation = self
            .post_json(
                "/api/jira/pull-request",
                &body,
                &format!("{}#{}", repo, pull_request.number),
            )
            .await?;
        debug!(
            "PR {}#{} references {} JIRA issues",
            repo,
            pull_request.number,
            correlation.jira_issues.len()
        );
        Ok(correlation)
    }

    async fn summarize_issues(&self, issues: &[JiraIssue], model: &str) -> SourceResult<String> {
        let body = SummarizeIssuesBody { issues, model };
        let response: SummarizeIssuesResponse = self
            .post_json("/api/jira/summarize", &body, "jira summary")
            .await?;
        info!("Summarized {} JIRA issues", issues.len());
        Ok(response.summary)
    }
}

fn issue_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b[A-Z][A-Z0-9]+-[1-9][0-9]*\b").expect("issue key pattern is valid")
    })
}

/// Issue keys such as `ABC-123` in order of first appearance, without duplicates.
pub fn extract_issue_keys(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    issue_key_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Issue keys mentioned in a PR's title, branch or body, in that order.
pub fn pull_request_issue_keys(pr: &PullRequest) -> Vec<String> {
    let text = [
        Some(pr.title.as_str()),
        pr.branch(),
        pr.body.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("\n");
    extract_issue_keys(&text)
}

/// Builds browser links to JIRA issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraLinks {
    base_url: String,
}

impl JiraLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::types::BranchRef;

    #[test]
    fn test_extract_issue_keys() {
        let keys = extract_issue_keys("ABC-12: fix (see also XY2-7, ABC-12, abc-3 and ABC-0)");
        assert_eq!(keys, vec!["ABC-12".to_string(), "XY2-7".to_string()]);
        assert!(extract_issue_keys("no tickets here").is_empty());
    }

    #[test]
    fn test_pull_request_issue_keys() {
        let mut pr = PullRequest::new(9, "Improve login");
        pr.head = Some(BranchRef {
            branch: "feature/AUTH-42-login".to_string(),
        });
        pr.body = Some("Closes AUTH-43. Related: AUTH-42".to_string());
        assert_eq!(
            pull_request_issue_keys(&pr),
            vec!["AUTH-42".to_string(), "AUTH-43".to_string()]
        );
    }

    #[test]
    fn test_browse_url() {
        let links = JiraLinks::new("https://acme.atlassian.net/");
        assert_eq!(
            links.browse_url("ABC-1"),
            "https://acme.atlassian.net/browse/ABC-1"
        );
    }

    #[tokio::test]
    async fn test_pull_request_issues_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/jira/pull-request")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "repo": "org/repo",
                "pull_request": {"number": 42}
            })))
            .with_status(200)
            .with_body(r#"{"jiraIssues":[{"key":"ABC-1","summary":"Login","status":"Open","issueType":"Story"}],"jiraReferences":["ABC-1"]}"#)
            .create_async()
            .await;

        let client = ProxyClient::new(ApiConfig::default().with_base_url(server.url())).unwrap();
        let pr = PullRequest::new(42, "ABC-1 login");
        let correlation = client.pull_request_issues("org/repo", &pr).await.unwrap();
        assert_eq!(correlation.jira_issues.len(), 1);
        assert_eq!(correlation.jira_issues[0].key, "ABC-1");
    }

    #[tokio::test]
    async fn test_summarize_issues_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/jira/summarize")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"model": "m"})))
            .with_status(200)
            .with_body(r#"{"summary":"Two login stories."}"#)
            .create_async()
            .await;

        let client = ProxyClient::new(ApiConfig::default().with_base_url(server.url())).unwrap();
        let issues = vec![JiraIssue {
            key: "ABC-1".to_string(),
            summary: "Login".to_string(),
            status: "Open".to_string(),
            issue_type: "Story".to_string(),
            assignee: None,
            description: None,
        }];
        let summary = client.summarize_issues(&issues, "m").await.unwrap();
        assert_eq!(summary, "Two login stories.");
    }
}
