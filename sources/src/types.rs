//! Repository, pull request, commit, issue and JIRA records
//!
//! These mirror what the GitHub proxy and JIRA integration return. They are
//! read-only snapshots: the client never mutates upstream state, it only
//! re-fetches and attaches enrichment data.

use crate::error::SourceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `owner/name` identifier of a repository
///
/// # Examples
///
/// ```
/// use sources::RepoRef;
///
/// let repo: RepoRef = "octo-org/dashboard".parse().unwrap();
/// assert_eq!(repo.owner, "octo-org");
/// assert_eq!(repo.name, "dashboard");
/// assert_eq!(repo.to_string(), "octo-org/dashboard");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = SourceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || SourceError::InvalidRepository {
            value: value.to_string(),
        };
        let (owner, name) = value.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }
        Ok(Self::new(owner, name))
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_branch_name")]
    pub default_branch: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_branch_name() -> String {
    "main".to_string()
}

impl Repository {
    pub fn visibility(&self) -> Visibility {
        if self.private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub branch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Open,
    Closed,
    All,
}

impl PullRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullRequestState::Open => "open",
            PullRequestState::Closed => "closed",
            PullRequestState::All => "all",
        }
    }
}

/// Additions, deletions and changed-file count for one PR or commit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileSummary {
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

impl FileSummary {
    pub fn changed_lines(&self) -> u64 {
        self.additions + self.deletions
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub head: Option<BranchRef>,
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Full name of the owning repository, when the source spans repositories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_summary: Option<FileSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jira_issues: Option<Vec<JiraIssue>>,
}

fn default_state() -> String {
    "open".to_string()
}

impl PullRequest {
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: None,
            user: None,
            state: default_state(),
            created_at: None,
            updated_at: None,
            merged_at: None,
            head: None,
            labels: Vec::new(),
            repository: None,
            file_summary: None,
            jira_issues: None,
        }
    }

    pub fn author(&self) -> &str {
        self.user.as_ref().map(|u| u.login.as_str()).unwrap_or("unknown")
    }

    pub fn branch(&self) -> Option<&str> {
        self.head.as_ref().map(|h| h.branch.as_str())
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.name.eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitSignature {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitDetail {
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetail,
    #[serde(default)]
    pub author: Option<GitHubUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_summary: Option<FileSummary>,
}

impl Commit {
    pub fn new(sha: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sha: sha.into(),
            commit: CommitDetail {
                message: message.into(),
                author: None,
            },
            author: None,
            file_summary: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.commit.message
    }

    /// First line of the commit message.
    pub fn title(&self) -> &str {
        self.commit.message.lines().next().unwrap_or_default()
    }

    pub fn short_sha(&self) -> &str {
        &self.sha[..self.sha.len().min(7)]
    }

    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|u| u.login.as_str())
            .or_else(|| self.commit.author.as_ref().map(|a| a.name.as_str()))
            .unwrap_or("unknown")
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.commit.author.as_ref().and_then(|a| a.date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
    All,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
            IssueState::All => "all",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.name.eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileChange {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
    #[serde(default)]
    pub patch: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
}

impl FileChange {
    /// Identity used when paginated file lists overlap.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.filename, self.sha.as_deref().unwrap_or(""))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequestFiles {
    pub files: Vec<FileChange>,
    pub summary: FileSummary,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitFiles {
    pub files: Vec<FileChange>,
    #[serde(default)]
    pub stats: CommitStats,
}

impl CommitFiles {
    pub fn summary(&self) -> FileSummary {
        FileSummary {
            additions: self.stats.additions,
            deletions: self.stats.deletions,
            changed_files: self.files.len() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JiraIssue {
    pub key: String,
    pub summary: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub issue_type: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// JIRA issues and raw issue-key references found for one pull request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JiraCorrelation {
    #[serde(default)]
    pub jira_issues: Vec<JiraIssue>,
    #[serde(default)]
    pub jira_references: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_ref_parsing() {
        assert!("org/repo".parse::<RepoRef>().is_ok());
        assert!("org".parse::<RepoRef>().is_err());
        assert!("/repo".parse::<RepoRef>().is_err());
        assert!("org/repo/extra".parse::<RepoRef>().is_err());
    }

    #[test]
    fn test_repository_deserialization_defaults() {
        let repo: Repository = serde_json::from_str(
            r#"{"name":"repo","full_name":"org/repo","stargazers_count":12,"private":true,"updated_at":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(repo.default_branch, "main");
        assert_eq!(repo.stargazers_count, 12);
        assert_eq!(repo.visibility(), Visibility::Private);
        assert!(!repo.archived);
        assert!(repo.updated_at.is_some());
    }

    #[test]
    fn test_pull_request_helpers() {
        let pr: PullRequest = serde_json::from_str(
            r#"{"number":7,"title":"ABC-1 fix login","user":{"login":"octocat"},"head":{"ref":"feature/ABC-1"},"labels":[{"name":"Bug"}],"merged_at":"2024-05-02T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(pr.author(), "octocat");
        assert_eq!(pr.branch(), Some("feature/ABC-1"));
        assert!(pr.has_label("bug"));
        assert!(pr.is_merged());
        assert_eq!(pr.state, "open");
        assert!(pr.file_summary.is_none());

        let json = serde_json::to_value(&pr).unwrap();
        assert!(json.get("file_summary").is_none());
    }

    #[test]
    fn test_commit_helpers() {
        let commit: Commit = serde_json::from_str(
            r#"{"sha":"0123456789abcdef","commit":{"message":"Fix parser\n\nLonger body","author":{"name":"Ada","date":"2024-01-01T00:00:00Z"}}}"#,
        )
        .unwrap();
        assert_eq!(commit.title(), "Fix parser");
        assert_eq!(commit.short_sha(), "0123456");
        assert_eq!(commit.author_name(), "Ada");
        assert!(commit.timestamp().is_some());
    }

    #[test]
    fn test_commit_files_summary() {
        let files: CommitFiles = serde_json::from_str(
            r#"{"files":[{"filename":"a.rs"},{"filename":"b.rs"}],"stats":{"additions":10,"deletions":3,"total":13}}"#,
        )
        .unwrap();
        let summary = files.summary();
        assert_eq!(summary.changed_files, 2);
        assert_eq!(summary.changed_lines(), 13);
    }

    #[test]
    fn test_jira_correlation_camel_case() {
        let correlation: JiraCorrelation = serde_json::from_str(
            r#"{"jiraIssues":[{"key":"ABC-1","summary":"Login","status":"Done","issueType":"Bug"}],"jiraReferences":["ABC-1"]}"#,
        )
        .unwrap();
        assert_eq!(correlation.jira_issues[0].issue_type, "Bug");
        assert_eq!(correlation.jira_references, vec!["ABC-1".to_string()]);
    }
}
