pub mod client;
pub mod config;
pub mod error;
pub mod github;
pub mod graph;
pub mod jira;
pub mod search;
pub mod types;

pub use client::ProxyClient;
pub use config::{ApiConfig, JIRA_BASE_URL_ENV};
pub use error::{SourceError, SourceResult};
pub use github::GitHubApi;
pub use graph::{
    DependencyGraph, DependencyGraphApi, DependencyGraphRequest, GraphFilter, GraphLink,
    GraphMetadata, GraphNode, LinkKind,
};
pub use jira::{extract_issue_keys, pull_request_issue_keys, JiraApi, JiraLinks};
pub use search::{
    map_search_item, search_pull_requests, SearchIssueItem, SearchPullRequestRef, SearchQuery,
    MAX_SEARCH_PAGES, SEARCH_PAGE_SIZE,
};
pub use types::{
    BranchRef, Commit, CommitDetail, CommitFiles, CommitSignature, CommitStats, FileChange,
    FileSummary, GitHubUser, Issue, IssueState, JiraCorrelation, JiraIssue, Label, PullRequest,
    PullRequestFiles, PullRequestState, RepoRef, Repository, Visibility,
};
