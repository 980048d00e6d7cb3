use crate::client::ProxyClient;
use crate::error::SourceResult;
use crate::search::{SearchIssueItem, SearchQuery, SEARCH_PAGE_SIZE};
use crate::types::{
    Commit, CommitFiles, Issue, IssueState, PullRequest, PullRequestFiles, PullRequestState,
    RepoRef, Repository,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

/// Read access to repositories through the GitHub proxy.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn list_repositories(&self) -> SourceResult<Vec<Repository>>;

    async fn list_pull_requests(
        &self,
        repo: &str,
        state: PullRequestState,
    ) -> SourceResult<Vec<PullRequest>>;

    async fn list_commits(&self, repo: &str) -> SourceResult<Vec<Commit>>;

    async fn list_issues(&self, repo: &RepoRef, state: IssueState) -> SourceResult<Vec<Issue>>;

    async fn pull_request_files(&self, repo: &str, number: u64) -> SourceResult<PullRequestFiles>;

    async fn commit_files(&self, repo: &str, sha: &str) -> SourceResult<CommitFiles>;

    /// Raw diff text of one file at a PR number or commit SHA.
    async fn file_diff(&self, repo: &str, reference: &str, filename: &str) -> SourceResult<String>;

    async fn search_page(&self, query: &SearchQuery, page: u32) -> SourceResult<Vec<SearchIssueItem>>;
}

#[derive(Deserialize)]
struct RepositoriesResponse {
    repositories: Vec<Repository>,
}

#[derive(Deserialize)]
struct PullRequestsResponse {
    #[serde(rename = "pullRequests")]
    pull_requests: Vec<PullRequest>,
}

#[derive(Deserialize)]
struct CommitsResponse {
    commits: Vec<Commit>,
}

#[derive(Deserialize)]
struct IssuesResponse {
    issues: Vec<Issue>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchIssueItem>,
}

#[async_trait]
impl GitHubApi for ProxyClient {
    async fn list_repositories(&self) -> SourceResult<Vec<Repository>> {
        let response: RepositoriesResponse = self
            .get_json("/api/github/repositories", &[], "repositories")
            .await?;
        info!("Retrieved {} repositories", response.repositories.len());
        Ok(response.repositories)
    }

    async fn list_pull_requests(
        &self,
        repo: &str,
        state: PullRequestState,
    ) -> SourceResult<Vec<PullRequest>> {
        let response: PullRequestsResponse = self
            .get_json(
                "/api/github/pulls",
                &[("repo", repo.to_string()), ("state", state.as_str().to_string())],
                repo,
            )
            .await?;
        info!("Retrieved {} pull requests for {}", response.pull_requests.len(), repo);
        Ok(response.pull_requests)
    }

    async fn list_commits(&self, repo: &str) -> SourceResult<Vec<Commit>> {
        let response: CommitsResponse = self
            .get_json("/api/github/commits", &[("repo", repo.to_string())], repo)
            .await?;
        info!("Retrieved {} commits for {}", response.commits.len(), repo);
        Ok(response.commits)
    }

    async fn list_issues(&self, repo: &RepoRef, state: IssueState) -> SourceResult<Vec<Issue>> {
        let response: IssuesResponse = self
            .get_json(
                "/api/github/issues",
                &[
                    ("org", repo.owner.clone()),
                    ("repo", repo.name.clone()),
                    ("state", state.as_str().to_string()),
                ],
                &repo.full_name(),
            )
            .await?;
        info!("Retrieved {} issues for {}", response.issues.len(), repo);
        Ok(response.issues)
    }

    async fn pull_request_files(&self, repo: &str, number: u64) -> SourceResult<PullRequestFiles> {
        self.get_json(
            "/api/github/pulls/files",
            &[("repo", repo.to_string()), ("number", number.to_string())],
            &format!("{}#{}", repo, number),
        )
        .await
    }

    async fn commit_files(&self, repo: &str, sha: &str) -> SourceResult<CommitFiles> {
        self.get_json(
            "/api/github/commits/files",
            &[("repo", repo.to_string()), ("sha", sha.to_string())],
            &format!("{}@{}", repo, sha),
        )
        .await
    }

    async fn file_diff(&self, repo: &str, reference: &str, filename: &str) -> SourceResult<String> {
        self.get_text(
            "/api/github/diff",
            &[
                ("repo", repo.to_string()),
                ("ref", reference.to_string()),
                ("filename", filename.to_string()),
            ],
            filename,
        )
        .await
    }

    async fn search_page(&self, query: &SearchQuery, page: u32) -> SourceResult<Vec<SearchIssueItem>> {
        let mut params = vec![
            ("q", query.query.clone()),
            ("page", page.to_string()),
            ("per_page", SEARCH_PAGE_SIZE.to_string()),
        ];
        if let Some(sort) = &query.sort {
            params.push(("sort", sort.clone()));
        }
        let response: SearchResponse = self.get_json("/api/github/search", &params, "search").await?;
        Ok(response.items)
    }
}
