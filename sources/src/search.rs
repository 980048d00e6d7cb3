//! Issue/PR search and the translation of search hits into pull requests.
//!
//! GitHub search returns issue-shaped items; this module is the single place
//! where that shape is turned into [`PullRequest`] so upstream drift stays here.

use crate::error::SourceResult;
use crate::github::GitHubApi;
use crate::types::{GitHubUser, Label, PullRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const SEARCH_PAGE_SIZE: u32 = 100;
pub const MAX_SEARCH_PAGES: u32 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub sort: Option<String>,
    pub max_pages: u32,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sort: None,
            max_pages: MAX_SEARCH_PAGES,
        }
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Clamped to [`MAX_SEARCH_PAGES`].
    pub fn with_max_pages(mut self, pages: u32) -> Self {
        self.max_pages = pages.clamp(1, MAX_SEARCH_PAGES);
        self
    }

    /// Query for pull requests in one repository.
    pub fn pull_requests_in(repo: &str, extra: &str) -> Self {
        let extra = extra.trim();
        if extra.is_empty() {
            Self::new(format!("repo:{} is:pr", repo))
        } else {
            Self::new(format!("repo:{} is:pr {}", repo, extra))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPullRequestRef {
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// One item of a GitHub issue search response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchIssueItem {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub user: Option<GitHubUser>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pull_request: Option<SearchPullRequestRef>,
    #[serde(default)]
    pub repository_url: Option<String>,
}

/// Maps a search hit onto a pull request. Plain issues yield `None`.
pub fn map_search_item(item: SearchIssueItem) -> Option<PullRequest> {
    let pr_ref = item.pull_request?;
    let repository = item
        .repository_url
        .as_deref()
        .and_then(repository_from_api_url);

    let mut pr = PullRequest::new(item.number, item.title);
    pr.body = item.body;
    pr.user = item.user;
    pr.state = if item.state.is_empty() {
        "open".to_string()
    } else {
        item.state
    };
    pr.created_at = item.created_at;
    pr.updated_at = item.updated_at;
    pr.merged_at = pr_ref.merged_at;
    pr.labels = item.labels;
    pr.repository = repository;
    Some(pr)
}

/// `https://api.github.com/repos/org/repo` -> `org/repo`
fn repository_from_api_url(url: &str) -> Option<String> {
    let (_, tail) = url.split_once("/repos/")?;
    let mut parts = tail.trim_end_matches('/').splitn(3, '/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let name = parts.next().filter(|s| !s.is_empty())?;
    Some(format!("{}/{}", owner, name))
}

/// Pages through search results, stopping at the first short page or at
/// `query.max_pages`, and keeps only pull requests.
pub async fn search_pull_requests(
    api: &dyn GitHubApi,
    query: &SearchQuery,
) -> SourceResult<Vec<PullRequest>> {
    let mut results = Vec::new();
    let max_pages = query.max_pages.clamp(1, MAX_SEARCH_PAGES);

    for page in 1..=max_pages {
        let items = api.search_page(query, page).await?;
        let count = items.len();
        debug!("Search page {} returned {} items", page, count);

        results.extend(items.into_iter().filter_map(map_search_item));

        if (count as u32) < SEARCH_PAGE_SIZE {
            break;
        }
    }

    Ok(results)
}
