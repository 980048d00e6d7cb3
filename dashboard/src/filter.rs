//! List filtering, sorting and de-duplication for repositories, issues and
//! pull requests.
//!
//! All criteria in a filter are AND-combined. Sorting is stable, so items that
//! compare equal keep the order the backend returned them in.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use sources::{Commit, FileChange, Issue, PullRequest, Repository, Visibility};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::hash::Hash;

/// Keeps the first item for each key and drops the rest.
///
/// ```
/// use dashboard::filter::dedup_by_key;
///
/// let items = vec![(1, "a"), (2, "b"), (1, "c")];
/// let unique = dedup_by_key(items, |(id, _)| *id);
/// assert_eq!(unique, vec![(1, "a"), (2, "b")]);
/// ```
pub fn dedup_by_key<T, K, F>(items: Vec<T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::with_capacity(items.len());
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

pub fn dedup_commits(commits: Vec<Commit>) -> Vec<Commit> {
    dedup_by_key(commits, |c| c.sha.clone())
}

pub fn dedup_pull_requests(pull_requests: Vec<PullRequest>) -> Vec<PullRequest> {
    dedup_by_key(pull_requests, |pr| pr.number)
}

pub fn dedup_issues(issues: Vec<Issue>) -> Vec<Issue> {
    dedup_by_key(issues, |issue| issue.number)
}

pub fn dedup_files(files: Vec<FileChange>) -> Vec<FileChange> {
    dedup_by_key(files, FileChange::dedup_key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Window of recent activity, measured back from now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Quarter,
    Year,
    #[default]
    All,
}

impl TimeRange {
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            TimeRange::Day => 1,
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::Quarter => 90,
            TimeRange::Year => 365,
            TimeRange::All => return None,
        };
        Some(now - ChronoDuration::days(days))
    }

    /// Items without a timestamp only pass the unbounded range.
    pub fn contains(self, timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match self.cutoff(now) {
            None => true,
            Some(cutoff) => timestamp.is_some_and(|t| t >= cutoff),
        }
    }
}

fn matches_text(query: &str, fields: &[Option<&str>]) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&query))
}

/// Compares optional timestamps with missing values ordered first.
fn cmp_time(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    a.cmp(&b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositorySort {
    #[default]
    Updated,
    Created,
    Stars,
    Forks,
    Name,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryFilter {
    pub search: String,
    pub visibility: Option<Visibility>,
    pub include_forks: bool,
    pub include_archived: bool,
    pub time_range: TimeRange,
    pub sort: RepositorySort,
    pub direction: SortDirection,
}

impl RepositoryFilter {
    pub fn new() -> Self {
        Self {
            include_forks: true,
            include_archived: true,
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_forks(mut self, include: bool) -> Self {
        self.include_forks = include;
        self
    }

    pub fn with_archived(mut self, include: bool) -> Self {
        self.include_archived = include;
        self
    }

    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    pub fn with_sort(mut self, sort: RepositorySort, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    pub fn matches(&self, repo: &Repository, now: DateTime<Utc>) -> bool {
        matches_text(
            &self.search,
            &[Some(repo.name.as_str()), Some(repo.full_name.as_str()), repo.description.as_deref()],
        ) && self.visibility.map_or(true, |v| repo.visibility() == v)
            && (self.include_forks || !repo.fork)
            && (self.include_archived || !repo.archived)
            && self.time_range.contains(repo.updated_at, now)
    }

    /// Filters then stably sorts.
    pub fn apply(&self, repositories: Vec<Repository>, now: DateTime<Utc>) -> Vec<Repository> {
        let mut kept: Vec<Repository> = repositories
            .into_iter()
            .filter(|repo| self.matches(repo, now))
            .collect();
        sort_repositories(&mut kept, self.sort, self.direction);
        kept
    }
}

pub fn sort_repositories(repositories: &mut [Repository], sort: RepositorySort, direction: SortDirection) {
    repositories.sort_by(|a, b| {
        let ordering = match sort {
            RepositorySort::Updated => cmp_time(a.updated_at, b.updated_at),
            RepositorySort::Created => cmp_time(a.created_at, b.created_at),
            RepositorySort::Stars => a.stargazers_count.cmp(&b.stargazers_count),
            RepositorySort::Forks => a.forks_count.cmp(&b.forks_count),
            RepositorySort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        direction.apply(ordering)
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSort {
    #[default]
    Updated,
    Created,
    Number,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFilter {
    #[default]
    All,
    Open,
    Closed,
    /// Pull requests only: closed with a merge timestamp.
    Merged,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueFilter {
    pub search: String,
    pub state: StateFilter,
    pub label: Option<String>,
    pub include_pull_requests: bool,
    pub time_range: TimeRange,
    pub sort: ItemSort,
    pub direction: SortDirection,
}

impl IssueFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_state(mut self, state: StateFilter) -> Self {
        self.state = state;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    pub fn with_sort(mut self, sort: ItemSort, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    pub fn matches(&self, issue: &Issue, now: DateTime<Utc>) -> bool {
        let state_ok = match self.state {
            StateFilter::All => true,
            StateFilter::Open => issue.state.eq_ignore_ascii_case("open"),
            StateFilter::Closed | StateFilter::Merged => issue.state.eq_ignore_ascii_case("closed"),
        };
        state_ok
            && (self.include_pull_requests || !issue.is_pull_request())
            && matches_text(&self.search, &[Some(issue.title.as_str())])
            && self.label.as_deref().map_or(true, |l| issue.has_label(l))
            && self.time_range.contains(issue.updated_at, now)
    }

    pub fn apply(&self, issues: Vec<Issue>, now: DateTime<Utc>) -> Vec<Issue> {
        let mut kept: Vec<Issue> = dedup_issues(issues)
            .into_iter()
            .filter(|issue| self.matches(issue, now))
            .collect();
        let direction = self.direction;
        match self.sort {
            ItemSort::Updated => kept.sort_by(|a, b| direction.apply(cmp_time(a.updated_at, b.updated_at))),
            ItemSort::Created => kept.sort_by(|a, b| direction.apply(cmp_time(a.created_at, b.created_at))),
            ItemSort::Number => kept.sort_by(|a, b| direction.apply(a.number.cmp(&b.number))),
            ItemSort::Title => kept.sort_by(|a, b| {
                direction.apply(a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            }),
        }
        kept
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestFilter {
    pub search: String,
    pub state: StateFilter,
    pub label: Option<String>,
    pub author: Option<String>,
    pub time_range: TimeRange,
    pub sort: ItemSort,
    pub direction: SortDirection,
}

impl PullRequestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_state(mut self, state: StateFilter) -> Self {
        self.state = state;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    pub fn with_sort(mut self, sort: ItemSort, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    pub fn matches(&self, pr: &PullRequest, now: DateTime<Utc>) -> bool {
        let state_ok = match self.state {
            StateFilter::All => true,
            StateFilter::Open => pr.state.eq_ignore_ascii_case("open"),
            StateFilter::Closed => pr.state.eq_ignore_ascii_case("closed") && !pr.is_merged(),
            StateFilter::Merged => pr.is_merged(),
        };
        state_ok
            && matches_text(&self.search, &[Some(pr.title.as_str()), pr.body.as_deref()])
            && self.label.as_deref().map_or(true, |l| pr.has_label(l))
            && self
                .author
                .as_deref()
                .map_or(true, |a| pr.author().eq_ignore_ascii_case(a))
            && self.time_range.contains(pr.updated_at.or(pr.created_at), now)
    }

    pub fn apply(&self, pull_requests: Vec<PullRequest>, now: DateTime<Utc>) -> Vec<PullRequest> {
        let mut kept: Vec<PullRequest> = dedup_pull_requests(pull_requests)
            .into_iter()
            .filter(|pr| self.matches(pr, now))
            .collect();
        let direction = self.direction;
        match self.sort {
            ItemSort::Updated => kept.sort_by(|a, b| direction.apply(cmp_time(a.updated_at, b.updated_at))),
            ItemSort::Created => kept.sort_by(|a, b| direction.apply(cmp_time(a.created_at, b.created_at))),
            ItemSort::Number => kept.sort_by(|a, b| direction.apply(a.number.cmp(&b.number))),
            ItemSort::Title => kept.sort_by(|a, b| {
                direction.apply(a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            }),
        }
        kept
    }
}
