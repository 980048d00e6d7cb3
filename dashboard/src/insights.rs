//! Locally computed activity insights, shown when the AI backend is degraded.

use crate::enrichment::EnrichmentPipeline;
use crate::filter::{dedup_commits, dedup_pull_requests};
use crate::requester::SummaryOutcome;
use serde::{Deserialize, Serialize};
use sources::{Commit, GitHubApi, PullRequest, PullRequestState, SourceResult};
use std::fmt::Write;
use tracing::warn;

/// Weights and cut-offs for the activity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InsightThresholds {
    /// Score above which activity is reported as high.
    pub high_activity: f64,
    /// Score below which activity is reported as low.
    pub low_activity: f64,
    pub commit_weight: f64,
    pub pull_request_weight: f64,
    pub merged_weight: f64,
    /// Changed lines contributing one point.
    pub lines_per_point: u64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            high_activity: 50.0,
            low_activity: 10.0,
            commit_weight: 1.0,
            pull_request_weight: 2.0,
            merged_weight: 3.0,
            lines_per_point: 100,
        }
    }
}

impl InsightThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.low_activity > self.high_activity {
            return Err("Low activity threshold must not exceed high activity threshold".to_string());
        }
        if self.lines_per_point == 0 {
            return Err("Lines per point must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityInsights {
    pub commit_count: usize,
    pub pull_request_count: usize,
    pub merged_count: usize,
    pub changed_lines: u64,
    pub activity_score: f64,
    pub level: ActivityLevel,
    pub assessment: String,
}

impl ActivityInsights {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Commits:        {}", self.commit_count);
        let _ = writeln!(out, "Pull requests:  {} ({} merged)", self.pull_request_count, self.merged_count);
        let _ = writeln!(out, "Changed lines:  {}", self.changed_lines);
        let _ = writeln!(out, "Activity score: {:.1}", self.activity_score);
        let _ = write!(out, "\n{}", self.assessment);
        out
    }
}

/// Changed lines come from enrichment; items that were never enriched count
/// as zero.
pub fn compute_insights(
    commits: &[Commit],
    pull_requests: &[PullRequest],
    thresholds: &InsightThresholds,
) -> ActivityInsights {
    let merged_count = pull_requests.iter().filter(|pr| pr.is_merged()).count();
    let changed_lines: u64 = commits
        .iter()
        .filter_map(|c| c.file_summary)
        .chain(pull_requests.iter().filter_map(|pr| pr.file_summary))
        .map(|s| s.changed_lines())
        .sum();

    let activity_score = commits.len() as f64 * thresholds.commit_weight
        + pull_requests.len() as f64 * thresholds.pull_request_weight
        + merged_count as f64 * thresholds.merged_weight
        + (changed_lines / thresholds.lines_per_point.max(1)) as f64;

    let level = if activity_score > thresholds.high_activity {
        ActivityLevel::High
    } else if activity_score < thresholds.low_activity {
        ActivityLevel::Low
    } else {
        ActivityLevel::Moderate
    };

    let assessment = match level {
        ActivityLevel::High => format!(
            "High productivity: {} commits and {} merged pull requests in this period.",
            commits.len(),
            merged_count
        ),
        ActivityLevel::Moderate => {
            "Moderate activity: steady development with room to pick up pace.".to_string()
        }
        ActivityLevel::Low => {
            "Low activity: few commits or pull requests in this period.".to_string()
        }
    };

    ActivityInsights {
        commit_count: commits.len(),
        pull_request_count: pull_requests.len(),
        merged_count,
        changed_lines,
        activity_score,
        level,
        assessment,
    }
}

/// Lists, enriches and scores a repository's activity without the AI service.
pub async fn local_insights(
    github: &dyn GitHubApi,
    pipeline: &EnrichmentPipeline,
    repo: &str,
    thresholds: &InsightThresholds,
) -> SourceResult<ActivityInsights> {
    let (commits, pull_requests) = tokio::try_join!(
        github.list_commits(repo),
        github.list_pull_requests(repo, PullRequestState::All)
    )?;

    let (commits, _) = pipeline.enrich_commits(repo, dedup_commits(commits)).await;
    let (pull_requests, _) = pipeline
        .enrich_pull_requests(repo, dedup_pull_requests(pull_requests))
        .await;

    Ok(compute_insights(&commits, &pull_requests, thresholds))
}

/// Text shown for a summary outcome. A maintenance outcome is followed by
/// locally computed insights for `repo`.
pub async fn display_summary(
    outcome: &SummaryOutcome,
    github: &dyn GitHubApi,
    pipeline: &EnrichmentPipeline,
    repo: &str,
    thresholds: &InsightThresholds,
) -> String {
    let SummaryOutcome::Unavailable(message) = outcome else {
        return outcome.text().to_string();
    };

    match local_insights(github, pipeline, repo, thresholds).await {
        Ok(insights) => format!("{}\n\n{}", message, insights.render()),
        Err(e) => {
            warn!("Could not compute fallback insights for {}: {}", repo, e);
            message.clone()
        }
    }
}
