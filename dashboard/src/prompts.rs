//! Prompt text for AI summaries
//!
//! A prompt is built in two parts: a scaffold describing the entity (pull
//! request, commit or JIRA issue set) and, where available, a section of file
//! changes. Patches are capped per file so a single huge diff cannot blow up
//! the prompt.

use sources::{Commit, FileChange, JiraIssue, PullRequest};
use std::fmt::Write;

pub const DEFAULT_PATCH_CHAR_LIMIT: usize = 2000;
pub const TRUNCATION_MARKER: &str = "\n... [patch truncated]";

/// Cuts `patch` to at most `limit` characters, appending [`TRUNCATION_MARKER`]
/// when anything was removed.
///
/// # Example
/// ```
/// use dashboard::prompts::{truncate_patch, TRUNCATION_MARKER};
///
/// let long = "x".repeat(2500);
/// let cut = truncate_patch(&long, 2000);
/// assert_eq!(cut.chars().count(), 2000 + TRUNCATION_MARKER.chars().count());
/// assert_eq!(truncate_patch("short", 2000), "short");
/// ```
pub fn truncate_patch(patch: &str, limit: usize) -> String {
    match patch.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{}{}", &patch[..byte_index], TRUNCATION_MARKER),
        None => patch.to_string(),
    }
}

pub struct PullRequestPrompt;

impl PullRequestPrompt {
    pub fn build(repo: &str, pr: &PullRequest) -> String {
        let mut prompt = format!(
            "Summarize this pull request for a reviewer in a short paragraph, \
             followed by the key changes as bullet points.\n\n\
             REPOSITORY: {}\n\
             PULL REQUEST: #{} {}\n\
             AUTHOR: {}\n\
             STATE: {}\n",
            repo,
            pr.number,
            pr.title,
            pr.author(),
            if pr.is_merged() { "merged" } else { pr.state.as_str() }
        );

        if let Some(branch) = pr.branch() {
            let _ = writeln!(prompt, "BRANCH: {}", branch);
        }
        if !pr.labels.is_empty() {
            let labels: Vec<&str> = pr.labels.iter().map(|l| l.name.as_str()).collect();
            let _ = writeln!(prompt, "LABELS: {}", labels.join(", "));
        }
        if let Some(summary) = &pr.file_summary {
            let _ = writeln!(
                prompt,
                "CHANGES: {} files, +{} -{}",
                summary.changed_files, summary.additions, summary.deletions
            );
        }
        if let Some(body) = pr.body.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            let _ = write!(prompt, "\nDESCRIPTION:\n{}\n", body);
        }
        if let Some(issues) = pr.jira_issues.as_deref().filter(|i| !i.is_empty()) {
            prompt.push_str("\nLINKED JIRA ISSUES:\n");
            for issue in issues {
                let _ = writeln!(
                    prompt,
                    "- {} [{}] {}: {}",
                    issue.key, issue.issue_type, issue.status, issue.summary
                );
            }
        }

        prompt
    }
}

pub struct CommitPrompt;

impl CommitPrompt {
    pub fn build(repo: &str, commit: &Commit) -> String {
        let mut prompt = format!(
            "Summarize what this commit changes and why, in two or three sentences.\n\n\
             REPOSITORY: {}\n\
             COMMIT: {}\n\
             AUTHOR: {}\n",
            repo,
            commit.short_sha(),
            commit.author_name()
        );

        if let Some(date) = commit.timestamp() {
            let _ = writeln!(prompt, "DATE: {}", date.to_rfc3339());
        }
        if let Some(summary) = &commit.file_summary {
            let _ = writeln!(
                prompt,
                "CHANGES: {} files, +{} -{}",
                summary.changed_files, summary.additions, summary.deletions
            );
        }
        let _ = write!(prompt, "\nMESSAGE:\n{}\n", commit.message().trim());

        prompt
    }
}

pub struct JiraIssuesPrompt;

impl JiraIssuesPrompt {
    pub fn build(issues: &[JiraIssue]) -> String {
        let mut prompt = format!(
            "Summarize the goal and current status of these {} JIRA issues.\n\n",
            issues.len()
        );
        for issue in issues {
            let _ = writeln!(
                prompt,
                "- {} ({}, {}): {}",
                issue.key, issue.issue_type, issue.status, issue.summary
            );
            if let Some(assignee) = &issue.assignee {
                let _ = writeln!(prompt, "  assignee: {}", assignee);
            }
            if let Some(description) = issue.description.as_deref().filter(|d| !d.trim().is_empty()) {
                let _ = writeln!(prompt, "  {}", truncate_patch(description.trim(), 500));
            }
        }
        prompt
    }
}

/// Appends a FILE CHANGES section with each patch capped at `patch_limit` characters.
pub fn append_file_changes(
    mut prompt: String,
    files: &[FileChange],
    patch_limit: usize,
    max_files: usize,
) -> String {
    if files.is_empty() {
        return prompt;
    }

    let _ = write!(prompt, "\nFILE CHANGES ({} files):\n", files.len());
    for file in files.iter().take(max_files) {
        let _ = writeln!(
            prompt,
            "\n### {} ({}, +{} -{})",
            file.filename, file.status, file.additions, file.deletions
        );
        if let Some(patch) = file.patch.as_deref().filter(|p| !p.is_empty()) {
            let _ = writeln!(prompt, "{}", truncate_patch(patch, patch_limit));
        }
    }
    if files.len() > max_files {
        let _ = writeln!(prompt, "\n... and {} more files", files.len() - max_files);
    }

    prompt
}
