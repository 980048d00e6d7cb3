//! AI summary requests for the currently selected entity
//!
//! Only one entity is "current" at a time. Selecting another entity cancels
//! the token of the request in flight, and every resumption point checks both
//! the token and the current entity, so a superseded response can never be
//! attached. Callers asking for the entity that is already in flight share its
//! result instead of issuing a second request.

use crate::cache::TtlCache;
use crate::filter::dedup_by_key;
use crate::prompts::{
    append_file_changes, CommitPrompt, JiraIssuesPrompt, PullRequestPrompt,
    DEFAULT_PATCH_CHAR_LIMIT,
};
use model::{ContentType, SummaryProvider, SummaryRequest};
use serde::{Deserialize, Serialize};
use sources::{Commit, FileChange, GitHubApi, JiraIssue, PullRequest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub model: String,
    pub patch_char_limit: usize,
    pub max_files: usize,
    pub file_cache_ttl_secs: u64,
    pub fallback_message: String,
    pub maintenance_message: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            patch_char_limit: DEFAULT_PATCH_CHAR_LIMIT,
            max_files: 20,
            file_cache_ttl_secs: 600,
            fallback_message: "Failed to generate summary. Please try again.".to_string(),
            maintenance_message:
                "AI summaries are temporarily unavailable while the service is under maintenance."
                    .to_string(),
        }
    }
}

impl SummaryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Summary model cannot be empty".to_string());
        }
        if self.patch_char_limit == 0 {
            return Err("Patch character limit must be greater than 0".to_string());
        }
        if self.max_files == 0 {
            return Err("Max files must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Something a summary can be requested for.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryTarget {
    PullRequest {
        repo: String,
        pull_request: PullRequest,
    },
    Commit {
        repo: String,
        commit: Commit,
    },
    JiraIssues {
        repo: String,
        pr_number: u64,
        issues: Vec<JiraIssue>,
    },
}

impl SummaryTarget {
    pub fn pull_request(repo: impl Into<String>, pull_request: PullRequest) -> Self {
        SummaryTarget::PullRequest {
            repo: repo.into(),
            pull_request,
        }
    }

    pub fn commit(repo: impl Into<String>, commit: Commit) -> Self {
        SummaryTarget::Commit {
            repo: repo.into(),
            commit,
        }
    }

    /// Stable identity used to track the current entity and key results.
    pub fn entity_id(&self) -> String {
        match self {
            SummaryTarget::PullRequest { repo, pull_request } => {
                format!("pr:{}#{}", repo, pull_request.number)
            }
            SummaryTarget::Commit { repo, commit } => format!("commit:{}@{}", repo, commit.sha),
            SummaryTarget::JiraIssues {
                repo,
                pr_number,
                issues,
            } => {
                let mut keys: Vec<&str> = issues.iter().map(|i| i.key.as_str()).collect();
                keys.sort_unstable();
                keys.dedup();
                format!("jira:{}#{}:{}", repo, pr_number, keys.join(","))
            }
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            SummaryTarget::PullRequest { .. } => ContentType::PullRequest,
            SummaryTarget::Commit { .. } => ContentType::Commit,
            SummaryTarget::JiraIssues { .. } => ContentType::JiraIssues,
        }
    }

    fn scaffold(&self) -> String {
        match self {
            SummaryTarget::PullRequest { repo, pull_request } => {
                PullRequestPrompt::build(repo, pull_request)
            }
            SummaryTarget::Commit { repo, commit } => CommitPrompt::build(repo, commit),
            SummaryTarget::JiraIssues { issues, .. } => JiraIssuesPrompt::build(issues),
        }
    }
}

/// The request was superseded or cancelled; nothing was attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("summary request was cancelled")]
pub struct Cancelled;

/// Displayable value attached to an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Generated(String),
    /// The AI service reported maintenance.
    Unavailable(String),
    /// Any other failure; carries the fallback text.
    Failed(String),
}

impl SummaryOutcome {
    pub fn text(&self) -> &str {
        match self {
            SummaryOutcome::Generated(text)
            | SummaryOutcome::Unavailable(text)
            | SummaryOutcome::Failed(text) => text,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, SummaryOutcome::Generated(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Requesting { entity: String },
    Fulfilled { entity: String },
    Cancelled { entity: String },
    Failed { entity: String },
}

type Completion = Option<Result<SummaryOutcome, Cancelled>>;

struct InFlight {
    id: u64,
    entity: String,
    token: CancellationToken,
    done: watch::Sender<Completion>,
}

struct RequesterState {
    next_id: u64,
    current: Option<String>,
    in_flight: Option<InFlight>,
    state: RequestState,
    summaries: HashMap<String, SummaryOutcome>,
}

enum Begin {
    Cached(SummaryOutcome),
    Join(watch::Receiver<Completion>),
    Start { id: u64, token: CancellationToken },
}

/// Releases a started request whose future is dropped mid-flight, so later
/// requests for the same entity do not join a result that never arrives.
struct AbandonGuard<'a> {
    requester: &'a SummaryRequester,
    id: u64,
    armed: bool,
}

impl AbandonGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.requester.abandon(self.id);
        }
    }
}

pub struct SummaryRequester {
    provider: Arc<dyn SummaryProvider>,
    github: Arc<dyn GitHubApi>,
    config: SummaryConfig,
    files: TtlCache<String, Vec<FileChange>>,
    inner: Mutex<RequesterState>,
}

impl SummaryRequester {
    pub fn new(
        provider: Arc<dyn SummaryProvider>,
        github: Arc<dyn GitHubApi>,
        config: SummaryConfig,
    ) -> Self {
        let file_ttl = Duration::from_secs(config.file_cache_ttl_secs);
        Self {
            provider,
            github,
            config,
            files: TtlCache::with_ttl(file_ttl),
            inner: Mutex::new(RequesterState {
                next_id: 0,
                current: None,
                in_flight: None,
                state: RequestState::Idle,
                summaries: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RequesterState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> RequestState {
        self.lock().state.clone()
    }

    pub fn current_entity(&self) -> Option<String> {
        self.lock().current.clone()
    }

    /// Summary attached to an entity, if any.
    pub fn summary(&self, entity: &str) -> Option<SummaryOutcome> {
        self.lock().summaries.get(entity).cloned()
    }

    /// Drops an attached summary so the next request regenerates it.
    pub fn invalidate(&self, entity: &str) {
        self.lock().summaries.remove(entity);
        self.files.remove(&entity.to_string());
    }

    /// Cancels whatever is in flight and clears the current selection.
    pub fn cancel_current(&self) {
        let mut inner = self.lock();
        if let Some(in_flight) = inner.in_flight.take() {
            debug!("Cancelling summary request for {}", in_flight.entity);
            Self::release(&mut inner, in_flight);
        }
        inner.current = None;
    }

    /// Cancels `in_flight`, wakes its joiners and records the cancellation.
    fn release(inner: &mut RequesterState, in_flight: InFlight) {
        in_flight.token.cancel();
        in_flight.done.send_replace(Some(Err(Cancelled)));
        inner.state = RequestState::Cancelled {
            entity: in_flight.entity,
        };
    }

    /// Frees the slot of request `id` whose future was dropped before `finish`.
    fn abandon(&self, id: u64) {
        let mut inner = self.lock();
        if !inner.in_flight.as_ref().is_some_and(|f| f.id == id) {
            return;
        }
        if let Some(in_flight) = inner.in_flight.take() {
            debug!("Summary request for {} dropped before completion", in_flight.entity);
            Self::release(&mut inner, in_flight);
        }
    }

    /// Selects `target` and produces its summary.
    ///
    /// Returns `Err(Cancelled)` if another entity is selected (or
    /// [`cancel_current`](Self::cancel_current) is called) before the result
    /// is attached.
    pub async fn request(&self, target: SummaryTarget) -> Result<SummaryOutcome, Cancelled> {
        let entity = target.entity_id();

        let (id, token) = match self.begin(&entity) {
            Begin::Cached(outcome) => return Ok(outcome),
            Begin::Join(receiver) => return Self::join(receiver).await,
            Begin::Start { id, token } => (id, token),
        };

        let guard = AbandonGuard {
            requester: self,
            id,
            armed: true,
        };
        let result = self.run(&entity, &target, &token).await;
        guard.disarm();
        self.finish(id, &entity, result)
    }

    fn begin(&self, entity: &str) -> Begin {
        let mut inner = self.lock();

        if let Some(in_flight) = &inner.in_flight {
            if in_flight.entity == entity && !in_flight.token.is_cancelled() {
                debug!("Joining in-flight summary request for {}", entity);
                return Begin::Join(in_flight.done.subscribe());
            }
        }

        if let Some(previous) = inner.in_flight.take() {
            debug!(
                "Selection moved from {} to {}; cancelling",
                previous.entity, entity
            );
            previous.token.cancel();
            previous.done.send_replace(Some(Err(Cancelled)));
        }

        inner.current = Some(entity.to_string());

        if let Some(outcome) = inner.summaries.get(entity).filter(|o| o.is_generated()).cloned() {
            inner.state = RequestState::Fulfilled {
                entity: entity.to_string(),
            };
            return Begin::Cached(outcome);
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let token = CancellationToken::new();
        let (done, _) = watch::channel(None);
        inner.in_flight = Some(InFlight {
            id,
            entity: entity.to_string(),
            token: token.clone(),
            done,
        });
        inner.state = RequestState::Requesting {
            entity: entity.to_string(),
        };
        Begin::Start { id, token }
    }

    async fn join(mut receiver: watch::Receiver<Completion>) -> Result<SummaryOutcome, Cancelled> {
        let completion = match receiver.wait_for(|completion| completion.is_some()).await {
            Ok(completion) => completion.clone(),
            Err(_) => None,
        };
        completion.unwrap_or(Err(Cancelled))
    }

    fn checkpoint(&self, entity: &str, token: &CancellationToken) -> Result<(), Cancelled> {
        if token.is_cancelled() {
            return Err(Cancelled);
        }
        if self.lock().current.as_deref() != Some(entity) {
            return Err(Cancelled);
        }
        Ok(())
    }

    async fn run(
        &self,
        entity: &str,
        target: &SummaryTarget,
        token: &CancellationToken,
    ) -> Result<SummaryOutcome, Cancelled> {
        self.checkpoint(entity, token)?;

        let (files, scaffold) = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Cancelled),
            prepared = async { tokio::join!(self.files_for(entity, target), async { target.scaffold() }) } => prepared,
        };
        self.checkpoint(entity, token)?;

        let prompt = append_file_changes(
            scaffold,
            &files,
            self.config.patch_char_limit,
            self.config.max_files,
        );
        let request = SummaryRequest::new(prompt, target.content_type(), self.config.model.as_str());
        self.checkpoint(entity, token)?;

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Cancelled),
            result = self.provider.summarize(request) => result,
        };
        self.checkpoint(entity, token)?;

        Ok(match result {
            Ok(summary) => SummaryOutcome::Generated(summary.trim().to_string()),
            Err(e) if e.is_maintenance() => {
                warn!("Summary service unavailable for {}: {}", entity, e);
                SummaryOutcome::Unavailable(self.config.maintenance_message.clone())
            }
            Err(e) => {
                warn!("Summary request failed for {}: {}", entity, e);
                SummaryOutcome::Failed(self.config.fallback_message.clone())
            }
        })
    }

    /// Attaches the outcome if request `id` is still the one in flight.
    fn finish(
        &self,
        id: u64,
        entity: &str,
        result: Result<SummaryOutcome, Cancelled>,
    ) -> Result<SummaryOutcome, Cancelled> {
        let mut inner = self.lock();

        let still_current = inner
            .in_flight
            .as_ref()
            .is_some_and(|f| f.id == id && !f.token.is_cancelled())
            && inner.current.as_deref() == Some(entity);
        if !still_current {
            debug!("Discarding stale summary result for {}", entity);
            return Err(Cancelled);
        }

        let Some(in_flight) = inner.in_flight.take() else {
            return Err(Cancelled);
        };

        match &result {
            Ok(outcome) => {
                inner.summaries.insert(entity.to_string(), outcome.clone());
                inner.state = if outcome.is_generated() {
                    info!("Summary attached to {}", entity);
                    RequestState::Fulfilled {
                        entity: entity.to_string(),
                    }
                } else {
                    RequestState::Failed {
                        entity: entity.to_string(),
                    }
                };
            }
            Err(Cancelled) => {
                inner.state = RequestState::Cancelled {
                    entity: entity.to_string(),
                };
            }
        }

        in_flight.done.send_replace(Some(result.clone()));
        result
    }

    async fn files_for(&self, entity: &str, target: &SummaryTarget) -> Vec<FileChange> {
        let key = entity.to_string();
        if let Some(files) = self.files.get(&key) {
            debug!("Reusing fetched files for {}", entity);
            return files;
        }

        let fetched = match target {
            SummaryTarget::PullRequest { repo, pull_request } => self
                .github
                .pull_request_files(repo, pull_request.number)
                .await
                .map(|f| f.files),
            SummaryTarget::Commit { repo, commit } => self
                .github
                .commit_files(repo, &commit.sha)
                .await
                .map(|f| f.files),
            SummaryTarget::JiraIssues { .. } => return Vec::new(),
        };

        match fetched {
            Ok(files) => {
                let files = dedup_by_key(files, FileChange::dedup_key);
                self.files.insert(key, files.clone());
                files
            }
            Err(e) => {
                warn!("Could not fetch files for {}; summarizing without diffs: {}", entity, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(key: &str) -> JiraIssue {
        JiraIssue {
            key: key.to_string(),
            summary: String::new(),
            status: String::new(),
            issue_type: String::new(),
            assignee: None,
            description: None,
        }
    }

    #[test]
    fn test_entity_ids() {
        let pr = SummaryTarget::pull_request("org/repo", PullRequest::new(42, "t"));
        assert_eq!(pr.entity_id(), "pr:org/repo#42");
        assert_eq!(pr.content_type(), ContentType::PullRequest);

        let commit = SummaryTarget::commit("org/repo", Commit::new("abc", "m"));
        assert_eq!(commit.entity_id(), "commit:org/repo@abc");

        let jira = SummaryTarget::JiraIssues {
            repo: "org/repo".to_string(),
            pr_number: 42,
            issues: vec![issue("ABC-2"), issue("ABC-1"), issue("ABC-2")],
        };
        assert_eq!(jira.entity_id(), "jira:org/repo#42:ABC-1,ABC-2");
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(SummaryOutcome::Generated("a".into()).text(), "a");
        assert!(!SummaryOutcome::Failed("b".into()).is_generated());
    }

    #[test]
    fn test_summary_config_validation() {
        assert!(SummaryConfig::default().validate().is_ok());
        let config = SummaryConfig {
            patch_char_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
