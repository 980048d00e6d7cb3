use serde::{Deserialize, Serialize};

/// Kind of content handed to the summarization backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    PullRequest,
    Commit,
    JiraIssues,
    Repository,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::PullRequest => "pull_request",
            ContentType::Commit => "commit",
            ContentType::JiraIssues => "jira_issues",
            ContentType::Repository => "repository",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryRequest {
    pub content: String,
    pub content_type: ContentType,
    pub model: String,
}

impl SummaryRequest {
    pub fn new(content: impl Into<String>, content_type: ContentType, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type,
            model: model.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Flags telling the chat backend which repository context to pull in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    pub include_jira: bool,
    pub include_commits: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub user_id: String,
    pub session_id: String,
    pub chat_id: String,
    pub context: ChatContext,
}

impl ChatRequest {
    pub fn new(
        messages: Vec<ChatMessage>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            messages,
            user_id: user_id.into(),
            session_id: session_id.into(),
            chat_id: chat_id.into(),
            context: ChatContext::default(),
        }
    }

    pub fn with_context(mut self, context: ChatContext) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResetRequest {
    pub username: String,
    pub session_id: String,
    pub org: String,
    pub repo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimit {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub remaining: Option<u32>,
    #[serde(default)]
    pub reset: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FastApiHealth {
    pub status: String,
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendHealth {
    pub status: String,
    #[serde(default)]
    pub fastapi_health: Option<FastApiHealth>,
}

impl BackendHealth {
    /// True when either the proxy or the FastAPI service reports anything but healthy,
    /// or when the upstream rate limit is exhausted.
    pub fn is_degraded(&self) -> bool {
        if !is_healthy_status(&self.status) {
            return true;
        }

        match &self.fastapi_health {
            Some(fastapi) => {
                let exhausted = fastapi
                    .rate_limit
                    .as_ref()
                    .and_then(|limit| limit.remaining)
                    .is_some_and(|remaining| remaining == 0);
                !is_healthy_status(&fastapi.status) || exhausted
            }
            None => true,
        }
    }
}

fn is_healthy_status(status: &str) -> bool {
    matches!(status.to_ascii_lowercase().as_str(), "ok" | "healthy")
}
