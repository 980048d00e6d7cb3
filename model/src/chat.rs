use crate::config::SummarizerConfig;
use crate::provider::{ModelError, ModelResult};
use crate::types::{ChatRequest, ChatResetRequest};
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, info};

/// Raw body chunks of a streaming chat response, in arrival order.
pub type ChatByteStream = BoxStream<'static, ModelResult<Bytes>>;

#[derive(Debug, Deserialize)]
struct ResetResponse {
    #[serde(default)]
    success: bool,
}

/// Client for the streaming chat endpoint and its session reset.
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(config: &SummarizerConfig) -> ModelResult<Self> {
        config
            .validate()
            .map_err(|msg| ModelError::InvalidConfig { message: msg })?;

        // No overall timeout: a chat stream legitimately stays open for a long time.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Unknown {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.normalized_base_url(),
        })
    }

    /// Sends the conversation and returns the response body as a byte stream.
    pub async fn send(&self, request: &ChatRequest) -> ModelResult<ChatByteStream> {
        debug!(
            "Sending chat with {} messages for session {}",
            request.messages.len(),
            request.session_id
        );

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(ModelError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::from_status(status, &body));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ModelError::Network))
            .boxed())
    }

    /// Clears the server-side conversation state for a session.
    pub async fn reset(&self, request: &ChatResetRequest) -> ModelResult<bool> {
        let url = format!("{}/api/chat/reset", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(ModelError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::from_status(status, &body));
        }

        let ack: ResetResponse = response.json().await.map_err(ModelError::Network)?;
        info!(
            "Chat reset for session {} acknowledged: {}",
            request.session_id, ack.success
        );
        Ok(ack.success)
    }
}
