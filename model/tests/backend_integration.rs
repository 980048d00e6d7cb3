//! Live checks against a running dashboard backend.
//!
//! Run with `INSIGHT_API_BASE_URL=http://host:port cargo test -- --ignored`.

use futures::StreamExt;
use model::{
    ChatClient, ChatFrame, ChatMessage, ChatRequest, ContentType, FrameDecoder,
    HttpSummaryProvider, SummarizerConfig, SummaryProvider, SummaryRequest,
};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(120);

fn config() -> SummarizerConfig {
    let base_url = std::env::var("INSIGHT_API_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());
    SummarizerConfig::new()
        .with_base_url(base_url)
        .with_timeout(TIMEOUT)
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let provider = HttpSummaryProvider::new(config()).expect("provider creation");

    let health = tokio::time::timeout(TIMEOUT, provider.health_check())
        .await
        .expect("health_check timed out")
        .expect("health_check failed");

    assert!(!health.status.is_empty(), "status must be present");
}

#[tokio::test]
#[ignore]
async fn test_summarize_commit() {
    let config = config();
    let model = config.default_model.clone();
    let provider = HttpSummaryProvider::new(config).expect("provider creation");
    let request = SummaryRequest::new(
        "COMMIT: abc1234\nMESSAGE:\nFix off-by-one in pagination",
        ContentType::Commit,
        model,
    );

    let summary = tokio::time::timeout(TIMEOUT, provider.summarize(request))
        .await
        .expect("summarize timed out")
        .expect("summarize failed");

    assert!(!summary.trim().is_empty(), "summary must not be empty");
}

#[tokio::test]
#[ignore]
async fn test_chat_stream_decodes() {
    let client = ChatClient::new(&config()).expect("client creation");
    let request = ChatRequest::new(
        vec![ChatMessage::user("Say hello in one word.")],
        "integration",
        "integration-session",
        "integration-chat",
    );

    let mut stream = tokio::time::timeout(TIMEOUT, client.send(&request))
        .await
        .expect("send timed out")
        .expect("send failed");

    let mut decoder = FrameDecoder::new();
    let mut content = String::new();
    while let Some(chunk) = tokio::time::timeout(TIMEOUT, stream.next())
        .await
        .expect("stream stalled")
    {
        for frame in decoder.feed(&chunk.expect("chunk")) {
            if let ChatFrame::Content(text) = frame {
                content.push_str(&text);
            }
        }
    }
    for frame in decoder.finish() {
        if let ChatFrame::Content(text) = frame {
            content.push_str(&text);
        }
    }

    assert!(!content.is_empty(), "assistant content must not be empty");
}
