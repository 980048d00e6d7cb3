//! Chat stream consumption
//!
//! Raw chunks go through [`FrameDecoder`]; content frames accumulate into one
//! assistant message. The first non-empty content creates the message, later
//! content updates it in place at most once per throttle interval, and
//! whatever is pending is flushed when the stream ends.

use crate::error::{DashboardError, DashboardResult};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use model::{ChatFrame, DecoderState, FrameDecoder, ModelResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Receives the assistant message as it grows.
pub trait MessageSink: Send {
    /// Called once with the first non-empty content.
    fn start_message(&mut self, content: &str);

    /// Called with the full accumulated content, never more than once per
    /// throttle interval except for the final flush.
    fn update_message(&mut self, content: &str);

    fn progress(&mut self, _message: Option<&str>) {}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub throttle_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { throttle_ms: 100 }
    }
}

impl StreamConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub content: String,
    pub progress_events: usize,
    /// Sink calls that delivered content, `start_message` included.
    pub updates: usize,
    pub malformed_frames: usize,
    pub end: StreamEnd,
}

struct Delivery {
    content: String,
    delivered: usize,
    started: bool,
    updates: usize,
    last_flush: Option<Instant>,
}

impl Delivery {
    fn is_dirty(&self) -> bool {
        self.content.len() != self.delivered
    }

    fn flush<K: MessageSink + ?Sized>(&mut self, sink: &mut K) {
        if !self.is_dirty() || self.content.is_empty() {
            return;
        }
        if self.started {
            sink.update_message(&self.content);
        } else {
            sink.start_message(&self.content);
            self.started = true;
        }
        self.delivered = self.content.len();
        self.updates += 1;
        self.last_flush = Some(Instant::now());
    }
}

pub struct ChatStreamConsumer {
    config: StreamConfig,
}

impl Default for ChatStreamConsumer {
    fn default() -> Self {
        Self::new(StreamConfig::default())
    }
}

impl ChatStreamConsumer {
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }

    /// Reads `stream` to completion, cancellation or a backend error frame.
    ///
    /// Once `cancel` fires no further sink calls are made and the summary
    /// reports [`StreamEnd::Cancelled`].
    pub async fn consume<S, K>(
        &self,
        mut stream: S,
        sink: &mut K,
        cancel: &CancellationToken,
    ) -> DashboardResult<StreamSummary>
    where
        S: Stream<Item = ModelResult<Bytes>> + Unpin,
        K: MessageSink + ?Sized,
    {
        let throttle = self.config.throttle();
        let mut decoder = FrameDecoder::new();
        let mut delivery = Delivery {
            content: String::new(),
            delivered: 0,
            started: false,
            updates: 0,
            last_flush: None,
        };
        let mut progress_events = 0;
        let mut flush_at: Option<Instant> = None;

        let end = loop {
            let deadline = flush_at;
            let frames = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Chat stream cancelled; abandoning reader");
                    break StreamEnd::Cancelled;
                }
                _ = async move {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => {
                    flush_at = None;
                    delivery.flush(sink);
                    continue;
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => decoder.feed(&bytes),
                    Some(Err(e)) => {
                        warn!("Chat stream read failed: {}", e);
                        return Err(e.into());
                    }
                    None => {
                        let frames = decoder.finish();
                        Self::apply(frames, &mut delivery, sink, &mut progress_events)?;
                        break StreamEnd::Completed;
                    }
                },
            };

            Self::apply(frames, &mut delivery, sink, &mut progress_events)?;
            if decoder.state() == DecoderState::Terminated {
                break StreamEnd::Completed;
            }

            if delivery.is_dirty() && flush_at.is_none() {
                let now = Instant::now();
                match delivery.last_flush {
                    Some(last) if now < last + throttle => flush_at = Some(last + throttle),
                    _ => delivery.flush(sink),
                }
            }
        };

        if end == StreamEnd::Completed {
            delivery.flush(sink);
        }

        Ok(StreamSummary {
            content: delivery.content,
            progress_events,
            updates: delivery.updates,
            malformed_frames: decoder.malformed_count(),
            end,
        })
    }

    fn apply<K: MessageSink + ?Sized>(
        frames: Vec<ChatFrame>,
        delivery: &mut Delivery,
        sink: &mut K,
        progress_events: &mut usize,
    ) -> DashboardResult<()> {
        for frame in frames {
            match frame {
                ChatFrame::Content(text) => delivery.content.push_str(&text),
                ChatFrame::Progress(message) => {
                    *progress_events += 1;
                    sink.progress(message.as_deref());
                }
                ChatFrame::Error(message) => {
                    delivery.flush(sink);
                    return Err(DashboardError::Stream { message });
                }
                ChatFrame::Done => {}
                ChatFrame::Other(value) => debug!("Ignoring chat frame: {}", value),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, String)>,
    }

    impl MessageSink for Recorder {
        fn start_message(&mut self, content: &str) {
            self.calls.push(("start".to_string(), content.to_string()));
        }

        fn update_message(&mut self, content: &str) {
            self.calls.push(("update".to_string(), content.to_string()));
        }
    }

    fn chunks(parts: &[&str]) -> impl Stream<Item = ModelResult<Bytes>> + Unpin {
        let items: Vec<ModelResult<Bytes>> = parts
            .iter()
            .map(|p| Ok(Bytes::from(p.to_string())))
            .collect();
        stream::iter(items)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_content_starts_message() {
        let mut sink = Recorder::default();
        let summary = ChatStreamConsumer::default()
            .consume(
                chunks(&["data: {\"content\":\"Hi\"}\n", "data: [DONE]\n"]),
                &mut sink,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(summary.content, "Hi");
        assert_eq!(summary.end, StreamEnd::Completed);
        assert_eq!(sink.calls, vec![("start".to_string(), "Hi".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_frame_surfaces() {
        let mut sink = Recorder::default();
        let result = ChatStreamConsumer::default()
            .consume(
                chunks(&["data: {\"content\":\"partial\"}\ndata: {\"type\":\"error\",\"error\":\"boom\"}\n"]),
                &mut sink,
                &CancellationToken::new(),
            )
            .await;

        match result {
            Err(DashboardError::Stream { message }) => assert_eq!(message, "boom"),
            other => panic!("expected stream error, got {:?}", other.map(|s| s.content)),
        }
        assert_eq!(sink.calls.last().map(|c| c.1.as_str()), Some("partial"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_makes_no_sink_calls() {
        let token = CancellationToken::new();
        token.cancel();
        let mut sink = Recorder::default();
        let summary = ChatStreamConsumer::default()
            .consume(chunks(&["data: {\"content\":\"Hi\"}\n"]), &mut sink, &token)
            .await
            .unwrap();

        assert_eq!(summary.end, StreamEnd::Cancelled);
        assert!(sink.calls.is_empty());
    }
}
