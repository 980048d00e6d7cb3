//! Line-buffered decoder for the chat endpoint's `data: {...}` framing.
//!
//! Bytes are appended to a buffer as they arrive. Only newly appended bytes
//! are scanned for a line terminator; each complete line is turned into a
//! frame and dispatched. A trailing partial line waits for the next chunk, so
//! frames and multi-byte characters split across network reads decode the
//! same as if they had arrived in one piece.

use serde::Deserialize;
use tracing::debug;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// One dispatched frame from the chat stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatFrame {
    /// Backend progress notice; recorded, never rendered.
    Progress(Option<String>),
    /// A piece of assistant text.
    Content(String),
    /// Backend-reported failure.
    Error(String),
    /// End of stream.
    Done,
    /// Well-formed frame of a type the consumer does not act on.
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type", default)]
    frame_type: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for the rest of the current line.
    Accumulating,
    /// A `[DONE]` sentinel or `done` frame was seen; further input is ignored.
    Terminated,
}

#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    scanned: usize,
    state: DecoderState,
    malformed: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            state: DecoderState::Accumulating,
            malformed: 0,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Number of `data:` lines dropped because their payload was not valid JSON.
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    /// Feeds a chunk of bytes and returns every frame completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ChatFrame> {
        if self.state == DecoderState::Terminated {
            return Vec::new();
        }

        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        // `start` is the first byte of the line being assembled; complete
        // lines before it are dropped in one go at the end.
        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = buffer[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + offset;
            let frame = self.decode_line(&buffer[start..end]);
            start = end + 1;
            search_from = start;

            if let Some(frame) = frame {
                let done = frame == ChatFrame::Done;
                frames.push(frame);
                if done {
                    self.terminate();
                    return frames;
                }
            }
        }

        buffer.drain(..start);
        self.scanned = buffer.len();
        self.buffer = buffer;
        frames
    }

    /// Flushes a final unterminated line once the underlying stream has ended.
    pub fn finish(&mut self) -> Vec<ChatFrame> {
        if self.state == DecoderState::Terminated || self.buffer.is_empty() {
            self.terminate();
            return Vec::new();
        }

        let line = std::mem::take(&mut self.buffer);
        let frame = self.decode_line(&line);
        self.terminate();
        frame.into_iter().collect()
    }

    fn terminate(&mut self) {
        self.state = DecoderState::Terminated;
        self.buffer.clear();
        self.scanned = 0;
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<ChatFrame> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches('\r');

        let payload = line.strip_prefix(DATA_PREFIX)?.trim();
        if payload.is_empty() {
            return None;
        }
        if payload == DONE_SENTINEL {
            return Some(ChatFrame::Done);
        }

        let value: serde_json::Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                self.malformed += 1;
                debug!("Dropping malformed chat frame: {}", e);
                return None;
            }
        };

        match serde_json::from_value::<RawFrame>(value.clone()) {
            Ok(raw) => Some(classify(raw, value)),
            Err(_) => Some(ChatFrame::Other(value)),
        }
    }
}

fn classify(raw: RawFrame, value: serde_json::Value) -> ChatFrame {
    match raw.frame_type.as_deref() {
        Some("progress") => ChatFrame::Progress(raw.message.or(raw.content)),
        Some("error") => ChatFrame::Error(
            raw.error
                .or(raw.message)
                .unwrap_or_else(|| "unknown stream error".to_string()),
        ),
        Some("done") | Some("complete") => ChatFrame::Done,
        _ => match raw.content {
            Some(content) => ChatFrame::Content(content),
            None => ChatFrame::Other(value),
        },
    }
}
