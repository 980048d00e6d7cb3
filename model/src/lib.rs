pub mod chat;
pub mod config;
pub mod http;
pub mod provider;
pub mod stream;
pub mod types;

pub use chat::{ChatByteStream, ChatClient};
pub use config::SummarizerConfig;
pub use http::HttpSummaryProvider;
pub use provider::{ModelError, ModelResult, SummaryProvider};
pub use stream::{ChatFrame, DecoderState, FrameDecoder};
pub use types::{
    BackendHealth, ChatContext, ChatMessage, ChatRequest, ChatResetRequest, ContentType,
    FastApiHealth, MessageRole, RateLimit, SummaryRequest,
};

pub mod prelude {
    pub use crate::chat::*;
    pub use crate::config::*;
    pub use crate::http::*;
    pub use crate::provider::*;
    pub use crate::stream::*;
    pub use crate::types::*;
}
