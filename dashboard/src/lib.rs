pub mod cache;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod filter;
pub mod insights;
pub mod jira_summary;
pub mod prompts;
pub mod requester;
pub mod streaming;

pub use cache::TtlCache;
pub use config::DashboardConfig;
pub use enrichment::{run_in_batches, EnrichmentConfig, EnrichmentPipeline, EnrichmentReport};
pub use error::{DashboardError, DashboardResult};
pub use filter::{
    dedup_by_key, IssueFilter, ItemSort, PullRequestFilter, RepositoryFilter, RepositorySort,
    SortDirection, StateFilter, TimeRange,
};
pub use insights::{
    compute_insights, display_summary, local_insights, ActivityInsights, ActivityLevel,
    InsightThresholds,
};
pub use jira_summary::JiraSummaryCache;
pub use requester::{
    Cancelled, RequestState, SummaryConfig, SummaryOutcome, SummaryRequester, SummaryTarget,
};
pub use streaming::{ChatStreamConsumer, MessageSink, StreamConfig, StreamEnd, StreamSummary};

pub mod prelude {
    pub use crate::cache::*;
    pub use crate::config::*;
    pub use crate::enrichment::*;
    pub use crate::error::*;
    pub use crate::filter::*;
    pub use crate::insights::*;
    pub use crate::jira_summary::*;
    pub use crate::requester::*;
    pub use crate::streaming::*;
}
