use clap::{Parser, Subcommand, ValueEnum};
use dashboard::prelude::*;
use model::prelude::*;
use sources::{
    search_pull_requests, DependencyGraphApi, DependencyGraphRequest, GitHubApi, GraphFilter,
    IssueState, JiraApi, JiraLinks, ProxyClient, PullRequest, PullRequestState, RepoRef,
    SearchQuery, Visibility,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "insight")]
#[command(about = "Repository activity, AI summaries and chat from the terminal")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Updated,
    Created,
    Stars,
    Forks,
    Name,
}

#[derive(Clone, Copy, ValueEnum)]
enum RangeArg {
    Day,
    Week,
    Month,
    Quarter,
    Year,
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum StateArg {
    Open,
    Closed,
    Merged,
    All,
}

#[derive(Subcommand)]
enum Commands {
    /// List repositories
    Repos {
        /// Case-insensitive text matched against name and description
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long, value_enum, default_value = "updated")]
        sort: SortArg,
        /// Sort ascending instead of descending
        #[arg(long)]
        ascending: bool,
        #[arg(long, value_enum, default_value = "all")]
        range: RangeArg,
        /// Only private repositories
        #[arg(long)]
        private: bool,
        #[arg(long)]
        no_forks: bool,
        #[arg(long)]
        no_archived: bool,
    },
    /// List pull requests with file statistics and linked JIRA issues
    Pulls {
        /// Repository as owner/name
        repo: String,
        #[arg(long, value_enum, default_value = "open")]
        state: StateArg,
        #[arg(short, long)]
        label: Option<String>,
        /// Skip per-PR enrichment
        #[arg(long)]
        no_enrich: bool,
    },
    /// List commits with file statistics
    Commits {
        repo: String,
        #[arg(long)]
        no_enrich: bool,
    },
    /// List issues, excluding pull requests
    Issues {
        repo: String,
        #[arg(long, value_enum, default_value = "open")]
        state: StateArg,
        #[arg(short, long)]
        label: Option<String>,
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// Show the raw diff of one file at a ref
    Diff {
        repo: String,
        reference: String,
        filename: String,
    },
    /// Generate an AI summary for a pull request or commit
    Summarize {
        repo: String,
        #[arg(long, conflicts_with = "commit", required_unless_present = "commit")]
        pr: Option<u64>,
        #[arg(long)]
        commit: Option<String>,
    },
    /// Summarize the JIRA issues linked to a pull request
    JiraSummary { repo: String, pr: u64 },
    /// Search pull requests
    Search {
        query: String,
        /// Restrict to one repository
        #[arg(short, long)]
        repo: Option<String>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long, default_value = "10")]
        max_pages: u32,
    },
    /// Fetch a dependency graph across repositories
    Graph {
        #[arg(required = true)]
        repos: Vec<String>,
        #[arg(long = "file-type")]
        file_types: Vec<String>,
        #[arg(long, default_value = "100")]
        max_files: usize,
        /// Keep only nodes of these types
        #[arg(long = "node-type")]
        node_types: Vec<String>,
        #[arg(long, default_value = "0.0")]
        min_strength: f64,
    },
    /// Ask the chat assistant a question
    Chat {
        message: String,
        #[arg(long)]
        org: Option<String>,
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        include_jira: bool,
        #[arg(long)]
        include_commits: bool,
        #[arg(long, default_value = "cli")]
        user: String,
        /// Reuse an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
    },
    /// Clear server-side chat state for a session
    ResetChat {
        session: String,
        org: String,
        repo: String,
        #[arg(long, default_value = "cli")]
        user: String,
    },
    /// Backend health check
    Health,
    /// Activity insights computed locally from commits and pull requests
    Insights { repo: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = DashboardConfig::load(cli.config.as_deref())?;
    let client = Arc::new(ProxyClient::new(config.api_config())?);

    let result = run(cli.command, &config, client).await;
    if let Err(e) = &result {
        error!("Command failed: {}", e);
    }
    result
}

async fn run(
    command: Commands,
    config: &DashboardConfig,
    client: Arc<ProxyClient>,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Repos {
            search,
            sort,
            ascending,
            range,
            private,
            no_forks,
            no_archived,
        } => {
            let mut filter = RepositoryFilter::new()
                .with_search(search)
                .with_forks(!no_forks)
                .with_archived(!no_archived)
                .with_time_range(range.into())
                .with_sort(sort.into(), direction(ascending));
            if private {
                filter = filter.with_visibility(Visibility::Private);
            }
            list_repositories(client.as_ref(), &filter).await?;
        }
        Commands::Pulls {
            repo,
            state,
            label,
            no_enrich,
        } => {
            let mut filter = PullRequestFilter::new().with_state(state.into());
            if let Some(label) = label {
                filter = filter.with_label(label);
            }
            list_pull_requests(client, config, &repo, state, &filter, !no_enrich).await?;
        }
        Commands::Commits { repo, no_enrich } => {
            list_commits(client, config, &repo, !no_enrich).await?;
        }
        Commands::Issues {
            repo,
            state,
            label,
            search,
        } => {
            let mut filter = IssueFilter::new().with_state(state.into()).with_search(search);
            if let Some(label) = label {
                filter = filter.with_label(label);
            }
            list_issues(client.as_ref(), &repo, state, &filter).await?;
        }
        Commands::Diff {
            repo,
            reference,
            filename,
        } => {
            let diff = client.file_diff(&repo, &reference, &filename).await?;
            println!("{}", diff);
        }
        Commands::Summarize { repo, pr, commit } => {
            summarize(client, config, &repo, pr, commit).await?;
        }
        Commands::JiraSummary { repo, pr } => {
            jira_summary(client, config, &repo, pr).await?;
        }
        Commands::Search {
            query,
            repo,
            sort,
            max_pages,
        } => {
            let mut search = match &repo {
                Some(repo) => SearchQuery::pull_requests_in(repo, &query),
                None => SearchQuery::new(format!("is:pr {}", query)),
            }
            .with_max_pages(max_pages);
            if let Some(sort) = sort {
                search = search.with_sort(sort);
            }
            let results = search_pull_requests(client.as_ref(), &search).await?;
            println!("{} pull requests found", results.len());
            for pr in &results {
                print_pull_request(pr);
            }
        }
        Commands::Graph {
            repos,
            file_types,
            max_files,
            node_types,
            min_strength,
        } => {
            let request = DependencyGraphRequest::new(repos, config.summary.model.as_str())
                .with_file_types(file_types)
                .with_max_files(max_files);
            let graph = client.dependency_graph(&request).await?;
            let mut filter = GraphFilter::new().with_min_strength(min_strength);
            if !node_types.is_empty() {
                filter = filter.with_node_types(node_types);
            }
            let graph = graph.filtered(&filter);
            println!("{}", serde_json::to_string_pretty(&graph)?);
        }
        Commands::Chat {
            message,
            org,
            repo,
            include_jira,
            include_commits,
            user,
            session,
        } => {
            let context = ChatContext {
                org,
                repo,
                include_jira,
                include_commits,
            };
            chat(config, &message, context, &user, session).await?;
        }
        Commands::ResetChat {
            session,
            org,
            repo,
            user,
        } => {
            let chat = ChatClient::new(&config.summarizer_config())?;
            let acknowledged = chat
                .reset(&ChatResetRequest {
                    username: user,
                    session_id: session,
                    org,
                    repo,
                })
                .await?;
            println!("Reset {}", if acknowledged { "acknowledged" } else { "rejected" });
        }
        Commands::Health => {
            let provider = HttpSummaryProvider::new(config.summarizer_config())?;
            let health = provider.health_check().await?;
            println!("Backend: {}", health.status);
            if let Some(fastapi) = &health.fastapi_health {
                println!("AI service: {}", fastapi.status);
                if let Some(limit) = &fastapi.rate_limit {
                    println!(
                        "Rate limit: {}/{}",
                        limit.remaining.map_or("?".to_string(), |r| r.to_string()),
                        limit.limit.map_or("?".to_string(), |l| l.to_string())
                    );
                }
            }
            if health.is_degraded() {
                println!("AI features are degraded");
            }
        }
        Commands::Insights { repo } => {
            insights(client, config, &repo).await?;
        }
    }

    Ok(())
}

fn direction(ascending: bool) -> SortDirection {
    if ascending {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    }
}

impl From<SortArg> for RepositorySort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Updated => RepositorySort::Updated,
            SortArg::Created => RepositorySort::Created,
            SortArg::Stars => RepositorySort::Stars,
            SortArg::Forks => RepositorySort::Forks,
            SortArg::Name => RepositorySort::Name,
        }
    }
}

impl From<RangeArg> for TimeRange {
    fn from(arg: RangeArg) -> Self {
        match arg {
            RangeArg::Day => TimeRange::Day,
            RangeArg::Week => TimeRange::Week,
            RangeArg::Month => TimeRange::Month,
            RangeArg::Quarter => TimeRange::Quarter,
            RangeArg::Year => TimeRange::Year,
            RangeArg::All => TimeRange::All,
        }
    }
}

impl From<StateArg> for StateFilter {
    fn from(arg: StateArg) -> Self {
        match arg {
            StateArg::Open => StateFilter::Open,
            StateArg::Closed => StateFilter::Closed,
            StateArg::Merged => StateFilter::Merged,
            StateArg::All => StateFilter::All,
        }
    }
}

impl StateArg {
    fn pull_request_state(self) -> PullRequestState {
        match self {
            StateArg::Open => PullRequestState::Open,
            StateArg::Closed | StateArg::Merged => PullRequestState::Closed,
            StateArg::All => PullRequestState::All,
        }
    }

    fn issue_state(self) -> IssueState {
        match self {
            StateArg::Open => IssueState::Open,
            StateArg::Closed | StateArg::Merged => IssueState::Closed,
            StateArg::All => IssueState::All,
        }
    }
}

fn print_pull_request(pr: &PullRequest) {
    let stats = pr
        .file_summary
        .map(|s| format!(" [{} files, +{} -{}]", s.changed_files, s.additions, s.deletions))
        .unwrap_or_default();
    let repo = pr
        .repository
        .as_deref()
        .map(|r| format!("{} ", r))
        .unwrap_or_default();
    println!("{}#{} {} ({}){}", repo, pr.number, pr.title, pr.author(), stats);
    if let Some(issues) = pr.jira_issues.as_deref().filter(|i| !i.is_empty()) {
        let keys: Vec<&str> = issues.iter().map(|i| i.key.as_str()).collect();
        println!("    JIRA: {}", keys.join(", "));
    }
}

async fn list_repositories(
    client: &ProxyClient,
    filter: &RepositoryFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    let repositories = client.list_repositories().await?;
    let total = repositories.len();
    let repositories = filter.apply(repositories, chrono::Utc::now());
    info!("Showing {} of {} repositories", repositories.len(), total);

    for repo in &repositories {
        let mut flags = Vec::new();
        if repo.private {
            flags.push("private");
        }
        if repo.fork {
            flags.push("fork");
        }
        if repo.archived {
            flags.push("archived");
        }
        println!(
            "{:<40} ★{:<6} forks {:<5} {}",
            repo.full_name,
            repo.stargazers_count,
            repo.forks_count,
            flags.join(",")
        );
    }
    Ok(())
}

async fn list_pull_requests(
    client: Arc<ProxyClient>,
    config: &DashboardConfig,
    repo: &str,
    state: StateArg,
    filter: &PullRequestFilter,
    enrich: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let pull_requests = client
        .list_pull_requests(repo, state.pull_request_state())
        .await?;
    let pull_requests = filter.apply(pull_requests, chrono::Utc::now());

    let pull_requests = if enrich {
        let pipeline = EnrichmentPipeline::new(client.clone(), config.enrichment.clone())
            .with_jira(client.clone());
        let (enriched, report) = pipeline.enrich_pull_requests(repo, pull_requests).await;
        if !report.failed.is_empty() {
            warn!("Could not enrich: {}", report.failed.join(", "));
        }
        enriched
    } else {
        pull_requests
    };

    for pr in &pull_requests {
        print_pull_request(pr);
    }
    Ok(())
}

async fn list_commits(
    client: Arc<ProxyClient>,
    config: &DashboardConfig,
    repo: &str,
    enrich: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let commits = dashboard::filter::dedup_commits(client.list_commits(repo).await?);
    let commits = if enrich {
        let pipeline = EnrichmentPipeline::new(client.clone(), config.enrichment.clone());
        pipeline.enrich_commits(repo, commits).await.0
    } else {
        commits
    };

    for commit in &commits {
        let stats = commit
            .file_summary
            .map(|s| format!(" [+{} -{}]", s.additions, s.deletions))
            .unwrap_or_default();
        println!(
            "{} {} ({}){}",
            commit.short_sha(),
            commit.title(),
            commit.author_name(),
            stats
        );
    }
    Ok(())
}

async fn list_issues(
    client: &ProxyClient,
    repo: &str,
    state: StateArg,
    filter: &IssueFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    let repo_ref: RepoRef = repo.parse()?;
    let issues = client.list_issues(&repo_ref, state.issue_state()).await?;
    let issues = filter.apply(issues, chrono::Utc::now());

    for issue in &issues {
        let labels: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
        println!("#{} [{}] {} {}", issue.number, issue.state, issue.title, labels.join(","));
    }
    Ok(())
}

async fn find_pull_request(
    client: &ProxyClient,
    repo: &str,
    number: u64,
) -> Result<PullRequest, Box<dyn std::error::Error>> {
    client
        .list_pull_requests(repo, PullRequestState::All)
        .await?
        .into_iter()
        .find(|pr| pr.number == number)
        .ok_or_else(|| format!("Pull request {}#{} not found", repo, number).into())
}

async fn summarize(
    client: Arc<ProxyClient>,
    config: &DashboardConfig,
    repo: &str,
    pr: Option<u64>,
    commit: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = match (pr, commit) {
        (Some(number), _) => {
            let mut pull_request = find_pull_request(client.as_ref(), repo, number).await?;
            if let Ok(correlation) = client.pull_request_issues(repo, &pull_request).await {
                pull_request.jira_issues = Some(correlation.jira_issues);
            }
            SummaryTarget::pull_request(repo, pull_request)
        }
        (None, Some(sha)) => {
            let commit = client
                .list_commits(repo)
                .await?
                .into_iter()
                .find(|c| c.sha.starts_with(&sha))
                .ok_or_else(|| format!("Commit {} not found in {}", sha, repo))?;
            SummaryTarget::commit(repo, commit)
        }
        (None, None) => return Err("Either --pr or --commit is required".into()),
    };

    let provider = Arc::new(HttpSummaryProvider::new(config.summarizer_config())?);
    let requester = SummaryRequester::new(provider, client.clone(), config.summary.clone());

    match requester.request(target).await {
        Ok(outcome) => {
            let pipeline = EnrichmentPipeline::new(client.clone(), config.enrichment.clone());
            let text =
                display_summary(&outcome, client.as_ref(), &pipeline, repo, &config.insights).await;
            println!("{}", text);
        }
        Err(Cancelled) => println!("Summary request was cancelled"),
    }
    Ok(())
}

async fn jira_summary(
    client: Arc<ProxyClient>,
    config: &DashboardConfig,
    repo: &str,
    number: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let pull_request = find_pull_request(client.as_ref(), repo, number).await?;
    let correlation = client.pull_request_issues(repo, &pull_request).await?;
    if correlation.jira_issues.is_empty() {
        println!("No JIRA issues linked to {}#{}", repo, number);
        return Ok(());
    }

    let links = config.jira_base_url.as_deref().map(JiraLinks::new);
    for issue in &correlation.jira_issues {
        match &links {
            Some(links) => println!("{} {} ({})", issue.key, issue.summary, links.browse_url(&issue.key)),
            None => println!("{} {}", issue.key, issue.summary),
        }
    }

    let cache = TtlCache::new(config.jira_summary_ttl(), config.jira_summary_capacity);
    let summaries = JiraSummaryCache::new(client, cache, config.summary.model.as_str());
    let summary = summaries
        .get_or_generate(&correlation.jira_issues, number, repo)
        .await?;
    println!("\n{}", summary);
    Ok(())
}

/// Prints assistant text as it streams in.
struct StdoutSink {
    printed: usize,
}

impl StdoutSink {
    fn print_delta(&mut self, content: &str) {
        if let Some(delta) = content.get(self.printed..) {
            print!("{}", delta);
            let _ = io::stdout().flush();
        }
        self.printed = content.len();
    }
}

impl MessageSink for StdoutSink {
    fn start_message(&mut self, content: &str) {
        print!("Assistant: ");
        self.print_delta(content);
    }

    fn update_message(&mut self, content: &str) {
        self.print_delta(content);
    }

    fn progress(&mut self, message: Option<&str>) {
        if let Some(message) = message {
            info!("{}", message);
        }
    }
}

async fn chat(
    config: &DashboardConfig,
    message: &str,
    context: ChatContext,
    user: &str,
    session: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let chat_id = uuid::Uuid::new_v4().to_string();
    let request = ChatRequest::new(vec![ChatMessage::user(message)], user, &session, chat_id)
        .with_context(context);

    let client = ChatClient::new(&config.summarizer_config())?;
    let stream = client.send(&request).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let consumer = ChatStreamConsumer::new(config.chat.clone());
    let mut sink = StdoutSink { printed: 0 };
    let summary = consumer.consume(stream, &mut sink, &cancel).await?;
    println!();

    if summary.end == StreamEnd::Cancelled {
        println!("(interrupted)");
    }
    info!("Chat session {}", session);
    Ok(())
}

async fn insights(
    client: Arc<ProxyClient>,
    config: &DashboardConfig,
    repo: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = HttpSummaryProvider::new(config.summarizer_config())?;
    let degraded = match provider.health_check().await {
        Ok(health) => health.is_degraded(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            true
        }
    };
    if degraded {
        println!("AI service is degraded; showing locally computed insights.\n");
    }

    let pipeline = EnrichmentPipeline::new(client.clone(), config.enrichment.clone());
    let insights = local_insights(client.as_ref(), &pipeline, repo, &config.insights).await?;
    println!("{}", insights.render());
    Ok(())
}
