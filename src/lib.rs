//! # magma-search
//!
//! Open-source intelligence search for a person or nickname.
//!
//! A run queries DuckDuckGo and Bing page by page, collects a deduplicated
//! set of candidate URLs, then fetches every candidate concurrently and
//! reports the page title and the links on it that relate to the query.
//!
//! ## Design
//!
//! - Scrapes provider HTML result pages with CSS selectors; no API keys
//! - Paginates providers sequentially, analyses pages on a bounded worker pool
//! - Rotates User-Agent strings across requests through an optional proxy
//! - Retries transient HTTP failures with exponential backoff
//! - Scores links by exact substring match or fuzzy similarity
//! - Cancellation stops dispatch and still yields a partial report
//!
//! ## Security
//!
//! - No network listeners; this is a library, not a server
//! - Query text is logged only at trace level

pub mod analyzer;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod identity;
pub mod orchestrator;
pub mod providers;
pub mod relevance;
pub mod types;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use analyzer::PageAnalyzer;
pub use config::SearchConfig;
pub use coordinator::Coordinator;
pub use error::{ErrorKind, Result, SearchError};
pub use http::{Fetcher, HttpClient, RetryPolicy};
pub use identity::IdentityRotator;
pub use orchestrator::aggregate::ResultAggregator;
pub use orchestrator::url_normalize::{normalize_href, normalize_url};
pub use providers::{ProviderAdapter, SearchProvider};
pub use relevance::partial_ratio;
pub use types::{
    AggregateReport, CandidateUrl, MatchReason, PageResult, Provider, RelevantLink, RunState,
    SearchQuery,
};

/// Investigate `query` with the providers enabled in `config`.
///
/// Runs the whole pipeline: pagination, dedup, concurrent page analysis.
/// Page-level failures are recorded in the report rather than returned.
/// When `cancel` fires, the report holds whatever was analysed so far and
/// its state is [`RunState::Cancelled`].
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` is invalid, or
/// [`SearchError::Http`] if the HTTP client cannot be built (for example
/// an unsupported proxy). No request is sent in either case.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> magma_search::Result<()> {
/// use magma_search::{SearchConfig, SearchQuery};
/// use tokio_util::sync::CancellationToken;
///
/// let query = SearchQuery::with_defaults("Jane Doe")?;
/// let report =
///     magma_search::investigate(&query, &SearchConfig::default(), &CancellationToken::new())
///         .await?;
/// for page in &report.pages {
///     println!("{} ({} relevant links)", page.url, page.relevant_links.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn investigate(
    query: &SearchQuery,
    config: &SearchConfig,
    cancel: &CancellationToken,
) -> Result<AggregateReport> {
    let providers = ProviderAdapter::from_config(config);
    investigate_with(query, config, &providers, cancel).await
}

/// Like [`investigate`], with caller-supplied provider adapters.
///
/// # Errors
///
/// Same as [`investigate`].
pub async fn investigate_with(
    query: &SearchQuery,
    config: &SearchConfig,
    providers: &[ProviderAdapter],
    cancel: &CancellationToken,
) -> Result<AggregateReport> {
    config.validate()?;

    let proxy = query.proxy().cloned();
    let identity = match &config.user_agent {
        Some(user_agent) => IdentityRotator::fixed(user_agent.clone(), proxy),
        None => IdentityRotator::new(proxy),
    };
    let client = HttpClient::new(config, Arc::new(identity))?.with_cancellation(cancel.clone());

    Ok(investigate_using(Arc::new(client), query, config, providers, cancel).await)
}

/// Run the pipeline over an arbitrary [`Fetcher`].
///
/// `config` is assumed valid.
pub async fn investigate_using<F: Fetcher + 'static>(
    fetcher: Arc<F>,
    query: &SearchQuery,
    config: &SearchConfig,
    providers: &[ProviderAdapter],
    cancel: &CancellationToken,
) -> AggregateReport {
    let candidates = ResultAggregator::new(fetcher.as_ref(), providers, config)
        .collect(query.text(), query.max_results(), cancel)
        .await;
    let total_candidates = candidates.len();
    let cancelled_while_searching = cancel.is_cancelled();

    let analyzer = PageAnalyzer::new(fetcher, query.text(), config.fuzzy_threshold);
    let mut coordinator = Coordinator::new(analyzer, query.thread_count());
    let pages = coordinator.run(candidates, cancel).await;

    let state = if cancelled_while_searching {
        RunState::Cancelled
    } else {
        coordinator.state()
    };
    let report = AggregateReport::new(query.clone(), pages, total_candidates, state);
    tracing::info!(
        candidates = report.total_candidates,
        analysed = report.total_analyzed,
        errors = report.total_errors,
        state = ?report.state,
        "investigation finished"
    );
    report
}
