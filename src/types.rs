//! Result model shared by every stage of the pipeline.
//!
//! All types derive `Serialize` so an external formatter can project an
//! [`AggregateReport`] to JSON or CSV without touching the pipeline.

use crate::error::{ErrorKind, SearchError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

/// Default number of deduplicated URLs to analyse.
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Default size of the page analysis worker pool.
pub const DEFAULT_THREAD_COUNT: usize = 5;

/// Proxy schemes reqwest can route through.
const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

/// Search providers the aggregator can paginate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// DuckDuckGo, scraped through its JavaScript-free endpoints.
    DuckDuckGo,
    /// Bing web search.
    Bing,
}

impl Provider {
    /// Returns the human-readable name of this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Bing => "Bing",
        }
    }

    /// Returns all available provider variants.
    pub fn all() -> &'static [Provider] {
        &[Self::DuckDuckGo, Self::Bing]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable description of one investigation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    text: String,
    max_results: usize,
    thread_count: usize,
    proxy: Option<Url>,
}

impl SearchQuery {
    /// Build a validated query.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the text is blank, `max_results`
    /// or `thread_count` is zero, or `proxy` is not an absolute
    /// `http`, `https`, `socks5` or `socks5h` URL.
    pub fn new(
        text: &str,
        max_results: usize,
        thread_count: usize,
        proxy: Option<&str>,
    ) -> Result<Self, SearchError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SearchError::Config("query text must not be empty".into()));
        }
        if max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if thread_count == 0 {
            return Err(SearchError::Config(
                "thread_count must be at least 1".into(),
            ));
        }
        let proxy = proxy.map(parse_proxy).transpose()?;

        Ok(Self {
            text: text.to_owned(),
            max_results,
            thread_count,
            proxy,
        })
    }

    /// Build a query with the default result cap and worker count.
    ///
    /// # Errors
    ///
    /// Same as [`SearchQuery::new`].
    pub fn with_defaults(text: &str) -> Result<Self, SearchError> {
        Self::new(text, DEFAULT_MAX_RESULTS, DEFAULT_THREAD_COUNT, None)
    }

    /// The trimmed query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Upper bound on deduplicated URLs handed to analysis.
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Size of the analysis worker pool.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Static proxy used for every request of the run.
    pub fn proxy(&self) -> Option<&Url> {
        self.proxy.as_ref()
    }
}

fn parse_proxy(raw: &str) -> Result<Url, SearchError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| SearchError::Config(format!("invalid proxy URL '{raw}': {e}")))?;
    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(SearchError::Config(format!(
            "unsupported proxy scheme '{}' (expected http, https, socks5 or socks5h)",
            url.scheme()
        )));
    }
    if !url.host_str().is_some_and(|host| !host.is_empty()) {
        return Err(SearchError::Config(format!("proxy URL '{raw}' has no host")));
    }
    Ok(url)
}

/// A URL surfaced by a provider before its page is fetched.
///
/// Equality and hashing use the normalised `url` only, so the same page
/// found by both providers collapses to one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateUrl {
    /// Normalised URL (tracking parameters and trailing slash removed).
    pub url: String,
    /// Provider that surfaced this URL first.
    pub source_provider: Provider,
    /// Zero-based provider page the URL was found on.
    pub discovered_at_page: usize,
    /// Result title as shown by the provider, if any.
    pub title: Option<String>,
    /// Result snippet as shown by the provider, if any.
    pub snippet: Option<String>,
}

impl PartialEq for CandidateUrl {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for CandidateUrl {}

impl Hash for CandidateUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

/// Why a link was judged relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchReason {
    /// Query appears verbatim (case-insensitive) in the URL or anchor text.
    ExactSubstring,
    /// Anchor text is similar enough to the query.
    FuzzyMatch,
}

/// A hyperlink on an analysed page that relates to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantLink {
    /// Absolute link target.
    pub href: String,
    /// Trimmed anchor text.
    pub anchor_text: String,
    /// Rule that classified the link.
    pub match_reason: MatchReason,
    /// Similarity in `[0, 100]`; exact matches score 100.
    pub similarity_score: f64,
}

/// Outcome of analysing a single candidate URL. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// The analysed URL.
    pub url: String,
    /// Document title, if the page has a non-empty one.
    pub title: Option<String>,
    /// Relevant links in document order.
    pub relevant_links: Vec<RelevantLink>,
    /// Set when the page could not be fetched.
    pub fetch_error: Option<ErrorKind>,
}

impl PageResult {
    /// A result for a page that could not be fetched.
    pub fn failed(url: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            url: url.into(),
            title: None,
            relevant_links: Vec::new(),
            fetch_error: Some(kind),
        }
    }
}

/// Lifecycle of the concurrent analysis stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Created, nothing dispatched.
    Pending,
    /// Workers are pulling tasks.
    Running,
    /// Every candidate produced a page result.
    Completed,
    /// Cancellation stopped dispatch before the queue drained.
    Cancelled,
}

/// Terminal artifact of a run, handed to external serialisation.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    /// The query that produced this report.
    pub query: SearchQuery,
    /// One entry per analysed URL, in completion order.
    pub pages: Vec<PageResult>,
    /// Deduplicated candidates gathered from the providers.
    pub total_candidates: usize,
    /// Pages that produced a result (equals `pages.len()`).
    pub total_analyzed: usize,
    /// Pages whose fetch failed.
    pub total_errors: usize,
    /// Final state of the analysis stage.
    pub state: RunState,
}

impl AggregateReport {
    /// Assemble a report, deriving the counters from `pages`.
    pub fn new(
        query: SearchQuery,
        pages: Vec<PageResult>,
        total_candidates: usize,
        state: RunState,
    ) -> Self {
        let total_analyzed = pages.len();
        let total_errors = pages.iter().filter(|p| p.fetch_error.is_some()).count();
        Self {
            query,
            pages,
            total_candidates,
            total_analyzed,
            total_errors,
            state,
        }
    }

    /// Whether the run was interrupted before every candidate was analysed.
    pub fn is_partial(&self) -> bool {
        self.state == RunState::Cancelled
    }
}
