//! Page analysis: fetch one candidate, extract its title and the links that
//! relate to the query.
//!
//! Analysis is stateless apart from the shared fetcher, so one
//! [`PageAnalyzer`] is cloned into every worker. Fetch failures never
//! propagate: they become a [`PageResult`] carrying the
//! [`ErrorKind`](crate::error::ErrorKind).

use std::collections::HashSet;
use std::sync::Arc;

use scraper::{Html, Selector};
use url::Url;

use crate::http::Fetcher;
use crate::orchestrator::url_normalize::normalize_href;
use crate::providers::clean_text;
use crate::relevance::score_link;
use crate::types::{CandidateUrl, PageResult, RelevantLink};

/// Title and relevant links extracted from one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAnalysis {
    /// First non-empty title-like element.
    pub title: Option<String>,
    /// Relevant links in document order, each href at most once.
    pub relevant_links: Vec<RelevantLink>,
}

/// Fetches and scores a single page. Cheap to clone.
pub struct PageAnalyzer<F> {
    fetcher: Arc<F>,
    query: Arc<str>,
    fuzzy_threshold: f64,
}

impl<F> Clone for PageAnalyzer<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            query: Arc::clone(&self.query),
            fuzzy_threshold: self.fuzzy_threshold,
        }
    }
}

impl<F: Fetcher> PageAnalyzer<F> {
    /// Analyzer scoring links against `query`.
    pub fn new(fetcher: Arc<F>, query: &str, fuzzy_threshold: f64) -> Self {
        Self {
            fetcher,
            query: Arc::from(query),
            fuzzy_threshold,
        }
    }

    /// Fetch `candidate` and analyse it.
    pub async fn analyze(&self, candidate: &CandidateUrl) -> PageResult {
        let response = match self.fetcher.fetch(&candidate.url).await {
            Ok(response) => response,
            Err(kind) => {
                tracing::debug!(url = %candidate.url, error = %kind, "page fetch failed");
                return PageResult::failed(candidate.url.clone(), kind);
            }
        };

        let analysis = analyze_document(
            &response.body,
            &response.final_url,
            &self.query,
            self.fuzzy_threshold,
        );
        tracing::debug!(
            url = %candidate.url,
            title = analysis.title.as_deref().unwrap_or(""),
            relevant = analysis.relevant_links.len(),
            "page analysed"
        );

        PageResult {
            url: candidate.url.clone(),
            title: analysis.title,
            relevant_links: analysis.relevant_links,
            fetch_error: None,
        }
    }
}

/// Extract the title and relevant links of an HTML document.
///
/// Relative links resolve against `base_url`. The result depends only on
/// the inputs, so re-analysing an unchanged document is idempotent.
pub fn analyze_document(
    html: &str,
    base_url: &str,
    query: &str,
    fuzzy_threshold: f64,
) -> DocumentAnalysis {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    DocumentAnalysis {
        title: extract_title(&document),
        relevant_links: extract_relevant_links(&document, base.as_ref(), query, fuzzy_threshold),
    }
}

/// The `<title>` text, falling back to `og:title`.
fn extract_title(document: &Html) -> Option<String> {
    let from_title = Selector::parse("title").ok().and_then(|selector| {
        document
            .select(&selector)
            .next()
            .map(|el| clean_text(&el.text().collect::<String>()))
    });
    if let Some(title) = from_title.filter(|t| !t.is_empty()) {
        return Some(title);
    }

    let og = Selector::parse(r#"meta[property="og:title"]"#).ok()?;
    document
        .select(&og)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(clean_text)
        .filter(|t| !t.is_empty())
}

fn extract_relevant_links(
    document: &Html,
    base: Option<&Url>,
    query: &str,
    fuzzy_threshold: f64,
) -> Vec<RelevantLink> {
    let Ok(anchor_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&anchor_sel) {
        let Some(href) = anchor
            .value()
            .attr("href")
            .and_then(|raw| normalize_href(raw, base))
        else {
            continue;
        };
        if seen.contains(&href) {
            continue;
        }

        let mut anchor_text = clean_text(&anchor.text().collect::<String>());
        if anchor_text.is_empty() {
            anchor_text = anchor.value().attr("title").map(clean_text).unwrap_or_default();
        }

        seen.insert(href.clone());
        if let Some((match_reason, similarity_score)) =
            score_link(query, &href, &anchor_text, fuzzy_threshold)
        {
            links.push(RelevantLink {
                href,
                anchor_text,
                match_reason,
                similarity_score,
            });
        }
    }

    links
}
