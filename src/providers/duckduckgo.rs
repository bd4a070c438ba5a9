//! DuckDuckGo provider: HTML and Lite endpoints, both JavaScript-free.
//!
//! Two interchangeable strategies share this adapter:
//!
//! - [`DuckDuckGoStrategy::Html`] scrapes `https://html.duckduckgo.com/html/`
//! - [`DuckDuckGoStrategy::Lite`] scrapes `https://lite.duckduckgo.com/lite/`
//!
//! Both paginate with an `s` offset of 30 results per page and wrap outbound
//! links in a `duckduckgo.com/l/?uddg=` redirect that is unwrapped here.

use serde::{Deserialize, Serialize};
use url::Url;

use super::{clean_text, ensure_body, make_candidate, page_url, selector, SearchProvider};
use crate::error::{ErrorKind, SearchError};
use crate::types::{CandidateUrl, Provider};

const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const LITE_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";

/// Results per DuckDuckGo page, used for the `s` offset.
pub const RESULTS_PER_PAGE: usize = 30;

/// Which DuckDuckGo front end to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuckDuckGoStrategy {
    /// The JavaScript-free HTML front end (richer markup, snippets).
    #[default]
    Html,
    /// The minimal table-based front end (lighter, fewer blocks).
    Lite,
}

impl DuckDuckGoStrategy {
    fn endpoint(self) -> &'static str {
        match self {
            Self::Html => HTML_ENDPOINT,
            Self::Lite => LITE_ENDPOINT,
        }
    }
}

/// DuckDuckGo search scraper.
#[derive(Debug, Clone)]
pub struct DuckDuckGoEngine {
    strategy: DuckDuckGoStrategy,
    endpoint: String,
}

impl DuckDuckGoEngine {
    /// Adapter for the public endpoint of `strategy`.
    pub fn new(strategy: DuckDuckGoStrategy) -> Self {
        Self {
            strategy,
            endpoint: strategy.endpoint().to_owned(),
        }
    }

    /// Point the adapter at a different endpoint (mirrors, mock servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The strategy this adapter parses.
    pub fn strategy(&self) -> DuckDuckGoStrategy {
        self.strategy
    }

    /// Extract the actual URL from DuckDuckGo's redirect wrapper.
    ///
    /// DDG wraps URLs like: `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...`
    /// We parse out the `uddg` query parameter and URL-decode it. Ad
    /// redirects (`/y.js`) yield `None`.
    fn extract_url(href: &str) -> Option<String> {
        let base = Url::parse("https://duckduckgo.com/").ok()?;
        let parsed = base.join(href.trim()).ok()?;

        let is_ddg = parsed
            .host_str()
            .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"));
        if !is_ddg {
            return Some(parsed.to_string());
        }

        if parsed.path().starts_with("/l/") {
            parsed
                .query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, value)| value.into_owned())
        } else {
            None
        }
    }

    fn parse_html(&self, body: &str, page_index: usize) -> Result<Vec<CandidateUrl>, ErrorKind> {
        let document = scraper::Html::parse_document(body);

        let result_sel = selector(
            ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
        )?;
        let title_sel = selector(".result__a")?;
        let snippet_sel = selector(".result__snippet")?;

        let mut results = Vec::new();

        for element in document.select(&result_sel) {
            let Some(title_el) = element.select(&title_sel).next() else {
                continue;
            };
            let Some(href) = title_el.value().attr("href") else {
                continue;
            };
            let Some(url) = Self::extract_url(href) else {
                continue;
            };

            let title = clean_text(&title_el.text().collect::<String>());
            let snippet = element
                .select(&snippet_sel)
                .next()
                .map(|el| clean_text(&el.text().collect::<String>()));

            if let Some(candidate) =
                make_candidate(Provider::DuckDuckGo, &url, page_index, Some(title), snippet)
            {
                results.push(candidate);
            }
        }

        Ok(results)
    }

    fn parse_lite(&self, body: &str, page_index: usize) -> Result<Vec<CandidateUrl>, ErrorKind> {
        let document = scraper::Html::parse_document(body);

        let link_sel = selector("a.result-link")?;
        let snippet_sel = selector("td.result-snippet")?;

        // Lite renders each result as a link row followed by a snippet row.
        let snippets: Vec<String> = document
            .select(&snippet_sel)
            .map(|el| clean_text(&el.text().collect::<String>()))
            .collect();

        let mut results = Vec::new();

        for (ordinal, link) in document.select(&link_sel).enumerate() {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(url) = Self::extract_url(href) else {
                continue;
            };

            let title = clean_text(&link.text().collect::<String>());
            let snippet = snippets.get(ordinal).cloned();

            if let Some(candidate) =
                make_candidate(Provider::DuckDuckGo, &url, page_index, Some(title), snippet)
            {
                results.push(candidate);
            }
        }

        Ok(results)
    }
}

impl Default for DuckDuckGoEngine {
    fn default() -> Self {
        Self::new(DuckDuckGoStrategy::default())
    }
}

impl SearchProvider for DuckDuckGoEngine {
    fn provider(&self) -> Provider {
        Provider::DuckDuckGo
    }

    fn build_page_url(&self, query: &str, page_index: usize) -> Result<Url, SearchError> {
        let offset = page_index * RESULTS_PER_PAGE;
        page_url(
            &self.endpoint,
            &[("q", query.to_owned()), ("s", offset.to_string())],
        )
    }

    fn parse_results(
        &self,
        body: &str,
        page_index: usize,
    ) -> Result<Vec<CandidateUrl>, ErrorKind> {
        ensure_body(Provider::DuckDuckGo, body)?;

        let results = match self.strategy {
            DuckDuckGoStrategy::Html => self.parse_html(body, page_index)?,
            DuckDuckGoStrategy::Lite => self.parse_lite(body, page_index)?,
        };

        tracing::debug!(
            count = results.len(),
            page_index,
            strategy = ?self.strategy,
            "DuckDuckGo results parsed"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_DDG_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<div class="result results_links results_links_deep web-result result--ad">
    <a class="result__a" href="https://duckduckgo.com/y.js?ad_provider=x&amp;u3=https%3A%2F%2Fads.example">
        Find Jane Doe Now (Ad)
    </a>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.linkedin.com%2Fin%2Fjanedoe%2F&amp;rut=abc123">
        Jane Doe - LinkedIn
    </a>
    <div class="result__snippet">
        View Jane Doe's profile on LinkedIn.
    </div>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="https://github.com/janedoe">
        janedoe (Jane Doe) · GitHub
    </a>
    <div class="result__snippet">janedoe has 12 repositories available.</div>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Ftwitter.com%2Fjanedoe%3Futm_source%3Dddg&amp;rut=def456">
        Jane Doe (@janedoe) / X
    </a>
</div>
</body>
</html>"#;

    const MOCK_DDG_LITE: &str = r#"<html><body><table>
<tr><td>1.</td><td><a rel="nofollow" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fjane" class="result-link">Jane at Example</a></td></tr>
<tr><td></td><td class="result-snippet">All about Jane.</td></tr>
<tr><td>2.</td><td><a rel="nofollow" href="https://janedoe.dev/" class="result-link">Jane Doe's blog</a></td></tr>
<tr><td></td><td class="result-snippet">Posts by Jane.</td></tr>
</table></body></html>"#;

    #[test]
    fn extract_url_from_ddg_redirect() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc";
        let result = DuckDuckGoEngine::extract_url(href);
        assert_eq!(result, Some("https://example.com/page".to_string()));
    }

    #[test]
    fn extract_url_relative_redirect() {
        let href = "/l/?uddg=https%3A%2F%2Fexample.com%2Frel";
        let result = DuckDuckGoEngine::extract_url(href);
        assert_eq!(result, Some("https://example.com/rel".to_string()));
    }

    #[test]
    fn extract_url_direct_link() {
        let href = "https://example.com/direct";
        let result = DuckDuckGoEngine::extract_url(href);
        assert_eq!(result, Some("https://example.com/direct".to_string()));
    }

    #[test]
    fn extract_url_skips_ad_redirect() {
        let href = "https://duckduckgo.com/y.js?u3=https%3A%2F%2Fads.example";
        assert!(DuckDuckGoEngine::extract_url(href).is_none());
    }

    #[test]
    fn page_urls_use_thirty_result_offsets() {
        let engine = DuckDuckGoEngine::default();
        let first = engine.build_page_url("Jane Doe", 0).expect("valid url");
        assert_eq!(first.host_str(), Some("html.duckduckgo.com"));
        assert!(first.query_pairs().any(|(k, v)| k == "q" && v == "Jane Doe"));
        assert!(first.query_pairs().any(|(k, v)| k == "s" && v == "0"));

        let third = engine.build_page_url("Jane Doe", 2).expect("valid url");
        assert!(third.query_pairs().any(|(k, v)| k == "s" && v == "60"));
    }

    #[test]
    fn parse_mock_html_returns_organic_results() {
        let engine = DuckDuckGoEngine::default();
        let results = engine.parse_results(MOCK_DDG_HTML, 1).expect("should parse");
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].url, "https://www.linkedin.com/in/janedoe");
        assert_eq!(results[0].title.as_deref(), Some("Jane Doe - LinkedIn"));
        assert!(results[0]
            .snippet
            .as_deref()
            .is_some_and(|s| s.contains("profile on LinkedIn")));
        assert_eq!(results[0].source_provider, Provider::DuckDuckGo);
        assert_eq!(results[0].discovered_at_page, 1);

        assert_eq!(results[1].url, "https://github.com/janedoe");
        // Tracking parameter stripped during normalisation.
        assert_eq!(results[2].url, "https://twitter.com/janedoe");
        assert!(results[2].snippet.is_none());
    }

    #[test]
    fn parse_excludes_ads() {
        let engine = DuckDuckGoEngine::default();
        let results = engine.parse_results(MOCK_DDG_HTML, 0).expect("should parse");
        for r in &results {
            assert!(!r.url.contains("ads.example"), "ad leaked: {}", r.url);
        }
    }

    #[test]
    fn parse_page_without_results_is_empty() {
        let engine = DuckDuckGoEngine::default();
        let results = engine
            .parse_results("<html><body><div class=\"no-results\">No results.</div></body></html>", 3)
            .expect("should parse");
        assert!(results.is_empty());
    }

    #[test]
    fn parse_empty_body_is_parse_failure() {
        let engine = DuckDuckGoEngine::default();
        assert_eq!(
            engine.parse_results("   \n", 0).unwrap_err(),
            ErrorKind::ParseFailure
        );
    }

    #[test]
    fn parse_lite_pairs_links_with_snippets() {
        let engine = DuckDuckGoEngine::new(DuckDuckGoStrategy::Lite);
        let results = engine.parse_results(MOCK_DDG_LITE, 0).expect("should parse");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://example.com/jane");
        assert_eq!(results[0].snippet.as_deref(), Some("All about Jane."));
        assert_eq!(results[1].url, "https://janedoe.dev/");
        assert_eq!(results[1].title.as_deref(), Some("Jane Doe's blog"));
    }

    #[test]
    fn html_markup_is_not_parsed_by_lite_strategy() {
        let engine = DuckDuckGoEngine::new(DuckDuckGoStrategy::Lite);
        let results = engine.parse_results(MOCK_DDG_HTML, 0).expect("should parse");
        assert!(results.is_empty());
    }

    #[test]
    fn with_endpoint_overrides_host() {
        let engine = DuckDuckGoEngine::default().with_endpoint("http://127.0.0.1:9999/html/");
        let url = engine.build_page_url("jane", 0).expect("valid url");
        assert_eq!(url.port(), Some(9999));
        assert_eq!(url.path(), "/html/");
    }

    #[test]
    fn is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DuckDuckGoEngine>();
    }
}
