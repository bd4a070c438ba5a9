//! Bing provider: an independent index and the second result source.
//!
//! Bing paginates with a one-based `first` offset of 10 results per page and
//! sometimes wraps result links in a `bing.com/ck/a` redirect whose `u`
//! parameter carries the target as `a1` + base64url. Those are unwrapped
//! during parsing.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use url::Url;

use super::{clean_text, ensure_body, make_candidate, page_url, selector, SearchProvider};
use crate::error::{ErrorKind, SearchError};
use crate::types::{CandidateUrl, Provider};

const ENDPOINT: &str = "https://www.bing.com/search";

/// Results per Bing page, used for the `first` offset.
pub const RESULTS_PER_PAGE: usize = 10;

/// Bing HTML search scraper.
#[derive(Debug, Clone)]
pub struct BingEngine {
    endpoint: String,
}

impl BingEngine {
    /// Adapter for the public Bing endpoint.
    pub fn new() -> Self {
        Self {
            endpoint: ENDPOINT.to_owned(),
        }
    }

    /// Point the adapter at a different endpoint (mirrors, mock servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Resolve Bing's click-tracking redirect to the real target.
    fn extract_url(href: &str) -> Option<String> {
        let parsed = Url::parse(href.trim()).ok()?;

        let is_redirect = parsed
            .host_str()
            .is_some_and(|host| host.ends_with("bing.com"))
            && parsed.path().starts_with("/ck/a");
        if !is_redirect {
            return Some(parsed.to_string());
        }

        let encoded = parsed
            .query_pairs()
            .find(|(key, _)| key == "u")
            .map(|(_, value)| value.into_owned())?;
        decode_redirect_target(&encoded)
    }
}

impl Default for BingEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the `u` parameter of a Bing redirect (`a1` + base64url).
fn decode_redirect_target(encoded: &str) -> Option<String> {
    let payload = encoded.strip_prefix("a1")?.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let target = String::from_utf8(bytes).ok()?;
    target.starts_with("http").then_some(target)
}

impl SearchProvider for BingEngine {
    fn provider(&self) -> Provider {
        Provider::Bing
    }

    fn build_page_url(&self, query: &str, page_index: usize) -> Result<Url, SearchError> {
        let first = page_index * RESULTS_PER_PAGE + 1;
        page_url(
            &self.endpoint,
            &[
                ("q", query.to_owned()),
                ("first", first.to_string()),
                ("count", RESULTS_PER_PAGE.to_string()),
                ("setlang", "en".to_owned()),
            ],
        )
    }

    fn parse_results(
        &self,
        body: &str,
        page_index: usize,
    ) -> Result<Vec<CandidateUrl>, ErrorKind> {
        ensure_body(Provider::Bing, body)?;
        let document = scraper::Html::parse_document(body);

        // Bing uses li.b_algo containers for organic search results
        let result_sel = selector("li.b_algo")?;
        let link_sel = selector("h2 a")?;
        let snippet_sel = selector(".b_caption p, .b_lineclamp2")?;

        let mut results = Vec::new();

        for element in document.select(&result_sel) {
            let Some(link) = element.select(&link_sel).next() else {
                continue;
            };
            let Some(url) = link.value().attr("href").and_then(Self::extract_url) else {
                continue;
            };

            let title = clean_text(&link.text().collect::<String>());
            let snippet = element
                .select(&snippet_sel)
                .next()
                .map(|el| clean_text(&el.text().collect::<String>()));

            if let Some(candidate) =
                make_candidate(Provider::Bing, &url, page_index, Some(title), snippet)
            {
                results.push(candidate);
            }
        }

        tracing::debug!(count = results.len(), page_index, "Bing results parsed");
        Ok(results)
    }
}
