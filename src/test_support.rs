//! In-memory fixtures shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ErrorKind;
use crate::http::{Fetcher, HttpResponse};

/// Endpoint DuckDuckGo fixtures are registered under.
pub const DDG_ENDPOINT: &str = "http://ddg.test/html/";

/// Endpoint Bing fixtures are registered under.
pub const BING_ENDPOINT: &str = "http://bing.test/search";

const EMPTY_PAGE: &str = "<html><body><p>No results.</p></body></html>";

/// Serves canned bodies by exact URL; unknown URLs get an empty results page.
#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, Result<String, ErrorKind>>,
    requests: Mutex<Vec<String>>,
    delay: Duration,
    cancel_after: Option<(usize, CancellationToken)>,
    panic_on: Option<String>,
    completed: AtomicUsize,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_owned(), Ok(body.into()));
        self
    }

    pub fn with_error(mut self, url: &str, kind: ErrorKind) -> Self {
        self.pages.insert(url.to_owned(), Err(kind));
        self
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cancel `token` as the `count`-th fetch completes.
    pub fn cancel_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    /// Panic inside the fetch of `url`.
    pub fn with_panic(mut self, url: &str) -> Self {
        self.panic_on = Some(url.to_owned());
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requests
            .lock()
            .map(|r| r.iter().any(|u| u == url))
            .unwrap_or(false)
    }
}

impl Fetcher for FixtureFetcher {
    async fn fetch(&self, url: &str) -> Result<HttpResponse, ErrorKind> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_owned());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panic_on.as_deref() == Some(url) {
            panic!("fixture fetch panicked for {url}");
        }

        let outcome = match self.pages.get(url) {
            Some(Ok(body)) => Ok(HttpResponse::ok(url, body.clone())),
            Some(Err(kind)) => Err(*kind),
            None => Ok(HttpResponse::ok(url, EMPTY_PAGE)),
        };

        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, token)) = &self.cancel_after {
            if done == *count {
                token.cancel();
            }
        }
        outcome
    }
}

/// A DuckDuckGo HTML results page linking to `urls`.
pub fn ddg_page<S: AsRef<str>>(urls: &[S]) -> String {
    let results: String = urls
        .iter()
        .map(|url| {
            format!(
                r#"<div class="result results_links results_links_deep web-result">
<a class="result__a" href="{}">Result</a>
<div class="result__snippet">Snippet</div>
</div>"#,
                url.as_ref()
            )
        })
        .collect();
    format!("<html><body>{results}</body></html>")
}

/// A Bing results page linking to `urls`.
pub fn bing_page<S: AsRef<str>>(urls: &[S]) -> String {
    let results: String = urls
        .iter()
        .map(|url| {
            format!(
                r#"<li class="b_algo"><h2><a href="{}">Result</a></h2><div class="b_caption"><p>Snippet</p></div></li>"#,
                url.as_ref()
            )
        })
        .collect();
    format!("<html><body><ol id=\"b_results\">{results}</ol></body></html>")
}

/// A plain document with `title` and `(href, text)` anchors.
pub fn document(title: &str, links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(href, text)| format!(r#"<a href="{href}">{text}</a>"#))
        .collect();
    format!("<html><head><title>{title}</title></head><body>{anchors}</body></html>")
}
