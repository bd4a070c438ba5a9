//! Sequential pagination across providers into a capped, deduplicated
//! candidate list.
//!
//! For each page index the aggregator asks every provider that still has
//! results for that page, one request at a time, and merges what comes back
//! into a [`CandidateSet`]. It stops when the cap is reached, when every
//! provider is exhausted, at the configured maximum page index, or on
//! cancellation. A provider is exhausted by an empty page, a parse failure
//! or a failed fetch; none of these abort the run.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::dedup::CandidateSet;
use crate::config::SearchConfig;
use crate::error::ErrorKind;
use crate::http::Fetcher;
use crate::providers::{ProviderAdapter, SearchProvider};
use crate::types::CandidateUrl;

/// Paginates providers sequentially to respect their rate limits.
pub struct ResultAggregator<'a, F> {
    fetcher: &'a F,
    providers: &'a [ProviderAdapter],
    max_page_index: usize,
    request_delay_ms: (u64, u64),
}

impl<'a, F: Fetcher> ResultAggregator<'a, F> {
    /// Aggregator over `providers`, paced and bounded by `config`.
    pub fn new(fetcher: &'a F, providers: &'a [ProviderAdapter], config: &SearchConfig) -> Self {
        Self {
            fetcher,
            providers,
            max_page_index: config.max_page_index,
            request_delay_ms: config.request_delay_ms,
        }
    }

    /// Collect up to `max_results` distinct candidates for `query`, in
    /// discovery order.
    pub async fn collect(
        &self,
        query: &str,
        max_results: usize,
        cancel: &CancellationToken,
    ) -> Vec<CandidateUrl> {
        tracing::trace!(query, "aggregating provider results");

        let mut set = CandidateSet::new();
        let mut live: Vec<&ProviderAdapter> = self.providers.iter().collect();
        let mut requests = 0usize;

        'pages: for page_index in 0..=self.max_page_index {
            if live.is_empty() {
                break;
            }

            let mut still_live = Vec::with_capacity(live.len());
            for adapter in live {
                if set.len() >= max_results {
                    break 'pages;
                }
                if cancel.is_cancelled() {
                    tracing::info!(page_index, "pagination cancelled");
                    break 'pages;
                }

                if requests > 0 {
                    self.pause().await;
                }
                requests += 1;

                let provider = adapter.provider();
                match self.fetch_page(adapter, query, page_index).await {
                    Ok(batch) if batch.is_empty() => {
                        tracing::debug!(%provider, page_index, "provider exhausted");
                    }
                    Ok(batch) => {
                        let found = batch.len();
                        let added = set.extend_until(batch, max_results);
                        tracing::debug!(%provider, page_index, found, added, "merged provider page");
                        still_live.push(adapter);
                    }
                    Err(kind) => {
                        tracing::warn!(
                            %provider,
                            page_index,
                            error = %kind,
                            "provider page failed, treating as exhausted"
                        );
                    }
                }
            }
            live = still_live;
        }

        let candidates = set.into_truncated(max_results);
        tracing::info!(
            candidates = candidates.len(),
            requests,
            "provider aggregation finished"
        );
        candidates
    }

    async fn fetch_page(
        &self,
        adapter: &ProviderAdapter,
        query: &str,
        page_index: usize,
    ) -> Result<Vec<CandidateUrl>, ErrorKind> {
        let url = match adapter.build_page_url(query, page_index) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(provider = %adapter.provider(), error = %e, "cannot build page URL");
                return Ok(Vec::new());
            }
        };
        let response = self.fetcher.fetch(url.as_str()).await?;
        adapter.parse_results(&response.body, page_index)
    }

    async fn pause(&self) {
        let delay = jitter(self.request_delay_ms);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Random delay within `(min, max)` milliseconds.
fn jitter((min, max): (u64, u64)) -> Duration {
    if max == 0 || min >= max {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}
