//! Bounded worker pool running page analysis over the candidate set.
//!
//! Workers pull candidates from a shared FIFO queue and send each
//! [`PageResult`] over a channel to a single collector. Cancellation is
//! checked before every dispatch; a page already being fetched runs to
//! completion and its result is kept.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::analyzer::PageAnalyzer;
use crate::http::Fetcher;
use crate::types::{CandidateUrl, PageResult, RunState};

type TaskQueue = Arc<Mutex<VecDeque<CandidateUrl>>>;

/// Runs one analysis pass over a candidate set.
///
/// State moves `Pending → Running → {Completed, Cancelled}`; a run ends
/// `Cancelled` when the token fired before every candidate was dispatched.
pub struct Coordinator<F> {
    analyzer: PageAnalyzer<F>,
    thread_count: usize,
    state: RunState,
}

impl<F: Fetcher + 'static> Coordinator<F> {
    /// Coordinator with `thread_count` workers (at least one).
    pub fn new(analyzer: PageAnalyzer<F>, thread_count: usize) -> Self {
        Self {
            analyzer,
            thread_count: thread_count.max(1),
            state: RunState::Pending,
        }
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Analyse every candidate, or as many as cancellation allows.
    ///
    /// Returns at most one result per candidate, in completion order.
    pub async fn run(
        &mut self,
        candidates: Vec<CandidateUrl>,
        cancel: &CancellationToken,
    ) -> Vec<PageResult> {
        self.state = RunState::Running;
        let total = candidates.len();
        let workers = self.thread_count.min(total.max(1));
        tracing::info!(candidates = total, workers, "starting page analysis");

        let queue: TaskQueue = Arc::new(Mutex::new(candidates.into()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|id| {
                let analyzer = self.analyzer.clone();
                let queue = Arc::clone(&queue);
                let tx = tx.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    run_worker(id, analyzer, queue, tx, cancel).await;
                })
            })
            .collect();
        drop(tx);

        let mut pages = Vec::with_capacity(total);
        while let Some(page) = rx.recv().await {
            pages.push(page);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "analysis worker panicked");
            }
        }

        let undispatched = queue.lock().map(|q| q.len()).unwrap_or(0);
        self.state = if cancel.is_cancelled() && undispatched > 0 {
            tracing::warn!(
                analysed = pages.len(),
                undispatched,
                "page analysis cancelled, returning partial results"
            );
            RunState::Cancelled
        } else {
            tracing::info!(analysed = pages.len(), "page analysis complete");
            RunState::Completed
        };
        pages
    }
}

async fn run_worker<F: Fetcher>(
    id: usize,
    analyzer: PageAnalyzer<F>,
    queue: TaskQueue,
    tx: mpsc::UnboundedSender<PageResult>,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            tracing::debug!(worker = id, "cancellation observed, worker stopping");
            break;
        }
        let next = queue.lock().ok().and_then(|mut q| q.pop_front());
        let Some(candidate) = next else {
            break;
        };

        let page = analyzer.analyze(&candidate).await;
        if tx.send(page).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::relevance::DEFAULT_FUZZY_THRESHOLD;
    use crate::test_support::{document, FixtureFetcher};
    use crate::types::Provider;

    fn candidates(n: usize) -> Vec<CandidateUrl> {
        (0..n)
            .map(|i| CandidateUrl {
                url: format!("https://site{i}.example/jane"),
                source_provider: if i % 2 == 0 {
                    Provider::DuckDuckGo
                } else {
                    Provider::Bing
                },
                discovered_at_page: 0,
                title: None,
                snippet: None,
            })
            .collect()
    }

    fn coordinator(
        fetcher: FixtureFetcher,
        threads: usize,
    ) -> (Coordinator<FixtureFetcher>, Arc<FixtureFetcher>) {
        let fetcher = Arc::new(fetcher);
        let analyzer =
            PageAnalyzer::new(Arc::clone(&fetcher), "Jane Doe", DEFAULT_FUZZY_THRESHOLD);
        (Coordinator::new(analyzer, threads), fetcher)
    }

    #[tokio::test]
    async fn starts_pending() {
        let (coordinator, _) = coordinator(FixtureFetcher::new(), 3);
        assert_eq!(coordinator.state(), RunState::Pending);
    }

    #[tokio::test]
    async fn analyses_every_candidate_once() {
        let (mut coordinator, fetcher) = coordinator(FixtureFetcher::new(), 3);
        let cancel = CancellationToken::new();

        let pages = coordinator.run(candidates(10), &cancel).await;

        assert_eq!(coordinator.state(), RunState::Completed);
        assert_eq!(pages.len(), 10);
        let urls: HashSet<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls.len(), 10);
        assert_eq!(fetcher.request_count(), 10);
    }

    #[tokio::test]
    async fn empty_candidate_set_completes() {
        let (mut coordinator, fetcher) = coordinator(FixtureFetcher::new(), 5);
        let pages = coordinator.run(Vec::new(), &CancellationToken::new()).await;
        assert!(pages.is_empty());
        assert_eq!(coordinator.state(), RunState::Completed);
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn failed_pages_do_not_abort_the_batch() {
        let fetcher = FixtureFetcher::new()
            .with_page(
                "https://site0.example/jane",
                document("Jane", &[("https://github.com/janedoe", "Jane Doe")]),
            )
            .with_error("https://site1.example/jane", ErrorKind::Timeout)
            .with_error("https://site2.example/jane", ErrorKind::ClientRejected);
        let (mut coordinator, _) = coordinator(fetcher, 2);

        let pages = coordinator.run(candidates(4), &CancellationToken::new()).await;

        assert_eq!(coordinator.state(), RunState::Completed);
        assert_eq!(pages.len(), 4);
        assert_eq!(pages.iter().filter(|p| p.fetch_error.is_some()).count(), 2);
        let ok = pages
            .iter()
            .find(|p| p.url == "https://site0.example/jane")
            .map(|p| p.relevant_links.len());
        assert_eq!(ok, Some(1));
    }

    #[tokio::test]
    async fn panicking_worker_does_not_stop_the_pool() {
        let fetcher = FixtureFetcher::new().with_panic("https://site1.example/jane");
        let (mut coordinator, fetcher) = coordinator(fetcher, 2);

        let pages = coordinator.run(candidates(6), &CancellationToken::new()).await;

        assert_eq!(coordinator.state(), RunState::Completed);
        assert_eq!(fetcher.request_count(), 6);
        assert_eq!(pages.len(), 5);
        assert!(pages.iter().all(|p| p.url != "https://site1.example/jane"));
    }

    #[tokio::test]
    async fn cancellation_keeps_completed_pages() {
        let cancel = CancellationToken::new();
        let fetcher = FixtureFetcher::new().cancel_after(3, cancel.clone());
        let (mut coordinator, fetcher) = coordinator(fetcher, 1);

        let pages = coordinator.run(candidates(8), &cancel).await;

        assert_eq!(coordinator.state(), RunState::Cancelled);
        assert_eq!(pages.len(), 3);
        assert_eq!(fetcher.request_count(), 3);
    }

    #[tokio::test]
    async fn cancelled_before_start_dispatches_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (mut coordinator, fetcher) = coordinator(FixtureFetcher::new(), 4);

        let pages = coordinator.run(candidates(5), &cancel).await;

        assert!(pages.is_empty());
        assert_eq!(coordinator.state(), RunState::Cancelled);
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn in_flight_pages_finish_after_cancellation() {
        let cancel = CancellationToken::new();
        let fetcher = FixtureFetcher::new()
            .with_delay(Duration::from_millis(20))
            .cancel_after(1, cancel.clone());
        let (mut coordinator, fetcher) = coordinator(fetcher, 4);

        let pages = coordinator.run(candidates(20), &cancel).await;

        assert_eq!(coordinator.state(), RunState::Cancelled);
        assert_eq!(pages.len(), fetcher.request_count());
        assert!(pages.len() < 20);
        assert!(!pages.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pool_runs_pages_concurrently() {
        let fetcher = FixtureFetcher::new().with_delay(Duration::from_millis(100));
        let (mut coordinator, _) = coordinator(fetcher, 5);

        let started = std::time::Instant::now();
        let pages = coordinator.run(candidates(10), &CancellationToken::new()).await;

        assert_eq!(pages.len(), 10);
        assert!(started.elapsed() < Duration::from_millis(900));
    }
}
