//! Request identity rotation: User-Agent pool and static proxy.
//!
//! One [`IdentityRotator`] is created per run and shared (behind an `Arc`)
//! by the aggregator and every analysis worker. The cursor is atomic, so
//! concurrent callers never corrupt the pool index.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use url::Url;

/// Realistic browser User-Agent strings, rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
];

/// Supplies a User-Agent per request and the run's static proxy.
#[derive(Debug)]
pub struct IdentityRotator {
    user_agents: Vec<String>,
    cursor: AtomicUsize,
    proxy: Option<Url>,
}

impl IdentityRotator {
    /// Rotator over the built-in browser pool, starting at a random offset.
    pub fn new(proxy: Option<Url>) -> Self {
        let start = rand::thread_rng().gen_range(0..USER_AGENTS.len());
        Self {
            user_agents: USER_AGENTS.iter().map(|ua| (*ua).to_owned()).collect(),
            cursor: AtomicUsize::new(start),
            proxy,
        }
    }

    /// Rotator that always presents the same User-Agent.
    pub fn fixed(user_agent: impl Into<String>, proxy: Option<Url>) -> Self {
        Self {
            user_agents: vec![user_agent.into()],
            cursor: AtomicUsize::new(0),
            proxy,
        }
    }

    /// Next User-Agent, round-robin over the pool.
    ///
    /// With more than one entry, two consecutive calls never return the
    /// same string.
    pub fn next_user_agent(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[index]
    }

    /// The proxy configured for this run, identical for every request.
    pub fn proxy(&self) -> Option<&Url> {
        self.proxy.as_ref()
    }

    /// Number of distinct User-Agents in rotation.
    pub fn pool_size(&self) -> usize {
        self.user_agents.len()
    }
}
