//! Breadth-first crawl loop
//!
//! The controller owns the frontier, both dedup maps, and the progress
//! counters. Pages are fetched one at a time in FIFO order; link probes run
//! concurrently in their own tasks and are joined before the crawl returns,
//! so the sink is quiescent by the time the caller sees the result.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::config::CrawlConfig;

use super::checker::LinkChecker;
use super::fetcher::{extract_links, FetchError, PageFetcher};
use super::normalize::UrlNormalizer;
use super::robots::RobotsGuard;
use super::types::{CrawlError, CrawlProgress, LinkRecord, ProgressFn, SinkFn};

/// A frontier item: a page awaiting fetch and its distance from the start.
#[derive(Debug)]
struct PageEntry {
    url: Url,
    depth: usize,
}

/// Shared progress counters. Writes race across the controller and probe
/// tasks, so every counter is atomic; a snapshot reads them individually
/// and is not a consistent cross-counter view.
#[derive(Debug, Default)]
struct CrawlCounters {
    visited: AtomicU64,
    queued: AtomicU64,
    discovered: AtomicU64,
    errors: AtomicU64,
    checked_links: AtomicU64,
    total_links: AtomicU64,
}

impl CrawlCounters {
    fn snapshot(&self) -> CrawlProgress {
        CrawlProgress {
            visited: self.visited.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            discovered: self.discovered.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            checked_links: self.checked_links.load(Ordering::Relaxed),
            total_links: self.total_links.load(Ordering::Relaxed),
        }
    }
}

/// One crawl job's engine state.
pub struct Crawler {
    fetcher: PageFetcher,
    checker: Arc<LinkChecker>,
    normalizer: UrlNormalizer,
    robots: Option<RobotsGuard>,
    max_depth: usize,
    max_urls: usize,
    /// normalized URL -> depth at which the page was enqueued
    pages_seen: DashMap<String, usize>,
    /// normalized URLs already registered for probing
    links_seen: DashMap<String, ()>,
    counters: Arc<CrawlCounters>,
}

impl Crawler {
    /// Build the engine for one job. When robots handling is requested the
    /// guard is fetched here, once, and its crawl-delay raises the checker's
    /// host delay (it never lowers it).
    pub async fn new(
        start: &Url,
        max_depth: usize,
        respect_robots: bool,
        config: &CrawlConfig,
        checker: Arc<LinkChecker>,
    ) -> Result<Self, CrawlError> {
        let fetcher = PageFetcher::new(config)?;
        let normalizer = UrlNormalizer::new(start);

        let robots = if respect_robots {
            let guard = RobotsGuard::fetch(
                fetcher.client(),
                start,
                &config.user_agent,
                config.robots_max_body_bytes,
            )
            .await;
            let delay = guard.crawl_delay();
            if delay > std::time::Duration::ZERO {
                debug!(?delay, "raising host delay to robots crawl-delay");
                checker.raise_host_delay(delay);
            }
            Some(guard)
        } else {
            None
        };

        Ok(Self {
            fetcher,
            checker,
            normalizer,
            robots,
            max_depth,
            max_urls: config.max_urls,
            pages_seen: DashMap::new(),
            links_seen: DashMap::new(),
            counters: Arc::new(CrawlCounters::default()),
        })
    }

    /// Admission gate for the frontier: depth bound, http/https scheme,
    /// same-site scope, never-seen, and robots permission.
    fn should_visit(&self, url: &Url, depth: usize) -> bool {
        if depth > self.max_depth {
            return false;
        }
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if !self.normalizer.is_internal(url) {
            return false;
        }
        if self.pages_seen.contains_key(&self.normalizer.normalize(url)) {
            return false;
        }
        if let Some(robots) = &self.robots {
            if !robots.allowed(url) {
                return false;
            }
        }
        true
    }

    /// Run the crawl to completion, cancellation, or admission failure.
    ///
    /// Page fetch failures are reported as status-0 records and do not abort
    /// the crawl. The loop ends when the frontier drains; outstanding probes
    /// are then joined so no record arrives after this returns.
    pub async fn crawl(
        &self,
        ctx: CancellationToken,
        start: &Url,
        progress: ProgressFn,
        sink: SinkFn,
    ) -> Result<(), CrawlError> {
        if !self.should_visit(start, 0) {
            return Err(CrawlError::StartNotAllowed);
        }

        self.pages_seen.insert(self.normalizer.normalize(start), 0);
        self.counters.discovered.store(1, Ordering::Relaxed);
        self.counters.queued.store(1, Ordering::Relaxed);

        let mut frontier: VecDeque<PageEntry> = VecDeque::new();
        frontier.push_back(PageEntry {
            url: start.clone(),
            depth: 0,
        });

        let mut probes: JoinSet<()> = JoinSet::new();
        let mut canceled = false;

        while let Some(entry) = frontier.pop_front() {
            if ctx.is_cancelled() {
                canceled = true;
                break;
            }

            self.counters
                .queued
                .store(frontier.len() as u64, Ordering::Relaxed);
            self.counters.visited.fetch_add(1, Ordering::Relaxed);
            progress(self.counters.snapshot());

            let page = match self.fetcher.fetch(&ctx, &entry.url).await {
                Ok(page) => page,
                Err(FetchError::Canceled) => {
                    canceled = true;
                    break;
                }
                Err(err) => {
                    debug!(url = %entry.url, %err, "page fetch failed");
                    sink(LinkRecord {
                        url: entry.url.to_string(),
                        page_url: entry.url.to_string(),
                        internal: true,
                        status_code: 0,
                        error: err.to_string(),
                        elapsed_ms: 0,
                        depth: entry.depth,
                    });
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    progress(self.counters.snapshot());
                    continue;
                }
            };

            let base = page.final_url.clone();
            for link in extract_links(&page) {
                let normalized = self.normalizer.normalize(&link);

                // the insert is the linearization point: exactly one probe
                // per normalized URL
                if self.links_seen.insert(normalized, ()).is_none() {
                    self.counters.total_links.fetch_add(1, Ordering::Relaxed);
                    progress(self.counters.snapshot());
                    self.spawn_probe(
                        &mut probes,
                        &ctx,
                        link.clone(),
                        base.to_string(),
                        entry.depth,
                        &progress,
                        &sink,
                    );
                }

                if self.should_visit(&link, entry.depth + 1) {
                    if self.counters.discovered.load(Ordering::Relaxed) >= self.max_urls as u64 {
                        // hard cap reached; drop silently
                        continue;
                    }
                    self.pages_seen
                        .insert(self.normalizer.normalize(&link), entry.depth + 1);
                    self.counters.discovered.fetch_add(1, Ordering::Relaxed);
                    frontier.push_back(PageEntry {
                        url: link,
                        depth: entry.depth + 1,
                    });
                    self.counters
                        .queued
                        .store(frontier.len() as u64, Ordering::Relaxed);
                }
            }
        }

        // wait for tail probes; they observe the same token, so this is
        // prompt after cancellation
        while probes.join_next().await.is_some() {}

        if canceled {
            info!("crawl canceled");
            return Err(CrawlError::Canceled);
        }

        let finished = self.counters.snapshot();
        info!(
            visited = finished.visited,
            links = finished.total_links,
            errors = finished.errors,
            "crawl finished"
        );
        Ok(())
    }

    /// Spawn an asynchronous probe for a newly-seen link. The record carries
    /// the depth of the page the link was found on.
    #[allow(clippy::too_many_arguments)]
    fn spawn_probe(
        &self,
        probes: &mut JoinSet<()>,
        ctx: &CancellationToken,
        link: Url,
        page_url: String,
        depth: usize,
        progress: &ProgressFn,
        sink: &SinkFn,
    ) {
        let checker = Arc::clone(&self.checker);
        let counters = Arc::clone(&self.counters);
        let internal = self.normalizer.is_internal(&link);
        let ctx = ctx.clone();
        let progress = Arc::clone(progress);
        let sink = Arc::clone(sink);

        probes.spawn(async move {
            let report = checker.check_url(&ctx, &link).await;
            sink(LinkRecord {
                url: link.to_string(),
                page_url,
                internal,
                status_code: report.status_code,
                error: report
                    .error
                    .map(|err| err.to_string())
                    .unwrap_or_default(),
                elapsed_ms: report.elapsed.as_millis() as u64,
                depth,
            });
            counters.checked_links.fetch_add(1, Ordering::Relaxed);
            progress(counters.snapshot());
        });
    }
}
