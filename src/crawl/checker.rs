//! Link reachability probes
//!
//! Every probe acquires a global permit, then a per-host permit, sleeps a
//! jittered politeness delay, and issues a HEAD request with a GET fallback.
//! Transient network failures get exactly one retry. All waits observe the
//! job's cancellation token.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::Rng;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use url::Url;

use crate::config::CrawlConfig;

/// Probe failure, stringified into [`LinkRecord::error`].
///
/// [`LinkRecord::error`]: super::types::LinkRecord
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("check canceled")]
    Canceled,
    #[error("{0}")]
    Request(#[from] reqwest::Error),
}

impl CheckError {
    /// Timeouts, connect failures, and DNS errors warrant the single retry;
    /// protocol-level failures do not.
    fn is_transient(&self) -> bool {
        match self {
            Self::Canceled => false,
            Self::Request(err) => {
                err.is_timeout() || err.is_connect() || err.to_string().contains("timeout")
            }
        }
    }
}

/// Outcome of one [`LinkChecker::check_url`] call.
#[derive(Debug)]
pub struct CheckReport {
    /// HTTP status; 0 when the probe failed
    pub status_code: u16,
    /// URL the probe landed on after redirects; empty on failure
    pub final_url: String,
    /// Wall-clock time spent probing, summed across both attempts
    pub elapsed: Duration,
    /// Failure, if any
    pub error: Option<CheckError>,
}

impl CheckReport {
    fn success(status_code: u16, final_url: String, elapsed: Duration) -> Self {
        Self {
            status_code,
            final_url,
            elapsed,
            error: None,
        }
    }

    fn failure(elapsed: Duration, error: CheckError) -> Self {
        Self {
            status_code: 0,
            final_url: String::new(),
            elapsed,
            error: Some(error),
        }
    }

    fn canceled(elapsed: Duration) -> Self {
        Self::failure(elapsed, CheckError::Canceled)
    }
}

/// Probes URLs for reachability under global and per-host concurrency caps.
pub struct LinkChecker {
    client: Client,
    global: Semaphore,
    /// Per-host permits, created lazily; a host's entry persists for the
    /// job's lifetime
    per_host: DashMap<String, Arc<Semaphore>>,
    per_host_concurrency: usize,
    host_delay_ms: AtomicU64,
    jitter_ms: u64,
    retry_backoff: Duration,
}

impl LinkChecker {
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        let client = build_client(config)?;
        Ok(Self {
            client,
            global: Semaphore::new(config.global_concurrency),
            per_host: DashMap::new(),
            per_host_concurrency: config.per_host_concurrency,
            host_delay_ms: AtomicU64::new(config.host_delay_ms),
            jitter_ms: config.jitter_ms,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Raise the base per-host delay; never lowers it. Used to honor a
    /// robots.txt crawl-delay larger than the default.
    pub fn raise_host_delay(&self, delay: Duration) {
        let ms = delay.as_millis() as u64;
        self.host_delay_ms.fetch_max(ms, Ordering::Relaxed);
    }

    pub fn host_delay(&self) -> Duration {
        Duration::from_millis(self.host_delay_ms.load(Ordering::Relaxed))
    }

    fn host_permits(&self, host: &str) -> Arc<Semaphore> {
        let entry = self
            .per_host
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host_concurrency)));
        Arc::clone(entry.value())
    }

    fn jittered_delay(&self) -> Duration {
        let base = self.host_delay_ms.load(Ordering::Relaxed) as i64;
        let jitter = self.jitter_ms as i64;
        let offset = rand::thread_rng().gen_range(-jitter..=jitter);
        Duration::from_millis((base + offset).max(0) as u64)
    }

    /// One HEAD probe with GET fallback.
    ///
    /// HEAD is cheap but widely mishandled; any transport error or status
    /// >= 400 (including the explicit 405) retries the same URL with GET.
    async fn check_once(
        &self,
        ctx: &CancellationToken,
        url: &Url,
    ) -> (Duration, Result<(u16, String), CheckError>) {
        let started = Instant::now();

        let head = tokio::select! {
            _ = ctx.cancelled() => return (started.elapsed(), Err(CheckError::Canceled)),
            result = self.client.head(url.as_str()).send() => result,
        };

        let response = match head {
            Ok(response) if response.status().as_u16() < 400 => response,
            head_outcome => {
                // dropping a rejected HEAD response closes it
                drop(head_outcome);
                let get = tokio::select! {
                    _ = ctx.cancelled() => return (started.elapsed(), Err(CheckError::Canceled)),
                    result = self.client.get(url.as_str()).send() => result,
                };
                match get {
                    Ok(response) => response,
                    Err(err) => return (started.elapsed(), Err(err.into())),
                }
            }
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        (started.elapsed(), Ok((status, final_url)))
    }

    /// Probe a URL: acquire permits, pace, check once, retry once on a
    /// transient failure. Permits release in reverse acquisition order on
    /// every exit path.
    pub async fn check_url(&self, ctx: &CancellationToken, url: &Url) -> CheckReport {
        let _global = tokio::select! {
            _ = ctx.cancelled() => return CheckReport::canceled(Duration::ZERO),
            permit = self.global.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return CheckReport::canceled(Duration::ZERO),
            },
        };

        let host = url.host_str().unwrap_or_default().to_string();
        let host_permits = self.host_permits(&host);
        let _host = tokio::select! {
            _ = ctx.cancelled() => return CheckReport::canceled(Duration::ZERO),
            permit = host_permits.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return CheckReport::canceled(Duration::ZERO),
            },
        };

        tokio::select! {
            _ = ctx.cancelled() => return CheckReport::canceled(Duration::ZERO),
            _ = tokio::time::sleep(self.jittered_delay()) => {}
        }

        let (first_elapsed, first) = self.check_once(ctx, url).await;
        let error = match first {
            Ok((status, final_url)) => {
                trace!(%url, status, "link checked");
                return CheckReport::success(status, final_url, first_elapsed);
            }
            Err(err) => err,
        };

        if error.is_transient() {
            tokio::select! {
                _ = ctx.cancelled() => return CheckReport::canceled(first_elapsed),
                _ = tokio::time::sleep(self.retry_backoff) => {}
            }
            let (retry_elapsed, retry) = self.check_once(ctx, url).await;
            if let Ok((status, final_url)) = retry {
                return CheckReport::success(status, final_url, first_elapsed + retry_elapsed);
            }
        }

        CheckReport::failure(first_elapsed, error)
    }
}

/// Shared transport profile for probes and page fetches.
pub(crate) fn build_client(config: &CrawlConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .tcp_keepalive(Duration::from_secs(30))
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(Duration::from_secs(90))
        .gzip(true)
        .build()
}
