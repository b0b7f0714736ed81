//! Background job management
//!
//! Tracks crawl jobs, their lifecycle state, per-job result buffers, and
//! cancellation. The crawl engine reports through callbacks; the job layer
//! turns those into poll-able state for the HTTP surface.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::CrawlConfig;
use crate::crawl::{self, CrawlError, CrawlProgress, JobParams, LinkRecord, ProgressFn, SinkFn};

use super::metrics::ServerMetrics;

/// Job lifecycle: `queued -> running -> {done | failed | canceled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
    Canceled,
}

/// Point-in-time view of a job for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub state: JobState,
    #[serde(flatten)]
    pub progress: CrawlProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How long finished jobs are retained before cleanup
const JOB_RETENTION: Duration = Duration::from_secs(3600);

/// Per-job result buffer cap; records past this are counted and dropped
/// rather than growing without bound
const MAX_RESULTS_PER_JOB: usize = 50_000;

struct Job {
    params: JobParams,
    state: Mutex<JobState>,
    progress: Mutex<CrawlProgress>,
    results: Mutex<Vec<LinkRecord>>,
    error: Mutex<Option<String>>,
    cancel: CancellationToken,
    completed_at: Mutex<Option<Instant>>,
}

/// Job manager for tracking and controlling crawl jobs.
pub struct JobManager {
    jobs: DashMap<Uuid, Arc<Job>>,
    config: CrawlConfig,
    metrics: Arc<ServerMetrics>,
}

impl JobManager {
    pub fn new(config: CrawlConfig, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            jobs: DashMap::new(),
            config,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<ServerMetrics> {
        &self.metrics
    }

    /// Accept a crawl job and run it in a background task. Returns the job
    /// id immediately; progress is observed via [`JobManager::snapshot`].
    pub fn start(&self, params: JobParams) -> Uuid {
        self.cleanup_old_jobs();

        let job_id = Uuid::new_v4();
        let job = Arc::new(Job {
            params,
            state: Mutex::new(JobState::Queued),
            progress: Mutex::new(CrawlProgress::default()),
            results: Mutex::new(Vec::new()),
            error: Mutex::new(None),
            cancel: CancellationToken::new(),
            completed_at: Mutex::new(None),
        });
        self.jobs.insert(job_id, Arc::clone(&job));
        self.metrics.jobs_started.inc();

        let config = self.config.clone();
        let metrics = Arc::clone(&self.metrics);

        tokio::spawn(async move {
            info!(%job_id, start_url = %job.params.start_url, "crawl job starting");
            {
                let mut state = job.state.lock();
                if *state == JobState::Queued {
                    *state = JobState::Running;
                }
            }

            let progress: ProgressFn = {
                let job = Arc::clone(&job);
                Arc::new(move |snapshot| {
                    *job.progress.lock() = snapshot;
                })
            };

            let sink: SinkFn = {
                let job = Arc::clone(&job);
                let metrics = Arc::clone(&metrics);
                Arc::new(move |record| {
                    let mut results = job.results.lock();
                    if results.len() < MAX_RESULTS_PER_JOB {
                        results.push(record);
                        metrics.results_recorded.inc();
                    } else {
                        if metrics.results_dropped.get() == 0 {
                            warn!("result buffer full, dropping further records");
                        }
                        metrics.results_dropped.inc();
                    }
                })
            };

            let result = crawl::start_crawl(
                &job.params,
                &config,
                job.cancel.clone(),
                progress,
                sink,
            )
            .await;

            *job.completed_at.lock() = Some(Instant::now());
            let mut state = job.state.lock();
            match result {
                Ok(()) => {
                    if *state != JobState::Canceled {
                        *state = JobState::Done;
                        metrics.jobs_completed.inc();
                        info!(%job_id, "crawl job done");
                    }
                }
                Err(CrawlError::Canceled) => {
                    // cancel() already moved the state and counted it
                    if *state != JobState::Canceled {
                        *state = JobState::Canceled;
                        metrics.jobs_canceled.inc();
                    }
                    info!(%job_id, "crawl job canceled");
                }
                Err(err) => {
                    if *state != JobState::Canceled {
                        *state = JobState::Failed;
                        *job.error.lock() = Some(err.to_string());
                        metrics.jobs_failed.inc();
                        warn!(%job_id, %err, "crawl job failed");
                    }
                }
            }
        });

        job_id
    }

    /// Cancel a job. Returns false for unknown or already-finished jobs.
    pub fn cancel(&self, job_id: Uuid) -> bool {
        let Some(job) = self.jobs.get(&job_id) else {
            return false;
        };

        let mut state = job.state.lock();
        if matches!(*state, JobState::Queued | JobState::Running) {
            *state = JobState::Canceled;
            drop(state);
            job.cancel.cancel();
            self.metrics.jobs_canceled.inc();
            true
        } else {
            false
        }
    }

    /// Current state, counters, and error (if failed) for a job.
    pub fn snapshot(&self, job_id: Uuid) -> Option<JobSnapshot> {
        let job = self.jobs.get(&job_id)?;
        let snapshot = JobSnapshot {
            state: *job.state.lock(),
            progress: *job.progress.lock(),
            error: job.error.lock().clone(),
        };
        Some(snapshot)
    }

    /// Copy of the job's collected link records.
    pub fn results(&self, job_id: Uuid) -> Option<Vec<LinkRecord>> {
        let job = self.jobs.get(&job_id)?;
        let results = job.results.lock().clone();
        Some(results)
    }

    /// Number of jobs still queued or running.
    pub fn active_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|entry| {
                matches!(*entry.state.lock(), JobState::Queued | JobState::Running)
            })
            .count()
    }

    /// Drop finished jobs older than the retention window.
    fn cleanup_old_jobs(&self) {
        self.jobs.retain(|_, job| {
            matches!(*job.state.lock(), JobState::Queued | JobState::Running)
                || job
                    .completed_at
                    .lock()
                    .map(|t| t.elapsed() < JOB_RETENTION)
                    .unwrap_or(true)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JobManager {
        JobManager::new(CrawlConfig::default(), Arc::new(ServerMetrics::new()))
    }

    async fn wait_for_terminal(manager: &JobManager, job_id: Uuid) -> JobSnapshot {
        for _ in 0..120 {
            let snapshot = manager.snapshot(job_id).unwrap();
            if !matches!(snapshot.state, JobState::Queued | JobState::Running) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        panic!("job {job_id} did not reach a terminal state");
    }

    #[tokio::test]
    async fn bad_start_url_fails_the_job() {
        let manager = manager();
        let job_id = manager.start(JobParams {
            start_url: "ftp://example.com/".to_string(),
            max_depth: 0,
            respect_robots: false,
        });

        let snapshot = wait_for_terminal(&manager, job_id).await;
        assert_eq!(snapshot.state, JobState::Failed);
        assert!(snapshot.error.is_some());
        assert_eq!(manager.metrics().jobs_failed.get(), 1);
    }

    #[tokio::test]
    async fn cancel_moves_job_to_canceled() {
        let manager = manager();
        // an unreachable-but-valid target keeps the job alive long enough
        // to cancel: the page fetcher sleeps before dialing
        let job_id = manager.start(JobParams {
            start_url: "http://site.invalid/".to_string(),
            max_depth: 0,
            respect_robots: false,
        });

        assert!(manager.cancel(job_id));
        let snapshot = wait_for_terminal(&manager, job_id).await;
        assert_eq!(snapshot.state, JobState::Canceled);

        // a second cancel is a no-op
        assert!(!manager.cancel(job_id));
    }

    #[test]
    fn job_state_wire_names() {
        assert_eq!(serde_json::to_value(JobState::Queued).unwrap(), "queued");
        assert_eq!(serde_json::to_value(JobState::Running).unwrap(), "running");
        assert_eq!(serde_json::to_value(JobState::Done).unwrap(), "done");
        assert_eq!(serde_json::to_value(JobState::Failed).unwrap(), "failed");
        assert_eq!(serde_json::to_value(JobState::Canceled).unwrap(), "canceled");
    }

    #[test]
    fn snapshot_flattens_progress_fields() {
        let snapshot = JobSnapshot {
            state: JobState::Running,
            progress: CrawlProgress {
                visited: 2,
                queued: 1,
                discovered: 3,
                errors: 0,
                checked_links: 4,
                total_links: 6,
            },
            error: None,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["visited"], 2);
        assert_eq!(json["total_links"], 6);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn unknown_job_queries_return_none() {
        let manager = manager();
        let missing = Uuid::new_v4();
        assert!(manager.snapshot(missing).is_none());
        assert!(manager.results(missing).is_none());
        assert!(!manager.cancel(missing));
    }
}
