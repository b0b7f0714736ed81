//! Integration tests for linkpulse
//!
//! Exercises the public crate surface end to end without touching the
//! network: admission failures, unresolvable hosts, cancellation, and the
//! job layer's state machine.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use linkpulse::config::CrawlConfig;
use linkpulse::crawl::{
    self, extract_links, CrawlError, CrawlProgress, FetchedPage, JobParams, LinkRecord,
    UrlNormalizer,
};
use linkpulse::server::{JobManager, JobState, ServerMetrics};

fn params(start_url: &str) -> JobParams {
    JobParams {
        start_url: start_url.to_string(),
        max_depth: 1,
        respect_robots: false,
    }
}

fn collecting_callbacks() -> (
    Arc<Mutex<Vec<CrawlProgress>>>,
    Arc<Mutex<Vec<LinkRecord>>>,
    crawl::ProgressFn,
    crawl::SinkFn,
) {
    let snapshots: Arc<Mutex<Vec<CrawlProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let records: Arc<Mutex<Vec<LinkRecord>>> = Arc::new(Mutex::new(Vec::new()));

    let progress: crawl::ProgressFn = {
        let snapshots = Arc::clone(&snapshots);
        Arc::new(move |snapshot| snapshots.lock().unwrap().push(snapshot))
    };
    let sink: crawl::SinkFn = {
        let records = Arc::clone(&records);
        Arc::new(move |record| records.lock().unwrap().push(record))
    };

    (snapshots, records, progress, sink)
}

#[tokio::test]
async fn start_not_allowed_for_bad_scheme() {
    let (_, _, progress, sink) = collecting_callbacks();
    let result = crawl::start_crawl(
        &params("ftp://example.com/"),
        &CrawlConfig::default(),
        CancellationToken::new(),
        progress,
        sink,
    )
    .await;
    assert!(matches!(result, Err(CrawlError::StartNotAllowed)));
}

#[tokio::test]
async fn start_not_allowed_for_single_label_host() {
    // single-label hosts have no registrable domain, so the scope check
    // can never classify them as internal
    let (_, _, progress, sink) = collecting_callbacks();
    let result = crawl::start_crawl(
        &params("http://intranet/"),
        &CrawlConfig::default(),
        CancellationToken::new(),
        progress,
        sink,
    )
    .await;
    assert!(matches!(result, Err(CrawlError::StartNotAllowed)));
}

#[tokio::test]
async fn unresolvable_host_yields_error_record_and_finishes() {
    // .invalid never resolves (RFC 2606); the page fetch fails and the
    // crawl completes with a synthetic status-0 record
    let (snapshots, records, progress, sink) = collecting_callbacks();
    let result = tokio::time::timeout(
        Duration::from_secs(60),
        crawl::start_crawl(
            &params("http://site.invalid/"),
            &CrawlConfig::default(),
            CancellationToken::new(),
            progress,
            sink,
        ),
    )
    .await
    .expect("crawl should finish well within the timeout");
    assert!(result.is_ok());

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status_code, 0);
    assert!(!record.error.is_empty());
    assert!(record.internal);
    assert_eq!(record.depth, 0);
    assert_eq!(record.page_url, record.url);

    let snapshots = snapshots.lock().unwrap();
    let last = snapshots.last().expect("progress was emitted");
    assert_eq!(last.visited, 1);
    assert_eq!(last.discovered, 1);
    assert_eq!(last.errors, 1);
    assert_eq!(last.total_links, 0);
    assert_eq!(last.checked_links, 0);
}

#[tokio::test]
async fn pre_canceled_crawl_returns_canceled_without_records() {
    let (_, records, progress, sink) = collecting_callbacks();
    let ctx = CancellationToken::new();
    ctx.cancel();

    let result = crawl::start_crawl(
        &params("http://site.invalid/"),
        &CrawlConfig::default(),
        ctx,
        progress,
        sink,
    )
    .await;

    assert!(matches!(result, Err(CrawlError::Canceled)));
    assert!(records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn progress_counters_are_monotonic() {
    let (snapshots, _, progress, sink) = collecting_callbacks();
    let _ = crawl::start_crawl(
        &params("http://site.invalid/"),
        &CrawlConfig::default(),
        CancellationToken::new(),
        progress,
        sink,
    )
    .await;

    let snapshots = snapshots.lock().unwrap();
    for window in snapshots.windows(2) {
        assert!(window[1].visited >= window[0].visited);
        assert!(window[1].discovered >= window[0].discovered);
        assert!(window[1].errors >= window[0].errors);
        assert!(window[1].checked_links >= window[0].checked_links);
        assert!(window[1].total_links >= window[0].total_links);
    }
}

#[tokio::test]
async fn job_manager_runs_crawl_to_terminal_state() {
    let manager = JobManager::new(CrawlConfig::default(), Arc::new(ServerMetrics::new()));
    let job_id = manager.start(params("http://site.invalid/"));

    let mut terminal = None;
    for _ in 0..240 {
        let snapshot = manager.snapshot(job_id).unwrap();
        if !matches!(snapshot.state, JobState::Queued | JobState::Running) {
            terminal = Some(snapshot);
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    let snapshot = terminal.expect("job reached a terminal state");
    assert_eq!(snapshot.state, JobState::Done);
    assert_eq!(snapshot.progress.visited, 1);
    assert_eq!(snapshot.progress.errors, 1);

    let results = manager.results(job_id).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status_code, 0);
}

#[test]
fn normalization_collapses_equivalent_spellings() {
    let start = Url::parse("http://a.test/").unwrap();
    let normalizer = UrlNormalizer::new(&start);

    let left = normalizer.normalize(&Url::parse("http://A.test:80/x?utm_source=q&b=1#frag").unwrap());
    let right = normalizer.normalize(&Url::parse("http://a.test/x?b=1").unwrap());
    assert_eq!(left, right);
}

#[test]
fn extraction_resolves_against_page_base() {
    let page = FetchedPage {
        final_url: Url::parse("http://a.test/").unwrap(),
        status_code: 200,
        body: r#"<a href="/about">About</a><a href="https://ext.test/x">Ext</a>"#.to_string(),
    };

    let links: Vec<String> = extract_links(&page).iter().map(|u| u.to_string()).collect();
    assert_eq!(links, vec!["http://a.test/about", "https://ext.test/x"]);

    let normalizer = UrlNormalizer::new(&page.final_url);
    assert!(normalizer.is_internal(&Url::parse(&links[0]).unwrap()));
    assert!(!normalizer.is_internal(&Url::parse(&links[1]).unwrap()));
}
