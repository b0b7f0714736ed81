//! linkpulse: a polite, bounded web-link checker
//!
//! Crawls a site breadth-first from a start page, discovers outbound
//! hyperlinks, probes each discovered URL for reachability, and streams
//! per-link status records to an observer. Featuring:
//! - Two dedup universes: pages to fetch and links to probe
//! - Two-tier concurrency limits (global + per-host) with jittered pacing
//! - robots.txt gating with fail-open semantics and crawl-delay honoring
//! - Private/loopback host blocking on page fetches
//! - Prompt cancellation threaded through every wait and request
//! - A small REST surface for job submission, status, and results

pub mod config;
pub mod crawl;
pub mod server;

pub use config::Config;
pub use crawl::{start_crawl, CrawlError, CrawlProgress, JobParams, LinkRecord};
pub use server::{HttpServer, JobManager};
