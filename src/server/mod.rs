//! Job orchestration and HTTP surface over the crawl engine

pub mod http;
pub mod jobs;
pub mod metrics;

pub use http::HttpServer;
pub use jobs::{JobManager, JobSnapshot, JobState};
pub use metrics::ServerMetrics;
