//! HTTP API request/response types
//!
//! JSON-serializable types for the REST surface, plus the result filters
//! applied by the results endpoint.

use serde::{Deserialize, Serialize};

use crate::crawl::LinkRecord;

/// Crawl submission body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    /// Absolute http/https start URL
    pub start_url: String,
    /// Requested depth; clamped to the configured ceiling
    #[serde(default)]
    pub max_depth: i64,
    /// Honor robots.txt at the start host
    #[serde(default)]
    pub respect_robots: bool,
}

/// Response to a successful crawl submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStartedResponse {
    pub job_id: String,
}

/// Response to a cancel request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCancelResponse {
    pub success: bool,
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
}

/// Error body for all failure responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Query parameters accepted by the results endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsQuery {
    /// `internal`, `external`, or anything else for all
    pub scope: Option<String>,
    /// Comma-separated status classes: `2`, `3`, `4`, `5`, `e`
    pub status: Option<String>,
}

/// Which links to include by site membership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    InternalOnly,
    ExternalOnly,
}

impl Scope {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "internal" => Self::InternalOnly,
            "external" => Self::ExternalOnly,
            _ => Self::All,
        }
    }

    fn matches(&self, record: &LinkRecord) -> bool {
        match self {
            Self::All => true,
            Self::InternalOnly => record.internal,
            Self::ExternalOnly => !record.internal,
        }
    }
}

/// Status-code class of a link record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatusClass {
    Success,
    Redirect,
    ClientError,
    ServerError,
    /// Network-level failure (status 0)
    NetworkError,
}

impl StatusClass {
    pub fn of(record: &LinkRecord) -> Option<Self> {
        match record.status_code {
            0 => Some(Self::NetworkError),
            200..=299 => Some(Self::Success),
            300..=399 => Some(Self::Redirect),
            400..=499 => Some(Self::ClientError),
            500..=599 => Some(Self::ServerError),
            _ => None,
        }
    }

    /// Parse the comma-separated `status` query value. Unknown tokens are
    /// ignored; an empty result means no status filtering.
    pub fn parse_list(value: &str) -> Vec<Self> {
        let mut classes: Vec<Self> = value
            .split(',')
            .filter_map(|token| match token.trim().to_ascii_lowercase().as_str() {
                "2" => Some(Self::Success),
                "3" => Some(Self::Redirect),
                "4" => Some(Self::ClientError),
                "5" => Some(Self::ServerError),
                "e" => Some(Self::NetworkError),
                _ => None,
            })
            .collect();
        classes.sort();
        classes.dedup();
        classes
    }
}

/// Apply scope and status-class filters to a result set.
pub fn filter_results(records: Vec<LinkRecord>, query: &ResultsQuery) -> Vec<LinkRecord> {
    let scope = query
        .scope
        .as_deref()
        .map(Scope::parse)
        .unwrap_or(Scope::All);
    let classes = query
        .status
        .as_deref()
        .map(StatusClass::parse_list)
        .unwrap_or_default();

    records
        .into_iter()
        .filter(|record| scope.matches(record))
        .filter(|record| {
            classes.is_empty()
                || StatusClass::of(record).is_some_and(|class| classes.contains(&class))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(internal: bool, status_code: u16) -> LinkRecord {
        LinkRecord {
            url: "https://example.com/x".to_string(),
            page_url: "https://example.com/".to_string(),
            internal,
            status_code,
            error: if status_code == 0 {
                "connect error".to_string()
            } else {
                String::new()
            },
            elapsed_ms: 1,
            depth: 0,
        }
    }

    #[test]
    fn scope_parsing() {
        assert_eq!(Scope::parse("internal"), Scope::InternalOnly);
        assert_eq!(Scope::parse("EXTERNAL"), Scope::ExternalOnly);
        assert_eq!(Scope::parse(""), Scope::All);
        assert_eq!(Scope::parse("everything"), Scope::All);
    }

    #[test]
    fn status_list_parsing_dedups_and_ignores_junk() {
        let classes = StatusClass::parse_list("4, 4,e,banana,2");
        assert_eq!(
            classes,
            vec![
                StatusClass::Success,
                StatusClass::ClientError,
                StatusClass::NetworkError
            ]
        );
        assert!(StatusClass::parse_list("").is_empty());
    }

    #[test]
    fn filters_compose() {
        let records = vec![
            record(true, 200),
            record(true, 404),
            record(false, 200),
            record(false, 0),
        ];

        let query = ResultsQuery {
            scope: Some("internal".to_string()),
            status: Some("4".to_string()),
        };
        let filtered = filter_results(records.clone(), &query);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].status_code, 404);

        let query = ResultsQuery {
            scope: None,
            status: Some("e".to_string()),
        };
        let filtered = filter_results(records.clone(), &query);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].status_code, 0);

        let query = ResultsQuery::default();
        assert_eq!(filter_results(records, &query).len(), 4);
    }
}
