//! URL canonicalization and same-site scoping
//!
//! Two URLs are considered the same page iff their normalized string forms
//! are byte-equal. A URL is "internal" when its registrable domain (eTLD+1)
//! matches the start URL's.

use url::Url;

/// Tracking query parameters stripped during normalization (case-insensitive)
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "gclid",
    "fbclid",
    "mc_cid",
    "mc_eid",
];

/// Canonicalizes URLs and classifies them against the start domain.
#[derive(Debug, Clone)]
pub struct UrlNormalizer {
    root_domain: String,
}

impl UrlNormalizer {
    /// Record the start URL's registrable domain as the scope root.
    /// Falls back to the literal hostname when the public-suffix lookup
    /// fails (IP literals, single-label hosts).
    pub fn new(start: &Url) -> Self {
        let host = start.host_str().unwrap_or_default();
        let root_domain = registrable_domain(host).unwrap_or_else(|| host.to_ascii_lowercase());
        Self { root_domain }
    }

    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    /// True iff the URL's registrable domain equals the scope root.
    /// False on null host or failed public-suffix lookup.
    pub fn is_internal(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        match registrable_domain(host) {
            Some(domain) => domain.eq_ignore_ascii_case(&self.root_domain),
            None => false,
        }
    }

    /// Canonical string form used for dedup equality.
    ///
    /// The `url` parser already lowercases scheme and host and drops default
    /// ports; on top of that this clears the fragment, lexically cleans the
    /// path, strips tracking parameters, and sorts the remaining query keys.
    pub fn normalize(&self, url: &Url) -> String {
        let mut normalized = url.clone();
        normalized.set_fragment(None);

        let cleaned = clean_path(normalized.path());
        normalized.set_path(&cleaned);

        if normalized.query().is_some() {
            let mut pairs: Vec<(String, String)> = normalized
                .query_pairs()
                .filter(|(key, _)| !is_tracking_param(key))
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            // stable sort: values for a repeated key keep document order
            pairs.sort_by(|a, b| a.0.cmp(&b.0));

            if pairs.is_empty() {
                normalized.set_query(None);
            } else {
                normalized.query_pairs_mut().clear().extend_pairs(pairs);
            }
        }

        normalized.into()
    }
}

fn registrable_domain(host: &str) -> Option<String> {
    let lowered = host.to_ascii_lowercase();
    psl::domain_str(&lowered).map(str::to_string)
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS
        .iter()
        .any(|param| key.eq_ignore_ascii_case(param))
}

/// Lexical path cleaning: collapse duplicate slashes, resolve `.` and `..`
/// segments, drop trailing slashes. Empty paths become `/`.
fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}
