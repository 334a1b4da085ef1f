//! Query resolution: topical query → ordered unique result URL list.
//!
//! The search provider is an opaque HTTP endpoint returning a result-document
//! payload. Each resolver run persists the raw payload as a discovery
//! snapshot (audit only) before any parsing, then extracts, filters, and
//! dedups the result URLs. A failed or empty resolution is reported to the
//! caller, who skips the query and leaves any previous URL set untouched:
//! stale-but-valid data over no data.

mod parser;

use reqwest::Client;
use tracing::{info, instrument};

use topicforge_shared::{Query, Result, TopicforgeError};
use topicforge_store::{Store, stamp_now};

pub use parser::extract_result_urls;

/// User-Agent string for resolution requests.
const USER_AGENT: &str = concat!("topicforge/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// Resolver options
// ---------------------------------------------------------------------------

/// Configuration for query resolution.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Search endpoint the query is sent to.
    pub provider_base: String,
    /// Number of results requested per query.
    pub result_count: u32,
    /// Result URLs containing any of these domains are dropped.
    pub blocked_domains: Vec<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            provider_base: "https://www.google.com/search".into(),
            result_count: 20,
            blocked_domains: vec!["google.com".into(), "youtube.com".into()],
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Turns a query into candidate document URLs via the search provider.
pub struct Resolver {
    opts: ResolveOptions,
    client: Client,
}

impl Resolver {
    /// Create a resolver with the given options.
    ///
    /// Fails on a malformed provider endpoint so the misconfiguration
    /// surfaces at startup, not per query.
    pub fn new(opts: ResolveOptions) -> Result<Self> {
        url::Url::parse(&opts.provider_base).map_err(|e| {
            TopicforgeError::config(format!(
                "invalid provider endpoint '{}': {e}",
                opts.provider_base
            ))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(std::time::Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| TopicforgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { opts, client })
    }

    /// Resolve a query to an ordered, deduplicated URL list.
    ///
    /// The raw payload is snapshotted to `store` under a timestamped key
    /// regardless of whether extraction succeeds. An empty result set is an
    /// error: the caller keeps the previous URL set for this query.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn resolve(&self, query: &Query, store: &Store) -> Result<Vec<String>> {
        let request_url = format!(
            "{}?q={}&num={}",
            self.opts.provider_base,
            query.as_str().replace(' ', "+"),
            self.opts.result_count
        );

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .map_err(|e| TopicforgeError::Network(format!("{request_url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TopicforgeError::Network(format!(
                "{request_url}: HTTP {status}"
            )));
        }

        let payload = response
            .text()
            .await
            .map_err(|e| TopicforgeError::Network(format!("{request_url}: body read: {e}")))?;

        // Snapshot before parsing: the payload is kept for audit even when
        // extraction yields nothing.
        store.write_snapshot(&query.ident(), &stamp_now(), &payload)?;

        let urls = parser::extract_result_urls(&payload, &self.opts.blocked_domains);

        if urls.is_empty() {
            return Err(TopicforgeError::validation(format!(
                "no result URLs for query '{query}'"
            )));
        }

        info!(count = urls.len(), "query resolved");
        Ok(urls)
    }
}
