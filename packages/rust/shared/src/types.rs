//! Core domain types for the TopicForge pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title value written when a page has no `<title>` element.
///
/// Callers must treat this as "absent", never as real content.
pub const NO_TITLE: &str = "No Title";

/// Description value written when a page has no description meta tag.
pub const NO_DESCRIPTION: &str = "No Description";

/// Timestamp format used in versioned artifact filenames. Lexicographic
/// order on the formatted string is chronological order.
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// A topical search string; the partition key for every staged artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(pub String);

impl Query {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The filesystem-safe identifier shared by all artifacts of this query.
    ///
    /// Spaces become underscores; case is preserved. Every stage joins on
    /// this exact derivation.
    pub fn ident(&self) -> String {
        self.0.replace(' ', "_")
    }

    /// The raw query text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One extracted page, as produced by the extractor. Text fields are raw:
/// whitespace collapsing and casing are the normalizer's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Source page URL.
    pub url: String,
    /// Page title, or [`NO_TITLE`] when absent.
    pub title: String,
    /// Meta description, or [`NO_DESCRIPTION`] when absent.
    pub description: String,
    /// Concatenated paragraph text in document order.
    pub content: String,
    /// All `img[src]` values as found on the page.
    pub images: Vec<String>,
    /// All `a[href]` values as found on the page.
    pub links: Vec<String>,
    /// When the page was fetched.
    pub fetched_at: DateTime<Utc>,
}

/// Lightweight per-run index entry (url/title/description only), written
/// alongside each extraction batch for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlEntry {
    pub url: String,
    pub title: String,
    pub description: String,
}

impl From<&RawRecord> for CrawlEntry {
    fn from(r: &RawRecord) -> Self {
        Self {
            url: r.url.clone(),
            title: r.title.clone(),
            description: r.description.clone(),
        }
    }
}

/// Normalized projection of a [`RawRecord`]: lower-cased, whitespace-collapsed
/// text; image/link lists filtered to absolute http(s) entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub images: Vec<String>,
    pub links: Vec<String>,
}

/// One unit of the training corpus. The category is an open string class,
/// not a fixed enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    pub text: String,
    pub category: String,
}

// ---------------------------------------------------------------------------
// Stage counters
// ---------------------------------------------------------------------------

/// Aggregate per-stage-run counters, so failure rates are observable without
/// changing the non-fatal skip policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounters {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl StageCounters {
    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    /// Fold another stage run's counters into this one.
    pub fn merge(&mut self, other: StageCounters) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
    }
}

impl std::fmt::Display for StageCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} ok, {} failed",
            self.succeeded, self.attempted, self.failed
        )
    }
}
