//! Normalization: raw extraction history → canonical corpus.
//!
//! Each run reads **all** extraction batches ever written for a query, not
//! just the latest, and concatenates their records before cleaning. This
//! cumulative-merge policy means canonical records are never lost even when
//! a later batch is partial. The output is a JSON batch plus a
//! row-equivalent CSV, derived from the same input under one timestamp so
//! the pair is always in lockstep.
//!
//! Cleaning passes are pure `&str -> String` functions applied per field.
//! Records left empty after cleaning are retained: completeness over pruning.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, instrument};

use topicforge_shared::{CanonicalRecord, Query, RawRecord, Result, TopicforgeError};
use topicforge_store::{Store, stamp_now};

// ---------------------------------------------------------------------------
// Batch normalization
// ---------------------------------------------------------------------------

/// Summary of one normalizer run.
#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    /// Raw records merged from the full extraction history.
    pub records_in: usize,
    /// Canonical records written (always equals `records_in`).
    pub records_out: usize,
}

/// Normalize a query's full extraction history into a new normalized batch.
///
/// Returns `None` when there is no extraction history: nothing to do, not
/// an error.
#[instrument(skip_all, fields(query = %query))]
pub fn normalize(query: &Query, store: &Store) -> Result<Option<NormalizeOutcome>> {
    let ident = query.ident();
    let raw = store.read_extraction_records(&ident)?;

    if raw.is_empty() {
        return Ok(None);
    }

    let canonical: Vec<CanonicalRecord> = raw.iter().map(clean_record).collect();
    let csv = render_csv(&canonical)?;
    store.write_normalized_batch(&ident, &stamp_now(), &canonical, &csv)?;

    info!(
        records_in = raw.len(),
        records_out = canonical.len(),
        "normalized batch written"
    );

    Ok(Some(NormalizeOutcome {
        records_in: raw.len(),
        records_out: canonical.len(),
    }))
}

// ---------------------------------------------------------------------------
// Cleaning passes
// ---------------------------------------------------------------------------

/// Project a raw record onto its canonical form.
pub fn clean_record(raw: &RawRecord) -> CanonicalRecord {
    CanonicalRecord {
        url: raw.url.clone(),
        title: clean_text(&raw.title),
        description: clean_text(&raw.description),
        content: clean_text(&raw.content),
        images: filter_absolute(&raw.images),
        links: filter_absolute(&raw.links),
    }
}

/// Collapse whitespace runs to a single space, lower-case, trim. Idempotent.
pub fn clean_text(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE
        .replace_all(text, " ")
        .trim()
        .to_lowercase()
}

/// Retain only entries with an absolute http(s) scheme prefix.
pub fn filter_absolute(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.starts_with("http"))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tabular export
// ---------------------------------------------------------------------------

/// Render canonical records as CSV with identical row semantics to the JSON
/// batch. List fields are serialized as JSON arrays inside their cells so
/// both files are deterministically derivable from the same input.
pub fn render_csv(records: &[CanonicalRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["url", "title", "description", "content", "images", "links"])
        .map_err(|e| TopicforgeError::Storage(format!("csv header: {e}")))?;

    for record in records {
        let images = serde_json::to_string(&record.images)
            .map_err(|e| TopicforgeError::Storage(format!("csv images cell: {e}")))?;
        let links = serde_json::to_string(&record.links)
            .map_err(|e| TopicforgeError::Storage(format!("csv links cell: {e}")))?;

        writer
            .write_record([
                record.url.as_str(),
                record.title.as_str(),
                record.description.as_str(),
                record.content.as_str(),
                images.as_str(),
                links.as_str(),
            ])
            .map_err(|e| TopicforgeError::Storage(format!("csv row: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TopicforgeError::Storage(format!("csv flush: {e}")))?;
    String::from_utf8(bytes).map_err(|e| TopicforgeError::Storage(format!("csv utf8: {e}")))
}
