//! Filesystem artifact store for the TopicForge pipeline.
//!
//! All cross-run state lives here, under one root directory. Two storage
//! semantics share the key namespace and must never be conflated:
//!
//! - **slots** — latest-wins, overwritten in place (URL sets, the labeled
//!   corpus, model blobs, predictions);
//! - **logs** — append-only, a new timestamped file per run, never
//!   overwritten (discovery snapshots, crawl metadata, extraction batches,
//!   normalized batches).
//!
//! Each stage exclusively owns writing its own artifact kind. The join key
//! across all stages is the query's derived identifier
//! ([`Query::ident`](topicforge_shared::Query::ident)).
//!
//! Layout under the root:
//!
//! ```text
//! logs/{ident}_{stamp}.html                      discovery snapshots
//! data/urls/{ident}.json                         URL set (slot)
//! data/urls/{ident}_crawled_{stamp}.json         crawl metadata (log)
//! data/refined/{ident}_scraped_{stamp}.json      extraction batches (log)
//! data/processed/{ident}_processed_{stamp}.json  normalized batches (log)
//! data/processed/{ident}_processed_{stamp}.csv   tabular export (log)
//! data/raw_data.json                             labeled corpus (slot)
//! model/*.json                                   model blobs (slots)
//! predictions.json                               prediction output (slot)
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use topicforge_shared::{
    CanonicalRecord, CrawlEntry, LabeledExample, RawRecord, Result, STAMP_FORMAT, TopicforgeError,
};

/// Labeled corpus slot file, relative to the data dir.
const CORPUS_FILE: &str = "raw_data.json";

/// Prediction output slot file, relative to the root.
const PREDICTIONS_FILE: &str = "predictions.json";

/// A sortable timestamp suffix for versioned artifact filenames.
pub fn stamp_now() -> String {
    Utc::now().format(STAMP_FORMAT).to_string()
}

/// Handle to the artifact store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open the store at `root`, creating the directory layout if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [
            root.join("logs"),
            root.join("data").join("urls"),
            root.join("data").join("refined"),
            root.join("data").join("processed"),
            root.join("model"),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| TopicforgeError::io(&dir, e))?;
        }
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // -----------------------------------------------------------------------
    // Discovery snapshots (log)
    // -----------------------------------------------------------------------

    /// Persist a raw discovery payload for audit. Immutable once written;
    /// never read back by later stages.
    pub fn write_snapshot(&self, ident: &str, stamp: &str, payload: &str) -> Result<PathBuf> {
        let path = self.root.join("logs").join(format!("{ident}_{stamp}.html"));
        std::fs::write(&path, payload).map_err(|e| TopicforgeError::io(&path, e))?;
        debug!(?path, bytes = payload.len(), "snapshot written");
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // URL sets (slot)
    // -----------------------------------------------------------------------

    fn url_set_path(&self, ident: &str) -> PathBuf {
        self.root
            .join("data")
            .join("urls")
            .join(format!("{ident}.json"))
    }

    /// Overwrite the URL set for a query. Latest wins.
    pub fn write_url_set(&self, ident: &str, urls: &[String]) -> Result<()> {
        let path = self.url_set_path(ident);
        write_json(&path, &urls)?;
        debug!(?path, count = urls.len(), "URL set written");
        Ok(())
    }

    /// Read the URL set for a query. `None` means the resolver has never
    /// succeeded for this query: "nothing to do", not an error.
    pub fn read_url_set(&self, ident: &str) -> Result<Option<Vec<String>>> {
        let path = self.url_set_path(ident);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_json(&path)?))
    }

    // -----------------------------------------------------------------------
    // Crawl metadata (log)
    // -----------------------------------------------------------------------

    /// Append a per-run crawl metadata file (url/title/description index).
    pub fn write_crawl_metadata(
        &self,
        ident: &str,
        stamp: &str,
        entries: &[CrawlEntry],
    ) -> Result<PathBuf> {
        let path = self
            .root
            .join("data")
            .join("urls")
            .join(format!("{ident}_crawled_{stamp}.json"));
        write_json(&path, &entries)?;
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // Extraction batches (log)
    // -----------------------------------------------------------------------

    /// Append a new extraction batch. A new file per run; existing batches
    /// are never touched.
    pub fn append_extraction_batch(
        &self,
        ident: &str,
        stamp: &str,
        records: &[RawRecord],
    ) -> Result<PathBuf> {
        let path = self
            .root
            .join("data")
            .join("refined")
            .join(format!("{ident}_scraped_{stamp}.json"));
        write_json(&path, &records)?;
        debug!(?path, count = records.len(), "extraction batch appended");
        Ok(path)
    }

    /// Read the full extraction history for a query: every batch whose
    /// filename matches `{ident}_scraped_*`, in chronological order,
    /// concatenated. A malformed batch file is logged and skipped.
    pub fn read_extraction_records(&self, ident: &str) -> Result<Vec<RawRecord>> {
        let dir = self.root.join("data").join("refined");
        let prefix = format!("{ident}_scraped_");

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map_err(|e| TopicforgeError::io(&dir, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".json"))
            })
            .collect();
        // Timestamp suffixes sort lexicographically in chronological order.
        paths.sort();

        let mut records = Vec::new();
        for path in paths {
            match read_json::<Vec<RawRecord>>(&path) {
                Ok(mut batch) => records.append(&mut batch),
                Err(e) => {
                    warn!(?path, error = %e, "skipping malformed extraction batch");
                }
            }
        }
        Ok(records)
    }

    // -----------------------------------------------------------------------
    // Normalized batches (log)
    // -----------------------------------------------------------------------

    /// Append a normalized batch: a JSON record array plus the row-equivalent
    /// CSV, both under the same timestamp so the pair stays in lockstep.
    pub fn write_normalized_batch(
        &self,
        ident: &str,
        stamp: &str,
        records: &[CanonicalRecord],
        csv: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        // Extensions are appended, not swapped in, so a dotted ident can
        // never truncate the filename.
        let dir = self.root.join("data").join("processed");
        let json_path = dir.join(format!("{ident}_processed_{stamp}.json"));
        write_json(&json_path, &records)?;

        let csv_path = dir.join(format!("{ident}_processed_{stamp}.csv"));
        std::fs::write(&csv_path, csv).map_err(|e| TopicforgeError::io(&csv_path, e))?;

        debug!(?json_path, ?csv_path, count = records.len(), "normalized batch written");
        Ok((json_path, csv_path))
    }

    // -----------------------------------------------------------------------
    // Labeled corpus (slot)
    // -----------------------------------------------------------------------

    fn corpus_path(&self) -> PathBuf {
        self.root.join("data").join(CORPUS_FILE)
    }

    /// Read the labeled corpus, or `None` if it has never been written.
    pub fn read_corpus(&self) -> Result<Option<Vec<LabeledExample>>> {
        let path = self.corpus_path();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_json(&path)?))
    }

    /// Overwrite the labeled corpus.
    pub fn write_corpus(&self, examples: &[LabeledExample]) -> Result<()> {
        write_json(&self.corpus_path(), &examples)
    }

    // -----------------------------------------------------------------------
    // Model blobs (slots)
    // -----------------------------------------------------------------------

    /// Overwrite a named model blob under `model/`. Trainer and predictor
    /// must agree on the well-known names.
    pub fn write_model_blob<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.root.join("model").join(name);
        write_json(&path, value)
    }

    /// Read a named model blob, or `None` if no model has been trained yet.
    pub fn read_model_blob<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.root.join("model").join(name);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_json(&path)?))
    }

    // -----------------------------------------------------------------------
    // Predictions (slot)
    // -----------------------------------------------------------------------

    /// Overwrite the prediction output list, order-aligned with its input.
    pub fn write_predictions(&self, labels: &[String]) -> Result<PathBuf> {
        let path = self.root.join(PREDICTIONS_FILE);
        write_json(&path, &labels)?;
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| TopicforgeError::Storage(format!("{}: serialize: {e}", path.display())))?;
    std::fs::write(path, content).map_err(|e| TopicforgeError::io(path, e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| TopicforgeError::io(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| TopicforgeError::parse(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use topicforge_shared::Query;

    fn temp_store() -> Store {
        let dir = std::env::temp_dir().join(format!("tf-store-test-{}", uuid::Uuid::now_v7()));
        Store::open(dir).expect("open store")
    }

    fn record(url: &str) -> RawRecord {
        RawRecord {
            url: url.into(),
            title: "t".into(),
            description: "d".into(),
            content: "c".into(),
            images: vec![],
            links: vec![],
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn url_set_slot_overwrites() {
        let store = temp_store();
        let ident = Query::new("demo query").ident();

        store
            .write_url_set(&ident, &["https://a.example".into()])
            .unwrap();
        store
            .write_url_set(&ident, &["https://b.example".into()])
            .unwrap();

        let urls = store.read_url_set(&ident).unwrap().unwrap();
        assert_eq!(urls, vec!["https://b.example".to_string()]);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn missing_url_set_is_none() {
        let store = temp_store();
        assert!(store.read_url_set("never_resolved").unwrap().is_none());
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn extraction_batches_accumulate() {
        let store = temp_store();
        let ident = "demo";

        store
            .append_extraction_batch(ident, "20250101_000000", &[record("https://a.example")])
            .unwrap();
        store
            .append_extraction_batch(
                ident,
                "20250102_000000",
                &[record("https://b.example"), record("https://c.example")],
            )
            .unwrap();

        let all = store.read_extraction_records(ident).unwrap();
        assert_eq!(all.len(), 3);
        // Chronological order across batches.
        assert_eq!(all[0].url, "https://a.example");
        assert_eq!(all[2].url, "https://c.example");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn malformed_batch_is_skipped_not_fatal() {
        let store = temp_store();
        let ident = "demo";

        store
            .append_extraction_batch(ident, "20250101_000000", &[record("https://a.example")])
            .unwrap();
        let bad = store
            .root()
            .join("data")
            .join("refined")
            .join("demo_scraped_20250102_000000.json");
        std::fs::write(&bad, "{ not json").unwrap();

        let all = store.read_extraction_records(ident).unwrap();
        assert_eq!(all.len(), 1);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn extraction_history_is_per_ident() {
        let store = temp_store();
        store
            .append_extraction_batch("alpha", "20250101_000000", &[record("https://a.example")])
            .unwrap();
        store
            .append_extraction_batch("beta", "20250101_000000", &[record("https://b.example")])
            .unwrap();

        assert_eq!(store.read_extraction_records("alpha").unwrap().len(), 1);
        assert_eq!(store.read_extraction_records("beta").unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn corpus_slot_roundtrip() {
        let store = temp_store();
        assert!(store.read_corpus().unwrap().is_none());

        let examples = vec![LabeledExample {
            text: "best food in ahmedabad".into(),
            category: "Food".into(),
        }];
        store.write_corpus(&examples).unwrap();
        assert_eq!(store.read_corpus().unwrap().unwrap(), examples);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn normalized_batch_writes_json_and_csv_pair() {
        let store = temp_store();
        let records = vec![CanonicalRecord {
            url: "https://a.example".into(),
            title: "hi there".into(),
            description: "no description".into(),
            content: "hello world".into(),
            images: vec![],
            links: vec![],
        }];

        let (json_path, csv_path) = store
            .write_normalized_batch("demo", "20250101_000000", &records, "url,title\n")
            .unwrap();
        assert!(json_path.exists());
        assert!(csv_path.exists());
        assert_eq!(json_path.with_extension("csv"), csv_path);

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn snapshot_filenames_embed_ident_and_stamp() {
        let store = temp_store();
        let path = store
            .write_snapshot("demo", "20250101_000000", "<html></html>")
            .unwrap();
        assert!(path.to_string_lossy().ends_with("demo_20250101_000000.html"));
        let _ = std::fs::remove_dir_all(store.root());
    }
}
