//! Content extraction: document URL → structured [`RawRecord`].
//!
//! Pages are fetched one at a time with a fixed inter-request delay, never
//! with concurrent fan-out. A failing URL is logged
//! and omitted; the batch proceeds with whatever succeeded. Whitespace
//! collapsing and casing are deliberately deferred to the normalizer.

use chrono::Utc;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use topicforge_shared::{
    CrawlEntry, NO_DESCRIPTION, NO_TITLE, Query, RawRecord, Result, StageCounters,
    TopicforgeError,
};
use topicforge_store::{Store, stamp_now};

/// User-Agent string for extraction requests.
const USER_AGENT: &str = concat!("topicforge/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options & outcome
// ---------------------------------------------------------------------------

/// Configuration for page extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Fixed delay in ms between consecutive fetches within one run.
    pub delay_ms: u64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            delay_ms: 5_000,
        }
    }
}

/// Summary of one extraction batch run.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Per-URL counters for this run.
    pub counters: StageCounters,
    /// Number of records appended (0 means no batch file was written).
    pub records_written: usize,
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Fetches documents and extracts structured content records.
pub struct Extractor {
    opts: ExtractOptions,
    client: Client,
}

impl Extractor {
    /// Create an extractor with the given options.
    pub fn new(opts: ExtractOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| TopicforgeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { opts, client })
    }

    /// Extract every URL in a query's URL set into one new extraction batch.
    ///
    /// Appends a timestamped batch file plus a crawl metadata file when at
    /// least one URL succeeded. Per-URL failures never abort the batch.
    #[instrument(skip_all, fields(query = %query, urls = urls.len()))]
    pub async fn extract_batch(
        &self,
        query: &Query,
        urls: &[String],
        store: &Store,
    ) -> Result<BatchOutcome> {
        let mut counters = StageCounters::default();
        let mut records: Vec<RawRecord> = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            if i > 0 && self.opts.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.opts.delay_ms)).await;
            }

            match extract_page(&self.client, url).await {
                Ok(record) => {
                    counters.record_success();
                    records.push(record);
                }
                Err(e) => {
                    counters.record_failure();
                    warn!(%url, error = %e, "extraction failed, skipping URL");
                }
            }
        }

        let records_written = records.len();
        if !records.is_empty() {
            let stamp = stamp_now();
            let entries: Vec<CrawlEntry> = records.iter().map(Into::into).collect();
            store.append_extraction_batch(&query.ident(), &stamp, &records)?;
            store.write_crawl_metadata(&query.ident(), &stamp, &entries)?;
        }

        info!(%counters, "extraction batch complete");
        Ok(BatchOutcome {
            counters,
            records_written,
        })
    }
}

// ---------------------------------------------------------------------------
// Single-page extraction
// ---------------------------------------------------------------------------

/// Fetch one document and extract a [`RawRecord`].
///
/// Failure kinds: transport (non-2xx, timeout, connection) and parse (no
/// recoverable title or body). A page missing only its `<title>` or
/// description gets the sentinel values, never an empty string.
pub async fn extract_page(client: &Client, url: &str) -> Result<RawRecord> {
    debug!(%url, "fetching page");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| TopicforgeError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TopicforgeError::Network(format!("{url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| TopicforgeError::Network(format!("{url}: body read: {e}")))?;

    let doc = Html::parse_document(&body);

    let title_sel = Selector::parse("title").expect("valid selector");
    let title = doc
        .select(&title_sel)
        .next()
        .map(|el| el.text().collect::<String>());

    let desc_sel = Selector::parse(r#"meta[name="description"]"#).expect("valid selector");
    let description = doc
        .select(&desc_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string);

    // Paragraph text concatenated in document order, no joining separator.
    let p_sel = Selector::parse("p").expect("valid selector");
    let mut content = String::new();
    for p in doc.select(&p_sel) {
        content.extend(p.text());
    }

    if title.is_none() && content.trim().is_empty() {
        return Err(TopicforgeError::parse(format!(
            "{url}: no recoverable title or body"
        )));
    }

    let img_sel = Selector::parse("img[src]").expect("valid selector");
    let images: Vec<String> = doc
        .select(&img_sel)
        .filter_map(|el| el.value().attr("src"))
        .map(str::to_string)
        .collect();

    let link_sel = Selector::parse("a[href]").expect("valid selector");
    let links: Vec<String> = doc
        .select(&link_sel)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_string)
        .collect();

    Ok(RawRecord {
        url: url.to_string(),
        title: title.unwrap_or_else(|| NO_TITLE.to_string()),
        description: description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        content: content.trim().to_string(),
        images,
        links,
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> Store {
        let dir = std::env::temp_dir().join(format!(
            "tf-extractor-test-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        Store::open(dir).unwrap()
    }

    fn client() -> Client {
        Client::builder().build().unwrap()
    }

    async fn mount(server: &wiremock::MockServer, path: &str, body: &str) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(path))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn body_is_paragraph_concatenation() {
        let server = wiremock::MockServer::start().await;
        mount(
            &server,
            "/page",
            "<html><head><title>Hi</title></head><body><p>Hello </p><p>World</p></body></html>",
        )
        .await;

        let record = extract_page(&client(), &format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(record.title, "Hi");
        assert_eq!(record.content, "Hello World");
    }

    #[tokio::test]
    async fn missing_title_yields_sentinel() {
        let server = wiremock::MockServer::start().await;
        mount(
            &server,
            "/page",
            "<html><body><p>Some body text</p></body></html>",
        )
        .await;

        let record = extract_page(&client(), &format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(record.title, NO_TITLE);
        assert_eq!(record.description, NO_DESCRIPTION);
    }

    #[tokio::test]
    async fn description_meta_is_extracted() {
        let server = wiremock::MockServer::start().await;
        mount(
            &server,
            "/page",
            r#"<html><head><title>T</title><meta name="description" content="A fine page"></head><body></body></html>"#,
        )
        .await;

        let record = extract_page(&client(), &format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(record.description, "A fine page");
    }

    #[tokio::test]
    async fn empty_document_is_a_parse_failure() {
        let server = wiremock::MockServer::start().await;
        mount(&server, "/page", "<html><body><div>nav only</div></body></html>").await;

        let result = extract_page(&client(), &format!("{}/page", server.uri())).await;
        assert!(matches!(result, Err(TopicforgeError::Parse { .. })));
    }

    #[tokio::test]
    async fn non_2xx_is_a_transport_failure() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/gone"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = extract_page(&client(), &format!("{}/gone", server.uri())).await;
        assert!(matches!(result, Err(TopicforgeError::Network(_))));
    }

    #[tokio::test]
    async fn images_and_links_are_collected_unfiltered() {
        let server = wiremock::MockServer::start().await;
        mount(
            &server,
            "/page",
            r##"<html><head><title>T</title></head><body>
                <p>text</p>
                <img src="https://a.example/pic.png">
                <img src="/relative.png">
                <a href="https://a.example/next">next</a>
                <a href="#anchor">anchor</a>
            </body></html>"##,
        )
        .await;

        let record = extract_page(&client(), &format!("{}/page", server.uri()))
            .await
            .unwrap();
        // Raw lists: filtering to absolute URLs is the normalizer's job.
        assert_eq!(record.images.len(), 2);
        assert_eq!(record.links.len(), 2);
    }

    #[tokio::test]
    async fn batch_skips_failures_and_appends_survivors() {
        let server = wiremock::MockServer::start().await;
        mount(
            &server,
            "/ok",
            "<html><head><title>Ok</title></head><body><p>fine</p></body></html>",
        )
        .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/bad"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = temp_store();
        let extractor = Extractor::new(ExtractOptions {
            delay_ms: 0,
            ..ExtractOptions::default()
        })
        .unwrap();

        let query = Query::new("demo");
        let urls = vec![
            format!("{}/ok", server.uri()),
            format!("{}/bad", server.uri()),
        ];
        let outcome = extractor.extract_batch(&query, &urls, &store).await.unwrap();

        assert_eq!(outcome.counters.attempted, 2);
        assert_eq!(outcome.counters.succeeded, 1);
        assert_eq!(outcome.counters.failed, 1);
        assert_eq!(outcome.records_written, 1);

        let records = store.read_extraction_records("demo").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Ok");

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn all_failed_batch_writes_nothing() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = temp_store();
        let extractor = Extractor::new(ExtractOptions {
            delay_ms: 0,
            ..ExtractOptions::default()
        })
        .unwrap();

        let query = Query::new("demo");
        let urls = vec![format!("{}/a", server.uri())];
        let outcome = extractor.extract_batch(&query, &urls, &store).await.unwrap();

        assert_eq!(outcome.records_written, 0);
        assert!(store.read_extraction_records("demo").unwrap().is_empty());

        let _ = std::fs::remove_dir_all(store.root());
    }
}
