//! Pure extraction of result URLs from a provider discovery payload.

use scraper::{Html, Selector};

/// Extract candidate document URLs from a search result page.
///
/// Result anchors carry hrefs of the form `/url?q=<target>&<tracking>`; the
/// target is everything between `/url?q=` and the next `&`. URLs containing
/// a blocked provider domain are dropped (self-referential navigation), and
/// duplicates are removed while preserving first-seen order (stable dedup,
/// never a sort).
pub fn extract_result_urls(html: &str, blocked_domains: &[String]) -> Vec<String> {
    let doc = Html::parse_document(html);
    let anchor_sel = Selector::parse(r#"a[href^="/url?q="]"#).expect("valid selector");

    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();

    for el in doc.select(&anchor_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(target) = href.strip_prefix("/url?q=") else {
            continue;
        };
        let url = target.split('&').next().unwrap_or(target);

        if url.is_empty() || blocked_domains.iter().any(|d| url.contains(d.as_str())) {
            continue;
        }
        if seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked() -> Vec<String> {
        vec!["google.com".into(), "youtube.com".into()]
    }

    fn page(hrefs: &[&str]) -> String {
        let anchors: String = hrefs
            .iter()
            .map(|h| format!(r#"<a href="{h}">result</a>"#))
            .collect();
        format!("<html><body>{anchors}</body></html>")
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let html = page(&[
            "/url?q=https://b.example&sa=x",
            "/url?q=https://a.example&sa=x",
            "/url?q=https://b.example&other",
        ]);
        let urls = extract_result_urls(&html, &blocked());
        assert_eq!(urls, vec!["https://b.example", "https://a.example"]);
    }

    #[test]
    fn provider_domains_are_excluded() {
        let html = page(&[
            "/url?q=https://a.example&sa=..",
            "/url?q=https://a.example&other",
            "/url?q=https://www.google.com/x",
        ]);
        let urls = extract_result_urls(&html, &blocked());
        assert_eq!(urls, vec!["https://a.example"]);
    }

    #[test]
    fn non_result_anchors_are_ignored() {
        let html = page(&["/settings", "https://direct.example", "/url?q="]);
        let urls = extract_result_urls(&html, &blocked());
        assert!(urls.is_empty());
    }

    #[test]
    fn tracking_suffix_is_stripped() {
        let html = page(&["/url?q=https://a.example/page&ved=abc&usg=def"]);
        let urls = extract_result_urls(&html, &blocked());
        assert_eq!(urls, vec!["https://a.example/page"]);
    }
}
