//! TF-IDF feature vectorization.
//!
//! Tokens are word sequences of two or more characters on lower-cased text.
//! IDF is smoothed (`ln((1+n)/(1+df)) + 1`) and rows are L2-normalized, so
//! document length does not dominate the term weights.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use topicforge_shared::{Result, TopicforgeError};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

/// Split a document into feature tokens.
fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A fitted TF-IDF vectorizer: vocabulary plus per-term inverse document
/// frequencies. Transform output is only meaningful against the vocabulary
/// it was fitted with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Term → column index, ordered lexicographically.
    vocabulary: BTreeMap<String, usize>,
    /// Smoothed IDF per column.
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fit vocabulary and IDF weights on a document collection.
    pub fn fit(docs: &[String]) -> Result<Self> {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();

        for doc in docs {
            let mut seen = std::collections::HashSet::new();
            for token in tokenize(doc) {
                if seen.insert(token.clone()) {
                    *document_frequency.entry(token).or_insert(0) += 1;
                }
            }
        }

        if document_frequency.is_empty() {
            return Err(TopicforgeError::config(
                "empty vocabulary: no usable tokens in the corpus",
            ));
        }

        let n = docs.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());

        for (index, (term, df)) in document_frequency.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Ok(Self { vocabulary, idf })
    }

    /// Number of feature columns.
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Transform documents into L2-normalized TF-IDF rows. Tokens outside
    /// the fitted vocabulary are ignored.
    pub fn transform(&self, docs: &[String]) -> Vec<Vec<f64>> {
        docs.iter().map(|doc| self.transform_one(doc)).collect()
    }

    fn transform_one(&self, doc: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.vocabulary.len()];

        for token in tokenize(doc) {
            if let Some(&index) = self.vocabulary.get(&token) {
                row[index] += 1.0;
            }
        }

        for (index, value) in row.iter_mut().enumerate() {
            *value *= self.idf[index];
        }

        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut row {
                *value /= norm;
            }
        }

        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn tokenizer_drops_single_char_tokens() {
        assert_eq!(tokenize("a be sea"), vec!["be", "sea"]);
    }

    #[test]
    fn fit_builds_sorted_vocabulary() {
        let v = TfidfVectorizer::fit(&docs(&["zebra apple", "apple mango"])).unwrap();
        assert_eq!(v.vocabulary_len(), 3);
        let terms: Vec<_> = v.vocabulary.keys().cloned().collect();
        assert_eq!(terms, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn empty_corpus_is_a_config_error() {
        let result = TfidfVectorizer::fit(&docs(&["", "a b c d"]));
        // Single-char tokens only → no vocabulary.
        assert!(result.is_err());
    }

    #[test]
    fn rows_are_l2_normalized() {
        let v = TfidfVectorizer::fit(&docs(&["apple mango", "apple zebra"])).unwrap();
        let rows = v.transform(&docs(&["apple apple mango"]));
        let norm: f64 = rows[0].iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn rare_terms_outweigh_common_ones() {
        let v = TfidfVectorizer::fit(&docs(&[
            "apple mango",
            "apple zebra",
            "apple pear",
        ]))
        .unwrap();
        let rows = v.transform(&docs(&["apple zebra"]));
        let apple = v.vocabulary["apple"];
        let zebra = v.vocabulary["zebra"];
        assert!(rows[0][zebra] > rows[0][apple]);
    }

    #[test]
    fn unseen_tokens_are_ignored() {
        let v = TfidfVectorizer::fit(&docs(&["apple mango"])).unwrap();
        let rows = v.transform(&docs(&["durian durian"]));
        assert!(rows[0].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn serde_roundtrip_preserves_transform() {
        let v = TfidfVectorizer::fit(&docs(&["apple mango", "zebra apple"])).unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let restored: TfidfVectorizer = serde_json::from_str(&json).unwrap();

        let input = docs(&["apple zebra"]);
        assert_eq!(v.transform(&input), restored.transform(&input));
    }
}
