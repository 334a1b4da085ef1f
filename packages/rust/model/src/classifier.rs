//! Multinomial naive Bayes over TF-IDF feature rows.
//!
//! Labels form an open string domain: the class set is derived from the
//! training data, never from a fixed schema. Scoring is done in log space
//! with Laplace smoothing; ties resolve to the lexicographically first
//! class, so prediction is deterministic.

use serde::{Deserialize, Serialize};

use topicforge_shared::{Result, TopicforgeError};

/// A fitted multinomial naive Bayes classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    /// Class labels in lexicographic order.
    classes: Vec<String>,
    /// Log prior per class.
    class_log_prior: Vec<f64>,
    /// Log feature likelihood per class (rows) and feature (columns).
    feature_log_prob: Vec<Vec<f64>>,
}

impl MultinomialNb {
    /// Fit the classifier on feature rows and their labels.
    ///
    /// `alpha` is the Laplace smoothing factor. Rows must all share the same
    /// width (the vectorizer's vocabulary length).
    pub fn fit(rows: &[Vec<f64>], labels: &[String], alpha: f64) -> Result<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(TopicforgeError::config(format!(
                "feature/label shape mismatch: {} rows, {} labels",
                rows.len(),
                labels.len()
            )));
        }

        let n_features = rows[0].len();

        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();

        let mut class_counts = vec![0usize; classes.len()];
        let mut feature_counts = vec![vec![0.0f64; n_features]; classes.len()];

        for (row, label) in rows.iter().zip(labels) {
            let class_index = classes
                .binary_search(label)
                .expect("label present in class set");
            class_counts[class_index] += 1;
            for (j, value) in row.iter().enumerate() {
                feature_counts[class_index][j] += value;
            }
        }

        let n = rows.len() as f64;
        let class_log_prior = class_counts
            .iter()
            .map(|&c| (c as f64 / n).ln())
            .collect();

        let feature_log_prob = feature_counts
            .iter()
            .map(|counts| {
                let total: f64 = counts.iter().sum();
                let denom = total + alpha * n_features as f64;
                counts.iter().map(|&c| ((c + alpha) / denom).ln()).collect()
            })
            .collect();

        Ok(Self {
            classes,
            class_log_prior,
            feature_log_prob,
        })
    }

    /// The class labels this model can predict.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Predict a label for each feature row.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<String> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }

    fn predict_one(&self, row: &[f64]) -> String {
        let mut best_index = 0;
        let mut best_score = f64::NEG_INFINITY;

        for (class_index, log_probs) in self.feature_log_prob.iter().enumerate() {
            let likelihood: f64 = row
                .iter()
                .zip(log_probs)
                .map(|(value, log_prob)| value * log_prob)
                .sum();
            let score = self.class_log_prior[class_index] + likelihood;

            if score > best_score {
                best_score = score;
                best_index = class_index;
            }
        }

        self.classes[best_index].clone()
    }
}
