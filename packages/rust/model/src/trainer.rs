//! Classifier training with a seeded evaluation holdout.
//!
//! The vectorizer is fitted on the full feature set, then a fixed-seed
//! shuffle holds out a fraction of examples for evaluation; the classifier
//! sees only the remainder. The evaluation report is a diagnostics side
//! channel. It is logged, not persisted, and a poorly scoring model still
//! replaces the previous one.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use topicforge_shared::{LabeledExample, Result, TopicforgeError};
use topicforge_store::Store;

use crate::artifact::ModelArtifact;
use crate::classifier::MultinomialNb;
use crate::vectorizer::TfidfVectorizer;

// ---------------------------------------------------------------------------
// Options & report
// ---------------------------------------------------------------------------

/// Training configuration.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Fraction of examples held out for evaluation.
    pub holdout: f64,
    /// Seed for the holdout partition, fixed for reproducibility.
    pub seed: u64,
    /// Laplace smoothing factor.
    pub alpha: f64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            holdout: 0.2,
            seed: 42,
            alpha: 1.0,
        }
    }
}

/// Per-label evaluation metrics over the held-out set.
#[derive(Debug, Clone)]
pub struct LabelMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    /// Held-out examples carrying this label.
    pub support: usize,
}

/// Held-out evaluation report. Diagnostics only.
#[derive(Debug, Clone)]
pub struct EvalReport {
    pub accuracy: f64,
    pub labels: Vec<LabelMetrics>,
    /// Examples evaluated.
    pub holdout_size: usize,
}

impl std::fmt::Display for EvalReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "accuracy {:.2} over {} held-out examples",
            self.accuracy, self.holdout_size
        )?;
        for m in &self.labels {
            writeln!(
                f,
                "  {:<12} precision {:.2}  recall {:.2}  support {}",
                m.label, m.precision, m.recall, m.support
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Training
// ---------------------------------------------------------------------------

/// Train a classifier over the labeled corpus.
///
/// Fatal configuration errors: zero examples, or fewer than two distinct
/// category labels. There is no partial-success mode here.
#[instrument(skip_all, fields(examples = examples.len()))]
pub fn train(
    examples: &[LabeledExample],
    opts: &TrainOptions,
) -> Result<(ModelArtifact, EvalReport)> {
    if examples.is_empty() {
        return Err(TopicforgeError::config("training corpus is empty"));
    }

    let mut distinct: Vec<&str> = examples.iter().map(|e| e.category.as_str()).collect();
    distinct.sort();
    distinct.dedup();
    if distinct.len() < 2 {
        return Err(TopicforgeError::config(format!(
            "need at least two label classes, got {}",
            distinct.len()
        )));
    }

    let texts: Vec<String> = examples.iter().map(|e| e.text.clone()).collect();
    let labels: Vec<String> = examples.iter().map(|e| e.category.clone()).collect();

    // Fitted on the full feature set; the split below only partitions rows.
    let vectorizer = TfidfVectorizer::fit(&texts)?;
    let rows = vectorizer.transform(&texts);

    let (train_idx, test_idx) = split_indices(examples.len(), opts.holdout, opts.seed);

    let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| rows[i].clone()).collect();
    let train_labels: Vec<String> = train_idx.iter().map(|&i| labels[i].clone()).collect();

    let classifier = MultinomialNb::fit(&train_rows, &train_labels, opts.alpha)?;

    let test_rows: Vec<Vec<f64>> = test_idx.iter().map(|&i| rows[i].clone()).collect();
    let test_labels: Vec<String> = test_idx.iter().map(|&i| labels[i].clone()).collect();
    let report = evaluate(&classifier, &test_rows, &test_labels);

    info!(
        train = train_idx.len(),
        holdout = test_idx.len(),
        accuracy = report.accuracy,
        "classifier trained"
    );

    let artifact = ModelArtifact {
        train_id: Uuid::now_v7().to_string(),
        vectorizer,
        classifier,
    };

    Ok((artifact, report))
}

/// Seeded shuffle split: `(train_indices, holdout_indices)`.
///
/// The holdout always gets at least one example and never all of them.
fn split_indices(n: usize, holdout: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_len = ((n as f64 * holdout).round() as usize).clamp(1, n.saturating_sub(1).max(1));
    let test = indices[..test_len].to_vec();
    let train = indices[test_len..].to_vec();
    (train, test)
}

fn evaluate(classifier: &MultinomialNb, rows: &[Vec<f64>], truth: &[String]) -> EvalReport {
    let predictions = classifier.predict(rows);

    let correct = predictions
        .iter()
        .zip(truth)
        .filter(|(p, t)| p == t)
        .count();
    let accuracy = if truth.is_empty() {
        0.0
    } else {
        correct as f64 / truth.len() as f64
    };

    let mut label_set: Vec<String> = truth.iter().chain(predictions.iter()).cloned().collect();
    label_set.sort();
    label_set.dedup();

    let labels = label_set
        .into_iter()
        .map(|label| {
            let true_positive = predictions
                .iter()
                .zip(truth)
                .filter(|(p, t)| **p == label && **t == label)
                .count() as f64;
            let predicted = predictions.iter().filter(|p| **p == label).count() as f64;
            let support = truth.iter().filter(|t| **t == label).count();

            LabelMetrics {
                precision: if predicted > 0.0 {
                    true_positive / predicted
                } else {
                    0.0
                },
                recall: if support > 0 {
                    true_positive / support as f64
                } else {
                    0.0
                },
                support,
                label,
            }
        })
        .collect();

    EvalReport {
        accuracy,
        labels,
        holdout_size: truth.len(),
    }
}

// ---------------------------------------------------------------------------
// Corpus bootstrap
// ---------------------------------------------------------------------------

/// Load the labeled corpus, synthesizing and persisting a minimal starter
/// corpus when none exists, so the pipeline is runnable from a clean state.
pub fn ensure_corpus(store: &Store) -> Result<Vec<LabeledExample>> {
    if let Some(examples) = store.read_corpus()? {
        return Ok(examples);
    }

    warn!("no labeled corpus found, writing starter corpus");
    let starter = starter_corpus();
    store.write_corpus(&starter)?;
    Ok(starter)
}

fn starter_corpus() -> Vec<LabeledExample> {
    [
        ("Best food in Ahmedabad", "Food"),
        ("Top tourist places in India", "Travel"),
        ("Best restaurants in New York", "Food"),
        ("Famous landmarks in Paris", "Travel"),
        ("Must-try street foods in Ahmedabad", "Food"),
        ("Explore the Eiffel Tower in Paris", "Travel"),
    ]
    .iter()
    .map(|(text, category)| LabeledExample {
        text: text.to_string(),
        category: category.to_string(),
    })
    .collect()
}
