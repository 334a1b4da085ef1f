//! Text classification for TopicForge: TF-IDF features + multinomial naive
//! Bayes, with a persisted, pairing-checked model artifact.
//!
//! The algorithm itself is an interchangeable detail; the contract is
//! `fit`/`predict` semantics over an open string label domain, and a
//! vectorizer/classifier pair that always originates from one training run.

mod artifact;
mod classifier;
mod trainer;
mod vectorizer;

pub use artifact::{CLASSIFIER_FILE, ModelArtifact, VECTORIZER_FILE};
pub use classifier::MultinomialNb;
pub use trainer::{EvalReport, LabelMetrics, TrainOptions, ensure_corpus, train};
pub use vectorizer::TfidfVectorizer;
