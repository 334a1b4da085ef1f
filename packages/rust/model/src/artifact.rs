//! Persisted model artifact: the vectorizer/classifier pair.
//!
//! Both blobs are written under fixed well-known names and carry the same
//! `train_id`, minted at train time. Loading refuses a mismatched pair: a
//! vectorizer fitted on one vocabulary must never feed a classifier trained
//! on another.

use serde::{Deserialize, Serialize};
use tracing::info;

use topicforge_shared::{Result, TopicforgeError};
use topicforge_store::Store;

use crate::classifier::MultinomialNb;
use crate::vectorizer::TfidfVectorizer;

/// Well-known blob name for the persisted vectorizer.
pub const VECTORIZER_FILE: &str = "vectorizer.json";

/// Well-known blob name for the persisted classifier.
pub const CLASSIFIER_FILE: &str = "classifier.json";

#[derive(Debug, Serialize, Deserialize)]
struct PersistedVectorizer {
    train_id: String,
    vectorizer: TfidfVectorizer,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedClassifier {
    train_id: String,
    classifier: MultinomialNb,
}

/// A matched vectorizer/classifier pair from a single training run.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    /// Identifier of the training run that produced both halves.
    pub train_id: String,
    pub vectorizer: TfidfVectorizer,
    pub classifier: MultinomialNb,
}

impl ModelArtifact {
    /// Predict a category for each input text. Pure: no side effects.
    /// Output order is aligned with the input order.
    pub fn predict(&self, texts: &[String]) -> Vec<String> {
        let rows = self.vectorizer.transform(texts);
        self.classifier.predict(&rows)
    }

    /// Predict and persist the label list to the predictions slot.
    pub fn predict_and_save(&self, texts: &[String], store: &Store) -> Result<Vec<String>> {
        let labels = self.predict(texts);
        let path = store.write_predictions(&labels)?;
        info!(?path, count = labels.len(), "predictions saved");
        Ok(labels)
    }

    /// Overwrite both persisted blobs. Latest training run wins.
    pub fn save(&self, store: &Store) -> Result<()> {
        store.write_model_blob(
            VECTORIZER_FILE,
            &PersistedVectorizer {
                train_id: self.train_id.clone(),
                vectorizer: self.vectorizer.clone(),
            },
        )?;
        store.write_model_blob(
            CLASSIFIER_FILE,
            &PersistedClassifier {
                train_id: self.train_id.clone(),
                classifier: self.classifier.clone(),
            },
        )?;
        info!(train_id = %self.train_id, "model artifact saved");
        Ok(())
    }

    /// Load the persisted pair. `None` when no model has been trained yet;
    /// a validation error when the halves come from different training runs.
    pub fn load(store: &Store) -> Result<Option<Self>> {
        let vectorizer: Option<PersistedVectorizer> = store.read_model_blob(VECTORIZER_FILE)?;
        let classifier: Option<PersistedClassifier> = store.read_model_blob(CLASSIFIER_FILE)?;

        match (vectorizer, classifier) {
            (None, None) => Ok(None),
            (Some(v), Some(c)) => {
                if v.train_id != c.train_id {
                    return Err(TopicforgeError::validation(format!(
                        "vectorizer/classifier train_id mismatch: {} vs {}",
                        v.train_id, c.train_id
                    )));
                }
                Ok(Some(Self {
                    train_id: v.train_id,
                    vectorizer: v.vectorizer,
                    classifier: c.classifier,
                }))
            }
            _ => Err(TopicforgeError::validation(
                "incomplete model artifact: one of vectorizer/classifier is missing",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::{TrainOptions, train};
    use topicforge_shared::LabeledExample;

    fn temp_store() -> Store {
        let dir = std::env::temp_dir().join(format!("tf-artifact-test-{}", uuid::Uuid::now_v7()));
        Store::open(dir).unwrap()
    }

    fn corpus() -> Vec<LabeledExample> {
        [
            ("best food in ahmedabad", "Food"),
            ("top tourist places in india", "Travel"),
            ("best restaurants in new york", "Food"),
            ("famous landmarks in paris", "Travel"),
            ("must-try street foods in ahmedabad", "Food"),
            ("explore the eiffel tower in paris", "Travel"),
        ]
        .iter()
        .map(|(text, category)| LabeledExample {
            text: text.to_string(),
            category: category.to_string(),
        })
        .collect()
    }

    #[test]
    fn save_load_roundtrip() {
        let store = temp_store();
        let (artifact, _) = train(&corpus(), &TrainOptions::default()).unwrap();
        artifact.save(&store).unwrap();

        let loaded = ModelArtifact::load(&store).unwrap().unwrap();
        assert_eq!(loaded.train_id, artifact.train_id);

        let texts = vec!["great restaurant".to_string()];
        assert_eq!(loaded.predict(&texts), artifact.predict(&texts));

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn missing_model_is_none() {
        let store = temp_store();
        assert!(ModelArtifact::load(&store).unwrap().is_none());
        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn mismatched_pair_is_rejected() {
        let store = temp_store();

        let (first, _) = train(&corpus(), &TrainOptions::default()).unwrap();
        first.save(&store).unwrap();

        // A later run overwrites only the classifier blob.
        let (second, _) = train(&corpus(), &TrainOptions::default()).unwrap();
        store
            .write_model_blob(
                CLASSIFIER_FILE,
                &PersistedClassifier {
                    train_id: second.train_id.clone(),
                    classifier: second.classifier.clone(),
                },
            )
            .unwrap();

        let result = ModelArtifact::load(&store);
        assert!(matches!(
            result,
            Err(TopicforgeError::Validation { .. })
        ));

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[test]
    fn predict_returns_one_label_per_text() {
        let (artifact, _) = train(&corpus(), &TrainOptions::default()).unwrap();
        let labels = artifact.predict(&vec!["great restaurant".to_string()]);
        assert_eq!(labels.len(), 1);
        assert!(labels[0] == "Food" || labels[0] == "Travel");
    }

    #[test]
    fn predict_and_save_writes_aligned_output() {
        let store = temp_store();
        let (artifact, _) = train(&corpus(), &TrainOptions::default()).unwrap();

        let texts = vec![
            "best restaurants to visit in ahmedabad".to_string(),
            "top tourist destinations in paris".to_string(),
        ];
        let labels = artifact.predict_and_save(&texts, &store).unwrap();
        assert_eq!(labels.len(), 2);

        let written: Vec<String> = serde_json::from_str(
            &std::fs::read_to_string(store.root().join("predictions.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written, labels);

        let _ = std::fs::remove_dir_all(store.root());
    }
}
