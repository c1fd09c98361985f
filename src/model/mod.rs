//! Fitted spam model: a feature extractor paired with a binary classifier.
//!
//! Both halves are loaded once at startup and shared read-only behind an
//! `Arc`; nothing here mutates after construction.

pub mod classifier;
pub mod error;
pub mod vectorizer;

pub use classifier::Classifier;
pub use error::{ArtifactError, ClassificationError};
pub use vectorizer::{FeatureVector, TfidfVectorizer};

use crate::config::ModelConfig;

#[derive(Debug, Clone)]
pub struct SpamModel {
    extractor: TfidfVectorizer,
    classifier: Classifier,
}

impl SpamModel {
    /// Pairs an extractor with a classifier, rejecting mismatched widths.
    pub fn new(extractor: TfidfVectorizer, classifier: Classifier) -> Result<Self, ArtifactError> {
        classifier.validate()?;
        if extractor.dim() != classifier.dim() {
            return Err(ArtifactError::DimensionMismatch {
                extractor: extractor.dim(),
                classifier: classifier.dim(),
            });
        }
        Ok(Self {
            extractor,
            classifier,
        })
    }

    pub fn load(config: &ModelConfig) -> Result<Self, ArtifactError> {
        let extractor = TfidfVectorizer::load(&config.vectorizer_path)?;
        let classifier = Classifier::load(&config.model_path)?;
        let model = Self::new(extractor, classifier)?;
        tracing::info!(
            target: "model",
            features = model.extractor.dim(),
            vectorizer = %config.vectorizer_path.display(),
            classifier = %config.model_path.display(),
            "spam model loaded"
        );
        Ok(model)
    }

    pub fn extract(&self, text: &str) -> FeatureVector {
        self.extractor.extract(text)
    }

    pub fn classify(&self, vector: &FeatureVector) -> Result<u8, ClassificationError> {
        self.classifier.classify(vector)
    }
}


#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use super::*;

    #[test]
    fn mismatched_artifacts_are_rejected() {
        let extractor = TfidfVectorizer::from_artifact(vectorizer::VectorizerArtifact {
            vocabulary: [("free".to_string(), 0)].into_iter().collect(),
            lowercase: true,
            token_pattern: None,
            ngram_range: (1, 1),
            idf: None,
            sublinear_tf: false,
            norm: None,
        })
        .unwrap();
        let classifier = Classifier::Linear {
            coef: vec![1.0, 2.0],
            intercept: 0.0,
        };
        assert!(matches!(
            SpamModel::new(extractor, classifier),
            Err(ArtifactError::DimensionMismatch {
                extractor: 1,
                classifier: 2
            })
        ));
    }

    #[test]
    fn loads_artifacts_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let vectorizer_path = dir.path().join("vectorizer.json");
        let model_path = dir.path().join("spam_model.json");
        fs::write(
            &vectorizer_path,
            r#"{"vocabulary": {"free": 0, "lunch": 1}, "idf": [1.5, 1.2]}"#,
        )
        .unwrap();
        fs::write(
            &model_path,
            r#"{"kind": "linear", "coef": [2.0, -2.0], "intercept": -0.1}"#,
        )
        .unwrap();

        let model = SpamModel::load(&ModelConfig {
            model_path,
            vectorizer_path,
        })
        .unwrap();
        assert_eq!(model.classify(&model.extract("FREE stuff")).unwrap(), 1);
        assert_eq!(model.classify(&model.extract("lunch?")).unwrap(), 0);
    }

    #[test]
    fn missing_artifact_reports_its_path() {
        let err = SpamModel::load(&ModelConfig {
            model_path: PathBuf::from("/nonexistent/spam_model.json"),
            vectorizer_path: PathBuf::from("/nonexistent/vectorizer.json"),
        })
        .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/vectorizer.json"));
    }
}
