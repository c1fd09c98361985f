use std::{fs, path::Path};

use serde::Deserialize;

use super::{
    error::{ArtifactError, ClassificationError},
    vectorizer::FeatureVector,
};

/// Fitted binary classifier. Class `1` is spam.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    /// Linear decision function: spam iff `coef · x + intercept > 0`.
    Linear { coef: Vec<f64>, intercept: f64 },
    /// Multinomial naive Bayes over two classes; ties resolve to class 0.
    MultinomialNb {
        class_log_prior: [f64; 2],
        feature_log_prob: [Vec<f64>; 2],
    },
}

impl Classifier {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let classifier: Classifier =
            serde_json::from_str(&raw).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        classifier.validate()?;
        Ok(classifier)
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        match self {
            Classifier::Linear { coef, intercept } => {
                if coef.is_empty() {
                    return Err(ArtifactError::Classifier("linear model has no weights".into()));
                }
                if !intercept.is_finite() || coef.iter().any(|w| !w.is_finite()) {
                    return Err(ArtifactError::Classifier(
                        "linear model contains non-finite weights".into(),
                    ));
                }
            }
            Classifier::MultinomialNb {
                feature_log_prob, ..
            } => {
                let [ham, spam] = feature_log_prob;
                if ham.is_empty() || ham.len() != spam.len() {
                    return Err(ArtifactError::Classifier(format!(
                        "naive Bayes feature rows have lengths {} and {}",
                        ham.len(),
                        spam.len()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn dim(&self) -> usize {
        match self {
            Classifier::Linear { coef, .. } => coef.len(),
            Classifier::MultinomialNb {
                feature_log_prob, ..
            } => feature_log_prob[0].len(),
        }
    }

    pub fn classify(&self, vector: &FeatureVector) -> Result<u8, ClassificationError> {
        if vector.dim() != self.dim() {
            return Err(ClassificationError::DimensionMismatch {
                expected: self.dim(),
                actual: vector.dim(),
            });
        }

        let class = match self {
            Classifier::Linear { coef, intercept } => {
                let score = vector
                    .iter()
                    .fold(*intercept, |acc, (column, value)| acc + coef[column] * value);
                u8::from(score > 0.0)
            }
            Classifier::MultinomialNb {
                class_log_prior,
                feature_log_prob,
            } => {
                let joint = |class: usize| {
                    vector.iter().fold(class_log_prior[class], |acc, (column, value)| {
                        acc + feature_log_prob[class][column] * value
                    })
                };
                u8::from(joint(1) > joint(0))
            }
        };
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_model_thresholds_at_zero() {
        let model = Classifier::Linear {
            coef: vec![1.0, -1.0],
            intercept: -0.5,
        };
        let spammy = FeatureVector::new(2, vec![(0, 1.0)]);
        let hammy = FeatureVector::new(2, vec![(1, 1.0)]);
        let empty = FeatureVector::new(2, vec![]);
        assert_eq!(model.classify(&spammy).unwrap(), 1);
        assert_eq!(model.classify(&hammy).unwrap(), 0);
        assert_eq!(model.classify(&empty).unwrap(), 0);
    }

    #[test]
    fn naive_bayes_picks_higher_joint_likelihood() {
        let model = Classifier::MultinomialNb {
            class_log_prior: [(0.5f64).ln(), (0.5f64).ln()],
            feature_log_prob: [
                vec![(0.9f64).ln(), (0.1f64).ln()],
                vec![(0.1f64).ln(), (0.9f64).ln()],
            ],
        };
        assert_eq!(model.classify(&FeatureVector::new(2, vec![(1, 2.0)])).unwrap(), 1);
        assert_eq!(model.classify(&FeatureVector::new(2, vec![(0, 2.0)])).unwrap(), 0);
        // equal priors and no evidence tie to class 0
        assert_eq!(model.classify(&FeatureVector::new(2, vec![])).unwrap(), 0);
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let model = Classifier::Linear {
            coef: vec![1.0, 1.0, 1.0],
            intercept: 0.0,
        };
        let err = model
            .classify(&FeatureVector::new(2, vec![]))
            .unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn deserializes_tagged_artifact() {
        let raw = r#"{"kind": "linear", "coef": [0.5, -0.25], "intercept": 0.1}"#;
        let model: Classifier = serde_json::from_str(raw).unwrap();
        model.validate().unwrap();
        assert_eq!(model.dim(), 2);
    }

    #[test]
    fn rejects_ragged_naive_bayes_rows() {
        let model = Classifier::MultinomialNb {
            class_log_prior: [0.0, 0.0],
            feature_log_prob: [vec![0.0, 0.0], vec![0.0]],
        };
        assert!(model.validate().is_err());
    }
}
