use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::Path,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::error::ArtifactError;

const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

static DEFAULT_TOKEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_TOKEN_PATTERN).expect("valid default token regex"));

/// Sparse, fixed-width feature vector. Columns are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    dim: usize,
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    pub fn new(dim: usize, entries: Vec<(usize, f64)>) -> Self {
        Self { dim, entries }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
    None,
}

/// On-disk form of a fitted vectorizer.
#[derive(Debug, Deserialize)]
pub struct VectorizerArtifact {
    pub vocabulary: HashMap<String, usize>,
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default)]
    pub token_pattern: Option<String>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub idf: Option<Vec<f64>>,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub norm: Option<Norm>,
}

fn default_lowercase() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// Bag-of-words / TF-IDF feature extractor with read-only fitted state.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    lowercase: bool,
    token_regex: Regex,
    ngram_range: (usize, usize),
    idf: Option<Vec<f64>>,
    sublinear_tf: bool,
    norm: Norm,
}

impl TfidfVectorizer {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: VectorizerArtifact =
            serde_json::from_str(&raw).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: VectorizerArtifact) -> Result<Self, ArtifactError> {
        let dim = artifact.vocabulary.len();
        if dim == 0 {
            return Err(ArtifactError::Vocabulary("vocabulary is empty".into()));
        }

        let mut seen = vec![false; dim];
        for (term, &column) in &artifact.vocabulary {
            if column >= dim || seen[column] {
                return Err(ArtifactError::Vocabulary(format!(
                    "term {term:?} maps to column {column}, expected a unique column below {dim}"
                )));
            }
            seen[column] = true;
        }

        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ArtifactError::Vocabulary(format!(
                "ngram_range ({min_n}, {max_n}) is not a valid range"
            )));
        }

        if let Some(idf) = &artifact.idf {
            if idf.len() != dim {
                return Err(ArtifactError::Vocabulary(format!(
                    "idf has {} weights for {dim} terms",
                    idf.len()
                )));
            }
        }

        let token_regex = match artifact.token_pattern.as_deref() {
            Some(pattern) if pattern != DEFAULT_TOKEN_PATTERN => Regex::new(pattern)?,
            _ => DEFAULT_TOKEN_REGEX.clone(),
        };
        let groups = token_regex.captures_len() - 1;
        if groups > 1 {
            return Err(ArtifactError::TokenGroups(groups));
        }

        let norm = artifact.norm.unwrap_or(if artifact.idf.is_some() {
            Norm::L2
        } else {
            Norm::None
        });

        Ok(Self {
            vocabulary: artifact.vocabulary,
            lowercase: artifact.lowercase,
            token_regex,
            ngram_range: artifact.ngram_range,
            idf: artifact.idf,
            sublinear_tf: artifact.sublinear_tf,
            norm,
        })
    }

    pub fn dim(&self) -> usize {
        self.vocabulary.len()
    }

    /// Maps text to its feature vector. Empty or token-free text yields a
    /// vector with no non-zero entries.
    pub fn extract(&self, text: &str) -> FeatureVector {
        let document = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let tokens = self.tokenize(&document);

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        let (min_n, max_n) = self.ngram_range;
        for n in min_n..=max_n {
            if n == 1 {
                for token in &tokens {
                    if let Some(&column) = self.vocabulary.get(*token) {
                        *counts.entry(column).or_insert(0.0) += 1.0;
                    }
                }
                continue;
            }
            for window in tokens.windows(n) {
                if let Some(&column) = self.vocabulary.get(&window.join(" ")) {
                    *counts.entry(column).or_insert(0.0) += 1.0;
                }
            }
        }

        let mut entries: Vec<(usize, f64)> = counts.into_iter().collect();
        for (column, value) in entries.iter_mut() {
            if self.sublinear_tf {
                *value = 1.0 + value.ln();
            }
            if let Some(idf) = &self.idf {
                *value *= idf[*column];
            }
        }
        self.normalize(&mut entries);

        FeatureVector::new(self.dim(), entries)
    }

    /// A pattern with one capture group yields that group as the token,
    /// otherwise the whole match.
    fn tokenize<'t>(&self, document: &'t str) -> Vec<&'t str> {
        if self.token_regex.captures_len() == 2 {
            self.token_regex
                .captures_iter(document)
                .filter_map(|captures| captures.get(1))
                .map(|m| m.as_str())
                .collect()
        } else {
            self.token_regex
                .find_iter(document)
                .map(|m| m.as_str())
                .collect()
        }
    }

    fn normalize(&self, entries: &mut [(usize, f64)]) {
        let length = match self.norm {
            Norm::None => return,
            Norm::L1 => entries.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            Norm::L2 => entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
        };
        if length > 0.0 {
            for (_, value) in entries.iter_mut() {
                *value /= length;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(terms: &[&str]) -> VectorizerArtifact {
        VectorizerArtifact {
            vocabulary: terms
                .iter()
                .enumerate()
                .map(|(i, t)| (t.to_string(), i))
                .collect(),
            lowercase: true,
            token_pattern: None,
            ngram_range: (1, 1),
            idf: None,
            sublinear_tf: false,
            norm: None,
        }
    }

    #[test]
    fn counts_known_tokens_case_insensitively() {
        let vectorizer = TfidfVectorizer::from_artifact(artifact(&["free", "money"])).unwrap();
        let vector = vectorizer.extract("FREE free Money and a cat");
        assert_eq!(vector.dim(), 2);
        assert_eq!(vector.iter().collect::<Vec<_>>(), vec![(0, 2.0), (1, 1.0)]);
    }

    #[test]
    fn empty_text_yields_zero_vector() {
        let vectorizer = TfidfVectorizer::from_artifact(artifact(&["free"])).unwrap();
        let vector = vectorizer.extract("");
        assert_eq!(vector.dim(), 1);
        assert_eq!(vector.nnz(), 0);
    }

    #[test]
    fn single_character_words_are_not_tokens() {
        let vectorizer = TfidfVectorizer::from_artifact(artifact(&["a", "ok"])).unwrap();
        let vector = vectorizer.extract("a ok");
        assert_eq!(vector.iter().collect::<Vec<_>>(), vec![(1, 1.0)]);
    }

    #[test]
    fn bigrams_are_matched_when_configured() {
        let mut art = artifact(&["free", "free money"]);
        art.ngram_range = (1, 2);
        let vectorizer = TfidfVectorizer::from_artifact(art).unwrap();
        let vector = vectorizer.extract("free money");
        assert_eq!(vector.iter().collect::<Vec<_>>(), vec![(0, 1.0), (1, 1.0)]);
    }

    #[test]
    fn idf_weights_are_l2_normalized_by_default() {
        let mut art = artifact(&["free", "money"]);
        art.idf = Some(vec![3.0, 4.0]);
        let vectorizer = TfidfVectorizer::from_artifact(art).unwrap();
        let values: Vec<f64> = vectorizer.extract("free money").iter().map(|(_, v)| v).collect();
        assert!((values[0] - 0.6).abs() < 1e-12);
        assert!((values[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn rejects_idf_of_wrong_length() {
        let mut art = artifact(&["free", "money"]);
        art.idf = Some(vec![1.0]);
        assert!(matches!(
            TfidfVectorizer::from_artifact(art),
            Err(ArtifactError::Vocabulary(_))
        ));
    }

    #[test]
    fn capture_group_in_token_pattern_selects_the_token() {
        let mut art = artifact(&["spam", "deal"]);
        art.token_pattern = Some(r"#(\w+)".into());
        let vectorizer = TfidfVectorizer::from_artifact(art).unwrap();
        let vector = vectorizer.extract("#spam and #deal, plus plain spam");
        assert_eq!(vector.iter().collect::<Vec<_>>(), vec![(0, 1.0), (1, 1.0)]);
    }

    #[test]
    fn rejects_token_pattern_with_several_groups() {
        let mut art = artifact(&["spam"]);
        art.token_pattern = Some(r"(\w)(\w+)".into());
        assert!(matches!(
            TfidfVectorizer::from_artifact(art),
            Err(ArtifactError::TokenGroups(2))
        ));
    }

    #[test]
    fn rejects_duplicate_columns() {
        let mut art = artifact(&["free", "money"]);
        art.vocabulary.insert("money".into(), 0);
        assert!(TfidfVectorizer::from_artifact(art).is_err());
    }
}
