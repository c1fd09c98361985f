use std::sync::Arc;

use crate::{
    domain::Verdict,
    model::{ClassificationError, SpamModel},
};

/// Runs one message through the shared model.
#[derive(Debug, Clone)]
pub struct ClassificationService {
    model: Arc<SpamModel>,
}

impl ClassificationService {
    pub fn new(model: Arc<SpamModel>) -> Self {
        Self { model }
    }

    /// Classifies text that the caller has already trimmed and capped.
    /// Empty text is classified like any other.
    pub fn classify_message(&self, text: &str) -> Result<Verdict, ClassificationError> {
        let vector = self.model.extract(text);
        let class = self.model.classify(&vector)?;
        tracing::trace!(target: "model", features = vector.nnz(), class, "message classified");
        Ok(Verdict::from_class(class))
    }
}
