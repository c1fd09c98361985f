use thiserror::Error;

use crate::{
    domain::{Message, ScanOutcome, ScanResult},
    mail::{MailSource, MailSourceError},
    model::ClassificationError,
};

use super::classify::ClassificationService;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    MailSource(#[from] MailSourceError),
    #[error(transparent)]
    Classification(#[from] ClassificationError),
}

/// Classifies an ordered batch and keeps the spam.
///
/// The first classification failure aborts the whole batch; no partial
/// result is ever returned.
#[derive(Debug, Clone)]
pub struct ScanAggregator {
    classifier: ClassificationService,
}

impl ScanAggregator {
    pub fn new(classifier: ClassificationService) -> Self {
        Self { classifier }
    }

    /// Classifies `messages` in order. Any classification error aborts the
    /// batch; with a model from `SpamModel::new` that can only be a width
    /// mismatch, which load-time validation already rules out.
    pub fn scan(&self, messages: &[Message]) -> Result<ScanOutcome, ClassificationError> {
        if messages.is_empty() {
            return Ok(ScanOutcome::NoMessages);
        }

        let mut result = ScanResult::default();
        for message in messages {
            let verdict = self.classifier.classify_message(message.text())?;
            result.record(message, verdict);
        }

        tracing::info!(
            target: "scan",
            total = result.total_checked(),
            spam = result.spam_count(),
            "batch classified"
        );
        Ok(ScanOutcome::Completed(result))
    }

    /// Fetches up to `limit` recent messages and scans them. A mail source
    /// failure aborts before anything is classified.
    pub async fn scan_inbox(
        &self,
        source: &dyn MailSource,
        limit: usize,
    ) -> Result<ScanOutcome, ScanError> {
        let messages = source.fetch_recent(limit).await?;
        tracing::debug!(target: "scan", fetched = messages.len(), "mail source returned batch");
        Ok(self.scan(&messages)?)
    }
}
