pub mod authorize;
pub mod credentials;
pub mod gmail;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::Message;

pub use credentials::{CredentialError, CredentialManager};
pub use gmail::GmailMailSource;

/// Supplies the most recent inbox messages, newest first.
pub trait MailSource: Send + Sync {
    fn fetch_recent(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Message>, MailSourceError>>;
}

#[derive(Debug, Error)]
pub enum MailSourceError {
    #[error("mailbox authentication failed: {0}")]
    Authentication(String),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("mailbox request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mailbox API returned {status}: {body}")]
    Api { status: u16, body: String },
}
