pub mod message;
pub mod types;

pub use message::{normalize_text, Message};
pub use types::{Label, NotificationRequest, ScanOutcome, ScanResult, Verdict};
