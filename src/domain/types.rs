use std::fmt;

use serde::{Serialize, Serializer};

use super::message::Message;

/// Binary spam label. Serializes to the wire strings `"SPAM"` / `"Not Spam"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Spam,
    NotSpam,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Spam => "SPAM",
            Label::NotSpam => "Not Spam",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Outcome of classifying one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    label: Label,
    class: u8,
}

impl Verdict {
    /// Maps a raw classifier output to a verdict; only `1` means spam.
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            Self {
                label: Label::Spam,
                class: 1,
            }
        } else {
            Self {
                label: Label::NotSpam,
                class: 0,
            }
        }
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn class(&self) -> u8 {
        self.class
    }

    pub fn is_spam(&self) -> bool {
        self.label == Label::Spam
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpamItem {
    pub sender: String,
    pub text: String,
    pub verdict: Verdict,
}

/// Aggregate of a completed scan. Only spam is retained, in scan order.
///
/// `spam_count` is derived from the retained items, so it can never drift
/// from `spam_items().len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    total_checked: usize,
    spam_items: Vec<SpamItem>,
}

impl ScanResult {
    pub fn record(&mut self, message: &Message, verdict: Verdict) {
        self.total_checked += 1;
        if verdict.is_spam() {
            self.spam_items.push(SpamItem {
                sender: message.sender_or_unknown().to_string(),
                text: message.text().to_string(),
                verdict,
            });
        }
    }

    pub fn total_checked(&self) -> usize {
        self.total_checked
    }

    pub fn spam_count(&self) -> usize {
        self.spam_items.len()
    }

    pub fn spam_items(&self) -> &[SpamItem] {
        &self.spam_items
    }
}

/// Result of scanning a mailbox. An empty mailbox is reported as
/// [`ScanOutcome::NoMessages`], never as a zero-valued [`ScanResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    NoMessages,
    Completed(ScanResult),
}

/// A rendered report ready for the notification sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}
