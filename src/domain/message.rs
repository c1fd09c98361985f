/// Upper bound on the characters of a message that reach the classifier.
pub const MAX_TEXT_CHARS: usize = 1000;

/// Sender shown for inbox messages without a `From` header.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// A single piece of text to classify, optionally attributed to a sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender: Option<String>,
    text: String,
}

impl Message {
    /// Builds a message from raw text, applying [`normalize_text`].
    pub fn new(sender: Option<String>, raw_text: &str) -> Self {
        Self {
            sender,
            text: normalize_text(raw_text),
        }
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn sender_or_unknown(&self) -> &str {
        self.sender().unwrap_or(UNKNOWN_SENDER)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Trims surrounding whitespace, then keeps at most [`MAX_TEXT_CHARS`] characters.
///
/// Truncation counts Unicode scalar values, never bytes, so multi-byte text is
/// never split inside a character.
pub fn normalize_text(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(MAX_TEXT_CHARS) {
        Some((cut, _)) => trimmed[..cut].to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_before_truncating() {
        let raw = format!("   {}   ", "a".repeat(MAX_TEXT_CHARS + 50));
        let text = normalize_text(&raw);
        assert_eq!(text.chars().count(), MAX_TEXT_CHARS);
        assert!(text.chars().all(|ch| ch == 'a'));
    }

    #[test]
    fn normalize_counts_characters_not_bytes() {
        let raw = "스팸".repeat(MAX_TEXT_CHARS);
        let text = normalize_text(&raw);
        assert_eq!(text.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn short_text_is_only_trimmed() {
        assert_eq!(normalize_text("  hello there \n"), "hello there");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn missing_sender_falls_back_to_unknown() {
        let message = Message::new(None, "hi");
        assert_eq!(message.sender(), None);
        assert_eq!(message.sender_or_unknown(), UNKNOWN_SENDER);

        let message = Message::new(Some("a@b.com".into()), "hi");
        assert_eq!(message.sender(), Some("a@b.com"));
        assert_eq!(message.sender_or_unknown(), "a@b.com");
    }
}
