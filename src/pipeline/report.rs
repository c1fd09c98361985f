//! Plain-text reports for the notification sender. Pure string building.

use crate::domain::{NotificationRequest, ScanResult, Verdict};

pub const SINGLE_SUBJECT: &str = "Spam Scanner - Message Prediction";
pub const SCAN_SUBJECT: &str = "Spam Scanner - Gmail Inbox Report";

pub fn format_single(recipient: &str, text: &str, verdict: &Verdict) -> NotificationRequest {
    let body = format!(
        "Hi,\n\n\
         You submitted the following message:\n\n\
         {text}\n\n\
         Prediction: {label}\n\n\
         Thank you for using Spam Scanner.\n",
        label = verdict.label(),
    );
    NotificationRequest {
        recipient: recipient.to_string(),
        subject: SINGLE_SUBJECT.to_string(),
        body,
    }
}

pub fn format_scan(recipient: &str, result: &ScanResult) -> NotificationRequest {
    let details = if result.spam_count() == 0 {
        "No spam found.".to_string()
    } else {
        result
            .spam_items()
            .iter()
            .map(|item| format!("From: {}\nMessage: {}", item.sender, item.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let body = format!(
        "Hi,\n\n\
         We scanned your latest {total} Gmail messages.\n\
         Spam detected: {spam} message(s).\n\n\
         Details:\n\
         {details}\n\n\
         Thank you for using Spam Scanner.\n",
        total = result.total_checked(),
        spam = result.spam_count(),
    );
    NotificationRequest {
        recipient: recipient.to_string(),
        subject: SCAN_SUBJECT.to_string(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Message;

    #[test]
    fn single_report_names_text_and_label() {
        let request = format_single("a@b.com", "WIN FREE MONEY NOW", &Verdict::from_class(1));
        assert_eq!(request.recipient, "a@b.com");
        assert_eq!(request.subject, SINGLE_SUBJECT);
        assert!(request.body.contains("\n\nWIN FREE MONEY NOW\n\n"));
        assert!(request.body.contains("Prediction: SPAM\n"));
    }

    #[test]
    fn scan_report_lists_spam_in_order() {
        let mut result = ScanResult::default();
        result.record(&Message::new(Some("x@spam.io".into()), "free cash"), Verdict::from_class(1));
        result.record(
            &Message::new(Some("friend@example.com".into()), "hello"),
            Verdict::from_class(0),
        );
        result.record(&Message::new(None, "claim prize"), Verdict::from_class(1));

        let request = format_scan("me@example.com", &result);
        assert_eq!(request.subject, SCAN_SUBJECT);
        assert!(request.body.contains("We scanned your latest 3 Gmail messages.\n"));
        assert!(request.body.contains("Spam detected: 2 message(s).\n"));
        assert!(request.body.contains(
            "Details:\nFrom: x@spam.io\nMessage: free cash\n\n\
             From: Unknown\nMessage: claim prize\n\n"
        ));
        assert!(!request.body.contains("friend@example.com"));
    }

    #[test]
    fn scan_report_without_spam_says_so() {
        let mut result = ScanResult::default();
        result.record(&Message::new(None, "hello"), Verdict::from_class(0));

        let request = format_scan("me@example.com", &result);
        assert!(request
            .body
            .contains("Spam detected: 0 message(s).\n\nDetails:\nNo spam found.\n"));
    }

    #[test]
    fn formatting_is_deterministic() {
        let verdict = Verdict::from_class(0);
        assert_eq!(
            format_single("a@b.com", "hi", &verdict),
            format_single("a@b.com", "hi", &verdict)
        );
    }
}
