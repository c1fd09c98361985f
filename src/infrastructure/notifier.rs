use std::sync::Arc;

use futures::future::BoxFuture;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::{Credentials, Mechanism},
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use thiserror::Error;

use crate::{
    config::{SenderCredentials, SmtpConfig},
    domain::NotificationRequest,
};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notifications are disabled (SENDER_EMAIL/SENDER_PASS not set)")]
    Disabled,
    #[error("invalid address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("failed to build notification email: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Delivers a rendered report.
///
/// `send` consumes the request and returns an owned future so delivery can
/// run detached from the caller.
pub type NotificationFuture = BoxFuture<'static, Result<(), NotificationError>>;

pub trait Notifier: Send + Sync {
    fn send(&self, request: NotificationRequest) -> NotificationFuture;
}

/// Sends over an authenticated STARTTLS relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, sender: &SenderCredentials) -> Result<Self, NotificationError> {
        let from = parse_mailbox(&sender.email)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                sender.email.clone(),
                sender.password.clone(),
            ))
            .authentication(vec![Mechanism::Plain, Mechanism::Login])
            .build();
        Ok(Self { transport, from })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse::<Mailbox>()
        .map_err(|source| NotificationError::Address {
            address: address.to_string(),
            source,
        })
}

impl Notifier for SmtpNotifier {
    fn send(&self, request: NotificationRequest) -> NotificationFuture {
        let transport = self.transport.clone();
        let from = self.from.clone();
        Box::pin(async move {
            let message = lettre::Message::builder()
                .from(from)
                .to(parse_mailbox(&request.recipient)?)
                .subject(request.subject)
                .header(ContentType::TEXT_PLAIN)
                .body(request.body)?;
            transport.send(message).await?;
            Ok(())
        })
    }
}

/// Stand-in used when no sender credentials are configured.
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn send(&self, _request: NotificationRequest) -> NotificationFuture {
        Box::pin(async { Err(NotificationError::Disabled) })
    }
}

pub fn build_notifier(config: &SmtpConfig) -> Result<Arc<dyn Notifier>, NotificationError> {
    match &config.sender {
        Some(sender) => {
            tracing::info!(
                target: "notify",
                host = %config.host,
                port = config.port,
                sender = %sender.email,
                "SMTP notifications enabled"
            );
            Ok(Arc::new(SmtpNotifier::new(config, sender)?))
        }
        None => {
            tracing::warn!(
                target: "notify",
                "SENDER_EMAIL/SENDER_PASS not set; notifications disabled"
            );
            Ok(Arc::new(DisabledNotifier))
        }
    }
}

/// Fire-and-forget delivery. Failures are logged and dropped; they never
/// reach the caller.
pub fn notify_best_effort(notifier: &dyn Notifier, request: NotificationRequest) {
    let recipient = request.recipient.clone();
    let delivery = notifier.send(request);
    tokio::spawn(async move {
        match delivery.await {
            Ok(()) => tracing::info!(target: "notify", %recipient, "notification sent"),
            Err(NotificationError::Disabled) => {
                tracing::debug!(target: "notify", %recipient, "notification skipped")
            }
            Err(err) => tracing::warn!(
                target: "notify",
                %recipient,
                error = %err,
                "notification failed"
            ),
        }
    });
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Mutex;

    use super::*;

    /// Records every request handed to it; optionally fails delivery.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<NotificationRequest>>,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::default(),
                fail: true,
            }
        }

        pub fn requests(&self) -> Vec<NotificationRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, request: NotificationRequest) -> NotificationFuture {
            self.sent.lock().unwrap().push(request);
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    // same error a real send reports for an unusable recipient
                    parse_mailbox("not an address").map(drop)
                } else {
                    Ok(())
                }
            })
        }
    }
}
