use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};

use crate::domain::Message;

use super::{credentials::CredentialManager, MailSource, MailSourceError};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GmailMessage {
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

impl GmailMessage {
    pub(crate) fn into_message(self) -> Message {
        let sender = self.payload.and_then(|payload| {
            payload
                .headers
                .into_iter()
                .find(|header| header.name.eq_ignore_ascii_case("From"))
                .map(|header| header.value)
        });
        Message::new(sender, &self.snippet)
    }
}

/// Reads the newest inbox messages through the Gmail REST API.
pub struct GmailMailSource {
    http: Client,
    credentials: Arc<CredentialManager>,
}

impl GmailMailSource {
    pub fn new(http: Client, credentials: Arc<CredentialManager>) -> Self {
        Self { http, credentials }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MailSourceError> {
        let response = self
            .http
            .get(format!("{GMAIL_API_BASE}/{path}"))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<Message>, MailSourceError> {
        let token = self.credentials.get_valid_credential().await?;
        let result = self.fetch_with_token(&token, limit).await;
        if let Err(MailSourceError::Authentication(_)) = &result {
            if let Err(err) = self.credentials.invalidate(&token).await {
                tracing::warn!(target: "gmail", error = %err, "failed to drop rejected token");
            }
        }
        result
    }

    async fn fetch_with_token(
        &self,
        token: &str,
        limit: usize,
    ) -> Result<Vec<Message>, MailSourceError> {
        let max_results = limit.to_string();
        let listing: ListResponse = self
            .get_json(token, "messages", &[("maxResults", max_results.as_str())])
            .await?;

        tracing::debug!(target: "gmail", listed = listing.messages.len(), "listed inbox messages");

        let mut messages = Vec::with_capacity(listing.messages.len());
        for reference in listing.messages.into_iter().take(limit) {
            let message: GmailMessage = self
                .get_json(
                    token,
                    &format!("messages/{}", reference.id),
                    &[("format", "metadata"), ("metadataHeaders", "From")],
                )
                .await?;
            messages.push(message.into_message());
        }
        Ok(messages)
    }
}

async fn check_status(response: Response) -> Result<Response, MailSourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(MailSourceError::Authentication(format!("{status}: {body}")));
    }
    Err(MailSourceError::Api {
        status: status.as_u16(),
        body,
    })
}

impl MailSource for GmailMailSource {
    fn fetch_recent(&self, limit: usize) -> BoxFuture<'_, Result<Vec<Message>, MailSourceError>> {
        Box::pin(self.fetch(limit))
    }
}
