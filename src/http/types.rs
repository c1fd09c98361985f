use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{Label, ScanResult},
    model::ClassificationError,
    pipeline::ScanError,
};

pub const PREDICT_FIELDS_REQUIRED: &str = "Email and message text are required.";
pub const SCAN_EMAIL_REQUIRED: &str = "Email address is required.";
pub const NO_MESSAGES_FOUND: &str = "No messages found.";

/// Fields are optional so that a missing key reaches validation instead of
/// being rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanInboxRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub email: String,
    pub prediction: u8,
    pub label: Label,
}

#[derive(Debug, Serialize)]
pub struct SpamDetail {
    pub from: String,
    pub message: String,
    pub prediction: u8,
    pub label: Label,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub email: String,
    pub total_checked: usize,
    pub spam_detected: usize,
    pub details: Vec<SpamDetail>,
}

impl ScanResponse {
    pub fn new(email: String, result: &ScanResult) -> Self {
        Self {
            email,
            total_checked: result.total_checked(),
            spam_detected: result.spam_count(),
            details: result
                .spam_items()
                .iter()
                .map(|item| SpamDetail {
                    from: item.sender.clone(),
                    message: item.text.clone(),
                    prediction: item.verdict.class(),
                    label: item.verdict.label(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum HandlerError {
    Validation(&'static str),
    Classification(ClassificationError),
    Scan(ScanError),
}

impl From<ClassificationError> for HandlerError {
    fn from(err: ClassificationError) -> Self {
        HandlerError::Classification(err)
    }
}

impl From<ScanError> for HandlerError {
    fn from(err: ScanError) -> Self {
        HandlerError::Scan(err)
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HandlerError::Validation(message) => (StatusCode::BAD_REQUEST, message.to_string()),
            HandlerError::Classification(err) => {
                tracing::error!(target: "http", error = %err, "classification failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            HandlerError::Scan(err) => {
                tracing::error!(target: "http", error = %err, "inbox scan failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(ApiError::new(&message))).into_response()
    }
}
