use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
    domain::{normalize_text, ScanOutcome},
    infrastructure::notifier::notify_best_effort,
    pipeline::report,
};

use super::{
    types::{
        HandlerError, MessageResponse, PredictRequest, PredictResponse, ScanInboxRequest,
        ScanResponse, NO_MESSAGES_FOUND, PREDICT_FIELDS_REQUIRED, SCAN_EMAIL_REQUIRED,
    },
    AppState,
};

/// Lenient body parsing: anything that is not the expected JSON object reads
/// as an empty request and fails validation.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, HandlerError> {
    let request: PredictRequest = parse_body(&body);
    let email = request.email.as_deref().unwrap_or_default().trim();
    let text = normalize_text(request.text.as_deref().unwrap_or_default());
    if email.is_empty() || text.is_empty() {
        return Err(HandlerError::Validation(PREDICT_FIELDS_REQUIRED));
    }

    let verdict = state.classifier.classify_message(&text)?;
    tracing::info!(
        target: "http",
        label = %verdict.label(),
        chars = text.chars().count(),
        "message classified"
    );

    notify_best_effort(
        state.notifier.as_ref(),
        report::format_single(email, &text, &verdict),
    );

    Ok(Json(PredictResponse {
        email: email.to_string(),
        prediction: verdict.class(),
        label: verdict.label(),
    }))
}

pub async fn scan_inbox(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, HandlerError> {
    let request: ScanInboxRequest = parse_body(&body);
    let email = request.email.as_deref().unwrap_or_default().trim();
    if email.is_empty() {
        return Err(HandlerError::Validation(SCAN_EMAIL_REQUIRED));
    }

    let outcome = state
        .scanner
        .scan_inbox(state.mail_source.as_ref(), state.scan_limit)
        .await?;

    let result = match outcome {
        ScanOutcome::NoMessages => {
            tracing::info!(target: "http", "inbox scan found no messages");
            return Ok(Json(MessageResponse {
                message: NO_MESSAGES_FOUND,
            })
            .into_response());
        }
        ScanOutcome::Completed(result) => result,
    };

    notify_best_effort(state.notifier.as_ref(), report::format_scan(email, &result));

    Ok(Json(ScanResponse::new(email.to_string(), &result)).into_response())
}
