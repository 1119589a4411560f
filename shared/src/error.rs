//! Error handling for the gateway.
//!
//! Every failure that crosses the HTTP boundary is serialized as
//! `{"statusCode": <u16>, "reason": <string>}`, matching what callers
//! of the API already parse. Reason strings are part of the wire
//! contract and keep their historical spellings.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication gate.
    #[error("missing authentication headers")]
    MissingHeaders,

    #[error("request timestamp outside the replay window")]
    ReplayDetected,

    #[error("empty application name in signature header")]
    ApplicationNotFound,

    #[error("no shared secret registered for application")]
    ApplicationKeyNotFound,

    #[error("request signature mismatch")]
    SignatureMismatch,

    // Identity resolution and authorization.
    #[error("provider key not found")]
    ProviderKeyNotFound,

    #[error("provider is not owned by the requesting application")]
    ProviderNotInApplication,

    #[error("route requires an explicit provider key")]
    UnknownProvider,

    #[error("default upstream credential is misconfigured")]
    BadDefaultConfiguration,

    // Invoice lifecycle.
    #[error("transaction already confirmed")]
    TransactionAlreadyConfirmed,

    #[error("transaction still waiting confirmation")]
    TransactionWaitingConfirmation,

    #[error("invoice not found")]
    InvoiceNotFound,

    #[error("invoice not confirmed")]
    InvoiceNotConfirmed,

    #[error("invalid completion action")]
    InvalidActionValue,

    #[error("pending is not a completion action")]
    AlreadyPendingState,

    #[error("declaration rejected upstream: {reason}")]
    DeclarationRejected { reason: String },

    #[error("completion target not found upstream or already processed")]
    NotFoundOrAlreadyProcessed,

    // Everything the handlers did not anticipate.
    #[error("unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingHeaders => StatusCode::PRECONDITION_REQUIRED,
            AppError::ReplayDetected => StatusCode::UNAUTHORIZED,
            AppError::ApplicationNotFound => StatusCode::PRECONDITION_FAILED,
            AppError::ApplicationKeyNotFound => StatusCode::PRECONDITION_FAILED,
            AppError::SignatureMismatch => StatusCode::EXPECTATION_FAILED,
            AppError::ProviderKeyNotFound => StatusCode::UNAUTHORIZED,
            AppError::ProviderNotInApplication => StatusCode::UNAUTHORIZED,
            AppError::UnknownProvider => StatusCode::PRECONDITION_REQUIRED,
            AppError::BadDefaultConfiguration => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::TransactionAlreadyConfirmed => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::TransactionWaitingConfirmation => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvoiceNotFound => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvoiceNotConfirmed => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidActionValue => StatusCode::BAD_REQUEST,
            AppError::AlreadyPendingState => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DeclarationRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFoundOrAlreadyProcessed => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unexpected(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Wire-level reason code. These are consumed by callers and must
    /// not be reworded, including the historical misspellings.
    pub fn reason(&self) -> String {
        match self {
            AppError::MissingHeaders => "MISSING_HEADERS".into(),
            AppError::ReplayDetected => "HACKER_DETECTED".into(),
            AppError::ApplicationNotFound => "APPLICATION_NOT_FOUND".into(),
            AppError::ApplicationKeyNotFound => "APPLICATION_KEY_NOT_FOUND".into(),
            AppError::SignatureMismatch => "SIGNATURE_EXPECTATION_FAILED".into(),
            AppError::ProviderKeyNotFound => "PROVIDER_KEY_NOT_FOUND".into(),
            AppError::ProviderNotInApplication => "PROVIDER_NOT_IN_APPLICATION".into(),
            AppError::UnknownProvider => "UNKNOW_PROVIDER".into(),
            AppError::BadDefaultConfiguration => {
                "Bad configuration found for emcf default value. Please contact the developer of the API !".into()
            }
            AppError::TransactionAlreadyConfirmed => "TRANSACTION_ALREADY_CONFIRMED".into(),
            AppError::TransactionWaitingConfirmation => "TRANSACTION_WAITING_CONFIRMATION".into(),
            AppError::InvoiceNotFound => "INVOICE_NOT_FOUND".into(),
            AppError::InvoiceNotConfirmed => "INVOICE_NOT_CONFIRMED".into(),
            AppError::InvalidActionValue => "INVALID_ACTION_VALUE".into(),
            AppError::AlreadyPendingState => "ALREADY_PENDING_STATE".into(),
            AppError::DeclarationRejected { reason } => reason.clone(),
            AppError::NotFoundOrAlreadyProcessed => "NOT_FOUND_OR_ALREADY_PROCESSED".into(),
            AppError::Unexpected(_) => "UNEXPECTED_ERROR_OCCURED".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let AppError::Unexpected(ref source) = self {
            tracing::error!(error = %source, "unexpected error reached the handler boundary");
        }

        let body = ErrorResponse {
            status_code: status.as_u16(),
            reason: self.reason(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_expected_status_codes() {
        assert_eq!(AppError::MissingHeaders.status_code(), StatusCode::PRECONDITION_REQUIRED);
        assert_eq!(AppError::ReplayDetected.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::ApplicationKeyNotFound.status_code(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(AppError::SignatureMismatch.status_code(), StatusCode::EXPECTATION_FAILED);
        assert_eq!(AppError::UnknownProvider.status_code(), StatusCode::PRECONDITION_REQUIRED);
    }

    #[test]
    fn unexpected_errors_never_leak_detail() {
        let err = AppError::Unexpected(anyhow::anyhow!("connection pool exhausted"));
        assert_eq!(err.reason(), "UNEXPECTED_ERROR_OCCURED");
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn error_response_uses_camel_case_keys() {
        let body = serde_json::to_value(ErrorResponse {
            status_code: 428,
            reason: "MISSING_HEADERS".into(),
        })
        .unwrap();
        assert_eq!(body["statusCode"], 428);
        assert_eq!(body["reason"], "MISSING_HEADERS");
    }
}
