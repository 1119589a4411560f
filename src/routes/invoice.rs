//! Invoice route handlers.
//!
//! All routes here sit behind the signature gate and the provider gate;
//! handlers read the resolved identity from request extensions and map
//! coordinator results 1:1 to HTTP responses.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use shared::AppError;

use crate::models::{
    Invoice, InvoiceCompletion, InvoicePayload, InvoiceStatus, RequestIdentity, TransactionQuery,
};
use crate::services::ApiOutcome;
use crate::state::AppState;

/// `GET /v1/invoice/api/status` — upstream API status for the resolved
/// provider token.
pub async fn api_status(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Result<ApiOutcome, AppError> {
    Ok(state.emcf.api_status(&identity.provider.token).await)
}

/// `GET /v1/invoice/remote/info/:invoice_id` — amounts computed
/// upstream for a pending declaration.
pub async fn remote_info(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(invoice_id): Path<String>,
) -> Result<ApiOutcome, AppError> {
    Ok(state
        .emcf
        .invoice_status(&identity.provider.token, &invoice_id)
        .await)
}

/// `GET /v1/invoice/local/info/:invoice_id` — read a persisted invoice.
/// Only confirmed invoices are readable.
pub async fn local_info(
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .invoices
        .get(&invoice_id)
        .await?
        .ok_or(AppError::InvoiceNotFound)?;

    confirmed_invoice_response(invoice)
}

/// `POST /v1/invoice/transaction/fetch/data` — read a persisted invoice
/// by transaction id; `isFee` selects the default-credential scope.
pub async fn transaction_fetch(
    State(state): State<Arc<AppState>>,
    Json(query): Json<TransactionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let invoice = state
        .invoices
        .find_by_transaction(&query.transaction_id, query.is_fee)
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::InvoiceNotFound)?;

    confirmed_invoice_response(invoice)
}

fn confirmed_invoice_response(invoice: Invoice) -> Result<impl IntoResponse, AppError> {
    if invoice.status != InvoiceStatus::Confirm {
        return Err(AppError::InvoiceNotConfirmed);
    }

    // `providerKey` is skipped by the record's serialization.
    Ok((
        StatusCode::OK,
        Json(json!({
            "statusCode": 200,
            "values": invoice,
        })),
    ))
}

/// `POST /v1/invoice/declare` — declare an invoice upstream.
pub async fn declare(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<RequestIdentity>,
    Json(payload): Json<InvoicePayload>,
) -> Result<ApiOutcome, AppError> {
    info!(
        application = %identity.application,
        transaction_id = %payload.transaction_id,
        "invoice declaration received"
    );

    let now_ms = chrono::Utc::now().timestamp_millis();
    state.invoice_service.declare(&identity, payload, now_ms).await
}

/// `PUT /v1/invoice/complete` — confirm or cancel a pending declaration.
pub async fn complete(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<RequestIdentity>,
    Json(completion): Json<InvoiceCompletion>,
) -> Result<ApiOutcome, AppError> {
    info!(
        application = %identity.application,
        invoice_id = %completion.invoice_id,
        action = %completion.action,
        "invoice completion received"
    );

    state.invoice_service.complete(&identity, completion).await
}
