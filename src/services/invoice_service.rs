//! Invoice lifecycle coordinator.
//!
//! Owns the per-transaction state machine: pending -> confirm | cancel,
//! both terminal. For a (transactionId, credential-scope) key at most
//! one record may be pending or confirmed at a time; a cancelled record
//! does not block a retry with the same transaction id.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use shared::{AppError, Result};

use crate::db::InvoiceStore;
use crate::models::{Invoice, InvoiceCompletion, InvoicePayload, InvoiceStatus, Provider, RequestIdentity};
use crate::services::emcf_client::{ApiOutcome, EmcfClient};

#[derive(Clone)]
pub struct InvoiceService {
    invoices: Arc<dyn InvoiceStore>,
    emcf: EmcfClient,
    /// Age in millis after which a pending declaration is considered
    /// expired. The upstream expires pendings on the same interval.
    pending_expiry_ms: i64,
    /// Pid of the platform's own credential; declarations made with it
    /// live in the default-credential scope.
    default_pid: String,
    /// Per-key declare serialization. An entry exists only while a
    /// declare for that key is in flight.
    declare_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl InvoiceService {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        emcf: EmcfClient,
        pending_expiry_ms: i64,
        default_pid: String,
    ) -> Self {
        Self {
            invoices,
            emcf,
            pending_expiry_ms,
            default_pid,
            declare_locks: Arc::new(DashMap::new()),
        }
    }

    fn uses_default_credential(&self, provider: &Provider) -> bool {
        provider.pid == self.default_pid
    }

    /// Declare an invoice upstream, enforcing at most one active
    /// (pending or confirmed) declaration per transaction key.
    ///
    /// The check-then-act sequence and the final persist run under a
    /// per-key lock held across the upstream call, so concurrent
    /// declares for the same key serialize instead of double-submitting.
    pub async fn declare(
        &self,
        identity: &RequestIdentity,
        payload: InvoicePayload,
        now_ms: i64,
    ) -> Result<ApiOutcome> {
        let use_default = self.uses_default_credential(&identity.provider);
        let key = format!("{}:{}", payload.transaction_id, use_default);

        let lock = self
            .declare_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;

        let result = self
            .declare_locked(identity, payload, now_ms, use_default)
            .await;

        drop(guard);
        // Prune the entry unless another declare already holds a handle
        // (map entry + our clone = 2).
        self.declare_locks
            .remove_if(&key, |_, entry| Arc::strong_count(entry) <= 2);

        result
    }

    async fn declare_locked(
        &self,
        identity: &RequestIdentity,
        mut payload: InvoicePayload,
        now_ms: i64,
        use_default: bool,
    ) -> Result<ApiOutcome> {
        let transaction_id = payload.transaction_id.clone();

        let existing = self
            .invoices
            .find_by_transaction(&transaction_id, use_default)
            .await?;

        for invoice in &existing {
            match invoice.status {
                InvoiceStatus::Confirm => {
                    return Err(AppError::TransactionAlreadyConfirmed);
                }
                InvoiceStatus::Pending => {
                    if now_ms - invoice.created_at < self.pending_expiry_ms {
                        return Err(AppError::TransactionWaitingConfirmation);
                    }
                    // Expired pending: cancel locally. The upstream
                    // expires pendings after the same interval, so no
                    // remote cancellation call is made here.
                    warn!(
                        uid = %invoice.uid,
                        transaction_id = %transaction_id,
                        "auto-cancelling expired pending invoice"
                    );
                    self.invoices
                        .update_status(&invoice.uid, InvoiceStatus::Cancel, Some("Timeout !".into()))
                        .await?;
                }
                InvoiceStatus::Cancel => {}
            }
        }

        apply_provider_defaults(&mut payload, &identity.provider);

        let body = upstream_declaration_body(&payload)?;
        let outcome = self.emcf.declare(&identity.provider.token, &body).await;

        if outcome.is_ok() {
            // A 200 without a uid is a business-rule rejection; nothing
            // is persisted for it.
            let uid = outcome
                .value("uid")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            let Some(uid) = uid else {
                let reason = outcome
                    .value("errorDesc")
                    .and_then(Value::as_str)
                    .unwrap_or("DECLARATION_REJECTED")
                    .to_string();
                return Err(AppError::DeclarationRejected { reason });
            };

            info!(uid = %uid, transaction_id = %transaction_id, "invoice declared upstream");

            self.invoices
                .insert(Invoice {
                    uid,
                    provider_key: identity.provider.pid.clone(),
                    is_default_token: use_default,
                    status: InvoiceStatus::Pending,
                    created_at: now_ms,
                    pending_response: outcome.values.as_ref().map(Value::to_string),
                    action_response: None,
                    payload,
                })
                .await?;
        }

        Ok(outcome)
    }

    /// Confirm or cancel a pending declaration.
    ///
    /// Once the upstream accepts the completion call the declaration is
    /// consumed on its side whatever the business payload says, so the
    /// local record always moves to the requested terminal state before
    /// any business-level error is reported.
    pub async fn complete(
        &self,
        identity: &RequestIdentity,
        completion: InvoiceCompletion,
    ) -> Result<ApiOutcome> {
        let action = match completion.action.as_str() {
            "confirm" => InvoiceStatus::Confirm,
            "cancel" => InvoiceStatus::Cancel,
            "pending" => return Err(AppError::AlreadyPendingState),
            _ => return Err(AppError::InvalidActionValue),
        };

        let use_default = self.uses_default_credential(&identity.provider);
        let invoice = self
            .invoices
            .find_by_uid(&completion.invoice_id, use_default)
            .await?
            .ok_or(AppError::InvoiceNotFound)?;

        // Terminal records never transition again; retrying a completed
        // declaration is indistinguishable from completing an unknown
        // one from the caller's point of view.
        if invoice.status.is_terminal() {
            return Err(AppError::NotFoundOrAlreadyProcessed);
        }

        let outcome = self
            .emcf
            .complete(&identity.provider.token, &completion.invoice_id, action.as_str())
            .await;

        if outcome.is_ok() {
            self.invoices
                .update_status(
                    &completion.invoice_id,
                    action,
                    outcome.values.as_ref().map(Value::to_string),
                )
                .await?;

            info!(
                uid = %completion.invoice_id,
                action = action.as_str(),
                "invoice completion persisted"
            );

            if carries_error_code(&outcome) {
                return Err(AppError::NotFoundOrAlreadyProcessed);
            }
        }

        Ok(outcome)
    }
}

/// Fill in the payload fields the caller may omit from the resolved
/// provider profile, and force the seller fiscal id to the provider's.
fn apply_provider_defaults(payload: &mut InvoicePayload, provider: &Provider) {
    payload.ifu = Some(provider.ifu.clone());

    match payload.aib.as_deref() {
        None if provider.aib != "N/A" => payload.aib = Some(provider.aib.clone()),
        // "N/A" must never be forwarded upstream.
        Some("N/A") => payload.aib = None,
        _ => {}
    }

    if payload.invoice_type.is_none() {
        payload.invoice_type = Some(provider.invoice_type.clone());
    }

    for item in &mut payload.items {
        if item.tax_group.is_none() {
            item.tax_group = Some(provider.tax_group.clone());
        }
    }
}

/// Upstream body: the payload without the gateway-only idempotency key.
fn upstream_declaration_body(payload: &InvoicePayload) -> Result<Value> {
    let mut body = serde_json::to_value(payload)
        .map_err(|e| AppError::Unexpected(anyhow::anyhow!("payload serialization: {e}")))?;
    if let Some(map) = body.as_object_mut() {
        map.remove("transactionId");
    }
    Ok(body)
}

/// `errorCode` in a transport-successful completion body signals a
/// business-level rejection.
fn carries_error_code(outcome: &ApiOutcome) -> bool {
    match outcome.value("errorCode") {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
