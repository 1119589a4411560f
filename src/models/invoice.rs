//! Invoice declaration payloads and the persisted invoice record.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a declared invoice. `pending` moves to exactly one
/// of `confirm` or `cancel`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Confirm,
    Cancel,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Confirm => "confirm",
            InvoiceStatus::Cancel => "cancel",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InvoiceStatus::Confirm | InvoiceStatus::Cancel)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub name: String,
    pub price: f64,
    pub quantity: f64,
    /// Defaulted from the provider profile when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_specific: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_modification: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub name: String,
    pub amount: f64,
}

/// Invoice declaration request body. `transaction_id` is the caller's
/// idempotency key and is stripped before the payload goes upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayload {
    pub transaction_id: String,
    /// Seller fiscal id. Always overwritten with the resolved provider's.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ifu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aib: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub invoice_type: Option<String>,
    pub items: Vec<InvoiceItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientInfo>,
    pub operator: Operator,
    pub payment: Vec<Payment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Persisted invoice record. Serializes as the payload fields plus the
/// audit columns; `provider_key` never leaves the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Declaration id assigned by the upstream API.
    pub uid: String,
    #[serde(skip_serializing, default)]
    pub provider_key: String,
    pub is_default_token: bool,
    pub status: InvoiceStatus,
    /// Epoch millis at declaration time; drives pending-expiry.
    pub created_at: i64,
    /// Raw upstream declaration response, kept for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_response: Option<String>,
    /// Raw upstream completion response, kept for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_response: Option<String>,
    #[serde(flatten)]
    pub payload: InvoicePayload,
}

impl Invoice {
    pub fn transaction_id(&self) -> &str {
        &self.payload.transaction_id
    }
}

/// Completion request. `action` is validated by the coordinator rather
/// than by serde so invalid values surface as `INVALID_ACTION_VALUE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCompletion {
    pub invoice_id: String,
    pub action: String,
}

/// Lookup body for `transaction/fetch/data`. `is_fee` selects the
/// default-credential scope of the transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub transaction_id: String,
    pub is_fee: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> InvoicePayload {
        InvoicePayload {
            transaction_id: "trx-1".into(),
            ifu: Some("0202134567890".into()),
            aib: None,
            invoice_type: Some("FV".into()),
            items: vec![InvoiceItem {
                code: None,
                name: "Airtime".into(),
                price: 500.0,
                quantity: 2.0,
                tax_group: Some("B".into()),
                tax_specific: None,
                original_price: None,
                price_modification: None,
            }],
            client: None,
            operator: Operator {
                id: None,
                name: "counter-1".into(),
            },
            payment: vec![Payment {
                name: "ESPECES".into(),
                amount: 1000.0,
            }],
            reference: None,
        }
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Confirm).unwrap(),
            "\"confirm\""
        );
        let status: InvoiceStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, InvoiceStatus::Pending);
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!InvoiceStatus::Pending.is_terminal());
        assert!(InvoiceStatus::Confirm.is_terminal());
        assert!(InvoiceStatus::Cancel.is_terminal());
    }

    #[test]
    fn record_serialization_omits_provider_key() {
        let record = Invoice {
            uid: "uid-1".into(),
            provider_key: "pid-secret".into(),
            is_default_token: false,
            status: InvoiceStatus::Confirm,
            created_at: 1_700_000_000_000,
            pending_response: Some("{}".into()),
            action_response: None,
            payload: sample_payload(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("providerKey").is_none());
        assert_eq!(value["uid"], "uid-1");
        assert_eq!(value["transactionId"], "trx-1");
        assert_eq!(value["status"], "confirm");
    }

    #[test]
    fn payload_type_field_renames_to_type() {
        let value = serde_json::to_value(sample_payload()).unwrap();
        assert_eq!(value["type"], "FV");
        assert!(value.get("invoiceType").is_none());
    }
}
