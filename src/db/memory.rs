//! DashMap-backed stores for single-instance deployments and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::Result;

use super::{InvoiceStore, ProviderStore};
use crate::models::{Invoice, InvoiceStatus, Provider};

#[derive(Debug, Default)]
pub struct MemoryProviderStore {
    providers: DashMap<String, Provider>,
}

impl MemoryProviderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile. Provisioning normally happens out-of-process;
    /// this is for bootstrap and tests.
    pub fn insert(&self, provider: Provider) {
        self.providers.insert(provider.pid.clone(), provider);
    }
}

#[async_trait]
impl ProviderStore for MemoryProviderStore {
    async fn find_by_pid(&self, pid: &str) -> Result<Option<Provider>> {
        Ok(self.providers.get(pid).map(|p| p.value().clone()))
    }

    async fn find_by_application_ifu(
        &self,
        application: &str,
        ifu: &str,
    ) -> Result<Option<Provider>> {
        Ok(self
            .providers
            .iter()
            .find(|p| p.application == application && p.ifu == ifu)
            .map(|p| p.value().clone()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryInvoiceStore {
    // Keyed by upstream declaration id.
    invoices: DashMap<String, Invoice>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn insert(&self, invoice: Invoice) -> Result<()> {
        self.invoices.insert(invoice.uid.clone(), invoice);
        Ok(())
    }

    async fn get(&self, uid: &str) -> Result<Option<Invoice>> {
        Ok(self.invoices.get(uid).map(|i| i.value().clone()))
    }

    async fn find_by_uid(&self, uid: &str, is_default_token: bool) -> Result<Option<Invoice>> {
        Ok(self
            .invoices
            .get(uid)
            .filter(|i| i.is_default_token == is_default_token)
            .map(|i| i.value().clone()))
    }

    async fn find_by_transaction(
        &self,
        transaction_id: &str,
        is_default_token: bool,
    ) -> Result<Vec<Invoice>> {
        Ok(self
            .invoices
            .iter()
            .filter(|i| {
                i.transaction_id() == transaction_id && i.is_default_token == is_default_token
            })
            .map(|i| i.value().clone())
            .collect())
    }

    async fn update_status(
        &self,
        uid: &str,
        status: InvoiceStatus,
        action_response: Option<String>,
    ) -> Result<()> {
        if let Some(mut invoice) = self.invoices.get_mut(uid) {
            invoice.status = status;
            if action_response.is_some() {
                invoice.action_response = action_response;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvoicePayload, Operator, Payment};

    fn record(uid: &str, transaction_id: &str, is_default_token: bool) -> Invoice {
        Invoice {
            uid: uid.into(),
            provider_key: "pid-1".into(),
            is_default_token,
            status: InvoiceStatus::Pending,
            created_at: 0,
            pending_response: None,
            action_response: None,
            payload: InvoicePayload {
                transaction_id: transaction_id.into(),
                ifu: None,
                aib: None,
                invoice_type: None,
                items: vec![],
                client: None,
                operator: Operator {
                    id: None,
                    name: "op".into(),
                },
                payment: vec![Payment {
                    name: "ESPECES".into(),
                    amount: 0.0,
                }],
                reference: None,
            },
        }
    }

    #[tokio::test]
    async fn provider_lookup_by_application_and_fiscal_id() {
        let store = MemoryProviderStore::new();
        store.insert(Provider {
            pid: "pid-1".into(),
            application: "app_1".into(),
            token: "t".into(),
            ifu: "0202134567890".into(),
            aib: "N/A".into(),
            tax_group: "B".into(),
            invoice_type: "FV".into(),
            is_active: true,
            email: None,
            phone_number: None,
            notify_limit: 4,
        });

        let found = store
            .find_by_application_ifu("app_1", "0202134567890")
            .await
            .unwrap();
        assert_eq!(found.unwrap().pid, "pid-1");

        let missing = store
            .find_by_application_ifu("app_2", "0202134567890")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn transaction_lookup_is_scoped_by_credential() {
        let store = MemoryInvoiceStore::new();
        store.insert(record("u1", "trx", false)).await.unwrap();
        store.insert(record("u2", "trx", true)).await.unwrap();

        let merchant = store.find_by_transaction("trx", false).await.unwrap();
        assert_eq!(merchant.len(), 1);
        assert_eq!(merchant[0].uid, "u1");

        let fee = store.find_by_transaction("trx", true).await.unwrap();
        assert_eq!(fee.len(), 1);
        assert_eq!(fee[0].uid, "u2");
    }

    #[tokio::test]
    async fn uid_lookup_honours_credential_scope() {
        let store = MemoryInvoiceStore::new();
        store.insert(record("u1", "trx", false)).await.unwrap();

        assert!(store.find_by_uid("u1", false).await.unwrap().is_some());
        // The other scope must not see it.
        assert!(store.find_by_uid("u1", true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_status_keeps_existing_response_when_none_given() {
        let store = MemoryInvoiceStore::new();
        store.insert(record("u1", "trx", false)).await.unwrap();

        store
            .update_status("u1", InvoiceStatus::Cancel, Some("Timeout !".into()))
            .await
            .unwrap();
        store
            .update_status("u1", InvoiceStatus::Cancel, None)
            .await
            .unwrap();

        let invoice = store.get("u1").await.unwrap().unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Cancel);
        assert_eq!(invoice.action_response.as_deref(), Some("Timeout !"));
    }
}
