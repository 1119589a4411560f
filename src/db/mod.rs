//! Storage seams for provider profiles and invoice records.
//!
//! Durable persistence lives behind these traits; the gateway itself is
//! storage-agnostic. The in-memory implementations back single-instance
//! deployments and the test suite. A multi-instance deployment would
//! implement `InvoiceStore` over a database with a uniqueness
//! constraint on (transactionId, isDefaultToken, status in
//! {pending, confirm}) instead of relying on the in-process declare
//! lock alone.

mod memory;

pub use memory::{MemoryInvoiceStore, MemoryProviderStore};

use async_trait::async_trait;
use shared::Result;

use crate::models::{Invoice, InvoiceStatus, Provider};

#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// Lookup by the stable provider key.
    async fn find_by_pid(&self, pid: &str) -> Result<Option<Provider>>;

    /// Lookup by owning application and seller fiscal id.
    async fn find_by_application_ifu(
        &self,
        application: &str,
        ifu: &str,
    ) -> Result<Option<Provider>>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn insert(&self, invoice: Invoice) -> Result<()>;

    /// Lookup by declaration id, unscoped. Used by the read-only info route.
    async fn get(&self, uid: &str) -> Result<Option<Invoice>>;

    /// Lookup by declaration id within one credential scope.
    async fn find_by_uid(&self, uid: &str, is_default_token: bool) -> Result<Option<Invoice>>;

    /// All records for a (transactionId, credential-scope) key.
    async fn find_by_transaction(
        &self,
        transaction_id: &str,
        is_default_token: bool,
    ) -> Result<Vec<Invoice>>;

    /// Flip the status of one record, keeping the raw upstream response
    /// when provided. Status monotonicity is enforced by the lifecycle
    /// coordinator, which is the only mutator of invoice records.
    async fn update_status(
        &self,
        uid: &str,
        status: InvoiceStatus,
        action_response: Option<String>,
    ) -> Result<()>;
}
