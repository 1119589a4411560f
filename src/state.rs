//! Shared application state: configuration, the credential registry,
//! storage seams, the upstream client and the lifecycle coordinator.

use std::sync::Arc;
use tracing::warn;

use shared::{Config, CredentialRegistry};

use crate::db::{InvoiceStore, MemoryInvoiceStore, MemoryProviderStore, ProviderStore};
use crate::services::{EmcfClient, InvoiceService, NotifyService};

const UPSTREAM_TIMEOUT_SECONDS: u64 = 30;

pub struct AppState {
    pub config: Config,
    pub credentials: CredentialRegistry,
    pub providers: Arc<dyn ProviderStore>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub emcf: EmcfClient,
    pub invoice_service: InvoiceService,
    pub notify: NotifyService,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_stores(
            config,
            Arc::new(MemoryProviderStore::new()),
            Arc::new(MemoryInvoiceStore::new()),
        )
    }

    /// Build state over explicit store implementations. Tests use this
    /// to seed providers and inspect persisted invoices.
    pub fn with_stores(
        config: Config,
        providers: Arc<dyn ProviderStore>,
        invoices: Arc<dyn InvoiceStore>,
    ) -> anyhow::Result<Self> {
        let credentials = config.credentials();
        if credentials.is_empty() {
            warn!("ALLOWED_APPS is empty, every signed request will be rejected");
        }

        let emcf = EmcfClient::new(config.emcf.base_url.clone(), UPSTREAM_TIMEOUT_SECONDS)?;
        let invoice_service = InvoiceService::new(
            invoices.clone(),
            emcf.clone(),
            config.request.invoice_ts_expiry_ms,
            config.emcf.user_pid.clone(),
        );
        let notify = NotifyService::new(config.notify.clone())?;

        Ok(Self {
            config,
            credentials,
            providers,
            invoices,
            emcf,
            invoice_service,
            notify,
        })
    }
}
