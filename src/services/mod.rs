pub mod emcf_client;
pub mod invoice_service;
pub mod notify_service;

pub use emcf_client::{ApiOutcome, EmcfClient};
pub use invoice_service::InvoiceService;
pub use notify_service::NotifyService;
