pub mod invoice;
pub mod provider;

pub use invoice::{
    ClientInfo, Invoice, InvoiceCompletion, InvoiceItem, InvoicePayload, InvoiceStatus, Operator,
    Payment, TransactionQuery,
};
pub use provider::{Provider, RequestIdentity};
