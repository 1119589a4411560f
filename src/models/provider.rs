//! Provider profiles and the per-request resolved identity.

use serde::{Deserialize, Serialize};
use shared::config::EmcfConfig;

/// Upstream credential profile registered by a caller application.
/// Provisioning is handled elsewhere; the gateway only reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Stable key callers pass in `X-Provider-Key`.
    pub pid: String,
    /// Application that registered this provider.
    pub application: String,
    /// Upstream bearer token. Never serialized in responses.
    #[serde(skip_serializing, default)]
    pub token: String,
    /// Seller fiscal id ("Identifiant Fiscal Unique").
    pub ifu: String,
    /// Default AIB tax code, "N/A" when not applicable.
    pub aib: String,
    pub tax_group: String,
    pub invoice_type: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    pub notify_limit: i32,
}

impl Provider {
    /// The platform's own credential, used when no provider key is sent.
    pub fn from_default_credential(emcf: &EmcfConfig) -> Self {
        Self {
            pid: emcf.user_pid.clone(),
            application: emcf.user_name.clone(),
            token: emcf.user_token.clone(),
            ifu: emcf.user_ifu.clone(),
            aib: "N/A".into(),
            tax_group: "B".into(),
            invoice_type: "FV".into(),
            is_active: true,
            email: None,
            phone_number: None,
            notify_limit: 4,
        }
    }
}

/// Identity resolved by the authentication gate and attached to the
/// request extensions for the rest of the pipeline. Request-scoped by
/// construction; handlers never consult shared mutable state for it.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    /// Verified caller application name.
    pub application: String,
    pub provider: Provider,
    /// True when the request carried an `X-Provider-Key` that resolved,
    /// false when the default credential was substituted.
    pub explicit: bool,
}
