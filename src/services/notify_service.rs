//! Operator notifications (email/SMS) through the external relay.
//!
//! Dispatch is best-effort: failures are logged, never propagated to
//! request handlers.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

use shared::config::NotifyConfig;

#[derive(Debug, Clone, Serialize)]
pub struct SmsContact {
    pub msisdn: String,
    pub country_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmsMessage {
    pub body: String,
    pub contacts: Vec<SmsContact>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MailMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    pub body: String,
    pub contacts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NotifyService {
    client: Client,
    config: NotifyConfig,
}

impl NotifyService {
    pub fn new(config: NotifyConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build notify HTTP client: {e}"))?;
        Ok(Self { client, config })
    }

    pub async fn send_sms(&self, message: SmsMessage) -> Option<Value> {
        self.dispatch(&self.config.sms_url, &serde_json::json!(message))
            .await
    }

    pub async fn send_mail(&self, message: MailMessage) -> Option<Value> {
        // The relay expects contacts as a JSON-encoded string field.
        let contacts = match serde_json::to_string(&message.contacts) {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "mail contacts serialization failed");
                return None;
            }
        };
        let payload = serde_json::json!({
            "object": message.object,
            "body": message.body,
            "contacts": contacts,
        });
        self.dispatch(&self.config.mail_url, &payload).await
    }

    async fn dispatch(&self, url: &str, payload: &Value) -> Option<Value> {
        debug!(%url, "notify dispatch");

        let result = self
            .client
            .post(url)
            .header("api_key", &self.config.api_key)
            .json(payload)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                response.json::<Value>().await.ok()
            }
            Ok(response) => {
                error!(status = response.status().as_u16(), %url, "notify relay rejected dispatch");
                None
            }
            Err(e) => {
                error!(error = %e, %url, "notify dispatch failed");
                None
            }
        }
    }
}
