//! Configuration management for the gateway.

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub app: AppConfig,
    pub request: RequestConfig,
    pub emcf: EmcfConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipe-separated `name:secret` pairs of callers allowed through the gate.
    pub allowed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Replay window: maximum tolerated gap between the request timestamp
    /// and server time, in milliseconds.
    pub timestamp_delay_ms: i64,
    /// Age after which a still-pending invoice declaration is considered
    /// expired and can be auto-cancelled locally, in milliseconds.
    pub invoice_ts_expiry_ms: i64,
}

/// Upstream e-MCF API endpoint and the platform's own default credential,
/// used when a request carries no `X-Provider-Key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmcfConfig {
    pub base_url: String,
    pub user_token: String,
    pub user_ifu: String,
    pub user_pid: String,
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub api_key: String,
    pub mail_url: String,
    pub sms_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            http: HttpConfig {
                port: env_parse("HTTP_PORT", 3000),
            },
            app: AppConfig {
                allowed: env_or("ALLOWED_APPS", ""),
            },
            request: RequestConfig {
                timestamp_delay_ms: env_parse("REQUEST_TIMESTAMP_DELAY", 5 * 60 * 1000),
                invoice_ts_expiry_ms: env_parse("INVOICE_EXPIRY_TS", 4 * 60 * 1000),
            },
            emcf: EmcfConfig {
                base_url: env_or("EMCF_BASEURL", "https://developper.impots.bj/sygmef-emcf"),
                user_token: env_or("EMCF_USER_TOKEN", ""),
                user_ifu: env_or("EMCF_USER_IFU", ""),
                user_pid: env_or("EMCF_USER_PID", ""),
                user_name: env_or("EMCF_USER_NAME", ""),
            },
            notify: NotifyConfig {
                api_key: env_or("NOTIFY_APIKEY", ""),
                mail_url: env_or("NOTIFY_MAIL_URL", ""),
                sms_url: env_or("NOTIFY_SMS_URL", ""),
            },
        })
    }

    /// Build the credential registry from the `ALLOWED_APPS` list.
    pub fn credentials(&self) -> CredentialRegistry {
        CredentialRegistry::parse(&self.app.allowed)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Static application-name to shared-secret mapping. Loaded once at
/// startup, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct CredentialRegistry {
    entries: Vec<(String, String)>,
}

impl CredentialRegistry {
    /// Parse a `name:secret|name:secret` list. Malformed entries are
    /// skipped with a warning rather than failing startup.
    pub fn parse(raw: &str) -> Self {
        let mut entries = Vec::new();
        for pair in raw.split('|').filter(|p| !p.is_empty()) {
            match pair.split_once(':') {
                Some((name, secret)) if !name.is_empty() && !secret.is_empty() => {
                    entries.push((name.to_string(), secret.to_string()));
                }
                _ => {
                    tracing::warn!(entry = pair, "ignoring malformed ALLOWED_APPS entry");
                }
            }
        }
        Self { entries }
    }

    pub fn secret_for(&self, application: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == application)
            .map(|(_, secret)| secret.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
